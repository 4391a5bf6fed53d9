//! Error Kind - Classification of errors
//!
//! Defines the [`ErrorKind`] enum shared by every crate's error type.

use serde::Serialize;

/// エラー種別の列挙体
///
/// 各クレートのエラーはこの分類にマッピングされます。
/// HTTP ステータスへの変換はトランスポート層の責務です。
///
/// ## Examples
/// ```rust
/// use kernel::error::kind::ErrorKind;
///
/// let kind = ErrorKind::ServiceUnavailable;
/// assert!(kind.is_retryable());
/// assert_eq!(kind.as_str(), "Service Unavailable");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum ErrorKind {
    /// 入力が不正（セッション検索条件など）
    BadRequest,
    /// 認証失敗（資格情報・トークン・セッション）
    Unauthorized,
    /// 必要なリソースが見つからない
    NotFound,
    /// ストアの現在の状態と競合（一意制約違反など）
    Conflict,
    /// 内部エラー
    InternalServerError,
    /// 一時的に利用不可（接続プール枯渇など）
    ServiceUnavailable,
}

impl ErrorKind {
    /// ユーザー向けの文字列表現を取得
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "Bad Request",
            ErrorKind::Unauthorized => "Unauthorized",
            ErrorKind::NotFound => "Not Found",
            ErrorKind::Conflict => "Conflict",
            ErrorKind::InternalServerError => "Internal Server Error",
            ErrorKind::ServiceUnavailable => "Service Unavailable",
        }
    }

    /// 一時的なリソース不足かどうか
    ///
    /// 呼び出し側で再試行してよいエラーは `true` を返します。
    /// このクレート自身は自動再試行を行いません。
    #[inline]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::ServiceUnavailable)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_service_unavailable_is_retryable() {
        assert!(ErrorKind::ServiceUnavailable.is_retryable());
        assert!(!ErrorKind::InternalServerError.is_retryable());
        assert!(!ErrorKind::Conflict.is_retryable());
        assert!(!ErrorKind::Unauthorized.is_retryable());
    }

    #[test]
    fn test_display() {
        assert_eq!(ErrorKind::Unauthorized.to_string(), "Unauthorized");
        assert_eq!(ErrorKind::InternalServerError.to_string(), "Internal Server Error");
    }

    #[test]
    fn test_serializes_as_screaming_snake_case() {
        let json = serde_json::to_string(&ErrorKind::ServiceUnavailable).unwrap();
        assert_eq!(json, "\"SERVICE_UNAVAILABLE\"");
    }
}
