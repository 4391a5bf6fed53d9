//! Application Error - Unified error type for the application
//!
//! Defines [`AppError`] struct and [`AppResult<T>`] type alias.

use std::borrow::Cow;
use std::error::Error;
use std::fmt;

use super::kind::ErrorKind;

/// アプリケーション統一エラー型
///
/// 各クレート固有のエラー（例: `auth::AuthError`）はこの型へ変換され、
/// トランスポート層はこの型だけを見て応答を組み立てます。
///
/// ## Fields
/// * `kind` - エラーの分類
/// * `code` - 機械可読な安定コード（例: `AUTHENTICATION_ERROR`）
/// * `message` - ユーザー向けのエラーメッセージ
/// * `source` - 元のエラー（オプション、デバッグ用）
///
/// ## Examples
/// ```rust
/// use kernel::error::{app_error::AppError, kind::ErrorKind};
///
/// let err = AppError::new(ErrorKind::Unauthorized, "Session expired")
///     .with_code("AUTHENTICATION_ERROR");
/// assert_eq!(err.code(), Some("AUTHENTICATION_ERROR"));
/// ```
pub struct AppError {
    kind: ErrorKind,
    code: Option<&'static str>,
    message: Cow<'static, str>,
    source: Option<Box<dyn Error + Send + Sync + 'static>>,
}

/// アプリケーション結果型エイリアス
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// 新しいエラーを作成
    #[inline]
    pub fn new(kind: ErrorKind, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind,
            code: None,
            message: message.into(),
            source: None,
        }
    }

    /// 機械可読コードを設定
    #[inline]
    pub fn with_code(mut self, code: &'static str) -> Self {
        self.code = Some(code);
        self
    }

    /// 元のエラーを設定（デバッグ用）
    #[inline]
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    #[inline]
    pub fn code(&self) -> Option<&'static str> {
        self.code
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[inline]
    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

impl fmt::Debug for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut builder = f.debug_struct("AppError");
        builder.field("kind", &self.kind);
        if let Some(code) = self.code {
            builder.field("code", &code);
        }
        builder.field("message", &self.message);
        if let Some(source) = &self.source {
            builder.field("source", source);
        }
        builder.finish()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn Error + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_error() {
        let err = AppError::new(ErrorKind::Unauthorized, "Session expired");
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
        assert_eq!(err.message(), "Session expired");
        assert!(err.code().is_none());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_with_code() {
        let err =
            AppError::new(ErrorKind::Conflict, "Duplicate session").with_code("CONFLICT_ERROR");
        assert_eq!(err.code(), Some("CONFLICT_ERROR"));
        assert!(format!("{err:?}").contains("CONFLICT_ERROR"));
    }

    #[test]
    fn test_with_source() {
        let io_err = std::io::Error::new(std::io::ErrorKind::TimedOut, "pool timed out");
        let err =
            AppError::new(ErrorKind::ServiceUnavailable, "Pool exhausted").with_source(io_err);
        assert!(err.source().is_some());
        assert!(err.is_retryable());
    }

    #[test]
    fn test_display() {
        let err = AppError::new(ErrorKind::NotFound, "User not found");
        assert_eq!(err.to_string(), "[Not Found] User not found");
    }
}
