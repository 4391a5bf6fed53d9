//! Platform Crate - Technical Infrastructure
//!
//! This crate provides shared technical foundations:
//! - Cryptographic utilities (SHA-256, Base64)
//! - Client identification (device metadata, device fingerprint)

pub mod client;
pub mod crypto;
