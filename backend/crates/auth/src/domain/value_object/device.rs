//! Device value objects
//!
//! Fingerprinting lives in `platform`; the domain only stores the result.

pub use platform::client::{DeviceFingerprint, DeviceId, DeviceMetadata};
