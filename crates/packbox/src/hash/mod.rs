//! Content keys used to look files up in the registries

pub mod digest;
pub mod fingerprint;

pub use digest::{sha1_hex, ContentHasher};
pub use fingerprint::{fingerprint, FingerprintCodec, FingerprintState};
