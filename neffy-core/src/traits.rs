//! Core trait definitions for neffy.
//!
//! These traits define the contracts that alignment and result types implement.

/// A type whose identity can be derived from its content via cryptographic hash.
pub trait ContentAddressable {
    /// Return the content hash as a hex string (e.g. SHA-256).
    fn content_hash(&self) -> String;
}

/// A type that carries a numeric score (NEFF value, weight, etc.).
pub trait Scored {
    /// The score value.
    fn score(&self) -> f64;
}

/// A type that can produce a summary of its contents.
pub trait Summarizable {
    /// A one-line summary suitable for display.
    fn summary(&self) -> String;
}
