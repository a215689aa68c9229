//! Shared primitives for the neffy NEFF engine.
//!
//! `neffy-core` provides the foundation the computation crates build on:
//!
//! - **Error types**: [`NeffError`] and [`Result`] for structured error handling
//! - **Traits**: Core abstractions like [`Scored`], [`ContentAddressable`], [`Summarizable`]
//! - **Hashing**: SHA-256 content addressing for alignment fingerprints

pub mod error;
pub mod hash;
pub mod traits;

pub use error::{NeffError, Result};
pub use traits::*;
