//! Utils Module - Helper Functions & Shared Utilities
//!
//! Registries, ABI codec, input normalization, formatting and the client
//! cache shared by the scanner, the CLI and the API.

pub mod address;
pub mod cache;
pub mod constants;
pub mod decoder;
pub mod format;

pub use address::*;
pub use cache::*;
pub use constants::*;
pub use decoder::*;
pub use format::*;
