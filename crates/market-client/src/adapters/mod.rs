//! # Adapters Layer
//!
//! Provider implementations.

pub mod devnet;

pub use devnet::*;
