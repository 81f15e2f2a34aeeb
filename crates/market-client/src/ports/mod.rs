//! # Ports Layer
//!
//! - `provider`: the wallet + RPC the session drives

pub mod provider;

pub use provider::*;
