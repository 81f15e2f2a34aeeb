//! # Sealed Markets Test Suite
//!
//! Unified test crate for flows that cross crate boundaries.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── lifecycle.rs     # ledger properties and scenarios
//!     └── client_flows.rs  # wallet sessions against a devnet ledger
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p market-tests
//! cargo test -p market-tests integration::client_flows::
//! ```

pub mod integration;
