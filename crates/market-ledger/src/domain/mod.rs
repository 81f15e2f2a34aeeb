//! # Domain Layer (Inner Hexagon)
//!
//! Pure market logic with no I/O.
//!
//! - `value_objects`: addresses, hashes, amounts, ciphertext handles
//! - `entities`: markets, bets, configuration, state changes
//! - `services`: hashing, validation, payout formula
//! - `invariants`: transition checks run before every commit

pub mod entities;
pub mod invariants;
pub mod services;
pub mod value_objects;

pub use entities::*;
pub use invariants::*;
pub use services::*;
pub use value_objects::*;
