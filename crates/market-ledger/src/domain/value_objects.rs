//! # Value Objects
//!
//! Immutable domain primitives for the market ledger.
//! These types represent concepts that are defined by their value, not identity.

use serde::{Deserialize, Serialize};
use std::fmt;

// Re-export U256 from primitive-types for native-currency amounts (wei)
pub use primitive_types::U256;

/// Sequential market identifier (0, 1, 2, ...).
pub type MarketId = u64;

/// Unix timestamp in seconds.
pub type Timestamp = u64;

/// Wei per ether (10^18).
pub const WEI_PER_ETHER: u64 = 1_000_000_000_000_000_000;

/// Returns `milli` thousandths of an ether in wei.
#[must_use]
pub fn milli_ether(milli: u64) -> U256 {
    U256::from(milli) * U256::from(WEI_PER_ETHER / 1_000)
}

/// Returns `whole` ether in wei.
#[must_use]
pub fn ether(whole: u64) -> U256 {
    U256::from(whole) * U256::from(WEI_PER_ETHER)
}

// =============================================================================
// ADDRESS (20 bytes)
// =============================================================================

/// A 20-byte account address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The zero address (0x0000...0000).
    pub const ZERO: Self = Self([0u8; 20]);

    /// Creates an address from a 20-byte array.
    #[must_use]
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Creates an address with every byte set to `byte`.
    #[must_use]
    pub const fn repeat_byte(byte: u8) -> Self {
        Self([byte; 20])
    }

    /// Creates an address from a slice. Returns None if wrong length.
    #[must_use]
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        if slice.len() == 20 {
            let mut bytes = [0u8; 20];
            bytes.copy_from_slice(slice);
            Some(Self(bytes))
        } else {
            None
        }
    }

    /// Parses a `0x`-prefixed (or bare) 40-digit hex string.
    #[must_use]
    pub fn from_hex(s: &str) -> Option<Self> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(digits).ok()?;
        Self::from_slice(&bytes)
    }

    /// Full lowercase `0x` hex form.
    #[must_use]
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Returns the underlying bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Returns true if this is the zero address.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        for byte in &self.0[..4] {
            write!(f, "{byte:02x}")?;
        }
        write!(f, "...")?;
        for byte in &self.0[18..] {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

// =============================================================================
// HASH (32 bytes)
// =============================================================================

/// A 32-byte Keccak-256 hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Hash(pub [u8; 32]);

impl Hash {
    /// The zero hash.
    pub const ZERO: Self = Self([0u8; 32]);

    /// Creates a hash from a 32-byte array.
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the underlying bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Returns true if this is the zero hash.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        for byte in &self.0[..4] {
            write!(f, "{byte:02x}")?;
        }
        write!(f, "...")?;
        for byte in &self.0[28..] {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl From<[u8; 32]> for Hash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

// =============================================================================
// CIPHERTEXT HANDLE
// =============================================================================

/// Kind of plaintext a handle refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SealedKind {
    /// An unsigned amount (stake).
    Amount,
    /// A boolean (prediction).
    Bool,
}

impl SealedKind {
    /// Domain-separation tag mixed into handle derivation.
    #[must_use]
    pub const fn tag(self) -> u8 {
        match self {
            Self::Amount => 0x01,
            Self::Bool => 0x02,
        }
    }
}

/// Opaque reference to a sealed value held by the confidential backend.
///
/// The handle carries no information about the plaintext; only subjects on
/// the handle's access list can ask the backend to unseal it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CiphertextHandle {
    digest: Hash,
    kind: SealedKind,
}

impl CiphertextHandle {
    /// Creates a handle from its digest and kind.
    #[must_use]
    pub const fn new(digest: Hash, kind: SealedKind) -> Self {
        Self { digest, kind }
    }

    /// The handle digest.
    #[must_use]
    pub const fn digest(&self) -> Hash {
        self.digest
    }

    /// The kind of value behind the handle.
    #[must_use]
    pub const fn kind(&self) -> SealedKind {
        self.kind
    }
}

impl fmt::Debug for CiphertextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle<{:?}>({})", self.kind, self.digest)
    }
}

/// Plaintext recovered from a handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SealedValue {
    /// Amount plaintext.
    Amount(U256),
    /// Boolean plaintext.
    Bool(bool),
}

impl SealedValue {
    /// The kind of this plaintext.
    #[must_use]
    pub const fn kind(&self) -> SealedKind {
        match self {
            Self::Amount(_) => SealedKind::Amount,
            Self::Bool(_) => SealedKind::Bool,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
