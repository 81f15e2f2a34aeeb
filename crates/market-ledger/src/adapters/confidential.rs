//! # Confidential Backend Adapter
//!
//! In-memory stand-in for a confidential-computation coprocessor. Plaintexts
//! never leave the backend; callers only ever see handles. Each handle keeps
//! its own access list (the capability map from (handle, subject) to
//! may-unseal).

use crate::domain::services::keccak256;
use crate::domain::value_objects::{Address, CiphertextHandle, SealedValue};
use crate::errors::AclError;
use crate::ports::outbound::ConfidentialCompute;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug)]
struct SealedEntry {
    value: SealedValue,
    acl: HashSet<Address>,
}

/// In-memory confidential backend.
#[derive(Debug)]
pub struct InMemoryConfidentialStore {
    /// Sealed plaintexts and their access lists.
    entries: RwLock<HashMap<CiphertextHandle, SealedEntry>>,
    /// Handle derivation counter.
    counter: AtomicU64,
    /// Backend-specific salt mixed into every handle.
    salt: [u8; 32],
}

impl InMemoryConfidentialStore {
    /// Create a backend with the given salt.
    #[must_use]
    pub fn new(salt: [u8; 32]) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            counter: AtomicU64::new(0),
            salt,
        }
    }

    /// Number of sealed values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if no sealed values are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Subjects allowed to unseal `handle`.
    #[must_use]
    pub fn access_list(&self, handle: CiphertextHandle) -> Vec<Address> {
        let mut subjects: Vec<Address> = self
            .entries
            .read()
            .get(&handle)
            .map(|entry| entry.acl.iter().copied().collect())
            .unwrap_or_default();
        subjects.sort();
        subjects
    }

    fn derive_handle(&self, value: &SealedValue) -> CiphertextHandle {
        let sequence = self.counter.fetch_add(1, Ordering::SeqCst);
        let kind = value.kind();

        let mut preimage = Vec::with_capacity(1 + 8 + 32);
        preimage.push(kind.tag());
        preimage.extend_from_slice(&sequence.to_be_bytes());
        preimage.extend_from_slice(&self.salt);

        CiphertextHandle::new(keccak256(&preimage), kind)
    }
}

impl Default for InMemoryConfidentialStore {
    fn default() -> Self {
        Self::new(keccak256(b"sealed-markets/devnet").0)
    }
}

impl ConfidentialCompute for InMemoryConfidentialStore {
    fn seal(&self, value: SealedValue) -> CiphertextHandle {
        let handle = self.derive_handle(&value);
        self.entries.write().insert(
            handle,
            SealedEntry {
                value,
                acl: HashSet::new(),
            },
        );
        handle
    }

    fn allow(&self, handle: CiphertextHandle, subject: Address) -> Result<(), AclError> {
        let mut entries = self.entries.write();
        let entry = entries
            .get_mut(&handle)
            .ok_or(AclError::UnknownHandle(handle))?;
        entry.acl.insert(subject);
        Ok(())
    }

    fn discard(&self, handle: CiphertextHandle) {
        self.entries.write().remove(&handle);
    }

    fn is_allowed(&self, handle: CiphertextHandle, subject: Address) -> bool {
        self.entries
            .read()
            .get(&handle)
            .is_some_and(|entry| entry.acl.contains(&subject))
    }

    fn unseal(
        &self,
        handle: CiphertextHandle,
        requester: Address,
    ) -> Result<SealedValue, AclError> {
        let entries = self.entries.read();
        let entry = entries.get(&handle).ok_or(AclError::UnknownHandle(handle))?;
        if !entry.acl.contains(&requester) {
            return Err(AclError::NotAllowed {
                handle,
                subject: requester,
            });
        }
        Ok(entry.value)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{SealedKind, U256};

    #[test]
    fn test_handles_are_unique_and_opaque() {
        let backend = InMemoryConfidentialStore::default();
        let a = backend.seal_amount(U256::from(10));
        let b = backend.seal_amount(U256::from(10));

        assert_ne!(a, b, "same plaintext must not produce the same handle");
        assert_eq!(a.kind(), SealedKind::Amount);
        assert_eq!(backend.len(), 2);
    }

    #[test]
    fn test_unseal_requires_acl() {
        let backend = InMemoryConfidentialStore::default();
        let owner = Address::repeat_byte(1);
        let stranger = Address::repeat_byte(2);

        let handle = backend.seal_bool(true);
        assert!(matches!(
            backend.unseal(handle, owner),
            Err(AclError::NotAllowed { .. })
        ));

        backend.allow(handle, owner).unwrap();
        assert!(backend.is_allowed(handle, owner));
        assert!(!backend.is_allowed(handle, stranger));
        assert_eq!(backend.unseal_bool(handle, owner), Ok(true));
        assert!(matches!(
            backend.unseal_bool(handle, stranger),
            Err(AclError::NotAllowed { .. })
        ));
    }

    #[test]
    fn test_allow_unknown_handle() {
        let backend = InMemoryConfidentialStore::default();
        let other = InMemoryConfidentialStore::new([9u8; 32]);
        let foreign = other.seal_bool(false);

        assert_eq!(
            backend.allow(foreign, Address::repeat_byte(1)),
            Err(AclError::UnknownHandle(foreign))
        );
    }

    #[test]
    fn test_discard_forgets_handle() {
        let backend = InMemoryConfidentialStore::default();
        let owner = Address::repeat_byte(1);
        let kept = backend.seal_amount(U256::from(5));
        let dropped = backend.seal_amount(U256::from(7));
        backend.allow(dropped, owner).unwrap();

        backend.discard(dropped);
        backend.discard(dropped);

        assert_eq!(backend.len(), 1);
        assert!(!backend.is_allowed(dropped, owner));
        assert_eq!(
            backend.unseal(dropped, owner),
            Err(AclError::UnknownHandle(dropped))
        );
        assert!(backend.access_list(kept).is_empty());
    }

    #[test]
    fn test_access_list_listing() {
        let backend = InMemoryConfidentialStore::default();
        let handle = backend.seal_amount(U256::one());
        backend.allow(handle, Address::repeat_byte(3)).unwrap();
        backend.allow(handle, Address::repeat_byte(1)).unwrap();
        backend.allow(handle, Address::repeat_byte(3)).unwrap();

        assert_eq!(
            backend.access_list(handle),
            vec![Address::repeat_byte(1), Address::repeat_byte(3)]
        );
    }
}
