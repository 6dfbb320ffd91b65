//! # Key Store
//!
//! The keys of one identity. Each key is identified by a 32-byte hash of
//! its public credential and carries a set of purposes.
//!
//! The store is a plain data structure: it enforces its own structural
//! invariants (no duplicate purpose, at least one MANAGEMENT key once
//! seeded) but not caller authorization, which belongs to [`Identity`].
//! Fallible mutations are split into `check_*` (validation, no effects)
//! and an infallible apply step.
//!
//! [`Identity`]: crate::identity::Identity

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use trex_core::{KeyId, KeyPurpose, KeyType, PurposeSet, TrexError};

/// A key held by an identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Key {
    /// Hash of the public credential.
    pub id: KeyId,
    /// Purposes the key holds.
    pub purposes: PurposeSet,
    /// Algorithm tag.
    pub key_type: KeyType,
}

/// Keys of one identity, indexed by id and by purpose.
#[derive(Debug, Clone, Default)]
pub struct KeyStore {
    keys: HashMap<KeyId, Key>,
    by_purpose: BTreeMap<KeyPurpose, Vec<KeyId>>,
}

impl KeyStore {
    /// A store seeded with one MANAGEMENT key.
    pub fn with_management_key(key: KeyId, key_type: KeyType) -> Self {
        let mut store = Self::default();
        let purposes: PurposeSet = [KeyPurpose::Management].into_iter().collect();
        store.insert(key, &purposes, key_type);
        store
    }

    /// The key, if present.
    pub fn get(&self, key: &KeyId) -> Option<&Key> {
        self.keys.get(key)
    }

    /// Purposes of the key; empty if the key is absent.
    pub fn purposes(&self, key: &KeyId) -> PurposeSet {
        self.keys
            .get(key)
            .map(|k| k.purposes.clone())
            .unwrap_or_default()
    }

    /// Keys holding exactly `purpose`, in the order the purpose was granted.
    pub fn keys_by_purpose(&self, purpose: KeyPurpose) -> Vec<KeyId> {
        self.by_purpose.get(&purpose).cloned().unwrap_or_default()
    }

    /// Whether the key satisfies `purpose` (MANAGEMENT satisfies all).
    pub fn has_purpose(&self, key: &KeyId, purpose: KeyPurpose) -> bool {
        self.keys
            .get(key)
            .is_some_and(|k| k.purposes.covers(purpose))
    }

    /// Whether the key holds any purpose at all.
    pub fn contains(&self, key: &KeyId) -> bool {
        self.keys.contains_key(key)
    }

    /// Number of MANAGEMENT keys.
    pub fn management_key_count(&self) -> usize {
        self.by_purpose
            .get(&KeyPurpose::Management)
            .map_or(0, Vec::len)
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Validate adding `purposes` to `key`.
    pub fn check_add(&self, key: &KeyId, purposes: &PurposeSet) -> Result<(), TrexError> {
        if purposes.is_empty() {
            return Err(TrexError::InvalidInput("at least one purpose is required".into()));
        }
        if let Some(existing) = self.keys.get(key) {
            if let Some(held) = purposes.iter().find(|p| existing.purposes.contains(*p)) {
                return Err(TrexError::already_exists(format!("key {key} with purpose {held}")));
            }
        }
        Ok(())
    }

    /// Add purposes to a key, creating it if absent. Call `check_add` first.
    pub fn insert(&mut self, key: KeyId, purposes: &PurposeSet, key_type: KeyType) {
        let entry = self.keys.entry(key).or_insert_with(|| Key {
            id: key,
            purposes: PurposeSet::new(),
            key_type,
        });
        for purpose in purposes.iter() {
            if entry.purposes.insert(purpose) {
                self.by_purpose.entry(purpose).or_default().push(key);
            }
        }
    }

    /// Validate removing `purpose` from `key`.
    pub fn check_remove(&self, key: &KeyId, purpose: KeyPurpose) -> Result<(), TrexError> {
        let held = self
            .keys
            .get(key)
            .is_some_and(|k| k.purposes.contains(purpose));
        if !held {
            return Err(TrexError::not_found(format!("key {key} with purpose {purpose}")));
        }
        if purpose == KeyPurpose::Management && self.management_key_count() <= 1 {
            return Err(TrexError::LastManagementKey {
                key: key.to_string(),
            });
        }
        Ok(())
    }

    /// Remove `purpose` from `key`, deleting the key when no purpose is
    /// left. Call `check_remove` first.
    pub fn remove(&mut self, key: &KeyId, purpose: KeyPurpose) {
        let emptied = match self.keys.get_mut(key) {
            Some(k) => {
                k.purposes.remove(purpose);
                k.purposes.is_empty()
            }
            None => return,
        };
        if let Some(list) = self.by_purpose.get_mut(&purpose) {
            list.retain(|k| k != key);
        }
        if emptied {
            self.keys.remove(key);
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn purpose() -> impl Strategy<Value = KeyPurpose> {
        prop_oneof![
            Just(KeyPurpose::Management),
            Just(KeyPurpose::Action),
            Just(KeyPurpose::Claim),
        ]
    }

    proptest! {
        #[test]
        fn management_key_never_lost(ops in prop::collection::vec((any::<bool>(), 0u8..4, purpose()), 0..64)) {
            let mut store = KeyStore::with_management_key(KeyId::from_bytes([0; 32]), KeyType::Ecdsa);
            for (add, n, p) in ops {
                let key = KeyId::from_bytes([n; 32]);
                if add {
                    let set: PurposeSet = [p].into_iter().collect();
                    if store.check_add(&key, &set).is_ok() {
                        store.insert(key, &set, KeyType::Ecdsa);
                    }
                } else if store.check_remove(&key, p).is_ok() {
                    store.remove(&key, p);
                }
                prop_assert!(store.management_key_count() >= 1);
                for k in store.keys_by_purpose(p) {
                    prop_assert!(store.purposes(&k).contains(p));
                }
            }
        }
    }
}
