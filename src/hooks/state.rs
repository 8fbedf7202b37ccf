//! Persistent key-value state written by hooks, scoped by
//! `(account, namespace, key)`.
//!
//! Entries are nested account → namespace → key, so purging a namespace is a
//! single map removal: readers see either every entry of the namespace or
//! none of them.

use std::collections::BTreeMap;
use std::fmt;

use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};

use super::Namespace;
use crate::config::ProtocolConfig;
use crate::ledger::AccountId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    #[error("state key must not be empty")]
    EmptyKey,
    #[error("state key is {size} bytes, limit {max}")]
    KeyTooLarge { size: usize, max: usize },
    #[error("state value is {size} bytes, limit {max}")]
    ValueTooLarge { size: usize, max: usize },
}

#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StateKey(Vec<u8>);

impl StateKey {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StateKey({})", hex::encode_upper(&self.0))
    }
}

impl Serialize for StateKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode_upper(&self.0))
    }
}

impl<'de> Deserialize<'de> for StateKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        hex::decode(&encoded).map(Self).map_err(D::Error::custom)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateValue(pub Vec<u8>);

impl Serialize for StateValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        crate::hooks::serde_bytes::serialize(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for StateValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        crate::hooks::serde_bytes::deserialize(deserializer).map(Self)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StateLimits {
    pub max_key_size: usize,
    pub max_value_size: usize,
}

impl StateLimits {
    pub fn from_config(config: &ProtocolConfig) -> Self {
        Self {
            max_key_size: config.max_state_key_size,
            max_value_size: config.max_state_value_size,
        }
    }

    pub fn check(&self, key: &[u8], value: &[u8]) -> Result<(), StateError> {
        if key.is_empty() {
            return Err(StateError::EmptyKey);
        }
        if key.len() > self.max_key_size {
            return Err(StateError::KeyTooLarge {
                size: key.len(),
                max: self.max_key_size,
            });
        }
        if value.len() > self.max_value_size {
            return Err(StateError::ValueTooLarge {
                size: value.len(),
                max: self.max_value_size,
            });
        }
        Ok(())
    }
}

/// Effect of a single `set` on the entry count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StateChange {
    Created,
    Modified,
    Deleted,
    Unchanged,
}

impl StateChange {
    pub fn owner_delta(&self) -> i64 {
        match self {
            StateChange::Created => 1,
            StateChange::Deleted => -1,
            StateChange::Modified | StateChange::Unchanged => 0,
        }
    }
}

type NamespaceEntries = BTreeMap<StateKey, StateValue>;

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct HookStateStore {
    entries: BTreeMap<AccountId, BTreeMap<Namespace, NamespaceEntries>>,
}

impl HookStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, account: &AccountId, namespace: &Namespace, key: &[u8]) -> Option<&[u8]> {
        self.entries
            .get(account)?
            .get(namespace)?
            .get(&StateKey::new(key))
            .map(|v| v.0.as_slice())
    }

    /// Write one entry. An empty value removes the entry; writing an empty
    /// value to an absent key changes nothing.
    pub fn set(
        &mut self,
        account: &AccountId,
        namespace: Namespace,
        key: &[u8],
        value: &[u8],
    ) -> StateChange {
        let key = StateKey::new(key);
        if value.is_empty() {
            let Some(namespaces) = self.entries.get_mut(account) else {
                return StateChange::Unchanged;
            };
            let Some(entries) = namespaces.get_mut(&namespace) else {
                return StateChange::Unchanged;
            };
            if entries.remove(&key).is_none() {
                return StateChange::Unchanged;
            }
            if entries.is_empty() {
                namespaces.remove(&namespace);
            }
            if namespaces.is_empty() {
                self.entries.remove(account);
            }
            return StateChange::Deleted;
        }

        let previous = self
            .entries
            .entry(account.clone())
            .or_default()
            .entry(namespace)
            .or_default()
            .insert(key, StateValue(value.to_vec()));
        match previous {
            Some(_) => StateChange::Modified,
            None => StateChange::Created,
        }
    }

    pub fn namespace_len(&self, account: &AccountId, namespace: &Namespace) -> usize {
        self.entries
            .get(account)
            .and_then(|n| n.get(namespace))
            .map_or(0, BTreeMap::len)
    }

    /// Remove every entry of `namespace` owned by `account`, returning how
    /// many were removed. An absent namespace removes nothing.
    pub fn delete_namespace(&mut self, account: &AccountId, namespace: &Namespace) -> usize {
        let Some(namespaces) = self.entries.get_mut(account) else {
            return 0;
        };
        let removed = namespaces.remove(namespace).map_or(0, |e| e.len());
        if namespaces.is_empty() {
            self.entries.remove(account);
        }
        removed
    }

    pub fn entries_owned_by(&self, account: &AccountId) -> usize {
        self.entries
            .get(account)
            .map_or(0, |n| n.values().map(BTreeMap::len).sum())
    }

    pub fn namespaces(&self, account: &AccountId) -> Vec<Namespace> {
        self.entries
            .get(account)
            .map(|n| n.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn namespace_entries(
        &self,
        account: &AccountId,
        namespace: &Namespace,
    ) -> Vec<(&StateKey, &StateValue)> {
        self.entries
            .get(account)
            .and_then(|n| n.get(namespace))
            .map(|e| e.iter().collect())
            .unwrap_or_default()
    }

    /// Every entry in canonical order, for state-root hashing.
    pub fn iter(&self) -> impl Iterator<Item = (&AccountId, &Namespace, &StateKey, &StateValue)> {
        self.entries.iter().flat_map(|(account, namespaces)| {
            namespaces.iter().flat_map(move |(ns, entries)| {
                entries.iter().map(move |(k, v)| (account, ns, k, v))
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NS_A: Namespace = Namespace([0xDE; 32]);
    const NS_B: Namespace = Namespace([0x01; 32]);

    fn alice() -> AccountId {
        "alice".into()
    }

    #[test]
    fn empty_value_clears_entry() {
        let mut store = HookStateStore::new();
        assert_eq!(store.set(&alice(), NS_A, b"k", b"v1"), StateChange::Created);
        assert_eq!(store.set(&alice(), NS_A, b"k", b"v2"), StateChange::Modified);
        assert_eq!(store.get(&alice(), &NS_A, b"k"), Some(&b"v2"[..]));
        assert_eq!(store.set(&alice(), NS_A, b"k", b""), StateChange::Deleted);
        assert_eq!(store.get(&alice(), &NS_A, b"k"), None);
        assert_eq!(store.set(&alice(), NS_A, b"k", b""), StateChange::Unchanged);
        assert_eq!(store, HookStateStore::new());
    }

    #[test]
    fn delete_namespace_leaves_other_namespaces_and_accounts() {
        let mut store = HookStateStore::new();
        let bob: AccountId = "bob".into();
        store.set(&alice(), NS_A, b"one", b"1");
        store.set(&alice(), NS_A, b"two", b"2");
        store.set(&alice(), NS_B, b"one", b"1");
        store.set(&bob, NS_A, b"one", b"1");

        assert_eq!(store.delete_namespace(&alice(), &NS_A), 2);
        assert_eq!(store.namespace_len(&alice(), &NS_A), 0);
        assert_eq!(store.get(&alice(), &NS_B, b"one"), Some(&b"1"[..]));
        assert_eq!(store.get(&bob, &NS_A, b"one"), Some(&b"1"[..]));
        assert_eq!(store.entries_owned_by(&alice()), 1);
    }

    #[test]
    fn listing_follows_canonical_order() {
        let mut store = HookStateStore::new();
        store.set(&alice(), NS_A, b"zeta", b"2");
        store.set(&alice(), NS_A, b"alpha", b"1");
        store.set(&alice(), NS_B, b"one", b"1");
        assert_eq!(store.namespaces(&alice()), vec![NS_B, NS_A]);
        let keys: Vec<&[u8]> = store
            .namespace_entries(&alice(), &NS_A)
            .into_iter()
            .map(|(key, _)| key.as_bytes())
            .collect();
        assert_eq!(keys, vec![&b"alpha"[..], &b"zeta"[..]]);
        assert!(store.namespaces(&"bob".into()).is_empty());
        assert!(store.namespace_entries(&alice(), &Namespace([9; 32])).is_empty());
    }

    #[test]
    fn delete_empty_namespace_is_noop() {
        let mut store = HookStateStore::new();
        store.set(&alice(), NS_B, b"one", b"1");
        let before = store.clone();
        assert_eq!(store.delete_namespace(&alice(), &NS_A), 0);
        assert_eq!(store.delete_namespace(&"ghost".to_string(), &NS_A), 0);
        assert_eq!(store, before);
    }

    #[test]
    fn limits_reject_oversized_keys_and_values() {
        let limits = StateLimits::from_config(&ProtocolConfig::default());
        assert_eq!(limits.check(b"", b"v"), Err(StateError::EmptyKey));
        assert!(limits.check(&[0u8; 32], &[0u8; 128]).is_ok());
        assert_eq!(
            limits.check(&[0u8; 33], b"v"),
            Err(StateError::KeyTooLarge { size: 33, max: 32 })
        );
        assert_eq!(
            limits.check(b"k", &[0u8; 129]),
            Err(StateError::ValueTooLarge { size: 129, max: 128 })
        );
    }

    #[test]
    fn store_serializes_with_hex_keys() {
        let mut store = HookStateStore::new();
        store.set(&alice(), NS_B, b"\x01", b"\xFF");
        let json = serde_json::to_string(&store).unwrap();
        assert!(json.contains("\"01\":\"FF\""));
        let back: HookStateStore = serde_json::from_str(&json).unwrap();
        assert_eq!(back, store);
    }
}
