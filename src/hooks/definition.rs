use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{HookHash, HookOn, HookParameter, Namespace};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DefinitionError {
    #[error("unknown hook definition {0}")]
    Unknown(HookHash),
}

/// Immutable hook code plus the metadata it was first installed with.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HookDefinition {
    pub hook_hash: HookHash,
    #[serde(with = "crate::hooks::serde_bytes")]
    pub code: Vec<u8>,
    pub api_version: u16,
    /// Namespace supplied by the installing entry that created the definition.
    pub namespace: Namespace,
    pub hook_on: HookOn,
    /// Default parameters, sorted by name.
    #[serde(default)]
    pub parameters: Vec<HookParameter>,
    /// Slots, across all accounts, that point at this definition.
    pub reference_count: u64,
}

impl HookDefinition {
    pub fn size(&self) -> usize {
        self.code.len()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Acquired {
    Created,
    Existing,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Released {
    Remaining(u64),
    Destroyed,
}

/// Content-addressed arena of hook definitions with explicit reference
/// counting. A definition is removed in the same call that drops its last
/// reference, so no definition is ever stored with a count of zero.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct HookDefinitionStore {
    definitions: BTreeMap<HookHash, HookDefinition>,
}

impl HookDefinitionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, hash: &HookHash) -> Option<&HookDefinition> {
        self.definitions.get(hash)
    }

    pub fn contains(&self, hash: &HookHash) -> bool {
        self.definitions.contains_key(hash)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&HookHash, &HookDefinition)> {
        self.definitions.iter()
    }

    /// Take a reference on the definition for `code`, storing it first if no
    /// byte-identical code is present. Metadata of an existing definition is
    /// left as it was created.
    pub fn get_or_create(
        &mut self,
        code: &[u8],
        api_version: u16,
        namespace: Namespace,
        hook_on: HookOn,
        parameters: &[HookParameter],
    ) -> (HookHash, Acquired) {
        let hash = HookHash::of_code(code);
        if let Some(existing) = self.definitions.get_mut(&hash) {
            existing.reference_count += 1;
            return (hash, Acquired::Existing);
        }
        self.definitions.insert(
            hash,
            HookDefinition {
                hook_hash: hash,
                code: code.to_vec(),
                api_version,
                namespace,
                hook_on,
                parameters: parameters.to_vec(),
                reference_count: 1,
            },
        );
        (hash, Acquired::Created)
    }

    /// Take another reference on an already stored definition.
    pub fn acquire(&mut self, hash: &HookHash) -> Result<u64, DefinitionError> {
        let definition = self
            .definitions
            .get_mut(hash)
            .ok_or(DefinitionError::Unknown(*hash))?;
        definition.reference_count += 1;
        Ok(definition.reference_count)
    }

    pub fn release(&mut self, hash: &HookHash) -> Result<Released, DefinitionError> {
        let definition = self
            .definitions
            .get_mut(hash)
            .ok_or(DefinitionError::Unknown(*hash))?;
        definition.reference_count = definition.reference_count.saturating_sub(1);
        if definition.reference_count == 0 {
            self.definitions.remove(hash);
            return Ok(Released::Destroyed);
        }
        Ok(Released::Remaining(definition.reference_count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NS: Namespace = Namespace([0xAB; 32]);

    #[test]
    fn identical_code_shares_one_definition() {
        let limit = HookParameter {
            name: b"limit".to_vec(),
            value: vec![0x10],
        };
        let mut store = HookDefinitionStore::new();
        let (a, first) = store.get_or_create(b"\0asm accept", 0, NS, HookOn(0), &[limit.clone()]);
        let (b, second) =
            store.get_or_create(b"\0asm accept", 0, Namespace([1; 32]), HookOn(7), &[]);
        assert_eq!(a, b);
        assert_eq!(first, Acquired::Created);
        assert_eq!(second, Acquired::Existing);
        assert_eq!(store.len(), 1);
        let def = store.get(&a).unwrap();
        assert_eq!(def.reference_count, 2);
        assert_eq!(def.namespace, NS);
        assert_eq!(def.parameters, vec![limit]);
        assert_eq!(def.size(), 11);
    }

    #[test]
    fn last_release_destroys_definition() {
        let mut store = HookDefinitionStore::new();
        let (hash, _) = store.get_or_create(b"code", 0, NS, HookOn(0), &[]);
        store.acquire(&hash).unwrap();
        assert_eq!(store.release(&hash).unwrap(), Released::Remaining(1));
        assert_eq!(store.release(&hash).unwrap(), Released::Destroyed);
        assert!(!store.contains(&hash));
        assert_eq!(store.release(&hash), Err(DefinitionError::Unknown(hash)));
    }

    #[test]
    fn acquire_unknown_hash_fails() {
        let mut store = HookDefinitionStore::new();
        let hash = HookHash::of_code(b"missing");
        assert_eq!(store.acquire(&hash), Err(DefinitionError::Unknown(hash)));
    }
}
