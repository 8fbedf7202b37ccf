use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::{HookFlags, HookHash, HookOn, HookParameter, Namespace};
use crate::ledger::AccountId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SlotError {
    #[error("slot {index} out of range, table holds {capacity}")]
    OutOfRange { index: usize, capacity: usize },
}

/// Occupied slot: which definition runs, under which namespace, on which
/// transaction types.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HookReference {
    pub hook_hash: HookHash,
    pub namespace: Namespace,
    pub hook_on: HookOn,
    #[serde(default)]
    pub flags: HookFlags,
    /// Overrides of the definition's default parameters, sorted by name.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<HookParameter>,
}

/// Fixed-capacity hook table of one account. Holes are `None` and keep
/// their position.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HookTable {
    slots: Vec<Option<HookReference>>,
}

impl HookTable {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.occupied() == 0
    }

    pub fn get(&self, index: usize) -> Option<&HookReference> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    pub fn slots(&self) -> &[Option<HookReference>] {
        &self.slots
    }

    pub fn set(
        &mut self,
        index: usize,
        reference: Option<HookReference>,
    ) -> Result<Option<HookReference>, SlotError> {
        let capacity = self.slots.len();
        let slot = self
            .slots
            .get_mut(index)
            .ok_or(SlotError::OutOfRange { index, capacity })?;
        Ok(std::mem::replace(slot, reference))
    }

    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn references(&self) -> impl Iterator<Item = (usize, &HookReference)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(idx, slot)| slot.as_ref().map(|r| (idx, r)))
    }

    pub fn distinct_definitions(&self) -> BTreeSet<HookHash> {
        self.references().map(|(_, r)| r.hook_hash).collect()
    }

    /// Hooks that fire for `tx_type`, in slot order.
    pub fn triggered_by(&self, tx_type: u16) -> Vec<(usize, &HookReference)> {
        self.references()
            .filter(|(_, r)| r.hook_on.can_hook(tx_type))
            .collect()
    }
}

/// Hook tables of every account. Accounts without any installed hook have no
/// stored table; readers see an all-holes table of the configured capacity.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HookSlotTable {
    capacity: usize,
    tables: BTreeMap<AccountId, HookTable>,
}

impl HookSlotTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            tables: BTreeMap::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn table(&self, account: &AccountId) -> HookTable {
        self.tables
            .get(account)
            .cloned()
            .unwrap_or_else(|| HookTable::with_capacity(self.capacity))
    }

    pub fn slot(&self, account: &AccountId, index: usize) -> Option<&HookReference> {
        self.tables.get(account).and_then(|t| t.get(index))
    }

    pub fn set_slot(
        &mut self,
        account: &AccountId,
        index: usize,
        reference: Option<HookReference>,
    ) -> Result<Option<HookReference>, SlotError> {
        if index >= self.capacity {
            return Err(SlotError::OutOfRange {
                index,
                capacity: self.capacity,
            });
        }
        let capacity = self.capacity;
        let table = self
            .tables
            .entry(account.clone())
            .or_insert_with(|| HookTable::with_capacity(capacity));
        let previous = table.set(index, reference)?;
        if table.is_empty() {
            self.tables.remove(account);
        }
        Ok(previous)
    }

    pub fn accounts(&self) -> impl Iterator<Item = (&AccountId, &HookTable)> {
        self.tables.iter()
    }
}
