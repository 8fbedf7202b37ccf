use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::ProtocolConfig;
use crate::hooks::definition::HookDefinitionStore;
use crate::hooks::reserve::ReserveAccountant;
use crate::hooks::slots::HookSlotTable;
use crate::hooks::state::{HookStateStore, StateChange, StateError, StateLimits};
use crate::hooks::{HookHash, HookParameter, Namespace};

pub type AccountId = String;
pub type Amount = u64;

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("unknown account {account}")]
    UnknownAccount { account: AccountId },
    #[error("insufficient funds in account {account}")]
    InsufficientAccountFunds { account: AccountId },
    #[error("crediting {amount} to {account} overflows its balance")]
    BalanceOverflow { account: AccountId, amount: Amount },
    #[error("account {account} balance {balance} cannot cover reserve {required}")]
    InsufficientReserve {
        account: AccountId,
        balance: Amount,
        required: Amount,
    },
    #[error("owner count of {account} would drop below zero")]
    ReserveUnderflow { account: AccountId },
    #[error(transparent)]
    State(#[from] StateError),
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct AccountRoot {
    pub balance: Amount,
    /// Ledger objects owned by the account, each locking one reserve increment.
    pub owner_count: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct LedgerMeta {
    pub sequence: u64,
    pub previous_tx: Option<[u8; 32]>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    AccountFunded {
        account: AccountId,
        amount: Amount,
    },
    FeeCharged {
        account: AccountId,
        amount: Amount,
    },
    DefinitionCreated {
        hook_hash: HookHash,
    },
    DefinitionDestroyed {
        hook_hash: HookHash,
    },
    HookInstalled {
        account: AccountId,
        slot: usize,
        hook_hash: HookHash,
    },
    HookReplaced {
        account: AccountId,
        slot: usize,
        previous: HookHash,
        hook_hash: HookHash,
    },
    HookUpdated {
        account: AccountId,
        slot: usize,
        hook_hash: HookHash,
    },
    HookCleared {
        account: AccountId,
        slot: usize,
        hook_hash: HookHash,
    },
    NamespaceDeleted {
        account: AccountId,
        namespace: Namespace,
        removed: usize,
    },
}

/// Immutable-by-convention ledger snapshot. Transactions are applied to a
/// clone and the clone replaces the previous snapshot only on success.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerState {
    pub meta: LedgerMeta,
    pub accounts: BTreeMap<AccountId, AccountRoot>,
    pub definitions: HookDefinitionStore,
    pub hooks: HookSlotTable,
    pub state: HookStateStore,
    /// Events of the most recent change only; each change replaces them.
    pub events: Vec<LedgerEvent>,
}

impl LedgerState {
    pub fn new(config: &ProtocolConfig) -> Self {
        Self {
            meta: LedgerMeta::default(),
            accounts: BTreeMap::new(),
            definitions: HookDefinitionStore::new(),
            hooks: HookSlotTable::new(config.max_slots),
            state: HookStateStore::new(),
            events: Vec::new(),
        }
    }

    pub fn account(&self, account: &AccountId) -> Option<&AccountRoot> {
        self.accounts.get(account)
    }

    pub fn credit_account(
        &mut self,
        account: &AccountId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let root = self
            .accounts
            .entry(account.clone())
            .or_insert_with(AccountRoot::default);
        root.balance = root
            .balance
            .checked_add(amount)
            .ok_or_else(|| LedgerError::BalanceOverflow {
                account: account.clone(),
                amount,
            })?;
        Ok(())
    }

    pub fn fund_account(
        &mut self,
        account: &AccountId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        self.credit_account(account, amount)?;
        self.events = vec![LedgerEvent::AccountFunded {
            account: account.clone(),
            amount,
        }];
        Ok(())
    }

    pub fn debit_account(&mut self, account: &AccountId, amount: Amount) -> Result<(), LedgerError> {
        let root = self
            .accounts
            .get_mut(account)
            .ok_or_else(|| LedgerError::UnknownAccount {
                account: account.clone(),
            })?;
        if root.balance < amount {
            return Err(LedgerError::InsufficientAccountFunds {
                account: account.clone(),
            });
        }
        root.balance -= amount;
        Ok(())
    }

    /// Write hook state on behalf of `account`, keeping its owner count in
    /// step: a new entry must be affordable and an erased one is refunded.
    pub fn write_hook_state(
        &mut self,
        config: &ProtocolConfig,
        account: &AccountId,
        namespace: Namespace,
        key: &[u8],
        value: &[u8],
    ) -> Result<StateChange, LedgerError> {
        StateLimits::from_config(config).check(key, value)?;
        let accountant = ReserveAccountant::from_config(config);
        let root = self
            .account(account)
            .ok_or_else(|| LedgerError::UnknownAccount {
                account: account.clone(),
            })?;
        let creates = !value.is_empty() && self.state.get(account, &namespace, key).is_none();
        if creates && !accountant.can_afford(self, account, 1) {
            return Err(LedgerError::InsufficientReserve {
                account: account.clone(),
                balance: root.balance,
                required: accountant.required_reserve(root.owner_count + 1),
            });
        }
        let change = self.state.set(account, namespace, key, value);
        accountant.apply(self, account, change.owner_delta())?;
        Ok(change)
    }

    /// Close out a committed transaction.
    pub fn record_transaction(&mut self, tx_hash: [u8; 32], events: Vec<LedgerEvent>) {
        self.events = events;
        self.meta.sequence += 1;
        self.meta.previous_tx = Some(tx_hash);
    }

    /// Root over accounts, definitions, slots and hook state. Two validators
    /// holding the same snapshot always agree on this value.
    pub fn state_root(&self) -> [u8; 32] {
        compute_merkle_root(self)
    }
}

fn update_len_prefixed(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

fn update_parameters(hasher: &mut Sha256, parameters: &[HookParameter]) {
    hasher.update((parameters.len() as u64).to_le_bytes());
    for param in parameters {
        update_len_prefixed(hasher, &param.name);
        update_len_prefixed(hasher, &param.value);
    }
}

fn compute_merkle_root(ledger: &LedgerState) -> [u8; 32] {
    let mut leaves: Vec<[u8; 32]> = Vec::new();
    for (account, root) in &ledger.accounts {
        let mut hasher = Sha256::new();
        hasher.update(b"acct");
        update_len_prefixed(&mut hasher, account.as_bytes());
        hasher.update(root.balance.to_le_bytes());
        hasher.update(root.owner_count.to_le_bytes());
        leaves.push(hasher.finalize().into());
    }
    for (hash, definition) in ledger.definitions.iter() {
        let mut hasher = Sha256::new();
        hasher.update(b"hookdef");
        hasher.update(hash.as_bytes());
        hasher.update(definition.api_version.to_le_bytes());
        hasher.update(definition.namespace.as_bytes());
        hasher.update(definition.hook_on.0.to_le_bytes());
        update_parameters(&mut hasher, &definition.parameters);
        hasher.update(definition.reference_count.to_le_bytes());
        leaves.push(hasher.finalize().into());
    }
    for (account, table) in ledger.hooks.accounts() {
        for (slot, reference) in table.references() {
            let mut hasher = Sha256::new();
            hasher.update(b"hook");
            update_len_prefixed(&mut hasher, account.as_bytes());
            hasher.update((slot as u64).to_le_bytes());
            hasher.update(reference.hook_hash.as_bytes());
            hasher.update(reference.namespace.as_bytes());
            hasher.update(reference.hook_on.0.to_le_bytes());
            hasher.update(reference.flags.0.to_le_bytes());
            update_parameters(&mut hasher, &reference.parameters);
            leaves.push(hasher.finalize().into());
        }
    }
    for (account, namespace, key, value) in ledger.state.iter() {
        let mut hasher = Sha256::new();
        hasher.update(b"state");
        update_len_prefixed(&mut hasher, account.as_bytes());
        hasher.update(namespace.as_bytes());
        update_len_prefixed(&mut hasher, key.as_bytes());
        update_len_prefixed(&mut hasher, &value.0);
        leaves.push(hasher.finalize().into());
    }
    build_merkle(leaves)
}

fn build_merkle(mut leaves: Vec<[u8; 32]>) -> [u8; 32] {
    if leaves.is_empty() {
        return Sha256::digest(b"hookset-ledger-empty").into();
    }
    while leaves.len() > 1 {
        let mut next = Vec::with_capacity((leaves.len() + 1) / 2);
        for chunk in leaves.chunks(2) {
            let mut hasher = Sha256::new();
            hasher.update(b"node");
            hasher.update(chunk[0]);
            if chunk.len() == 2 {
                hasher.update(chunk[1]);
            } else {
                hasher.update(chunk[0]);
            }
            next.push(hasher.finalize().into());
        }
        leaves = next;
    }
    leaves[0]
}
