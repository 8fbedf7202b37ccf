//! SetHook transaction processing.
//!
//! A transaction is staged against a private clone of the ledger snapshot:
//! stateless checks first, then every slot change in array order, then all
//! namespace deletions, then fee and reserve. Only a fully staged clone is
//! ever handed back, so a rejected transaction leaves the caller's snapshot
//! exactly as it was.

use super::definition::{Acquired, Released};
use super::reserve::{hook_object_count, ReserveAccountant};
use super::slots::HookReference;
use super::wire::{HookEntry, HookSource, InstallHook, SetHookRequest, SetHookTransaction};
use super::{HookFlags, HookHash, HookOn, HookParameter, Namespace};
use crate::config::ProtocolConfig;
use crate::error::{SetHookError, TxResult};
use crate::ledger::{AccountId, LedgerEvent, LedgerState};

pub struct SetHookProcessor {
    config: ProtocolConfig,
    reserve: ReserveAccountant,
}

impl SetHookProcessor {
    pub fn new(config: ProtocolConfig) -> Self {
        let reserve = ReserveAccountant::from_config(&config);
        Self { config, reserve }
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    /// Run every check `apply` runs without producing a new snapshot.
    pub fn validate(
        &self,
        tx: &SetHookTransaction,
        ledger: &LedgerState,
    ) -> Result<(), SetHookError> {
        self.stage(tx, ledger).map(|_| ())
    }

    /// Apply `tx` to `ledger`, returning the successor snapshot.
    pub fn apply(
        &self,
        tx: &SetHookTransaction,
        ledger: &LedgerState,
    ) -> Result<LedgerState, SetHookError> {
        match self.stage(tx, ledger) {
            Ok(next) => {
                tracing::info!(
                    account = %tx.account,
                    sequence = next.meta.sequence,
                    state_root = %hex::encode(next.state_root()),
                    "SetHook applied"
                );
                Ok(next)
            }
            Err(err) => {
                tracing::warn!(account = %tx.account, code = %err.code(), "SetHook rejected: {err}");
                Err(err)
            }
        }
    }

    /// Apply `tx` in place: `ledger` becomes the successor snapshot on
    /// success and is left exactly as it was on rejection.
    pub fn submit(&self, tx: &SetHookTransaction, ledger: &mut LedgerState) -> TxResult {
        let outcome = self.apply(tx, ledger);
        let result = TxResult::from(&outcome);
        if let Ok(next) = outcome {
            *ledger = next;
        }
        result
    }

    fn stage(
        &self,
        tx: &SetHookTransaction,
        ledger: &LedgerState,
    ) -> Result<LedgerState, SetHookError> {
        let request = tx.parse(&self.config)?;
        self.check_fee(&request)?;
        let account = &request.account;
        let root = ledger
            .account(account)
            .ok_or_else(|| SetHookError::UnknownAccount {
                account: account.clone(),
            })?;
        if root.balance < request.fee {
            return Err(SetHookError::InsufficientReserve {
                account: account.clone(),
                balance: root.balance,
                required: request.fee,
            });
        }

        let mut sandbox = ledger.clone();
        let mut events = Vec::new();
        let objects_before = hook_object_count(&sandbox, account);

        for (index, entry) in request.entries.iter().enumerate() {
            match entry {
                HookEntry::Noop | HookEntry::DeleteNamespace { .. } => {}
                HookEntry::Install(install) => {
                    self.install(&mut sandbox, account, index, install, &mut events)?
                }
                HookEntry::Clear => clear(&mut sandbox, account, index, &mut events)?,
                HookEntry::Update {
                    namespace,
                    hook_on,
                    parameters,
                } => update(
                    &mut sandbox,
                    account,
                    index,
                    *namespace,
                    *hook_on,
                    parameters.as_deref(),
                    &mut events,
                )?,
            }
        }
        self.delete_namespaces(&mut sandbox, &request, &mut events)?;

        sandbox.debit_account(account, request.fee)?;
        events.push(LedgerEvent::FeeCharged {
            account: account.clone(),
            amount: request.fee,
        });

        let objects_after = hook_object_count(&sandbox, account);
        let delta = objects_after as i64 - objects_before as i64;
        if !self.reserve.can_afford(&sandbox, account, delta) {
            let root = sandbox
                .account(account)
                .ok_or_else(|| SetHookError::UnknownAccount {
                    account: account.clone(),
                })?;
            let owner_count = root.owner_count.saturating_add(delta.unsigned_abs());
            return Err(SetHookError::InsufficientReserve {
                account: account.clone(),
                balance: root.balance,
                required: self.reserve.required_reserve(owner_count),
            });
        }
        self.reserve.apply(&mut sandbox, account, delta)?;

        sandbox.record_transaction(tx.hash(), events);
        Ok(sandbox)
    }

    fn check_fee(&self, request: &SetHookRequest) -> Result<(), SetHookError> {
        let required = self.config.required_fee(request.operation_count());
        if request.fee < required {
            return Err(SetHookError::InsufficientFee {
                declared: request.fee,
                required,
            });
        }
        Ok(())
    }

    fn install(
        &self,
        sandbox: &mut LedgerState,
        account: &AccountId,
        index: usize,
        install: &InstallHook,
        events: &mut Vec<LedgerEvent>,
    ) -> Result<(), SetHookError> {
        let (hook_hash, namespace, hook_on, parameters) = match &install.source {
            HookSource::Code { code, api_version } => {
                let namespace = install.namespace.unwrap_or_default();
                let hook_on = install.hook_on.unwrap_or_default();
                let (hash, acquired) = sandbox.definitions.get_or_create(
                    code,
                    *api_version,
                    namespace,
                    hook_on,
                    &install.parameters,
                );
                // a fresh definition already holds the parameters as defaults
                let overrides = if acquired == Acquired::Created {
                    events.push(LedgerEvent::DefinitionCreated { hook_hash: hash });
                    Vec::new()
                } else {
                    install.parameters.clone()
                };
                (hash, namespace, hook_on, overrides)
            }
            HookSource::Existing(hash) => {
                let definition = sandbox.definitions.get(hash).ok_or_else(|| {
                    SetHookError::malformed(index, format!("no stored definition {hash}"))
                })?;
                let namespace = install.namespace.unwrap_or(definition.namespace);
                let hook_on = install.hook_on.unwrap_or(definition.hook_on);
                sandbox
                    .definitions
                    .acquire(hash)
                    .map_err(|e| SetHookError::LedgerInvariant(e.to_string()))?;
                (*hash, namespace, hook_on, install.parameters.clone())
            }
        };

        let reference = HookReference {
            hook_hash,
            namespace,
            hook_on,
            flags: HookFlags::default(),
            parameters,
        };
        let previous = sandbox
            .hooks
            .set_slot(account, index, Some(reference))
            .map_err(|e| SetHookError::malformed(index, e.to_string()))?;
        tracing::debug!(%account, slot = index, hook = %hook_hash, "hook installed");

        match previous {
            None => events.push(LedgerEvent::HookInstalled {
                account: account.clone(),
                slot: index,
                hook_hash,
            }),
            Some(old) => {
                release(sandbox, &old.hook_hash, events)?;
                if old.hook_hash == hook_hash {
                    events.push(LedgerEvent::HookUpdated {
                        account: account.clone(),
                        slot: index,
                        hook_hash,
                    });
                } else {
                    events.push(LedgerEvent::HookReplaced {
                        account: account.clone(),
                        slot: index,
                        previous: old.hook_hash,
                        hook_hash,
                    });
                }
            }
        }
        Ok(())
    }

    fn delete_namespaces(
        &self,
        sandbox: &mut LedgerState,
        request: &SetHookRequest,
        events: &mut Vec<LedgerEvent>,
    ) -> Result<(), SetHookError> {
        let account = &request.account;
        let mut targets: Vec<Namespace> = Vec::new();
        for entry in &request.entries {
            if let HookEntry::DeleteNamespace { namespace } = entry {
                if !targets.contains(namespace) {
                    targets.push(*namespace);
                }
            }
        }

        let limit = self.config.max_namespace_delete_entries;
        let mut total = 0usize;
        for namespace in &targets {
            total += sandbox.state.namespace_len(account, namespace);
            if total > limit {
                return Err(SetHookError::NamespaceTooLarge {
                    namespace: *namespace,
                    entries: total,
                    limit,
                });
            }
        }

        for namespace in targets {
            let removed = sandbox.state.delete_namespace(account, &namespace);
            tracing::info!(%account, %namespace, removed, "hook namespace deleted");
            events.push(LedgerEvent::NamespaceDeleted {
                account: account.clone(),
                namespace,
                removed,
            });
        }
        Ok(())
    }
}

fn release(
    sandbox: &mut LedgerState,
    hash: &HookHash,
    events: &mut Vec<LedgerEvent>,
) -> Result<(), SetHookError> {
    let released = sandbox
        .definitions
        .release(hash)
        .map_err(|e| SetHookError::LedgerInvariant(e.to_string()))?;
    if released == Released::Destroyed {
        tracing::debug!(hook = %hash, "hook definition destroyed");
        events.push(LedgerEvent::DefinitionDestroyed { hook_hash: *hash });
    }
    Ok(())
}

fn clear(
    sandbox: &mut LedgerState,
    account: &AccountId,
    index: usize,
    events: &mut Vec<LedgerEvent>,
) -> Result<(), SetHookError> {
    let previous = sandbox
        .hooks
        .set_slot(account, index, None)
        .map_err(|e| SetHookError::malformed(index, e.to_string()))?;
    if let Some(old) = previous {
        release(sandbox, &old.hook_hash, events)?;
        events.push(LedgerEvent::HookCleared {
            account: account.clone(),
            slot: index,
            hook_hash: old.hook_hash,
        });
    }
    Ok(())
}

fn update(
    sandbox: &mut LedgerState,
    account: &AccountId,
    index: usize,
    namespace: Option<Namespace>,
    hook_on: Option<HookOn>,
    parameters: Option<&[HookParameter]>,
    events: &mut Vec<LedgerEvent>,
) -> Result<(), SetHookError> {
    let mut reference = sandbox
        .hooks
        .slot(account, index)
        .cloned()
        .ok_or_else(|| SetHookError::malformed(index, "no hook installed in slot to update"))?;
    if let Some(namespace) = namespace {
        reference.namespace = namespace;
    }
    if let Some(hook_on) = hook_on {
        reference.hook_on = hook_on;
    }
    if let Some(parameters) = parameters {
        reference.parameters = parameters.to_vec();
    }
    let hook_hash = reference.hook_hash;
    sandbox
        .hooks
        .set_slot(account, index, Some(reference))
        .map_err(|e| SetHookError::malformed(index, e.to_string()))?;
    events.push(LedgerEvent::HookUpdated {
        account: account.clone(),
        slot: index,
        hook_hash,
    });
    Ok(())
}
