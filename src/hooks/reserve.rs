use crate::config::ProtocolConfig;
use crate::ledger::{AccountId, Amount, LedgerError, LedgerState};

/// Hook-related ledger objects held by `account`: each distinct definition it
/// references once, each occupied slot, and each state entry.
pub fn hook_object_count(ledger: &LedgerState, account: &AccountId) -> u64 {
    let table = ledger.hooks.table(account);
    let definitions = table.distinct_definitions().len() as u64;
    let slots = table.occupied() as u64;
    let state = ledger.state.entries_owned_by(account) as u64;
    definitions + slots + state
}

/// Minimum-balance bookkeeping over `AccountRoot::owner_count`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReserveAccountant {
    base: Amount,
    increment: Amount,
}

impl ReserveAccountant {
    pub fn new(base: Amount, increment: Amount) -> Self {
        Self { base, increment }
    }

    pub fn from_config(config: &ProtocolConfig) -> Self {
        Self::new(config.reserve_base, config.reserve_increment)
    }

    pub fn required_reserve(&self, owner_count: u64) -> Amount {
        self.base
            .saturating_add(self.increment.saturating_mul(owner_count))
    }

    /// Whether `account` can hold `delta` more objects. Shrinking is always
    /// affordable; unknown accounts can afford nothing.
    pub fn can_afford(&self, ledger: &LedgerState, account: &AccountId, delta: i64) -> bool {
        let Some(root) = ledger.account(account) else {
            return false;
        };
        if delta <= 0 {
            return true;
        }
        let next = root.owner_count.saturating_add(delta.unsigned_abs());
        root.balance >= self.required_reserve(next)
    }

    /// Persist an owner-count change, returning the new count.
    pub fn apply(
        &self,
        ledger: &mut LedgerState,
        account: &AccountId,
        delta: i64,
    ) -> Result<u64, LedgerError> {
        let root = ledger
            .accounts
            .get_mut(account)
            .ok_or_else(|| LedgerError::UnknownAccount {
                account: account.clone(),
            })?;
        let next = if delta < 0 {
            root.owner_count
                .checked_sub(delta.unsigned_abs())
                .ok_or_else(|| LedgerError::ReserveUnderflow {
                    account: account.clone(),
                })?
        } else {
            root.owner_count.saturating_add(delta.unsigned_abs())
        };
        root.owner_count = next;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger_with(account: &str, balance: Amount, owner_count: u64) -> LedgerState {
        let mut ledger = LedgerState::new(&ProtocolConfig::default());
        ledger.credit_account(&account.to_string(), balance).unwrap();
        ledger
            .accounts
            .get_mut(account)
            .unwrap()
            .owner_count = owner_count;
        ledger
    }

    #[test]
    fn affordability_follows_base_plus_increment() {
        let accountant = ReserveAccountant::new(10, 2);
        let ledger = ledger_with("alice", 16, 1);
        let alice: AccountId = "alice".into();
        assert_eq!(accountant.required_reserve(3), 16);
        assert!(accountant.can_afford(&ledger, &alice, 2));
        assert!(!accountant.can_afford(&ledger, &alice, 3));
        assert!(accountant.can_afford(&ledger, &alice, -1));
        assert!(!accountant.can_afford(&ledger, &"bob".into(), 1));
    }

    #[test]
    fn owner_count_never_goes_negative() {
        let accountant = ReserveAccountant::new(10, 2);
        let mut ledger = ledger_with("alice", 100, 2);
        let alice: AccountId = "alice".into();
        assert_eq!(accountant.apply(&mut ledger, &alice, -2).unwrap(), 0);
        assert!(matches!(
            accountant.apply(&mut ledger, &alice, -1),
            Err(LedgerError::ReserveUnderflow { .. })
        ));
        assert_eq!(ledger.accounts[&alice].owner_count, 0);
        assert_eq!(accountant.apply(&mut ledger, &alice, 3).unwrap(), 3);
    }
}
