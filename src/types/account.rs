//! Account-related types for the tea ledger
//!
//! An account holds the balance of exactly one owner. Accounts are created
//! lazily on first reference and never deleted.

use super::amount::Amount;
use super::ids::{OwnerKind, OwnerRef};

/// Whether an account may take part in new transfers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountStatus {
    Normal,
    /// Blocks new transfers and new confirmations; the reason is always present
    Frozen { reason: String },
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Normal => "normal",
            AccountStatus::Frozen { .. } => "frozen",
        }
    }
}

/// Owner account state
///
/// Invariant: `locked_balance <= balance`. Only [`crate::core::AccountStore`]
/// mutates accounts, always under the account's lock.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub owner: OwnerRef,

    /// Total funds, in milligrams
    pub balance: Amount,

    /// Portion of `balance` reserved by outgoing transfers not yet settled
    pub locked_balance: Amount,

    pub status: AccountStatus,
}

impl Account {
    /// Create a new account with zero balances and normal status
    pub fn new(owner: OwnerRef) -> Self {
        Account {
            owner,
            balance: 0,
            locked_balance: 0,
            status: AccountStatus::Normal,
        }
    }

    pub fn owner_kind(&self) -> OwnerKind {
        self.owner.kind()
    }

    /// The only amount a new outgoing transfer may draw from
    pub fn available_balance(&self) -> Amount {
        self.balance.saturating_sub(self.locked_balance)
    }

    pub fn is_frozen(&self) -> bool {
        matches!(self.status, AccountStatus::Frozen { .. })
    }

    /// Present iff the account is frozen
    pub fn frozen_reason(&self) -> Option<&str> {
        match &self.status {
            AccountStatus::Frozen { reason } => Some(reason),
            AccountStatus::Normal => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_account_is_empty_and_normal() {
        let account = Account::new(OwnerRef::team(3));

        assert_eq!(account.balance, 0);
        assert_eq!(account.locked_balance, 0);
        assert_eq!(account.available_balance(), 0);
        assert_eq!(account.owner_kind(), OwnerKind::Team);
        assert!(!account.is_frozen());
        assert_eq!(account.frozen_reason(), None);
    }

    #[test]
    fn test_available_balance_excludes_locked_funds() {
        let mut account = Account::new(OwnerRef::user(1));
        account.balance = 100;
        account.locked_balance = 40;

        assert_eq!(account.available_balance(), 60);
    }

    #[test]
    fn test_frozen_reason_present_only_when_frozen() {
        let mut account = Account::new(OwnerRef::user(1));
        account.status = AccountStatus::Frozen {
            reason: "review".to_string(),
        };

        assert!(account.is_frozen());
        assert_eq!(account.frozen_reason(), Some("review"));
        assert_eq!(account.status.as_str(), "frozen");
    }
}
