//! Account state management
//!
//! This module provides the `AccountStore`, which owns the balance, locked
//! balance and status of every owner.
//!
//! # Atomic units
//!
//! Each account lives behind its own mutex inside a `DashMap`. Every mutating
//! operation (`hold`, `settle`, `release`, the administrative adjustments) is
//! one unit: it locks the accounts it touches, validates, appends its ledger
//! entries and only then writes the new balances. If any step fails nothing
//! is written, so no balance change is ever observable without its entry.
//!
//! Operations touching two accounts lock them in [`OwnerRef`] order.

use crate::core::ledger::LedgerRecorder;
use crate::types::{
    Account, AccountStatus, Amount, EntryDraft, EntryType, LedgerError, OwnerRef, TransferId,
};
use dashmap::DashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Thread-safe store of owner accounts
pub struct AccountStore {
    /// Account cells by owner; the map lock is never held while a cell is locked
    accounts: DashMap<OwnerRef, Arc<Mutex<Account>>>,
    ledger: Arc<LedgerRecorder>,
}

impl AccountStore {
    pub fn new(ledger: Arc<LedgerRecorder>) -> Self {
        Self {
            accounts: DashMap::new(),
            ledger,
        }
    }

    pub fn ledger(&self) -> &Arc<LedgerRecorder> {
        &self.ledger
    }

    /// Create the account if absent and return a snapshot
    ///
    /// Idempotent: concurrent callers for the same owner all observe the one
    /// account that was created.
    pub fn ensure_account(&self, owner: OwnerRef) -> Result<Account, LedgerError> {
        let cell = Arc::clone(
            self.accounts
                .entry(owner)
                .or_insert_with(|| {
                    debug!(owner = %owner, "account created");
                    Arc::new(Mutex::new(Account::new(owner)))
                })
                .value(),
        );
        let account = cell.lock()?;
        Ok(account.clone())
    }

    /// Snapshot of an existing account
    pub fn get_account(&self, owner: OwnerRef) -> Result<Account, LedgerError> {
        let cell = self.cell(owner)?;
        let account = cell.lock()?;
        Ok(account.clone())
    }

    pub fn contains(&self, owner: OwnerRef) -> bool {
        self.accounts.contains_key(&owner)
    }

    /// Freeze an account; balances are untouched
    ///
    /// Freezing an already frozen account replaces the reason.
    pub fn freeze(&self, owner: OwnerRef, reason: &str) -> Result<Account, LedgerError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(LedgerError::invalid_input("freeze reason must not be empty"));
        }

        self.with_account(owner, |account| {
            account.status = AccountStatus::Frozen {
                reason: reason.to_string(),
            };
            info!(owner = %owner, reason, "account frozen");
            Ok(account.clone())
        })
    }

    pub fn unfreeze(&self, owner: OwnerRef) -> Result<Account, LedgerError> {
        self.with_account(owner, |account| {
            if account.is_frozen() {
                info!(owner = %owner, "account unfrozen");
            }
            account.status = AccountStatus::Normal;
            Ok(account.clone())
        })
    }

    /// Administrative top-up; writes a `credit` entry with no transfer
    ///
    /// Creates the account if needed. Allowed on frozen accounts.
    pub fn deposit(&self, owner: OwnerRef, amount: Amount) -> Result<Account, LedgerError> {
        require_positive(amount)?;
        self.ensure_account(owner)?;

        self.with_account(owner, |account| {
            let new_balance = account
                .balance
                .checked_add(amount)
                .ok_or_else(|| LedgerError::arithmetic_overflow("deposit", owner))?;

            self.ledger.append(EntryDraft {
                owner,
                transfer: None,
                entry_type: EntryType::Credit,
                amount,
                balance_before: account.balance,
                balance_after: new_balance,
            })?;

            account.balance = new_balance;
            Ok(account.clone())
        })
    }

    /// Administrative payout; writes a `debit` entry with no transfer
    pub fn withdraw(&self, owner: OwnerRef, amount: Amount) -> Result<Account, LedgerError> {
        require_positive(amount)?;

        self.with_account(owner, |account| {
            ensure_not_frozen(account)?;

            let available = account.available_balance();
            if available < amount {
                return Err(LedgerError::insufficient_funds(owner, available, amount));
            }

            let new_balance = account
                .balance
                .checked_sub(amount)
                .ok_or_else(|| LedgerError::arithmetic_underflow("withdraw", owner))?;

            self.ledger.append(EntryDraft {
                owner,
                transfer: None,
                entry_type: EntryType::Debit,
                amount,
                balance_before: account.balance,
                balance_after: new_balance,
            })?;

            account.balance = new_balance;
            Ok(account.clone())
        })
    }

    /// Reserve `amount` of the available balance
    ///
    /// Fails with `InsufficientFunds` when `available_balance < amount`.
    pub fn hold(
        &self,
        owner: OwnerRef,
        amount: Amount,
        transfer: Option<TransferId>,
    ) -> Result<Account, LedgerError> {
        require_positive(amount)?;
        self.with_account(owner, |account| self.apply_hold(account, amount, transfer))
    }

    /// Reserve funds on `from` for a new transfer to `to`
    ///
    /// Both accounts are locked for the check, so a freeze applied to either
    /// side cannot slip in between the frozen check and the hold.
    pub fn hold_for_transfer(
        &self,
        from: OwnerRef,
        to: OwnerRef,
        amount: Amount,
        transfer: TransferId,
    ) -> Result<Account, LedgerError> {
        require_positive(amount)?;
        self.with_pair(from, to, |from_account, to_account| {
            ensure_not_frozen(from_account)?;
            ensure_not_frozen(to_account)?;
            self.apply_hold(from_account, amount, Some(transfer))
        })
    }

    /// Move a held amount from `from` to `to`
    ///
    /// The only operation that moves value between owners. Writes one
    /// `debit` entry on `from` and one `credit` entry on `to`, both tagged
    /// with `transfer`. Fails with `AccountFrozen` if either side is frozen.
    pub fn settle(
        &self,
        from: OwnerRef,
        to: OwnerRef,
        amount: Amount,
        transfer: TransferId,
    ) -> Result<(), LedgerError> {
        require_positive(amount)?;
        self.with_pair(from, to, |from_account, to_account| {
            ensure_not_frozen(from_account)?;
            ensure_not_frozen(to_account)?;

            let new_from_locked = from_account
                .locked_balance
                .checked_sub(amount)
                .ok_or_else(|| LedgerError::arithmetic_underflow("settle", from))?;
            let new_from_balance = from_account
                .balance
                .checked_sub(amount)
                .ok_or_else(|| LedgerError::arithmetic_underflow("settle", from))?;
            let new_to_balance = to_account
                .balance
                .checked_add(amount)
                .ok_or_else(|| LedgerError::arithmetic_overflow("settle", to))?;

            self.ledger.append_all(vec![
                EntryDraft {
                    owner: from,
                    transfer: Some(transfer),
                    entry_type: EntryType::Debit,
                    amount,
                    balance_before: from_account.balance,
                    balance_after: new_from_balance,
                },
                EntryDraft {
                    owner: to,
                    transfer: Some(transfer),
                    entry_type: EntryType::Credit,
                    amount,
                    balance_before: to_account.balance,
                    balance_after: new_to_balance,
                },
            ])?;

            from_account.balance = new_from_balance;
            from_account.locked_balance = new_from_locked;
            to_account.balance = new_to_balance;

            debug!(
                transfer_id = %transfer,
                from = %from,
                to = %to,
                amount,
                "funds settled"
            );
            Ok(())
        })
    }

    /// Lift a reservation without moving value
    ///
    /// Allowed on frozen accounts, since rejection and expiry must always be
    /// able to return held funds.
    pub fn release(
        &self,
        owner: OwnerRef,
        amount: Amount,
        transfer: Option<TransferId>,
    ) -> Result<Account, LedgerError> {
        require_positive(amount)?;
        self.with_account(owner, |account| {
            let new_locked = account
                .locked_balance
                .checked_sub(amount)
                .ok_or_else(|| LedgerError::arithmetic_underflow("release", owner))?;

            self.ledger.append(EntryDraft {
                owner,
                transfer,
                entry_type: EntryType::Release,
                amount,
                balance_before: account.balance,
                balance_after: account.balance,
            })?;

            account.locked_balance = new_locked;
            debug!(owner = %owner, amount, locked = new_locked, "funds released");
            Ok(account.clone())
        })
    }

    /// Snapshot of every account, ordered by owner
    pub fn list_accounts(&self) -> Result<Vec<Account>, LedgerError> {
        let cells: Vec<Arc<Mutex<Account>>> = self
            .accounts
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        let mut accounts = Vec::with_capacity(cells.len());
        for cell in cells {
            accounts.push(cell.lock()?.clone());
        }
        accounts.sort_by_key(|account| account.owner);
        Ok(accounts)
    }

    /// Sum of `balance` over every account
    pub fn total_balance(&self) -> Result<u128, LedgerError> {
        Ok(self
            .list_accounts()?
            .iter()
            .map(|account| u128::from(account.balance))
            .sum())
    }

    fn apply_hold(
        &self,
        account: &mut Account,
        amount: Amount,
        transfer: Option<TransferId>,
    ) -> Result<Account, LedgerError> {
        let owner = account.owner;
        let available = account.available_balance();
        if available < amount {
            return Err(LedgerError::insufficient_funds(owner, available, amount));
        }

        let new_locked = account
            .locked_balance
            .checked_add(amount)
            .ok_or_else(|| LedgerError::arithmetic_overflow("hold", owner))?;

        self.ledger.append(EntryDraft {
            owner,
            transfer,
            entry_type: EntryType::Hold,
            amount,
            balance_before: account.balance,
            balance_after: account.balance,
        })?;

        account.locked_balance = new_locked;
        debug!(owner = %owner, amount, locked = new_locked, "funds held");
        Ok(account.clone())
    }

    fn cell(&self, owner: OwnerRef) -> Result<Arc<Mutex<Account>>, LedgerError> {
        self.accounts
            .get(&owner)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| LedgerError::account_not_found(owner))
    }

    fn with_account<R>(
        &self,
        owner: OwnerRef,
        f: impl FnOnce(&mut Account) -> Result<R, LedgerError>,
    ) -> Result<R, LedgerError> {
        let cell = self.cell(owner)?;
        let mut account = cell.lock()?;
        f(&mut account)
    }

    /// Lock two distinct accounts in global owner order and run `f(a, b)`
    fn with_pair<R>(
        &self,
        a: OwnerRef,
        b: OwnerRef,
        f: impl FnOnce(&mut Account, &mut Account) -> Result<R, LedgerError>,
    ) -> Result<R, LedgerError> {
        if a == b {
            return Err(LedgerError::self_transfer(a));
        }

        let cell_a = self.cell(a)?;
        let cell_b = self.cell(b)?;

        let (mut guard_a, mut guard_b) = if a < b {
            let guard_a = cell_a.lock()?;
            let guard_b = cell_b.lock()?;
            (guard_a, guard_b)
        } else {
            let guard_b = cell_b.lock()?;
            let guard_a = cell_a.lock()?;
            (guard_a, guard_b)
        };

        f(&mut guard_a, &mut guard_b)
    }
}

impl std::fmt::Debug for AccountStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountStore")
            .field("accounts", &self.accounts.len())
            .finish()
    }
}

fn require_positive(amount: Amount) -> Result<(), LedgerError> {
    if amount == 0 {
        return Err(LedgerError::invalid_amount(amount));
    }
    Ok(())
}

fn ensure_not_frozen(account: &Account) -> Result<(), LedgerError> {
    match &account.status {
        AccountStatus::Frozen { reason } => Err(LedgerError::account_frozen(account.owner, reason)),
        AccountStatus::Normal => Ok(()),
    }
}
