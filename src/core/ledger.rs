//! Append-only transaction log
//!
//! The `LedgerRecorder` keeps every ledger entry ever written. Entries are
//! never mutated or removed. The account store appends while still holding
//! the locks of the accounts it is changing, so each owner's entries appear
//! in exactly the order its balance changed.
//!
//! # Reconciliation
//!
//! Replaying an owner's entries in creation order and taking the last
//! `balance_after` reproduces that owner's current balance. [`LedgerRecorder::reconcile`]
//! checks this for every account.

use crate::core::account_store::AccountStore;
use crate::core::traits::Clock;
use crate::types::{
    Amount, EntryDraft, IdSequence, LedgerEntry, LedgerEntryId, LedgerError, OwnerRef, Page,
    PageOf,
};
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Append-only ledger of balance mutations
pub struct LedgerRecorder {
    /// All entries in creation order
    entries: RwLock<Vec<LedgerEntry>>,
    ids: IdSequence,
    clock: Arc<dyn Clock>,
}

impl LedgerRecorder {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            ids: IdSequence::new(),
            clock,
        }
    }

    /// Append one entry
    pub fn append(&self, draft: EntryDraft) -> Result<LedgerEntry, LedgerError> {
        let mut written = self.append_all(vec![draft])?;
        written
            .pop()
            .ok_or_else(|| LedgerError::storage("ledger append produced no entry"))
    }

    /// Append several entries as one unit
    ///
    /// Either every draft is written or none is. Ids are allocated under the
    /// write lock so id order equals creation order.
    pub fn append_all(&self, drafts: Vec<EntryDraft>) -> Result<Vec<LedgerEntry>, LedgerError> {
        let mut entries = self.entries.write()?;
        let created_at = self.clock.now();

        let written: Vec<LedgerEntry> = drafts
            .into_iter()
            .map(|draft| LedgerEntry {
                id: LedgerEntryId(self.ids.next()),
                owner: draft.owner,
                transfer: draft.transfer,
                entry_type: draft.entry_type,
                amount: draft.amount,
                balance_before: draft.balance_before,
                balance_after: draft.balance_after,
                created_at,
            })
            .collect();

        for entry in &written {
            debug!(
                entry_id = %entry.id,
                owner = %entry.owner,
                entry_type = %entry.entry_type,
                amount = entry.amount,
                balance_after = entry.balance_after,
                "ledger entry appended"
            );
        }

        entries.extend(written.iter().cloned());
        Ok(written)
    }

    /// Statement view: reverse-chronological, paginated entries of one owner
    pub fn entries(&self, owner: OwnerRef, page: Page) -> Result<PageOf<LedgerEntry>, LedgerError> {
        let entries = self.entries.read()?;
        let owned: Vec<&LedgerEntry> = entries
            .iter()
            .rev()
            .filter(|entry| entry.owner == owner)
            .collect();

        Ok(PageOf {
            items: owned
                .iter()
                .skip(page.offset())
                .take(page.size)
                .map(|entry| (*entry).clone())
                .collect(),
            total: owned.len(),
            number: page.number,
            size: page.size,
        })
    }

    /// All entries of one owner in creation order
    pub fn history(&self, owner: OwnerRef) -> Result<Vec<LedgerEntry>, LedgerError> {
        let entries = self.entries.read()?;
        Ok(entries
            .iter()
            .filter(|entry| entry.owner == owner)
            .cloned()
            .collect())
    }

    /// Balance obtained by replaying the owner's entries in order
    pub fn replay_balance(&self, owner: OwnerRef) -> Result<Amount, LedgerError> {
        let entries = self.entries.read()?;
        Ok(entries
            .iter()
            .filter(|entry| entry.owner == owner)
            .fold(0, |_, entry| entry.balance_after))
    }

    /// Owners whose replayed ledger disagrees with their stored balance
    pub fn reconcile(&self, store: &AccountStore) -> Result<Vec<OwnerRef>, LedgerError> {
        let mut mismatched = Vec::new();
        for account in store.list_accounts()? {
            if self.replay_balance(account.owner)? != account.balance {
                mismatched.push(account.owner);
            }
        }
        Ok(mismatched)
    }

    pub fn len(&self) -> Result<usize, LedgerError> {
        Ok(self.entries.read()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, LedgerError> {
        Ok(self.entries.read()?.is_empty())
    }
}

impl std::fmt::Debug for LedgerRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerRecorder")
            .field("entries", &self.entries.read().map(|e| e.len()).unwrap_or(0))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::SystemClock;
    use crate::types::{EntryType, TransferId};

    fn draft(owner: OwnerRef, entry_type: EntryType, before: Amount, after: Amount) -> EntryDraft {
        EntryDraft {
            owner,
            transfer: None,
            entry_type,
            amount: before.abs_diff(after),
            balance_before: before,
            balance_after: after,
        }
    }

    fn recorder() -> LedgerRecorder {
        LedgerRecorder::new(Arc::new(SystemClock))
    }

    #[test]
    fn test_append_assigns_increasing_ids() {
        let ledger = recorder();
        let a = OwnerRef::user(1);
        assert!(ledger.is_empty().unwrap());

        let first = ledger.append(draft(a, EntryType::Credit, 0, 10)).unwrap();
        let second = ledger.append(draft(a, EntryType::Credit, 10, 30)).unwrap();

        assert!(second.id > first.id);
        assert_eq!(ledger.len().unwrap(), 2);
    }

    #[test]
    fn test_append_all_writes_every_draft() {
        let ledger = recorder();
        let transfer = Some(TransferId(7));
        let drafts = vec![
            EntryDraft {
                transfer,
                ..draft(OwnerRef::user(1), EntryType::Debit, 50, 20)
            },
            EntryDraft {
                transfer,
                ..draft(OwnerRef::user(2), EntryType::Credit, 0, 30)
            },
        ];

        let written = ledger.append_all(drafts).unwrap();

        assert_eq!(written.len(), 2);
        assert!(written.iter().all(|entry| entry.transfer == transfer));
        assert_eq!(written[0].created_at, written[1].created_at);
    }

    #[test]
    fn test_entries_are_reverse_chronological_and_paginated() {
        let ledger = recorder();
        let a = OwnerRef::user(1);
        let b = OwnerRef::user(2);

        for i in 0..5 {
            ledger.append(draft(a, EntryType::Credit, i * 10, (i + 1) * 10)).unwrap();
            ledger.append(draft(b, EntryType::Credit, i, i + 1)).unwrap();
        }

        let first = ledger.entries(a, Page::new(0, 2)).unwrap();
        assert_eq!(first.total, 5);
        assert_eq!(first.items.len(), 2);
        assert_eq!(first.items[0].balance_after, 50);
        assert_eq!(first.items[1].balance_after, 40);
        assert!(first.has_next());

        let last = ledger.entries(a, Page::new(2, 2)).unwrap();
        assert_eq!(last.items.len(), 1);
        assert_eq!(last.items[0].balance_after, 10);
        assert!(!last.has_next());

        let beyond = ledger.entries(a, Page::new(9, 2)).unwrap();
        assert!(beyond.items.is_empty());
    }

    #[test]
    fn test_replay_balance_takes_last_balance_after() {
        let ledger = recorder();
        let a = OwnerRef::team(4);

        assert_eq!(ledger.replay_balance(a).unwrap(), 0);

        ledger.append(draft(a, EntryType::Credit, 0, 100)).unwrap();
        ledger.append(draft(a, EntryType::Hold, 100, 100)).unwrap();
        ledger.append(draft(a, EntryType::Debit, 100, 60)).unwrap();

        assert_eq!(ledger.replay_balance(a).unwrap(), 60);
        assert_eq!(ledger.history(a).unwrap().len(), 3);
    }

    #[test]
    fn test_user_and_team_histories_do_not_mix() {
        let ledger = recorder();
        ledger.append(draft(OwnerRef::user(1), EntryType::Credit, 0, 5)).unwrap();
        ledger.append(draft(OwnerRef::team(1), EntryType::Credit, 0, 9)).unwrap();

        assert_eq!(ledger.replay_balance(OwnerRef::user(1)).unwrap(), 5);
        assert_eq!(ledger.replay_balance(OwnerRef::team(1)).unwrap(), 9);
    }
}
