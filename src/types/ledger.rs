//! Ledger entry types
//!
//! Every balance mutation produces exactly one immutable entry per affected
//! owner, carrying the balance before and after the change.

use super::amount::Amount;
use super::ids::{LedgerEntryId, OwnerRef, TransferId};
use chrono::{DateTime, Utc};
use std::fmt;

/// Kind of balance mutation recorded by an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryType {
    /// Funds reserved for an outgoing transfer; balance unchanged
    Hold,
    /// Reservation lifted without moving value; balance unchanged
    Release,
    /// Balance decreased
    Debit,
    /// Balance increased
    Credit,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::Hold => "hold",
            EntryType::Release => "release",
            EntryType::Debit => "debit",
            EntryType::Credit => "credit",
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable ledger row
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    pub id: LedgerEntryId,
    pub owner: OwnerRef,

    /// `None` for administrative adjustments not driven by a transfer
    pub transfer: Option<TransferId>,
    pub entry_type: EntryType,
    pub amount: Amount,
    pub balance_before: Amount,
    pub balance_after: Amount,
    pub created_at: DateTime<Utc>,
}

/// Entry content before the recorder assigns an id and timestamp
#[derive(Debug, Clone, PartialEq)]
pub struct EntryDraft {
    pub owner: OwnerRef,
    pub transfer: Option<TransferId>,
    pub entry_type: EntryType,
    pub amount: Amount,
    pub balance_before: Amount,
    pub balance_after: Amount,
}

/// Requested page of a paginated view (0-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: usize,
    pub size: usize,
}

/// Largest page size served by paginated views
pub const MAX_PAGE_SIZE: usize = 200;

impl Page {
    pub fn new(number: usize, size: usize) -> Self {
        Self {
            number,
            size: size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn first(size: usize) -> Self {
        Self::new(0, size)
    }

    pub fn offset(&self) -> usize {
        self.number.saturating_mul(self.size)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::first(20)
    }
}

/// One page of results plus the total row count
#[derive(Debug, Clone, PartialEq)]
pub struct PageOf<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub number: usize,
    pub size: usize,
}

impl<T> PageOf<T> {
    pub fn has_next(&self) -> bool {
        self.number.saturating_add(1).saturating_mul(self.size) < self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, 0, 1)]
    #[case(0, 50, 50)]
    #[case(0, 10_000, MAX_PAGE_SIZE)]
    fn test_page_size_is_clamped(#[case] number: usize, #[case] size: usize, #[case] expected: usize) {
        assert_eq!(Page::new(number, size).size, expected);
    }

    #[test]
    fn test_page_offset() {
        assert_eq!(Page::new(3, 20).offset(), 60);
    }

    #[test]
    fn test_has_next() {
        let page: PageOf<u8> = PageOf {
            items: vec![1, 2],
            total: 5,
            number: 0,
            size: 2,
        };
        assert!(page.has_next());

        let last: PageOf<u8> = PageOf {
            items: vec![5],
            total: 5,
            number: 2,
            size: 2,
        };
        assert!(!last.has_next());
    }
}
