//! Transfer state machine
//!
//! This module provides the `TransferEngine`, which creates transfers, holds
//! their funds and drives them to exactly one terminal state by coordinating
//! the [`AccountStore`] (balances and ledger) with the [`ApprovalGate`].
//!
//! ```text
//!                    confirm            ┌───────────┐
//!               ┌──────────────────────▶│ completed │
//!               │                       └───────────┘
//! ┌─────────────┴────┐  reject          ┌───────────┐
//! │ pending_approval ├─────────────────▶│ rejected  │
//! └─────────────┬────┘                  └───────────┘
//!               │  sweep / late confirm ┌───────────┐
//!               └──────────────────────▶│ expired   │
//!                                       └───────────┘
//! ```
//!
//! # Concurrency
//!
//! Every transfer row sits behind its own mutex. Confirm, reject and the
//! sweeper take that lock first, check the row is still pending, apply the
//! balance effect through the account store and write the new status before
//! releasing it. Whichever caller gets the row lock first wins; the others
//! observe `AlreadyFinalized` and change nothing.
//!
//! Lock order is always transfer row, then accounts (in owner order), then
//! the ledger.

use crate::config::EngineConfig;
use crate::core::account_store::AccountStore;
use crate::core::approval::{ApprovalGate, Capability};
use crate::core::traits::Clock;
use crate::types::{
    ActorId, IdSequence, LedgerError, OwnerRef, Transfer, TransferId, TransferKind,
    TransferRequest, TransferStatus, EXPIRED_REASON, MAX_NOTES_CHARS,
};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};

/// Reason stored when a rejecting actor gives none
const DEFAULT_REJECTION_REASON: &str = "rejected";

/// Outcome of one sweeper page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Candidates examined
    pub scanned: usize,

    /// Candidates moved to `expired`
    pub expired: usize,

    /// Candidates that a racing confirm or reject finalized first
    pub already_finalized: usize,

    /// Candidates whose expiry failed; they stay pending for the next pass
    pub failed: usize,

    /// Highest id examined, the cursor for the next page
    pub last_id: Option<TransferId>,
}

impl SweepReport {
    /// Add the counts of another page into this one
    pub fn absorb(&mut self, other: SweepReport) {
        self.scanned += other.scanned;
        self.expired += other.expired;
        self.already_finalized += other.already_finalized;
        self.failed += other.failed;
        if other.last_id.is_some() {
            self.last_id = other.last_id;
        }
    }
}

/// Multi-party transfer engine
pub struct TransferEngine {
    accounts: Arc<AccountStore>,
    gate: ApprovalGate,
    clock: Arc<dyn Clock>,
    config: EngineConfig,

    /// Transfer rows by id
    transfers: DashMap<TransferId, Arc<Mutex<Transfer>>>,

    /// Expiry instant of every pending transfer, scanned by the sweeper
    pending: DashMap<TransferId, DateTime<Utc>>,

    ids: IdSequence,
}

impl TransferEngine {
    /// Create an engine over an existing account store
    ///
    /// # Arguments
    ///
    /// * `accounts` - Shared account store (and, through it, the ledger)
    /// * `gate` - Authorization for confirm / reject
    /// * `clock` - Time source for `created_at`, expiry and payment time
    /// * `config` - Expiry horizon and sweeper paging
    pub fn new(
        accounts: Arc<AccountStore>,
        gate: ApprovalGate,
        clock: Arc<dyn Clock>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            accounts,
            gate,
            clock,
            config: config.clone(),
            transfers: DashMap::new(),
            pending: DashMap::new(),
            ids: IdSequence::new(),
        }
    }

    pub fn accounts(&self) -> &Arc<AccountStore> {
        &self.accounts
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Create a transfer and hold its amount on the source account
    ///
    /// Both accounts are ensured first. The requested lifetime is normalized
    /// by [`EngineConfig::expire_hours`].
    ///
    /// # Arguments
    ///
    /// * `request` - Parties, amount, notes, lifetime and initiating actor
    ///
    /// # Returns
    ///
    /// The stored transfer in `pending_approval`
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The amount is zero (`InvalidAmount`)
    /// - Source and destination are the same owner (`SelfTransfer`)
    /// - Either account is frozen (`AccountFrozen`)
    /// - The source's available balance is below the amount (`InsufficientFunds`)
    pub fn create(&self, request: TransferRequest) -> Result<Transfer, LedgerError> {
        if request.amount == 0 {
            return Err(LedgerError::invalid_amount(request.amount));
        }
        if request.from == request.to {
            return Err(LedgerError::self_transfer(request.from));
        }

        self.accounts.ensure_account(request.from)?;
        self.accounts.ensure_account(request.to)?;

        let id = TransferId(self.ids.next());
        self.accounts
            .hold_for_transfer(request.from, request.to, request.amount, id)?;

        let now = self.clock.now();
        let hours = self.config.expire_hours(request.expire_hours);
        let transfer = Transfer {
            id,
            kind: TransferKind::of(request.from, request.to),
            from: request.from,
            to: request.to,
            amount: request.amount,
            status: TransferStatus::PendingApproval,
            notes: normalize_notes(&request.notes),
            initiator: request.initiator,
            created_at: now,
            expires_at: now + Duration::hours(hours),
            payment_time: None,
            rejection_reason: None,
            approver_id: None,
        };

        self.transfers
            .insert(id, Arc::new(Mutex::new(transfer.clone())));
        self.pending.insert(id, transfer.expires_at);

        info!(
            transfer_id = %id,
            kind = %transfer.kind,
            from = %transfer.from,
            to = %transfer.to,
            amount = transfer.amount,
            expires_at = %transfer.expires_at,
            "transfer created"
        );
        Ok(transfer)
    }

    /// Settle a pending transfer
    ///
    /// # Arguments
    ///
    /// * `id` - The transfer to confirm
    /// * `actor` - Authenticated actor confirming it
    ///
    /// # Returns
    ///
    /// The transfer in `completed`
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The transfer does not exist (`TransferNotFound`)
    /// - It is no longer pending (`AlreadyFinalized`)
    /// - The actor may not confirm it (`Unauthorized`)
    /// - It is past its expiry (`Expired`); the transfer is expired as a
    ///   side effect and its hold released
    /// - Either account is frozen (`AccountFrozen`); the transfer stays pending
    pub fn confirm(&self, id: TransferId, actor: ActorId) -> Result<Transfer, LedgerError> {
        let cell = self.transfer_cell(id)?;
        let mut transfer = cell.lock()?;

        self.authorize(&transfer, actor, Capability::Confirm)?;

        let now = self.clock.now();
        if transfer.is_past_due(now) {
            self.expire_locked(&mut transfer)?;
            return Err(LedgerError::expired(id));
        }

        self.accounts
            .settle(transfer.from, transfer.to, transfer.amount, id)?;

        transfer.status = TransferStatus::Completed;
        transfer.payment_time = Some(now);
        transfer.approver_id = self.recorded_approver(&transfer, actor);
        self.pending.remove(&id);

        info!(
            transfer_id = %id,
            actor = %actor,
            from = %transfer.from,
            to = %transfer.to,
            amount = transfer.amount,
            "transfer completed"
        );
        Ok(transfer.clone())
    }

    /// Reject a pending transfer and release its hold
    ///
    /// Not blocked by frozen accounts: returning held funds is always allowed.
    ///
    /// # Arguments
    ///
    /// * `id` - The transfer to reject
    /// * `actor` - Authenticated actor rejecting it
    /// * `reason` - Free-text reason; blank becomes `"rejected"`
    ///
    /// # Errors
    ///
    /// Same existence, finality, authorization and expiry checks as
    /// [`TransferEngine::confirm`].
    pub fn reject(
        &self,
        id: TransferId,
        actor: ActorId,
        reason: &str,
    ) -> Result<Transfer, LedgerError> {
        let cell = self.transfer_cell(id)?;
        let mut transfer = cell.lock()?;

        self.authorize(&transfer, actor, Capability::Reject)?;

        if transfer.is_past_due(self.clock.now()) {
            self.expire_locked(&mut transfer)?;
            return Err(LedgerError::expired(id));
        }

        self.accounts
            .release(transfer.from, transfer.amount, Some(id))?;

        let reason = reason.trim();
        transfer.status = TransferStatus::Rejected;
        transfer.rejection_reason = Some(if reason.is_empty() {
            DEFAULT_REJECTION_REASON.to_string()
        } else {
            reason.to_string()
        });
        transfer.approver_id = self.recorded_approver(&transfer, actor);
        self.pending.remove(&id);

        info!(
            transfer_id = %id,
            actor = %actor,
            reason = transfer.rejection_reason.as_deref().unwrap_or_default(),
            "transfer rejected"
        );
        Ok(transfer.clone())
    }

    /// Expire every past-due pending transfer
    ///
    /// Works in pages of `sweep_page_size`, each page starting after the
    /// last id of the previous one. A failure on one transfer is logged and
    /// the sweep moves on to the next candidate.
    ///
    /// # Returns
    ///
    /// The number of transfers moved to `expired`
    pub fn sweep_expired(&self) -> usize {
        self.sweep_all().expired
    }

    /// Run pages until a short page
    fn sweep_all(&self) -> SweepReport {
        let page_size = self.config.sweep_page_size.max(1);
        let mut total = SweepReport::default();
        loop {
            let report = self.sweep_expired_page(total.last_id, page_size);
            total.absorb(report);
            if report.scanned < page_size {
                return total;
            }
        }
    }

    /// Expire at most `limit` past-due pending transfers with ids above
    /// `after`, lowest id first
    ///
    /// Pass the previous page's [`SweepReport::last_id`] as `after` to walk
    /// the backlog; candidates that failed are not picked up again.
    pub fn sweep_expired_page(&self, after: Option<TransferId>, limit: usize) -> SweepReport {
        let now = self.clock.now();
        let mut candidates: Vec<TransferId> = self
            .pending
            .iter()
            .filter(|entry| now > *entry.value())
            .map(|entry| *entry.key())
            .filter(|id| after.map_or(true, |cursor| *id > cursor))
            .collect();
        candidates.sort_unstable();
        candidates.truncate(limit);

        let mut report = SweepReport::default();
        for id in candidates {
            report.scanned += 1;
            report.last_id = Some(id);
            match self.expire_if_pending(id) {
                Ok(true) => report.expired += 1,
                Ok(false) => report.already_finalized += 1,
                Err(e) if e.is_retryable() => {
                    error!(transfer_id = %id, error = %e, "storage failure while expiring transfer");
                    report.failed += 1;
                }
                Err(e) => {
                    warn!(transfer_id = %id, error = %e, kind = e.kind(), "failed to expire transfer");
                    report.failed += 1;
                }
            }
        }
        report
    }

    /// Snapshot of one transfer
    pub fn get_transfer(&self, id: TransferId) -> Result<Transfer, LedgerError> {
        let cell = self.transfer_cell(id)?;
        let transfer = cell.lock()?;
        Ok(transfer.clone())
    }

    /// Transfers where `owner` is source or destination, newest first
    pub fn transfers_for(&self, owner: OwnerRef) -> Result<Vec<Transfer>, LedgerError> {
        let cells: Vec<Arc<Mutex<Transfer>>> = self
            .transfers
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        let mut transfers = Vec::new();
        for cell in cells {
            let transfer = cell.lock()?;
            if transfer.from == owner || transfer.to == owner {
                transfers.push(transfer.clone());
            }
        }
        transfers.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(transfers)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    fn transfer_cell(&self, id: TransferId) -> Result<Arc<Mutex<Transfer>>, LedgerError> {
        self.transfers
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| LedgerError::transfer_not_found(id))
    }

    fn authorize(
        &self,
        transfer: &Transfer,
        actor: ActorId,
        capability: Capability,
    ) -> Result<(), LedgerError> {
        if transfer.status.is_terminal() {
            return Err(LedgerError::already_finalized(transfer.id, transfer.status));
        }
        if !self.gate.is_authorized(transfer, actor, capability) {
            return Err(LedgerError::unauthorized(actor, transfer.id, capability.as_str()));
        }
        Ok(())
    }

    fn recorded_approver(&self, transfer: &Transfer, actor: ActorId) -> Option<ActorId> {
        if transfer.kind.involves_team() && self.gate.acts_for_team(transfer, actor) {
            Some(actor)
        } else {
            None
        }
    }

    /// Expire a transfer if it is still pending; `Ok(false)` if it was not
    fn expire_if_pending(&self, id: TransferId) -> Result<bool, LedgerError> {
        let cell = self.transfer_cell(id)?;
        let mut transfer = cell.lock()?;

        if transfer.status.is_terminal() {
            self.pending.remove(&id);
            return Ok(false);
        }

        self.expire_locked(&mut transfer)?;
        Ok(true)
    }

    /// Release the hold and mark expired; caller holds the row lock
    fn expire_locked(&self, transfer: &mut Transfer) -> Result<(), LedgerError> {
        self.accounts
            .release(transfer.from, transfer.amount, Some(transfer.id))?;

        transfer.status = TransferStatus::Expired;
        transfer.rejection_reason = Some(EXPIRED_REASON.to_string());
        transfer.approver_id = None;
        self.pending.remove(&transfer.id);

        info!(
            transfer_id = %transfer.id,
            from = %transfer.from,
            amount = transfer.amount,
            expires_at = %transfer.expires_at,
            "transfer expired"
        );
        Ok(())
    }
}

impl std::fmt::Debug for TransferEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferEngine")
            .field("transfers", &self.transfers.len())
            .field("pending", &self.pending.len())
            .field("gate", &self.gate)
            .finish()
    }
}

fn normalize_notes(notes: &str) -> String {
    notes.trim().chars().take(MAX_NOTES_CHARS).collect()
}
