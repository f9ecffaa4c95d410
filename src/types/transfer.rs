//! Transfer types for the tea ledger
//!
//! A transfer moves value between two owners through a hold and a later
//! settle or release. The owner-kind pair is captured once in [`TransferKind`]
//! so the state machine stays the same for every variant.

use super::amount::Amount;
use super::ids::{ActorId, OwnerRef, TransferId};
use chrono::{DateTime, Utc};
use std::fmt;

/// Owner-kind pair of a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferKind {
    UserToUser,
    UserToTeam,
    TeamToUser,
    TeamToTeam,
}

impl TransferKind {
    pub fn of(from: OwnerRef, to: OwnerRef) -> Self {
        match (from, to) {
            (OwnerRef::User(_), OwnerRef::User(_)) => TransferKind::UserToUser,
            (OwnerRef::User(_), OwnerRef::Team(_)) => TransferKind::UserToTeam,
            (OwnerRef::Team(_), OwnerRef::User(_)) => TransferKind::TeamToUser,
            (OwnerRef::Team(_), OwnerRef::Team(_)) => TransferKind::TeamToTeam,
        }
    }

    /// Whether a team-side core member takes part in approval
    pub fn involves_team(&self) -> bool {
        !matches!(self, TransferKind::UserToUser)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransferKind::UserToUser => "user_to_user",
            TransferKind::UserToTeam => "user_to_team",
            TransferKind::TeamToUser => "team_to_user",
            TransferKind::TeamToTeam => "team_to_team",
        }
    }
}

impl fmt::Display for TransferKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transfer lifecycle state
///
/// `PendingApproval` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferStatus {
    PendingApproval,
    Completed,
    Rejected,
    Expired,
}

impl TransferStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransferStatus::PendingApproval)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::PendingApproval => "pending_approval",
            TransferStatus::Completed => "completed",
            TransferStatus::Rejected => "rejected",
            TransferStatus::Expired => "expired",
        }
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejection reason recorded by the expiry path
pub const EXPIRED_REASON: &str = "expired";

/// Maximum stored length of transfer notes, in characters
pub const MAX_NOTES_CHARS: usize = 500;

/// Input to [`crate::core::TransferEngine::create`]
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub from: OwnerRef,
    pub to: OwnerRef,
    pub amount: Amount,
    pub notes: String,

    /// Requested lifetime; out-of-range or absent values use the configured default
    pub expire_hours: Option<i64>,

    /// Authenticated actor creating the transfer
    pub initiator: ActorId,
}

impl TransferRequest {
    pub fn new(from: OwnerRef, to: OwnerRef, amount: Amount, initiator: ActorId) -> Self {
        Self {
            from,
            to,
            amount,
            notes: String::new(),
            expire_hours: None,
            initiator,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn with_expire_hours(mut self, hours: i64) -> Self {
        self.expire_hours = Some(hours);
        self
    }
}

/// Stored transfer row
#[derive(Debug, Clone, PartialEq)]
pub struct Transfer {
    pub id: TransferId,
    pub kind: TransferKind,
    pub from: OwnerRef,
    pub to: OwnerRef,
    pub amount: Amount,
    pub status: TransferStatus,
    pub notes: String,
    pub initiator: ActorId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,

    /// Set only on `Completed`
    pub payment_time: Option<DateTime<Utc>>,

    /// Set only on `Rejected` or `Expired`
    pub rejection_reason: Option<String>,

    /// Team-side core member who finalized the transfer
    pub approver_id: Option<ActorId>,
}

impl Transfer {
    pub fn is_pending(&self) -> bool {
        self.status == TransferStatus::PendingApproval
    }

    /// Past due at `now` (strictly after `expires_at`)
    pub fn is_past_due(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}
