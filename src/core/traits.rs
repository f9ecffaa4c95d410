//! Trait seams between the engine and its collaborators
//!
//! The engine owns balances, transfers and the ledger. Time and team
//! membership come from outside and are injected through these traits so the
//! surrounding application (or a test) can supply its own implementation.

use crate::types::{ActorId, LedgerError, TeamId};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashSet;
use std::sync::Mutex;

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Team-membership collaborator
///
/// Answers whether an actor holds the "core member" capability on a team.
pub trait TeamDirectory: Send + Sync {
    fn is_core_member(&self, team: TeamId, actor: ActorId) -> bool;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Settable clock for tests and journal replay
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        let mut now = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *now = instant;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *now += by;
    }

    /// Move forward by `by`, leaving the clock untouched if the result is
    /// outside the representable range
    pub fn try_advance(&self, by: Duration) -> Result<DateTime<Utc>, LedgerError> {
        let mut now = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let next = now
            .checked_add_signed(by)
            .ok_or_else(|| LedgerError::invalid_input(format!("clock cannot advance by {}", by)))?;
        *now = next;
        Ok(next)
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// In-memory membership table
#[derive(Debug, Default)]
pub struct StaticTeamDirectory {
    core_members: DashSet<(TeamId, ActorId)>,
}

impl StaticTeamDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_core_member(&self, team: TeamId, actor: ActorId) {
        self.core_members.insert((team, actor));
    }

    pub fn remove_core_member(&self, team: TeamId, actor: ActorId) {
        self.core_members.remove(&(team, actor));
    }
}

impl TeamDirectory for StaticTeamDirectory {
    fn is_core_member(&self, team: TeamId, actor: ActorId) -> bool {
        self.core_members.contains(&(team, actor))
    }
}
