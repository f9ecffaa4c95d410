//! Identifier types for the tea ledger
//!
//! Owners come in two disjoint namespaces, users and teams. A user and a team
//! that happen to share a numeric id are different owners and never alias.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifier of a user (also the identity of an authenticated actor)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UserId(pub u64);

/// Identifier of a team
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TeamId(pub u64);

/// The already-authenticated user performing a request
pub type ActorId = UserId;

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The two kinds of account owner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OwnerKind {
    User,
    Team,
}

impl OwnerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OwnerKind::User => "user",
            OwnerKind::Team => "team",
        }
    }
}

impl fmt::Display for OwnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to the owner of an account
///
/// The derived ordering (all users before all teams, then by numeric id) is
/// the global lock order used whenever two accounts are touched together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OwnerRef {
    User(UserId),
    Team(TeamId),
}

impl OwnerRef {
    pub fn user(id: u64) -> Self {
        OwnerRef::User(UserId(id))
    }

    pub fn team(id: u64) -> Self {
        OwnerRef::Team(TeamId(id))
    }

    pub fn kind(&self) -> OwnerKind {
        match self {
            OwnerRef::User(_) => OwnerKind::User,
            OwnerRef::Team(_) => OwnerKind::Team,
        }
    }

    /// Numeric part of the id, without the namespace
    pub fn raw_id(&self) -> u64 {
        match self {
            OwnerRef::User(id) => id.0,
            OwnerRef::Team(id) => id.0,
        }
    }
}

impl fmt::Display for OwnerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OwnerRef::User(id) => write!(f, "u:{}", id),
            OwnerRef::Team(id) => write!(f, "t:{}", id),
        }
    }
}

impl FromStr for OwnerRef {
    type Err = String;

    /// Parse the `u:<id>` / `t:<id>` notation
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (prefix, id) = s
            .split_once(':')
            .ok_or_else(|| format!("Invalid owner '{}': expected u:<id> or t:<id>", s))?;
        let id: u64 = id
            .parse()
            .map_err(|_| format!("Invalid owner id in '{}'", s))?;

        match prefix {
            "u" | "user" => Ok(OwnerRef::user(id)),
            "t" | "team" => Ok(OwnerRef::team(id)),
            _ => Err(format!("Invalid owner kind '{}' in '{}'", prefix, s)),
        }
    }
}

/// Unique handle of a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransferId(pub u64);

impl fmt::Display for TransferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique id of a ledger row, increasing in creation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LedgerEntryId(pub u64);

impl fmt::Display for LedgerEntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic id allocator; ids start at 1 and are never reused
#[derive(Debug)]
pub struct IdSequence(AtomicU64);

impl IdSequence {
    pub fn new() -> Self {
        Self(AtomicU64::new(1))
    }

    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for IdSequence {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("u:1", OwnerRef::user(1))]
    #[case("t:42", OwnerRef::team(42))]
    #[case(" user:7 ", OwnerRef::user(7))]
    #[case("team:7", OwnerRef::team(7))]
    fn test_owner_parsing(#[case] input: &str, #[case] expected: OwnerRef) {
        assert_eq!(input.parse::<OwnerRef>().unwrap(), expected);
    }

    #[rstest]
    #[case::missing_separator("u1")]
    #[case::bad_kind("x:1")]
    #[case::bad_id("u:abc")]
    #[case::negative("t:-3")]
    fn test_owner_parsing_errors(#[case] input: &str) {
        assert!(input.parse::<OwnerRef>().is_err());
    }

    #[test]
    fn test_user_and_team_with_same_id_are_distinct() {
        assert_ne!(OwnerRef::user(5), OwnerRef::team(5));
        assert_eq!(OwnerRef::user(5).raw_id(), OwnerRef::team(5).raw_id());
    }

    #[test]
    fn test_lock_order_places_users_before_teams() {
        let mut owners = vec![OwnerRef::team(1), OwnerRef::user(9), OwnerRef::user(2)];
        owners.sort();
        assert_eq!(
            owners,
            vec![OwnerRef::user(2), OwnerRef::user(9), OwnerRef::team(1)]
        );
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        let owner = OwnerRef::team(12);
        assert_eq!(owner.to_string(), "t:12");
        assert_eq!(owner.to_string().parse::<OwnerRef>().unwrap(), owner);
    }

    #[test]
    fn test_id_sequence_starts_at_one() {
        let seq = IdSequence::new();
        assert_eq!(seq.next(), 1);
        assert_eq!(seq.next(), 2);
    }
}
