//! Authorization for transfer finalization
//!
//! The `ApprovalGate` answers one question: may this actor perform this
//! operation on this transfer? It is a pure capability check over the
//! transfer's [`TransferKind`] and never mutates state.
//!
//! # Parties
//!
//! - **Counter-party**: the destination user, or any core member of the
//!   destination team.
//! - **Approver**: any core member of the source team.
//!
//! | Kind           | Confirm        | Reject                     |
//! |----------------|----------------|----------------------------|
//! | user → user    | counter-party  | counter-party              |
//! | user → team    | counter-party  | counter-party              |
//! | team → user    | approver       | counter-party or approver  |
//! | team → team    | counter-party  | counter-party or approver  |
//!
//! Unless self-approval is allowed, the initiator of a transfer that involves
//! a team may not confirm it, even when they are a core member of the
//! relevant team. They may still reject it.

use crate::core::traits::TeamDirectory;
use crate::types::{ActorId, OwnerRef, Transfer, TransferKind};
use std::fmt;
use std::sync::Arc;

/// Operation an actor wants to perform on a pending transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Confirm,
    Reject,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Confirm => "confirm",
            Capability::Reject => "reject",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability check for confirm / reject
pub struct ApprovalGate {
    directory: Arc<dyn TeamDirectory>,
    allow_self_approval: bool,
}

impl ApprovalGate {
    /// Create a gate backed by the given team-membership collaborator
    ///
    /// # Arguments
    ///
    /// * `directory` - Resolves core membership of teams
    /// * `allow_self_approval` - Whether the initiator of a team-involving
    ///   transfer may also confirm it
    pub fn new(directory: Arc<dyn TeamDirectory>, allow_self_approval: bool) -> Self {
        Self {
            directory,
            allow_self_approval,
        }
    }

    /// Whether `actor` may perform `capability` on `transfer`
    pub fn is_authorized(&self, transfer: &Transfer, actor: ActorId, capability: Capability) -> bool {
        match capability {
            Capability::Confirm => {
                if self.is_blocked_self_approval(transfer, actor) {
                    return false;
                }
                match transfer.kind {
                    TransferKind::TeamToUser => self.is_approver(transfer, actor),
                    TransferKind::UserToUser
                    | TransferKind::UserToTeam
                    | TransferKind::TeamToTeam => self.is_counter_party(transfer, actor),
                }
            }
            Capability::Reject => {
                self.is_counter_party(transfer, actor) || self.is_approver(transfer, actor)
            }
        }
    }

    /// Whether `actor` acts for a team side of `transfer`
    ///
    /// Used to decide whether the acting actor is recorded as the approver.
    pub fn acts_for_team(&self, transfer: &Transfer, actor: ActorId) -> bool {
        self.is_core_member_of(transfer.from, actor) || self.is_core_member_of(transfer.to, actor)
    }

    fn is_counter_party(&self, transfer: &Transfer, actor: ActorId) -> bool {
        match transfer.to {
            OwnerRef::User(user) => user == actor,
            OwnerRef::Team(team) => self.directory.is_core_member(team, actor),
        }
    }

    fn is_approver(&self, transfer: &Transfer, actor: ActorId) -> bool {
        self.is_core_member_of(transfer.from, actor)
    }

    fn is_core_member_of(&self, owner: OwnerRef, actor: ActorId) -> bool {
        match owner {
            OwnerRef::Team(team) => self.directory.is_core_member(team, actor),
            OwnerRef::User(_) => false,
        }
    }

    fn is_blocked_self_approval(&self, transfer: &Transfer, actor: ActorId) -> bool {
        !self.allow_self_approval && transfer.kind.involves_team() && transfer.initiator == actor
    }
}

impl fmt::Debug for ApprovalGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApprovalGate")
            .field("allow_self_approval", &self.allow_self_approval)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::StaticTeamDirectory;
    use crate::types::{TeamId, TransferId, TransferStatus, UserId};
    use chrono::{Duration, Utc};
    use rstest::{fixture, rstest};

    const ALICE: UserId = UserId(1);
    const BOB: UserId = UserId(2);
    const CAROL: UserId = UserId(3);
    const SENDER_CORE: UserId = UserId(10);
    const RECEIVER_CORE: UserId = UserId(20);

    fn transfer(from: OwnerRef, to: OwnerRef, initiator: ActorId) -> Transfer {
        let now = Utc::now();
        Transfer {
            id: TransferId(1),
            kind: TransferKind::of(from, to),
            from,
            to,
            amount: 100,
            status: TransferStatus::PendingApproval,
            notes: String::new(),
            initiator,
            created_at: now,
            expires_at: now + Duration::hours(24),
            payment_time: None,
            rejection_reason: None,
            approver_id: None,
        }
    }

    #[fixture]
    fn directory() -> Arc<StaticTeamDirectory> {
        let directory = StaticTeamDirectory::new();
        directory.add_core_member(TeamId(1), SENDER_CORE);
        directory.add_core_member(TeamId(2), RECEIVER_CORE);
        Arc::new(directory)
    }

    #[fixture]
    fn gate(directory: Arc<StaticTeamDirectory>) -> ApprovalGate {
        ApprovalGate::new(directory, false)
    }

    #[rstest]
    #[case::recipient(BOB, true)]
    #[case::sender(ALICE, false)]
    #[case::stranger(CAROL, false)]
    #[case::core_member(SENDER_CORE, false)]
    fn test_user_to_user_confirm(gate: ApprovalGate, #[case] actor: UserId, #[case] allowed: bool) {
        let t = transfer(OwnerRef::User(ALICE), OwnerRef::User(BOB), ALICE);
        assert_eq!(gate.is_authorized(&t, actor, Capability::Confirm), allowed);
        assert_eq!(gate.is_authorized(&t, actor, Capability::Reject), allowed);
    }

    #[rstest]
    #[case::receiving_core_member(RECEIVER_CORE, true)]
    #[case::sending_user(ALICE, false)]
    #[case::other_team_core_member(SENDER_CORE, false)]
    fn test_user_to_team_confirm(gate: ApprovalGate, #[case] actor: UserId, #[case] allowed: bool) {
        let t = transfer(OwnerRef::User(ALICE), OwnerRef::team(2), ALICE);
        assert_eq!(gate.is_authorized(&t, actor, Capability::Confirm), allowed);
    }

    #[rstest]
    #[case::paying_core_member(SENDER_CORE, Capability::Confirm, true)]
    #[case::recipient_cannot_confirm(BOB, Capability::Confirm, false)]
    #[case::recipient_may_reject(BOB, Capability::Reject, true)]
    #[case::paying_core_member_may_reject(SENDER_CORE, Capability::Reject, true)]
    #[case::stranger(CAROL, Capability::Reject, false)]
    fn test_team_to_user(
        gate: ApprovalGate,
        #[case] actor: UserId,
        #[case] capability: Capability,
        #[case] allowed: bool,
    ) {
        let t = transfer(OwnerRef::team(1), OwnerRef::User(BOB), CAROL);
        assert_eq!(gate.is_authorized(&t, actor, capability), allowed);
    }

    #[rstest]
    #[case::receiving_core_member(RECEIVER_CORE, Capability::Confirm, true)]
    #[case::sending_core_member_cannot_confirm(SENDER_CORE, Capability::Confirm, false)]
    #[case::sending_core_member_may_reject(SENDER_CORE, Capability::Reject, true)]
    fn test_team_to_team(
        gate: ApprovalGate,
        #[case] actor: UserId,
        #[case] capability: Capability,
        #[case] allowed: bool,
    ) {
        let t = transfer(OwnerRef::team(1), OwnerRef::team(2), CAROL);
        assert_eq!(gate.is_authorized(&t, actor, capability), allowed);
    }

    #[rstest]
    fn test_initiator_cannot_confirm_own_team_transfer(directory: Arc<StaticTeamDirectory>) {
        directory.add_core_member(TeamId(1), ALICE);
        let t = transfer(OwnerRef::team(1), OwnerRef::User(BOB), ALICE);

        let strict = ApprovalGate::new(directory.clone(), false);
        assert!(!strict.is_authorized(&t, ALICE, Capability::Confirm));
        assert!(strict.is_authorized(&t, ALICE, Capability::Reject));

        let lenient = ApprovalGate::new(directory, true);
        assert!(lenient.is_authorized(&t, ALICE, Capability::Confirm));
    }

    #[rstest]
    fn test_user_to_user_ignores_self_approval_policy(gate: ApprovalGate) {
        // self-approval policy only covers transfers with a team side
        let t = transfer(OwnerRef::User(ALICE), OwnerRef::User(BOB), BOB);
        assert!(gate.is_authorized(&t, BOB, Capability::Confirm));
    }

    #[rstest]
    fn test_acts_for_team(gate: ApprovalGate) {
        let t = transfer(OwnerRef::team(1), OwnerRef::User(BOB), CAROL);
        assert!(gate.acts_for_team(&t, SENDER_CORE));
        assert!(!gate.acts_for_team(&t, BOB));
    }
}
