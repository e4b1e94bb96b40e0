use crate::model::*;

use super::EngineError;

// ── Access Scoping ───────────────────────────────────────────────
// Plain predicates, no policy framework. Reviewers see and touch
// everything; everyone else only rows they own. Detached rows (owner
// nulled) match nobody, so they surface for reviewers only.

fn owner_match(actor: &Identity, owner: Option<&str>) -> bool {
    actor.reviewer || owner == Some(actor.user.as_str())
}

pub fn can_view_reservation(actor: &Identity, reservation: &Reservation) -> bool {
    owner_match(actor, reservation.requester.as_deref())
}

pub fn can_view_feedback(actor: &Identity, feedback: &Feedback) -> bool {
    owner_match(actor, feedback.author.as_deref())
}

/// Cancel rights. Same rule as visibility: own rows, or reviewer.
pub fn can_mutate_reservation(actor: &Identity, reservation: &Reservation) -> bool {
    owner_match(actor, reservation.requester.as_deref())
}

/// Update/delete rights on feedback.
pub fn can_mutate_feedback(actor: &Identity, feedback: &Feedback) -> bool {
    owner_match(actor, feedback.author.as_deref())
}

pub fn require_reviewer(actor: &Identity) -> Result<(), EngineError> {
    if actor.reviewer {
        Ok(())
    } else {
        Err(EngineError::Forbidden("reviewer role required"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ulid::Ulid;

    fn reservation_by(requester: Option<&str>) -> Reservation {
        Reservation {
            id: Ulid::new(),
            requester: requester.map(String::from),
            span: Span::new(0, 1000),
            purpose: "1:1".into(),
            attendees: 2,
            status: ReservationStatus::Pending,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn feedback_by(author: Option<&str>) -> Feedback {
        Feedback {
            id: Ulid::new(),
            author: author.map(String::from),
            reservation_id: Ulid::new(),
            rating: 4,
            comment: "fine".into(),
            created_at: 0,
        }
    }

    #[test]
    fn reviewer_sees_everything() {
        let reviewer = Identity::new("root", true);
        assert!(can_view_reservation(&reviewer, &reservation_by(Some("alice"))));
        assert!(can_view_reservation(&reviewer, &reservation_by(None)));
        assert!(can_view_feedback(&reviewer, &feedback_by(Some("bob"))));
        assert!(can_view_feedback(&reviewer, &feedback_by(None)));
    }

    #[test]
    fn requester_sees_own_rows_only() {
        let alice = Identity::new("alice", false);
        assert!(can_view_reservation(&alice, &reservation_by(Some("alice"))));
        assert!(!can_view_reservation(&alice, &reservation_by(Some("bob"))));
        assert!(can_view_feedback(&alice, &feedback_by(Some("alice"))));
        assert!(!can_view_feedback(&alice, &feedback_by(Some("bob"))));
    }

    #[test]
    fn detached_rows_hidden_from_former_owner() {
        let alice = Identity::new("alice", false);
        assert!(!can_view_reservation(&alice, &reservation_by(None)));
        assert!(!can_view_feedback(&alice, &feedback_by(None)));
    }

    #[test]
    fn mutation_follows_ownership() {
        let alice = Identity::new("alice", false);
        let reviewer = Identity::new("root", true);
        assert!(can_mutate_reservation(&alice, &reservation_by(Some("alice"))));
        assert!(!can_mutate_reservation(&alice, &reservation_by(Some("bob"))));
        assert!(can_mutate_reservation(&reviewer, &reservation_by(Some("bob"))));
        assert!(can_mutate_feedback(&alice, &feedback_by(Some("alice"))));
        assert!(!can_mutate_feedback(&alice, &feedback_by(None)));
        assert!(can_mutate_feedback(&reviewer, &feedback_by(None)));
    }

    #[test]
    fn require_reviewer_gates_guests() {
        assert!(require_reviewer(&Identity::new("root", true)).is_ok());
        let err = require_reviewer(&Identity::new("alice", false)).unwrap_err();
        assert!(matches!(err, EngineError::Forbidden(_)));
    }
}
