//! Property-based tests for the enrollment state machine.

use proptest::prelude::*;
use uuid::Uuid;

use enrollo_shared::types::UserId;

use crate::enrollment::error::EnrollmentError;
use crate::enrollment::policy::AccessPolicy;
use crate::enrollment::service::EnrollmentStateMachine;
use crate::enrollment::types::{Actor, EnrollmentAction, EnrollmentStatus, Role};

fn arb_status() -> impl Strategy<Value = EnrollmentStatus> {
    prop::sample::select(EnrollmentStatus::ALL.to_vec())
}

fn arb_role() -> impl Strategy<Value = Role> {
    prop::sample::select(vec![
        Role::Student,
        Role::Registrar,
        Role::Admin,
        Role::Dean,
        Role::Cashier,
    ])
}

/// Every action except `Create`, which has no source status.
fn arb_action() -> impl Strategy<Value = EnrollmentAction> {
    prop::sample::select(vec![
        EnrollmentAction::Assess,
        EnrollmentAction::ApproveAssessment,
        EnrollmentAction::AddSubject,
        EnrollmentAction::RemoveSubject,
        EnrollmentAction::SubmitSubjects,
        EnrollmentAction::ApproveSubjects,
        EnrollmentAction::SubmitPayment,
        EnrollmentAction::VerifyPayment,
        EnrollmentAction::RejectPayment,
        EnrollmentAction::Reject,
    ])
}

fn arb_user() -> impl Strategy<Value = UserId> {
    any::<u128>().prop_map(|n| UserId::from(Uuid::from_u128(n)))
}

/// An actor whose role is allowed to perform `action`.
fn permitted_actor(action: EnrollmentAction, user_id: UserId) -> Actor {
    Actor::new(user_id, AccessPolicy::allowed_roles(action)[0])
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// With a permitted role, the check passes exactly when the status matches.
    #[test]
    fn prop_status_gate(
        action in arb_action(),
        status in arb_status(),
        user in arb_user(),
    ) {
        let actor = permitted_actor(action, user);
        let result = EnrollmentStateMachine::check(action, status, &actor);
        let expected_ok = action.requirement().is_some_and(|r| r.is_satisfied_by(status));
        prop_assert_eq!(result.is_ok(), expected_ok);
        if let Err(err) = result {
            let is_invalid_transition = matches!(err, EnrollmentError::InvalidTransition { .. });
            prop_assert!(is_invalid_transition);
        }
    }

    /// A wrong status is reported before a wrong role.
    #[test]
    fn prop_status_checked_before_role(
        action in arb_action(),
        status in arb_status(),
        role in arb_role(),
        user in arb_user(),
    ) {
        let result = EnrollmentStateMachine::check(action, status, &Actor::new(user, role));
        let status_ok = EnrollmentStateMachine::can_apply(action, status);
        let role_ok = AccessPolicy::permits(action, role);

        match result {
            Ok(_) => prop_assert!(status_ok && role_ok),
            Err(EnrollmentError::InvalidTransition { .. }) => prop_assert!(!status_ok),
            Err(EnrollmentError::Unauthorized { .. }) => prop_assert!(status_ok && !role_ok),
            Err(other) => prop_assert!(false, "unexpected error {other:?}"),
        }
    }

    /// Terminal statuses accept no action.
    #[test]
    fn prop_terminal_is_final(
        action in arb_action(),
        terminal in prop::sample::select(vec![EnrollmentStatus::Enrolled, EnrollmentStatus::Rejected]),
        user in arb_user(),
    ) {
        let actor = permitted_actor(action, user);
        prop_assert!(EnrollmentStateMachine::check(action, terminal, &actor).is_err());
    }

    /// Repeating a status-changing action fails the second time.
    #[test]
    fn prop_repeat_transition_fails(
        action in arb_action(),
        status in arb_status(),
        user in arb_user(),
    ) {
        let actor = permitted_actor(action, user);
        if let Ok(next) = EnrollmentStateMachine::check(action, status, &actor) {
            if next != status {
                let again = EnrollmentStateMachine::check(action, next, &actor);
                let is_invalid_transition =
                    matches!(again, Err(EnrollmentError::InvalidTransition { .. }));
                prop_assert!(is_invalid_transition);
            }
        }
    }

    /// PaymentVerification is only entered by submitting a payment from ForPayment,
    /// and Enrolled only by verifying from PaymentVerification.
    #[test]
    fn prop_payment_ordering(
        action in arb_action(),
        status in arb_status(),
        user in arb_user(),
    ) {
        let actor = permitted_actor(action, user);
        if let Ok(next) = EnrollmentStateMachine::check(action, status, &actor) {
            if next == EnrollmentStatus::PaymentVerification {
                prop_assert_eq!(action, EnrollmentAction::SubmitPayment);
                prop_assert_eq!(status, EnrollmentStatus::ForPayment);
            }
            if next == EnrollmentStatus::Enrolled {
                prop_assert_eq!(action, EnrollmentAction::VerifyPayment);
                prop_assert_eq!(status, EnrollmentStatus::PaymentVerification);
            }
        }
    }
}
