//! Role table for enrollment actions.

use crate::enrollment::error::EnrollmentError;
use crate::enrollment::types::{EnrollmentAction, Role};

/// Which roles may perform which action.
///
/// The table is static; the state machine consults it after the
/// status check so that a stale action reports `InvalidTransition`
/// regardless of who attempted it.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessPolicy;

impl AccessPolicy {
    /// Roles allowed to perform `action`.
    #[must_use]
    pub fn allowed_roles(action: EnrollmentAction) -> &'static [Role] {
        use EnrollmentAction as A;
        match action {
            A::Create | A::AddSubject | A::RemoveSubject | A::SubmitSubjects | A::SubmitPayment => {
                &[Role::Student]
            }
            A::Assess => &[Role::Registrar],
            A::ApproveAssessment => &[Role::Admin],
            A::ApproveSubjects => &[Role::Dean],
            A::VerifyPayment | A::RejectPayment => &[Role::Registrar, Role::Cashier],
            A::Reject => &[Role::Admin, Role::Registrar],
        }
    }

    /// Returns true if `role` may perform `action`.
    #[must_use]
    pub fn permits(action: EnrollmentAction, role: Role) -> bool {
        Self::allowed_roles(action).contains(&role)
    }

    /// Checks that `role` may perform `action`.
    ///
    /// # Errors
    ///
    /// Returns `EnrollmentError::Unauthorized` if it may not.
    pub fn authorize(action: EnrollmentAction, role: Role) -> Result<(), EnrollmentError> {
        if Self::permits(action, role) {
            Ok(())
        } else {
            Err(EnrollmentError::Unauthorized { role, action })
        }
    }
}
