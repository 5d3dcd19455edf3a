//! Enumerates errors of certificate state transitions.

use thiserror::Error;

use crate::{
    certificate_state::TransitionKind,
    common_models::{
        certificate::{CertificateId, CertificateStatus},
        user::{UserId, UserRole},
    },
    validity::error::ValidityError,
};

#[derive(Debug, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Account `{0}` is disabled")]
    AccountDisabled(UserId),
    #[error("Role `{role}` may not {transition}")]
    NotPermitted {
        role: UserRole,
        transition: TransitionKind,
    },
    #[error("Only the uploader may resubmit certificate `{0}`")]
    NotOwner(CertificateId),

    #[error("Cannot {transition} a certificate in state `{status}`")]
    InvalidState {
        transition: TransitionKind,
        status: CertificateStatus,
    },
    #[error("Cannot {transition} an expired certificate")]
    Expired { transition: TransitionKind },
    #[error("Reupload was not allowed when certificate `{0}` was rejected")]
    ReuploadNotAllowed(CertificateId),
    #[error("A resubmission of certificate `{0}` is already pending")]
    PendingResubmission(CertificateId),

    #[error("Missing required field: `{0}`")]
    MissingField(&'static str),
    #[error("Rejection reason must not be blank")]
    BlankRejectionReason,
    #[error("Note must not be blank")]
    BlankNote,
    #[error("Neither a new file nor the original file was selected")]
    MissingReuploadSource,
    #[error("Inconsistent certificate record: `{0}`")]
    InconsistentRecord(String),

    #[error("Validity error: `{0}`")]
    Validity(#[from] ValidityError),
}

impl TransitionError {
    /// Role or ownership problems, as opposed to state or input problems.
    pub fn is_authorization(&self) -> bool {
        matches!(
            self,
            Self::AccountDisabled(_) | Self::NotPermitted { .. } | Self::NotOwner(_)
        )
    }
}
