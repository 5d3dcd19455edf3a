//! Lifecycle of a certificate.
//!
//! ```text
//! PENDING ──approve──▶ VALID ──revoke──▶ REVOKED
//!    │                   ╎
//!    └──reject──▶ REJECTED   (EXPIRED, derived from the expiration date)
//!                    │
//!                    └──reupload──▶ new PENDING record
//! ```
//!
//! Transitions are checked in a fixed order: the role table first, then the current
//! state, then the event's own fields. Revoked and expired certificates accept no
//! further mutation.

use strum::Display;
use time::{Date, OffsetDateTime};

use crate::{
    common_models::{
        audit::AuditAction,
        certificate::{Certificate, CertificateId, CertificateStatus, CredentialDescriptor},
        non_blank,
        user::{UserId, UserRole},
    },
    status::is_expired,
    validity::{resolve_expiration, ExpirationChoice, ResolvedExpiration, ResolvedPeriod},
};

use self::{error::TransitionError, permission::ensure_permitted};

pub mod error;
pub mod permission;


#[derive(Clone, Copy, Debug, Display, Eq, PartialEq, Hash)]
#[strum(serialize_all = "kebab-case")]
pub enum TransitionKind {
    Upload,
    Issue,
    Approve,
    Reject,
    Reupload,
    Revoke,
    UpdateExpiration,
    Transfer,
}

impl From<TransitionKind> for AuditAction {
    fn from(value: TransitionKind) -> Self {
        match value {
            TransitionKind::Upload => Self::CertificateUpload,
            TransitionKind::Issue => Self::CertificateIssue,
            TransitionKind::Approve => Self::CertificateApprove,
            TransitionKind::Reject => Self::CertificateReject,
            TransitionKind::Reupload => Self::CertificateReupload,
            TransitionKind::Revoke => Self::CertificateRevoke,
            TransitionKind::UpdateExpiration => Self::CertificateUpdateExpiration,
            TransitionKind::Transfer => Self::CertificateTransfer,
        }
    }
}

/// Who is invoking a transition.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Actor {
    pub id: UserId,
    pub role: UserRole,
    pub enabled: bool,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TransitionContext {
    pub actor: Actor,
    /// Current instant in local time; its offset decides where a day ends.
    pub now: OffsetDateTime,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CertificateState {
    Pending,
    /// Persisted as `VALID`.
    Approved {
        issued_date: Date,
        expiration: ResolvedExpiration,
    },
    Rejected {
        reason: String,
        allow_reupload: bool,
    },
    Revoked {
        revoked_at: Option<OffsetDateTime>,
    },
}

impl CertificateState {
    pub fn status(&self) -> CertificateStatus {
        match self {
            Self::Pending => CertificateStatus::Pending,
            Self::Approved { .. } => CertificateStatus::Valid,
            Self::Rejected { .. } => CertificateStatus::Rejected,
            Self::Revoked { .. } => CertificateStatus::Revoked,
        }
    }
}

impl TryFrom<&Certificate> for CertificateState {
    type Error = TransitionError;

    fn try_from(certificate: &Certificate) -> Result<Self, Self::Error> {
        Ok(match certificate.status {
            CertificateStatus::Pending => Self::Pending,
            CertificateStatus::Valid => {
                if non_blank(certificate.rejection_reason.as_deref()).is_some() {
                    return Err(TransitionError::InconsistentRecord(format!(
                        "valid certificate `{}` carries a rejection reason",
                        certificate.id
                    )));
                }

                Self::Approved {
                    issued_date: certificate.issued_date,
                    expiration: ResolvedExpiration {
                        expiration_date: certificate.expiration_date,
                        validity_option_id: certificate.validity_option_id.to_owned(),
                    },
                }
            }
            CertificateStatus::Rejected => Self::Rejected {
                reason: non_blank(certificate.rejection_reason.as_deref())
                    .ok_or_else(|| {
                        TransitionError::InconsistentRecord(format!(
                            "rejected certificate `{}` has no rejection reason",
                            certificate.id
                        ))
                    })?
                    .to_owned(),
                allow_reupload: certificate.allow_reupload,
            },
            CertificateStatus::Revoked => Self::Revoked {
                revoked_at: certificate.revoked_at,
            },
        })
    }
}

/// Data every new certificate needs.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Intake {
    pub has_file: bool,
    pub holder_name: String,
    pub descriptor: CredentialDescriptor,
}

/// Transitions that create a record.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CreationEvent {
    Upload(Intake),
    /// Direct issuance, bypassing review.
    Issue {
        intake: Intake,
        issued_date: Option<Date>,
        period: ResolvedPeriod,
        choice: Option<ExpirationChoice>,
    },
}

impl CreationEvent {
    pub fn kind(&self) -> TransitionKind {
        match self {
            Self::Upload(_) => TransitionKind::Upload,
            Self::Issue { .. } => TransitionKind::Issue,
        }
    }
}

/// Transitions on an existing record.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CertificateEvent {
    Approve {
        issued_date: Option<Date>,
        period: ResolvedPeriod,
        choice: Option<ExpirationChoice>,
    },
    Reject {
        reason: String,
        allow_reupload: bool,
    },
    Reupload {
        certificate_id: CertificateId,
        uploader: Option<UserId>,
        has_source: bool,
        note: String,
        /// Another PENDING record already points back at this one.
        pending_resubmission: bool,
    },
    Revoke {
        at: OffsetDateTime,
    },
    UpdateExpiration {
        issued_date: Option<Date>,
        period: ResolvedPeriod,
        choice: Option<ExpirationChoice>,
    },
    Transfer {
        new_holder: Option<UserId>,
        note: String,
    },
}

impl CertificateEvent {
    pub fn kind(&self) -> TransitionKind {
        match self {
            Self::Approve { .. } => TransitionKind::Approve,
            Self::Reject { .. } => TransitionKind::Reject,
            Self::Reupload { .. } => TransitionKind::Reupload,
            Self::Revoke { .. } => TransitionKind::Revoke,
            Self::UpdateExpiration { .. } => TransitionKind::UpdateExpiration,
            Self::Transfer { .. } => TransitionKind::Transfer,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Transitioned {
    /// The record itself moves to this state.
    Updated(CertificateState),
    /// The record is left as is and a new record starts in this state.
    Superseded(CertificateState),
}

impl Transitioned {
    pub fn state(&self) -> &CertificateState {
        match self {
            Self::Updated(state) | Self::Superseded(state) => state,
        }
    }
}

/// Validates a creating transition and returns the state the new record starts in.
pub fn begin(
    event: CreationEvent,
    context: &TransitionContext,
) -> Result<CertificateState, TransitionError> {
    ensure_permitted(&context.actor, event.kind())?;

    match event {
        CreationEvent::Upload(intake) => {
            validate_intake(&intake)?;
            Ok(CertificateState::Pending)
        }
        CreationEvent::Issue {
            intake,
            issued_date,
            period,
            choice,
        } => {
            validate_intake(&intake)?;
            let issued_date = issued_date.ok_or(TransitionError::MissingField("issuedDate"))?;
            let expiration = resolve_expiration(&period, issued_date, choice.as_ref())?;

            Ok(CertificateState::Approved {
                issued_date,
                expiration,
            })
        }
    }
}

/// Validates `event` against `state` and returns the resulting state.
pub fn apply(
    state: &CertificateState,
    event: CertificateEvent,
    context: &TransitionContext,
) -> Result<Transitioned, TransitionError> {
    let transition = event.kind();
    ensure_permitted(&context.actor, transition)?;

    match (state, event) {
        (
            CertificateState::Pending,
            CertificateEvent::Approve {
                issued_date,
                period,
                choice,
            },
        ) => approved(issued_date, &period, choice.as_ref()).map(Transitioned::Updated),

        (
            CertificateState::Pending,
            CertificateEvent::Reject {
                reason,
                allow_reupload,
            },
        ) => {
            let reason = non_blank(Some(reason.as_str()))
                .ok_or(TransitionError::BlankRejectionReason)?;

            Ok(Transitioned::Updated(CertificateState::Rejected {
                reason: reason.to_owned(),
                allow_reupload,
            }))
        }

        (
            CertificateState::Rejected { allow_reupload, .. },
            CertificateEvent::Reupload {
                certificate_id,
                uploader,
                has_source,
                note,
                pending_resubmission,
            },
        ) => {
            // records without an uploader cannot be resubmitted by anyone
            if uploader.as_ref() != Some(&context.actor.id) {
                return Err(TransitionError::NotOwner(certificate_id));
            }
            if !allow_reupload {
                return Err(TransitionError::ReuploadNotAllowed(certificate_id));
            }
            if pending_resubmission {
                return Err(TransitionError::PendingResubmission(certificate_id));
            }
            if !has_source {
                return Err(TransitionError::MissingReuploadSource);
            }
            non_blank(Some(note.as_str())).ok_or(TransitionError::BlankNote)?;

            Ok(Transitioned::Superseded(CertificateState::Pending))
        }

        (CertificateState::Approved { expiration, .. }, event)
            if is_expired(expiration.expiration_date, context.now)
                && matches!(
                    event,
                    CertificateEvent::Revoke { .. }
                        | CertificateEvent::UpdateExpiration { .. }
                        | CertificateEvent::Transfer { .. }
                ) =>
        {
            Err(TransitionError::Expired { transition })
        }

        (CertificateState::Approved { .. }, CertificateEvent::Revoke { at }) => {
            Ok(Transitioned::Updated(CertificateState::Revoked {
                revoked_at: Some(at),
            }))
        }

        (
            CertificateState::Approved { .. },
            CertificateEvent::UpdateExpiration {
                issued_date,
                period,
                choice,
            },
        ) => approved(issued_date, &period, choice.as_ref()).map(Transitioned::Updated),

        (CertificateState::Approved { .. }, CertificateEvent::Transfer { new_holder, note }) => {
            new_holder
                .filter(|holder| !holder.as_str().trim().is_empty())
                .ok_or(TransitionError::MissingField("newUserId"))?;
            non_blank(Some(note.as_str())).ok_or(TransitionError::BlankNote)?;

            Ok(Transitioned::Updated(state.to_owned()))
        }

        (state, _) => Err(TransitionError::InvalidState {
            transition,
            status: state.status(),
        }),
    }
}

fn approved(
    issued_date: Option<Date>,
    period: &ResolvedPeriod,
    choice: Option<&ExpirationChoice>,
) -> Result<CertificateState, TransitionError> {
    let issued_date = issued_date.ok_or(TransitionError::MissingField("issuedDate"))?;
    let expiration = resolve_expiration(period, issued_date, choice)?;

    Ok(CertificateState::Approved {
        issued_date,
        expiration,
    })
}

fn validate_intake(intake: &Intake) -> Result<(), TransitionError> {
    if !intake.has_file {
        return Err(TransitionError::MissingField("file"));
    }
    non_blank(Some(intake.holder_name.as_str()))
        .ok_or(TransitionError::MissingField("holderName"))?;
    if !intake.descriptor.is_present() {
        return Err(TransitionError::MissingField("degree or credentialTypeId"));
    }

    Ok(())
}
