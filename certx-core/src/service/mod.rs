//! Services orchestrating the providers into the certificate workflows.
//!
//! Every mutating operation follows the same path: local validation, the state machine
//! check, the registry call, one audit entry for the attempt whatever its outcome, and
//! on success (or a not-found / conflict failure) a refetch of the certificate list.

use std::sync::Arc;

use certx_providers::{
    audit::AuditLog,
    common_models::audit::{AuditAction, AuditEntry, AuditOutcome},
    session::Session,
    util::clock::Clock,
};

use self::error::ServiceError;

pub mod certificate_list;
pub mod certificate_service;
pub mod credential_type_service;
pub mod error;
pub mod user_service;
pub mod verification_service;

#[derive(Clone)]
pub(crate) struct Auditor {
    log: Arc<dyn AuditLog>,
    clock: Clock,
}

impl Auditor {
    pub(crate) fn new(log: Arc<dyn AuditLog>, clock: Clock) -> Self {
        Self { log, clock }
    }

    /// Appends one entry for an attempted operation. A failing log is reported but does
    /// not undo or fail the operation itself.
    pub(crate) async fn record<T>(
        &self,
        session: &Session,
        action: AuditAction,
        resource: String,
        details: serde_json::Value,
        result: &Result<T, ServiceError>,
    ) {
        let outcome = match result {
            Ok(_) => AuditOutcome::Success,
            Err(error) if error.is_local() => AuditOutcome::Denied {
                reason: error.to_string(),
            },
            Err(error) => AuditOutcome::Failure {
                reason: error.to_string(),
            },
        };

        let entry = AuditEntry {
            at: (self.clock)(),
            action,
            actor: Some(session.user.id.to_owned()),
            actor_role: Some(session.user.role),
            resource: resource.to_owned(),
            outcome,
            details,
        };

        if let Err(error) = self.log.append(entry).await {
            tracing::error!(%error, %action, %resource, "failed to append audit entry");
        }
    }
}

/// Catalogue and account management are open to enabled administrators only.
pub(crate) fn ensure_administrator(session: &Session) -> Result<(), ServiceError> {
    if !session.user.enabled {
        return Err(ServiceError::Forbidden(format!(
            "Account `{}` is disabled",
            session.user.id
        )));
    }
    if !session.user.role.is_administrative() {
        return Err(ServiceError::Forbidden(format!(
            "Role `{}` may not manage the registry",
            session.user.role
        )));
    }

    Ok(())
}
