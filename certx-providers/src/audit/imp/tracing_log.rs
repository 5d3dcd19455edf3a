use async_trait::async_trait;

use crate::{
    audit::{AuditError, AuditLog},
    common_models::audit::AuditEntry,
};

pub const AUDIT_TARGET: &str = "certx::audit";

/// Emits every entry as one structured `tracing` event on [`AUDIT_TARGET`].
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingAuditLog;

#[async_trait]
impl AuditLog for TracingAuditLog {
    async fn append(&self, entry: AuditEntry) -> Result<(), AuditError> {
        let record =
            serde_json::to_string(&entry).map_err(|e| AuditError::Serialization(e.to_string()))?;

        tracing::info!(
            target: AUDIT_TARGET,
            action = %entry.action,
            resource = %entry.resource,
            actor = entry.actor.as_ref().map(|actor| actor.as_str()),
            %record,
            "audit"
        );

        Ok(())
    }
}
