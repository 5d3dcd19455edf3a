//! Append-only record of lifecycle operations.

use thiserror::Error;

use crate::common_models::audit::AuditEntry;

pub mod imp;

#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait::async_trait]
pub trait AuditLog: Send + Sync {
    async fn append(&self, entry: AuditEntry) -> Result<(), AuditError>;
}

#[derive(Clone, Error, Debug)]
pub enum AuditError {
    #[error("Append error: `{0}`")]
    Append(String),
    #[error("Serialization error: `{0}`")]
    Serialization(String),
}
