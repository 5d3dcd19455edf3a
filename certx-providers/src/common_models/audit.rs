use serde::Serialize;
use strum::Display;
use time::OffsetDateTime;

use super::user::{UserId, UserRole};

/// One append-only audit record: who attempted what on which resource, and how it ended.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    #[serde(with = "time::serde::rfc3339")]
    pub at: OffsetDateTime,
    pub action: AuditAction,
    pub actor: Option<UserId>,
    pub actor_role: Option<UserRole>,
    pub resource: String,
    pub outcome: AuditOutcome,
    #[serde(skip_serializing_if = "serde_json::Value::is_null")]
    pub details: serde_json::Value,
}

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    CertificateUpload,
    CertificateIssue,
    CertificateApprove,
    CertificateReject,
    CertificateReupload,
    CertificateRevoke,
    CertificateUpdateExpiration,
    CertificateTransfer,
    CredentialTypeCreate,
    CredentialTypeUpdate,
    CredentialTypeDelete,
    ValidityOptionCreate,
    ValidityOptionUpdate,
    ValidityOptionDelete,
    UserCreate,
    UserUpdate,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditOutcome {
    Success,
    /// Blocked locally before any request was sent.
    Denied { reason: String },
    /// Sent and refused or failed.
    Failure { reason: String },
}
