use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use time::{Date, OffsetDateTime};

use super::{
    credential_type::{CredentialTypeId, ValidityOptionId},
    macros::{impl_display, impl_string_id},
    non_blank,
    user::UserId,
};

/// Server-assigned, opaque certificate identifier.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CertificateId(String);
impl_display!(CertificateId);
impl_string_id!(CertificateId);

/// Content-addressed fingerprint of an issued document.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocHash(String);
impl_display!(DocHash);
impl_string_id!(DocHash);

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Certificate {
    pub id: CertificateId,
    pub doc_hash: DocHash,
    pub holder_name: String,
    pub degree: Option<String>,
    pub credential_type_id: Option<CredentialTypeId>,
    pub holder_id: Option<UserId>,
    pub uploader_id: Option<UserId>,
    /// Date the authority genuinely issued the credential.
    pub issued_date: Date,
    /// Intake time into the registry.
    pub certx_issued_date: Option<OffsetDateTime>,
    /// Absent for permanent credentials.
    pub expiration_date: Option<Date>,
    pub revoked_at: Option<OffsetDateTime>,
    pub status: CertificateStatus,
    pub rejection_reason: Option<String>,
    pub allow_reupload: bool,
    pub reupload_note: Option<String>,
    /// Lookup-only back reference to the rejected certificate this one supersedes.
    pub reuploaded_from: Option<CertificateId>,
    pub validity_option_id: Option<ValidityOptionId>,
}

impl Certificate {
    /// True when this record is an in-flight resubmission of `rejected`.
    pub fn is_pending_resubmission_of(&self, rejected: &CertificateId) -> bool {
        self.status == CertificateStatus::Pending && self.reuploaded_from.as_ref() == Some(rejected)
    }

    pub fn descriptor(&self) -> CredentialDescriptor {
        CredentialDescriptor {
            degree: self.degree.clone(),
            credential_type_id: self.credential_type_id.clone(),
        }
    }
}

/// Status as persisted by the registry. `EXPIRED` is never stored, see [`crate::status`].
#[derive(
    Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum CertificateStatus {
    Pending,
    Valid,
    Rejected,
    Revoked,
}

/// Free-text degree and/or a structured credential type reference.
///
/// When both are present the credential type drives the validity policy and the
/// degree is kept as display text only.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CredentialDescriptor {
    pub degree: Option<String>,
    pub credential_type_id: Option<CredentialTypeId>,
}

impl CredentialDescriptor {
    pub fn degree(degree: impl Into<String>) -> Self {
        Self {
            degree: Some(degree.into()),
            credential_type_id: None,
        }
    }

    pub fn credential_type(credential_type_id: impl Into<CredentialTypeId>) -> Self {
        Self {
            degree: None,
            credential_type_id: Some(credential_type_id.into()),
        }
    }

    pub fn credential_type_id(&self) -> Option<&CredentialTypeId> {
        self.credential_type_id
            .as_ref()
            .filter(|id| !id.as_str().trim().is_empty())
    }

    pub fn is_present(&self) -> bool {
        non_blank(self.degree.as_deref()).is_some() || self.credential_type_id().is_some()
    }
}

#[derive(Clone, Eq, PartialEq)]
pub struct CertificateFile {
    pub file_name: String,
    pub content_type: String,
    pub content: Vec<u8>,
}

impl std::fmt::Debug for CertificateFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateFile")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.content.len())
            .finish()
    }
}

impl CertificateFile {
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}
