//! `struct`s and `enum`s exchanged with the registry.

use serde::{Deserialize, Serialize};
use strum::Display;
use time::Date;

use crate::common_models::{
    certificate::{
        Certificate, CertificateFile, CertificateId, CertificateStatus, CredentialDescriptor,
        DocHash,
    },
    credential_type::{CredentialTypeId, ValidityOptionId, ValidityPeriod},
    user::{UserId, UserRole},
};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UploadCertificateRequest {
    pub file: CertificateFile,
    pub holder_name: String,
    pub descriptor: CredentialDescriptor,
    pub issued_date: Option<Date>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UploadedCertificate {
    pub id: CertificateId,
    pub doc_hash: DocHash,
    pub status: CertificateStatus,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct IssueCertificateRequest {
    pub file: CertificateFile,
    pub holder_name: String,
    pub descriptor: CredentialDescriptor,
    pub issued_date: Date,
    pub expiration_date: Option<Date>,
    pub validity_option_id: Option<ValidityOptionId>,
    pub recipient_user_id: Option<UserId>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct IssuedCertificate {
    pub hash: DocHash,
    /// Absent when the registry sent none and no verify base url is configured.
    pub verify_url: Option<String>,
    pub qr_payload: Option<String>,
}

/// Payload shared by approval and expiration updates.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExpirationUpdate {
    pub issued_date: Date,
    pub expiration_date: Option<Date>,
    pub validity_option_id: Option<ValidityOptionId>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ReuploadSource {
    NewFile(CertificateFile),
    /// Reuse the file stored with the rejected certificate.
    OriginalFile,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReuploadCertificateRequest {
    pub source: ReuploadSource,
    pub note: String,
    pub holder_name: String,
    pub descriptor: CredentialDescriptor,
    pub issued_date: Date,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RevokedCertificate {
    pub status: CertificateStatus,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TransferCertificateRequest {
    pub new_user_id: UserId,
    pub note: String,
    pub display_name_override: Option<String>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TransferredCertificate {
    pub message: String,
}

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum VerifiedStatus {
    Valid,
    Revoked,
    NotFound,
}

/// Where the registry found the record.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum VerificationSource {
    Chain,
    Db,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VerificationRecord {
    pub status: VerifiedStatus,
    pub metadata_uri: Option<String>,
    pub source: VerificationSource,
    pub certificate: Option<VerifiedCertificate>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VerifiedCertificate {
    pub holder_name: String,
    pub degree: Option<String>,
    pub credential_type_id: Option<CredentialTypeId>,
    pub issued_date: Option<Date>,
    /// As received; parsed leniently at presentation time.
    pub expiration_date: Option<String>,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateFilters {
    pub page: u32,
    pub limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<CertificateStatus>,
}

impl CertificateFilters {
    pub fn first_page(limit: u32) -> Self {
        Self {
            page: 1,
            limit,
            q: None,
            status: None,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u32,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CertificatePage {
    pub items: Vec<Certificate>,
    pub pagination: Pagination,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CreateCredentialTypeRequest {
    pub id: CredentialTypeId,
    pub name: String,
    pub is_permanent: bool,
}

/// The id of a credential type is never updated.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct UpdateCredentialTypeRequest {
    pub name: Option<String>,
    pub is_permanent: Option<bool>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CreateValidityOptionRequest {
    pub credential_type_id: CredentialTypeId,
    pub period: ValidityPeriod,
    pub note: Option<String>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct UpdateValidityOptionRequest {
    pub period: Option<ValidityPeriod>,
    pub note: Option<Option<String>>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CreateUserRequest {
    pub email: String,
    pub name: String,
    pub address: Option<String>,
    pub role: UserRole,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub address: Option<Option<String>>,
    pub role: Option<UserRole>,
    pub enabled: Option<bool>,
}
