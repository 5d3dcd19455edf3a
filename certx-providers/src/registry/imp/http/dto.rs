use serde::{Deserialize, Serialize};

use crate::{
    common_models::{certificate::CertificateStatus, user::UserRole},
    registry::model::{VerificationSource, VerifiedStatus},
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateDTO {
    #[serde(alias = "_id")]
    pub id: String,
    pub doc_hash: String,
    pub holder_name: String,
    pub degree: Option<String>,
    pub credential_type_id: Option<String>,
    pub holder_id: Option<String>,
    pub uploader_id: Option<String>,
    pub issued_date: Option<String>,
    pub certx_issued_date: Option<String>,
    pub expiration_date: Option<String>,
    pub revoked_at: Option<String>,
    pub status: CertificateStatus,
    pub rejection_reason: Option<String>,
    #[serde(default)]
    pub allow_reupload: bool,
    pub reupload_note: Option<String>,
    pub reuploaded_from: Option<String>,
    pub validity_option_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDTO {
    pub file_name: String,
    pub content_type: String,
    /// Base64 of the file bytes.
    pub content: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadCertificateRequestDTO {
    pub file: FileDTO,
    pub holder_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degree: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_type_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issued_date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedCertificateDTO {
    #[serde(alias = "_id")]
    pub id: String,
    pub doc_hash: String,
    pub status: CertificateStatus,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueCertificateRequestDTO {
    pub file: FileDTO,
    pub holder_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degree: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_type_id: Option<String>,
    pub issued_date: String,
    pub expiration_date: Option<String>,
    pub validity_option_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient_user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedCertificateDTO {
    pub hash: String,
    pub verify_url: Option<String>,
    pub qr_payload: Option<String>,
}

/// `expirationDate: null` clears a previous expiration.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpirationUpdateDTO {
    pub issued_date: String,
    pub expiration_date: Option<String>,
    pub validity_option_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectRequestDTO<'a> {
    pub reason: &'a str,
    pub allow_reupload: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReuploadRequestDTO {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<FileDTO>,
    pub use_original_file: bool,
    pub note: String,
    pub holder_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degree: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_type_id: Option<String>,
    pub issued_date: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequestDTO {
    pub new_user_id: String,
    pub note: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name_override: Option<String>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AckDTO {
    #[serde(default = "default_true")]
    pub ok: bool,
    pub message: Option<String>,
    pub status: Option<CertificateStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationDTO {
    pub status: VerifiedStatus,
    #[serde(rename = "metadataURI", alias = "metadataUri")]
    pub metadata_uri: Option<String>,
    pub source: Option<VerificationSource>,
    pub certificate: Option<VerifiedCertificateDTO>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedCertificateDTO {
    pub holder_name: String,
    pub degree: Option<String>,
    pub credential_type_id: Option<String>,
    pub issued_date: Option<String>,
    pub expiration_date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificatePageDTO {
    pub items: Vec<CertificateDTO>,
    pub pagination: PaginationDTO,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationDTO {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u32,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialTypeDTO {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub is_permanent: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCredentialTypeDTO {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_permanent: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidityOptionDTO {
    pub id: String,
    pub credential_type_id: String,
    pub period_months: Option<u32>,
    pub period_days: Option<u32>,
    pub note: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateValidityOptionDTO {
    pub credential_type_id: String,
    pub period_months: Option<u32>,
    pub period_days: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateValidityOptionDTO {
    /// Both period fields are sent together so the previous one gets cleared.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period_months: Option<Option<u32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period_days: Option<Option<u32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<Option<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDTO {
    #[serde(alias = "_id")]
    pub id: String,
    pub email: String,
    pub name: String,
    pub address: Option<String>,
    pub role: UserRole,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserDTO {
    pub email: String,
    pub name: String,
    pub address: Option<String>,
    pub role: UserRole,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserDTO {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}
