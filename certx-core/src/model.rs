//! Inputs and results of the core services.

use certx_providers::{
    common_models::{
        certificate::{CertificateFile, CredentialDescriptor},
        credential_type::CredentialTypeId,
        user::{UserId, UserRole},
    },
    registry::model::{VerificationSource, VerifiedCertificate},
    status::PresentationStatus,
    validity::ExpirationChoice,
};
use time::Date;

#[derive(Clone, Debug, Default)]
pub struct UploadCertificateInput {
    pub file: Option<CertificateFile>,
    pub holder_name: String,
    pub descriptor: CredentialDescriptor,
    /// Defaults to the upload time.
    pub issued_date: Option<Date>,
}

#[derive(Clone, Debug, Default)]
pub struct IssueCertificateInput {
    pub file: Option<CertificateFile>,
    pub holder_name: String,
    pub descriptor: CredentialDescriptor,
    pub issued_date: Option<Date>,
    /// Ignored for permanent credential types.
    pub expiration: Option<ExpirationChoice>,
    pub recipient_user_id: Option<UserId>,
}

/// Shared by approval and expiration updates.
#[derive(Clone, Debug, Default)]
pub struct ExpirationInput {
    pub issued_date: Option<Date>,
    pub expiration: Option<ExpirationChoice>,
}

#[derive(Clone, Debug, Default)]
pub struct RejectCertificateInput {
    pub reason: String,
    pub allow_reupload: bool,
}

#[derive(Clone, Debug, Default)]
pub struct ReuploadCertificateInput {
    pub file: Option<CertificateFile>,
    /// Reuse the file of the rejected certificate instead of sending a new one.
    pub use_original_file: bool,
    pub note: String,
    pub holder_name: String,
    pub descriptor: CredentialDescriptor,
    /// Only honoured with a new file; reusing the original file dates the resubmission
    /// to now.
    pub issued_date: Option<Date>,
}

#[derive(Clone, Debug, Default)]
pub struct TransferCertificateInput {
    pub new_user_id: Option<UserId>,
    pub note: String,
    /// Shown on the certificate instead of the target user's name. The account is not
    /// renamed.
    pub display_name_override: Option<String>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Verification {
    pub status: PresentationStatus,
    pub source: VerificationSource,
    pub metadata_uri: Option<String>,
    pub certificate: Option<VerifiedCertificate>,
}

/// Periods arrive as the two raw counts; exactly one of them must be set.
#[derive(Clone, Debug)]
pub struct CreateValidityOptionInput {
    pub credential_type_id: CredentialTypeId,
    pub period_months: Option<u32>,
    pub period_days: Option<u32>,
    pub note: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct UpdateValidityOptionInput {
    /// Leave both unset to keep the current period.
    pub period_months: Option<u32>,
    pub period_days: Option<u32>,
    pub note: Option<Option<String>>,
}

#[derive(Clone, Debug)]
pub struct CreateUserInput {
    pub email: String,
    pub name: String,
    pub address: Option<String>,
    pub role: UserRole,
}

#[derive(Clone, Debug, Default)]
pub struct UpdateUserInput {
    pub name: Option<String>,
    pub address: Option<String>,
    pub role: Option<UserRole>,
    pub enabled: Option<bool>,
}
