//! The credential registry: the authoritative store every certificate transition is
//! submitted to.
//!
//! The registry owns persistence and has the last word on every write. Clients call it
//! only after local validation passed and never retry a failed call; a refused
//! transition comes back as a [`RegistryError`] carrying the server's message.

use crate::{
    common_models::{
        certificate::{CertificateId, DocHash},
        credential_type::{CredentialType, CredentialTypeId, ValidityOption, ValidityOptionId},
        user::{User, UserId},
    },
    registry::{
        error::RegistryError,
        model::{
            CertificateFilters, CertificatePage, CreateCredentialTypeRequest,
            CreateUserRequest, CreateValidityOptionRequest, ExpirationUpdate,
            IssueCertificateRequest, IssuedCertificate, ReuploadCertificateRequest,
            RevokedCertificate, TransferCertificateRequest, TransferredCertificate,
            UpdateCredentialTypeRequest, UpdateUserRequest, UpdateValidityOptionRequest,
            UploadCertificateRequest, UploadedCertificate, VerificationRecord,
        },
    },
    session::Session,
};

pub mod error;
pub mod imp;
pub mod model;

#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait::async_trait]
pub trait RegistryClient: Send + Sync {
    /// Submits a certificate for review. It starts out `PENDING`.
    async fn upload_certificate(
        &self,
        session: &Session,
        request: UploadCertificateRequest,
    ) -> Result<UploadedCertificate, RegistryError>;

    /// Issues a certificate that is `VALID` straight away.
    async fn issue_certificate(
        &self,
        session: &Session,
        request: IssueCertificateRequest,
    ) -> Result<IssuedCertificate, RegistryError>;

    async fn approve_certificate(
        &self,
        session: &Session,
        id: &CertificateId,
        update: ExpirationUpdate,
    ) -> Result<(), RegistryError>;

    async fn reject_certificate(
        &self,
        session: &Session,
        id: &CertificateId,
        reason: &str,
        allow_reupload: bool,
    ) -> Result<(), RegistryError>;

    /// Creates a new `PENDING` certificate linked back to the rejected one.
    async fn reupload_certificate(
        &self,
        session: &Session,
        id: &CertificateId,
        request: ReuploadCertificateRequest,
    ) -> Result<(), RegistryError>;

    async fn revoke_certificate(
        &self,
        session: &Session,
        id: &CertificateId,
    ) -> Result<RevokedCertificate, RegistryError>;

    async fn update_expiration(
        &self,
        session: &Session,
        id: &CertificateId,
        update: ExpirationUpdate,
    ) -> Result<(), RegistryError>;

    async fn transfer_certificate(
        &self,
        session: &Session,
        id: &CertificateId,
        request: TransferCertificateRequest,
    ) -> Result<TransferredCertificate, RegistryError>;

    /// Public lookup, no session needed.
    async fn verify_by_hash(&self, hash: &DocHash) -> Result<VerificationRecord, RegistryError>;

    async fn list_certificates(
        &self,
        session: &Session,
        filters: &CertificateFilters,
    ) -> Result<CertificatePage, RegistryError>;

    async fn list_credential_types(
        &self,
        session: &Session,
    ) -> Result<Vec<CredentialType>, RegistryError>;

    async fn create_credential_type(
        &self,
        session: &Session,
        request: CreateCredentialTypeRequest,
    ) -> Result<CredentialType, RegistryError>;

    async fn update_credential_type(
        &self,
        session: &Session,
        id: &CredentialTypeId,
        request: UpdateCredentialTypeRequest,
    ) -> Result<CredentialType, RegistryError>;

    async fn delete_credential_type(
        &self,
        session: &Session,
        id: &CredentialTypeId,
    ) -> Result<(), RegistryError>;

    /// All options, or only those of one credential type.
    async fn list_validity_options(
        &self,
        session: &Session,
        credential_type_id: Option<CredentialTypeId>,
    ) -> Result<Vec<ValidityOption>, RegistryError>;

    async fn create_validity_option(
        &self,
        session: &Session,
        request: CreateValidityOptionRequest,
    ) -> Result<ValidityOption, RegistryError>;

    async fn update_validity_option(
        &self,
        session: &Session,
        id: &ValidityOptionId,
        request: UpdateValidityOptionRequest,
    ) -> Result<ValidityOption, RegistryError>;

    /// Certificates that already captured a concrete expiration date keep it.
    async fn delete_validity_option(
        &self,
        session: &Session,
        id: &ValidityOptionId,
    ) -> Result<(), RegistryError>;

    async fn get_user(&self, session: &Session, id: &UserId)
        -> Result<Option<User>, RegistryError>;

    async fn create_user(
        &self,
        session: &Session,
        request: CreateUserRequest,
    ) -> Result<User, RegistryError>;

    async fn update_user(
        &self,
        session: &Session,
        id: &UserId,
        request: UpdateUserRequest,
    ) -> Result<User, RegistryError>;
}
