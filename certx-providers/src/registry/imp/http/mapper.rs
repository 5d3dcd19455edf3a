use ct_codecs::{Base64, Encoder};

use super::dto::{
    CertificateDTO, CertificatePageDTO, CredentialTypeDTO, ExpirationUpdateDTO, FileDTO,
    UserDTO, ValidityOptionDTO, VerificationDTO, VerifiedCertificateDTO,
};
use crate::{
    common_models::{
        certificate::{Certificate, CertificateFile, CredentialDescriptor},
        credential_type::{CredentialType, ValidityOption, ValidityPeriod},
        non_blank,
        user::User,
    },
    registry::{
        error::RegistryError,
        model::{
            CertificatePage, ExpirationUpdate, Pagination, VerificationRecord,
            VerificationSource, VerifiedCertificate,
        },
    },
    util::date::{format_date, parse_date, parse_instant},
};

pub(super) fn file_to_dto(file: &CertificateFile) -> Result<FileDTO, RegistryError> {
    Ok(FileDTO {
        file_name: file.file_name.to_owned(),
        content_type: file.content_type.to_owned(),
        content: Base64::encode_to_string(&file.content)
            .map_err(|e| RegistryError::MappingError(e.to_string()))?,
    })
}

/// Splits a descriptor into the `degree` / `credentialTypeId` pair the registry expects,
/// dropping blank values.
pub(super) fn descriptor_to_dto(
    descriptor: &CredentialDescriptor,
) -> (Option<String>, Option<String>) {
    (
        non_blank(descriptor.degree.as_deref()).map(str::to_owned),
        descriptor
            .credential_type_id()
            .map(|id| id.as_str().trim().to_owned()),
    )
}

impl From<ExpirationUpdate> for ExpirationUpdateDTO {
    fn from(value: ExpirationUpdate) -> Self {
        Self {
            issued_date: format_date(value.issued_date),
            expiration_date: value.expiration_date.map(format_date),
            validity_option_id: value.validity_option_id.map(Into::into),
        }
    }
}

impl TryFrom<CertificateDTO> for Certificate {
    type Error = RegistryError;

    fn try_from(value: CertificateDTO) -> Result<Self, Self::Error> {
        let certx_issued_date = value.certx_issued_date.as_deref().and_then(parse_instant);

        // older records only carry the intake time
        let issued_date = value
            .issued_date
            .as_deref()
            .and_then(parse_date)
            .or(certx_issued_date.map(|at| at.date()))
            .ok_or_else(|| {
                RegistryError::MappingError(format!(
                    "certificate `{}` has no usable issued date",
                    value.id
                ))
            })?;

        let expiration_date = value.expiration_date.as_deref().and_then(|raw| {
            let parsed = parse_date(raw);
            if parsed.is_none() {
                tracing::warn!(certificate = %value.id, raw, "ignoring malformed expiration date");
            }
            parsed
        });

        Ok(Self {
            id: value.id.into(),
            doc_hash: value.doc_hash.into(),
            holder_name: value.holder_name,
            degree: value.degree,
            credential_type_id: value.credential_type_id.map(Into::into),
            holder_id: value.holder_id.map(Into::into),
            uploader_id: value.uploader_id.map(Into::into),
            issued_date,
            certx_issued_date,
            expiration_date,
            revoked_at: value.revoked_at.as_deref().and_then(parse_instant),
            status: value.status,
            rejection_reason: value.rejection_reason,
            allow_reupload: value.allow_reupload,
            reupload_note: value.reupload_note,
            reuploaded_from: value.reuploaded_from.map(Into::into),
            validity_option_id: value.validity_option_id.map(Into::into),
        })
    }
}

impl From<CertificatePageDTO> for CertificatePage {
    fn from(value: CertificatePageDTO) -> Self {
        Self {
            items: value
                .items
                .into_iter()
                .filter_map(|item| match Certificate::try_from(item) {
                    Ok(certificate) => Some(certificate),
                    Err(error) => {
                        tracing::warn!(%error, "skipping malformed certificate");
                        None
                    }
                })
                .collect(),
            pagination: Pagination {
                page: value.pagination.page,
                limit: value.pagination.limit,
                total: value.pagination.total,
                total_pages: value.pagination.total_pages,
            },
        }
    }
}

impl From<VerificationDTO> for VerificationRecord {
    fn from(value: VerificationDTO) -> Self {
        Self {
            status: value.status,
            metadata_uri: value.metadata_uri,
            source: value.source.unwrap_or(VerificationSource::Db),
            certificate: value.certificate.map(Into::into),
        }
    }
}

impl From<VerifiedCertificateDTO> for VerifiedCertificate {
    fn from(value: VerifiedCertificateDTO) -> Self {
        Self {
            holder_name: value.holder_name,
            degree: value.degree,
            credential_type_id: value.credential_type_id.map(Into::into),
            issued_date: value.issued_date.as_deref().and_then(parse_date),
            expiration_date: value.expiration_date,
        }
    }
}

impl From<CredentialTypeDTO> for CredentialType {
    fn from(value: CredentialTypeDTO) -> Self {
        Self {
            id: value.id.into(),
            name: value.name,
            is_permanent: value.is_permanent,
        }
    }
}

impl TryFrom<ValidityOptionDTO> for ValidityOption {
    type Error = RegistryError;

    fn try_from(value: ValidityOptionDTO) -> Result<Self, Self::Error> {
        let period = ValidityPeriod::from_parts(value.period_months, value.period_days)
            .map_err(|e| {
                RegistryError::MappingError(format!("validity option `{}`: {e}", value.id))
            })?;

        Ok(Self {
            id: value.id.into(),
            credential_type_id: value.credential_type_id.into(),
            period,
            note: value.note,
        })
    }
}

impl From<UserDTO> for User {
    fn from(value: UserDTO) -> Self {
        Self {
            id: value.id.into(),
            email: value.email,
            name: value.name,
            address: value.address,
            role: value.role,
            enabled: value.enabled,
        }
    }
}
