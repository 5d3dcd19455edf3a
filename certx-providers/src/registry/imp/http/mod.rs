//! Registry client speaking the registry's JSON API.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use url::Url;

use crate::{
    common_models::{
        certificate::{CertificateId, CertificateStatus, DocHash},
        credential_type::{CredentialType, CredentialTypeId, ValidityOption, ValidityOptionId},
        user::{User, UserId},
    },
    http_client::{HttpClient, Method, RequestBuilder, Response},
    registry::{
        error::RegistryError,
        model::{
            CertificateFilters, CertificatePage, CreateCredentialTypeRequest,
            CreateUserRequest, CreateValidityOptionRequest, ExpirationUpdate,
            IssueCertificateRequest, IssuedCertificate, ReuploadCertificateRequest,
            ReuploadSource, RevokedCertificate, TransferCertificateRequest,
            TransferredCertificate, UpdateCredentialTypeRequest, UpdateUserRequest,
            UpdateValidityOptionRequest, UploadCertificateRequest, UploadedCertificate,
            VerificationRecord, VerificationSource, VerifiedStatus,
        },
        RegistryClient,
    },
    session::Session,
    util::date::format_date,
};

use self::{
    dto::{
        AckDTO, CertificatePageDTO, CreateUserDTO, CreateValidityOptionDTO, CredentialTypeDTO,
        ExpirationUpdateDTO, IssueCertificateRequestDTO, IssuedCertificateDTO,
        RejectRequestDTO, ReuploadRequestDTO, TransferRequestDTO, UpdateCredentialTypeDTO,
        UpdateUserDTO, UpdateValidityOptionDTO, UploadCertificateRequestDTO,
        UploadedCertificateDTO, UserDTO, ValidityOptionDTO, VerificationDTO,
    },
    mapper::{descriptor_to_dto, file_to_dto},
};

pub mod dto;
pub mod mapper;


#[derive(Clone, Debug)]
pub struct Params {
    /// API root, e.g. `https://registry.example.org/api`.
    pub base_url: String,
    /// Public verification page, used when the registry does not return a verify url.
    pub verify_base_url: Option<String>,
}

pub struct HttpRegistryClient {
    client: Arc<dyn HttpClient>,
    base_url: String,
    verify_base_url: Option<String>,
}

impl HttpRegistryClient {
    pub fn new(client: Arc<dyn HttpClient>, params: Params) -> Result<Self, RegistryError> {
        Url::parse(&params.base_url).map_err(|e| {
            RegistryError::MappingError(format!("invalid registry url `{}`: {e}", params.base_url))
        })?;

        Ok(Self {
            client,
            base_url: params.base_url.trim_end_matches('/').to_owned(),
            verify_base_url: params
                .verify_base_url
                .map(|url| url.trim_end_matches('/').to_owned()),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    fn request(&self, session: &Session, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, &self.url(path))
            .bearer_auth(session.token())
    }

    fn certificate_path(id: &CertificateId, action: &str) -> String {
        format!("certificates/{}/{action}", urlencoding::encode(id.as_str()))
    }
}

async fn send(request: RequestBuilder) -> Result<Response, RegistryError> {
    let response = request.send().await?;
    check_status(response)
}

fn check_status(response: Response) -> Result<Response, RegistryError> {
    if response.status.is_success() {
        return Ok(response);
    }

    let message = response.error_message();
    tracing::debug!(status = %response.status, %message, "registry refused request");

    Err(match response.status.0 {
        401 => RegistryError::Unauthorized(message),
        403 => RegistryError::Forbidden(message),
        404 => RegistryError::NotFound(message),
        409 => RegistryError::Conflict(message),
        _ if response.status.is_client_error() => RegistryError::Rejected(message),
        _ => RegistryError::Unavailable(message),
    })
}

fn parse<T: DeserializeOwned>(response: &Response) -> Result<T, RegistryError> {
    Ok(serde_json::from_slice(&response.body)?)
}

/// Accepts an empty body or `{"ok": true}`; `{"ok": false}` is a refusal.
fn acknowledged(response: &Response) -> Result<AckDTO, RegistryError> {
    if response.is_empty() {
        return Ok(AckDTO {
            ok: true,
            message: None,
            status: None,
        });
    }

    let ack: AckDTO = parse(response)?;
    if !ack.ok {
        return Err(RegistryError::Rejected(
            ack.message
                .unwrap_or_else(|| "Request was not accepted".to_owned()),
        ));
    }

    Ok(ack)
}

#[async_trait::async_trait]
impl RegistryClient for HttpRegistryClient {
    async fn upload_certificate(
        &self,
        session: &Session,
        request: UploadCertificateRequest,
    ) -> Result<UploadedCertificate, RegistryError> {
        let (degree, credential_type_id) = descriptor_to_dto(&request.descriptor);
        let body = UploadCertificateRequestDTO {
            file: file_to_dto(&request.file)?,
            holder_name: request.holder_name.trim().to_owned(),
            degree,
            credential_type_id,
            issued_date: request.issued_date.map(format_date),
        };

        let response = send(
            self.request(session, Method::Post, "certificates/upload")
                .json(body)?,
        )
        .await?;
        let uploaded: UploadedCertificateDTO = parse(&response)?;

        Ok(UploadedCertificate {
            id: uploaded.id.into(),
            doc_hash: uploaded.doc_hash.into(),
            status: uploaded.status,
        })
    }

    async fn issue_certificate(
        &self,
        session: &Session,
        request: IssueCertificateRequest,
    ) -> Result<IssuedCertificate, RegistryError> {
        let (degree, credential_type_id) = descriptor_to_dto(&request.descriptor);
        let body = IssueCertificateRequestDTO {
            file: file_to_dto(&request.file)?,
            holder_name: request.holder_name.trim().to_owned(),
            degree,
            credential_type_id,
            issued_date: format_date(request.issued_date),
            expiration_date: request.expiration_date.map(format_date),
            validity_option_id: request.validity_option_id.map(Into::into),
            recipient_user_id: request.recipient_user_id.map(Into::into),
        };

        let response = send(
            self.request(session, Method::Post, "certificates/issue")
                .json(body)?,
        )
        .await?;
        let issued: IssuedCertificateDTO = parse(&response)?;

        // the certificate is issued at this point, a missing link must not fail the call
        let verify_url = issued.verify_url.or_else(|| {
            self.verify_base_url
                .as_ref()
                .map(|base| format!("{base}/{}", urlencoding::encode(&issued.hash)))
        });
        if verify_url.is_none() {
            tracing::warn!(hash = %issued.hash, "registry returned no verify url");
        }

        Ok(IssuedCertificate {
            hash: issued.hash.into(),
            verify_url,
            qr_payload: issued.qr_payload,
        })
    }

    async fn approve_certificate(
        &self,
        session: &Session,
        id: &CertificateId,
        update: ExpirationUpdate,
    ) -> Result<(), RegistryError> {
        let response = send(
            self.request(session, Method::Post, &Self::certificate_path(id, "approve"))
                .json(ExpirationUpdateDTO::from(update))?,
        )
        .await?;

        acknowledged(&response).map(|_| ())
    }

    async fn reject_certificate(
        &self,
        session: &Session,
        id: &CertificateId,
        reason: &str,
        allow_reupload: bool,
    ) -> Result<(), RegistryError> {
        let response = send(
            self.request(session, Method::Post, &Self::certificate_path(id, "reject"))
                .json(RejectRequestDTO {
                    reason,
                    allow_reupload,
                })?,
        )
        .await?;

        acknowledged(&response).map(|_| ())
    }

    async fn reupload_certificate(
        &self,
        session: &Session,
        id: &CertificateId,
        request: ReuploadCertificateRequest,
    ) -> Result<(), RegistryError> {
        let (degree, credential_type_id) = descriptor_to_dto(&request.descriptor);
        let (file, use_original_file) = match &request.source {
            ReuploadSource::NewFile(file) => (Some(file_to_dto(file)?), false),
            ReuploadSource::OriginalFile => (None, true),
        };
        let body = ReuploadRequestDTO {
            file,
            use_original_file,
            note: request.note.trim().to_owned(),
            holder_name: request.holder_name.trim().to_owned(),
            degree,
            credential_type_id,
            issued_date: format_date(request.issued_date),
        };

        let response = send(
            self.request(session, Method::Post, &Self::certificate_path(id, "reupload"))
                .json(body)?,
        )
        .await?;

        acknowledged(&response).map(|_| ())
    }

    async fn revoke_certificate(
        &self,
        session: &Session,
        id: &CertificateId,
    ) -> Result<RevokedCertificate, RegistryError> {
        let response = send(self.request(
            session,
            Method::Post,
            &Self::certificate_path(id, "revoke"),
        ))
        .await?;

        let ack = acknowledged(&response)?;
        Ok(RevokedCertificate {
            status: ack
                .status
                .unwrap_or(CertificateStatus::Revoked),
        })
    }

    async fn update_expiration(
        &self,
        session: &Session,
        id: &CertificateId,
        update: ExpirationUpdate,
    ) -> Result<(), RegistryError> {
        let response = send(
            self.request(session, Method::Put, &Self::certificate_path(id, "expiration"))
                .json(ExpirationUpdateDTO::from(update))?,
        )
        .await?;

        acknowledged(&response).map(|_| ())
    }

    async fn transfer_certificate(
        &self,
        session: &Session,
        id: &CertificateId,
        request: TransferCertificateRequest,
    ) -> Result<TransferredCertificate, RegistryError> {
        let body = TransferRequestDTO {
            new_user_id: request.new_user_id.into(),
            note: request.note.trim().to_owned(),
            display_name_override: request.display_name_override,
        };

        let response = send(
            self.request(session, Method::Post, &Self::certificate_path(id, "transfer"))
                .json(body)?,
        )
        .await?;

        let ack = acknowledged(&response)?;
        Ok(TransferredCertificate {
            message: ack
                .message
                .unwrap_or_else(|| "Certificate transferred".to_owned()),
        })
    }

    async fn verify_by_hash(&self, hash: &DocHash) -> Result<VerificationRecord, RegistryError> {
        let url = self.url(&format!("verify/{}", urlencoding::encode(hash.as_str())));

        match send(self.client.request(Method::Get, &url)).await {
            Ok(response) => Ok(parse::<VerificationDTO>(&response)?.into()),
            Err(RegistryError::NotFound(_)) => Ok(VerificationRecord {
                status: VerifiedStatus::NotFound,
                metadata_uri: None,
                source: VerificationSource::Db,
                certificate: None,
            }),
            Err(error) => Err(error),
        }
    }

    async fn list_certificates(
        &self,
        session: &Session,
        filters: &CertificateFilters,
    ) -> Result<CertificatePage, RegistryError> {
        let response = send(
            self.request(session, Method::Get, "certificates")
                .query(filters)?,
        )
        .await?;

        Ok(parse::<CertificatePageDTO>(&response)?.into())
    }

    async fn list_credential_types(
        &self,
        session: &Session,
    ) -> Result<Vec<CredentialType>, RegistryError> {
        let response = send(self.request(session, Method::Get, "credential-types")).await?;

        Ok(parse::<Vec<CredentialTypeDTO>>(&response)?
            .into_iter()
            .map(Into::into)
            .collect())
    }

    async fn create_credential_type(
        &self,
        session: &Session,
        request: CreateCredentialTypeRequest,
    ) -> Result<CredentialType, RegistryError> {
        let body = CredentialTypeDTO {
            id: request.id.into(),
            name: request.name,
            is_permanent: request.is_permanent,
        };

        let response = send(
            self.request(session, Method::Post, "credential-types")
                .json(body)?,
        )
        .await?;

        Ok(parse::<CredentialTypeDTO>(&response)?.into())
    }

    async fn update_credential_type(
        &self,
        session: &Session,
        id: &CredentialTypeId,
        request: UpdateCredentialTypeRequest,
    ) -> Result<CredentialType, RegistryError> {
        let body = UpdateCredentialTypeDTO {
            name: request.name,
            is_permanent: request.is_permanent,
        };
        let path = format!("credential-types/{}", urlencoding::encode(id.as_str()));

        let response = send(self.request(session, Method::Put, &path).json(body)?).await?;

        Ok(parse::<CredentialTypeDTO>(&response)?.into())
    }

    async fn delete_credential_type(
        &self,
        session: &Session,
        id: &CredentialTypeId,
    ) -> Result<(), RegistryError> {
        let path = format!("credential-types/{}", urlencoding::encode(id.as_str()));
        let response = send(self.request(session, Method::Delete, &path)).await?;

        acknowledged(&response).map(|_| ())
    }

    async fn list_validity_options(
        &self,
        session: &Session,
        credential_type_id: Option<CredentialTypeId>,
    ) -> Result<Vec<ValidityOption>, RegistryError> {
        #[derive(serde::Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Query {
            #[serde(skip_serializing_if = "Option::is_none")]
            credential_type_id: Option<String>,
        }

        let response = send(
            self.request(session, Method::Get, "validity-options")
                .query(Query {
                    credential_type_id: credential_type_id.map(Into::into),
                })?,
        )
        .await?;

        Ok(parse::<Vec<ValidityOptionDTO>>(&response)?
            .into_iter()
            .filter_map(|option| match ValidityOption::try_from(option) {
                Ok(option) => Some(option),
                Err(error) => {
                    tracing::warn!(%error, "skipping invalid validity option");
                    None
                }
            })
            .collect())
    }

    async fn create_validity_option(
        &self,
        session: &Session,
        request: CreateValidityOptionRequest,
    ) -> Result<ValidityOption, RegistryError> {
        let body = CreateValidityOptionDTO {
            credential_type_id: request.credential_type_id.into(),
            period_months: request.period.months(),
            period_days: request.period.days(),
            note: request.note,
        };

        let response = send(
            self.request(session, Method::Post, "validity-options")
                .json(body)?,
        )
        .await?;

        parse::<ValidityOptionDTO>(&response)?.try_into()
    }

    async fn update_validity_option(
        &self,
        session: &Session,
        id: &ValidityOptionId,
        request: UpdateValidityOptionRequest,
    ) -> Result<ValidityOption, RegistryError> {
        let body = UpdateValidityOptionDTO {
            period_months: request.period.map(|period| period.months()),
            period_days: request.period.map(|period| period.days()),
            note: request.note,
        };
        let path = format!("validity-options/{}", urlencoding::encode(id.as_str()));

        let response = send(self.request(session, Method::Put, &path).json(body)?).await?;

        parse::<ValidityOptionDTO>(&response)?.try_into()
    }

    async fn delete_validity_option(
        &self,
        session: &Session,
        id: &ValidityOptionId,
    ) -> Result<(), RegistryError> {
        let path = format!("validity-options/{}", urlencoding::encode(id.as_str()));
        let response = send(self.request(session, Method::Delete, &path)).await?;

        acknowledged(&response).map(|_| ())
    }

    async fn get_user(
        &self,
        session: &Session,
        id: &UserId,
    ) -> Result<Option<User>, RegistryError> {
        let path = format!("users/{}", urlencoding::encode(id.as_str()));

        match send(self.request(session, Method::Get, &path)).await {
            Ok(response) => Ok(Some(parse::<UserDTO>(&response)?.into())),
            Err(RegistryError::NotFound(_)) => Ok(None),
            Err(error) => Err(error),
        }
    }

    async fn create_user(
        &self,
        session: &Session,
        request: CreateUserRequest,
    ) -> Result<User, RegistryError> {
        let body = CreateUserDTO {
            email: request.email,
            name: request.name,
            address: request.address,
            role: request.role,
        };

        let response = send(self.request(session, Method::Post, "users").json(body)?).await?;

        Ok(parse::<UserDTO>(&response)?.into())
    }

    async fn update_user(
        &self,
        session: &Session,
        id: &UserId,
        request: UpdateUserRequest,
    ) -> Result<User, RegistryError> {
        let body = UpdateUserDTO {
            name: request.name,
            address: request.address,
            role: request.role,
            enabled: request.enabled,
        };
        let path = format!("users/{}", urlencoding::encode(id.as_str()));

        let response = send(self.request(session, Method::Put, &path).json(body)?).await?;

        Ok(parse::<UserDTO>(&response)?.into())
    }
}
