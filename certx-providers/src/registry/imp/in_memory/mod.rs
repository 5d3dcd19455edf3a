//! Authoritative registry kept in process memory.
//!
//! Runs every write through [`crate::certificate_state`] with its own clock and its own
//! view of the caller's account, so it refuses the same transitions a real registry
//! would. Used for tests and offline demos.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use time::UtcOffset;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    certificate_state::{
        apply, begin, error::TransitionError, Actor, CertificateEvent, CertificateState,
        CreationEvent, Intake, TransitionContext, Transitioned,
    },
    common_models::{
        certificate::{Certificate, CertificateId, CertificateStatus, DocHash},
        credential_type::{CredentialType, CredentialTypeId, ValidityOption, ValidityOptionId},
        non_blank,
        user::{normalize_address, User, UserId, UserRole},
    },
    registry::{
        error::RegistryError,
        model::{
            CertificateFilters, CertificatePage, CreateCredentialTypeRequest,
            CreateUserRequest, CreateValidityOptionRequest, ExpirationUpdate,
            IssueCertificateRequest, IssuedCertificate, Pagination,
            ReuploadCertificateRequest, ReuploadSource, RevokedCertificate,
            TransferCertificateRequest, TransferredCertificate, UpdateCredentialTypeRequest,
            UpdateUserRequest, UpdateValidityOptionRequest, UploadCertificateRequest,
            UploadedCertificate, VerificationRecord, VerificationSource, VerifiedCertificate,
            VerifiedStatus,
        },
        RegistryClient,
    },
    session::Session,
    util::{
        clock::{system_clock, Clock},
        date::format_date,
    },
    validity::{ExpirationChoice, ResolvedExpiration, ResolvedPeriod},
};

#[cfg(test)]
mod test;

#[derive(Default)]
struct Store {
    /// Insertion order; listings return newest first.
    certificates: Vec<Certificate>,
    users: HashMap<UserId, User>,
    credential_types: Vec<CredentialType>,
    validity_options: Vec<ValidityOption>,
}

impl Store {
    fn certificate_index(&self, id: &CertificateId) -> Result<usize, RegistryError> {
        self.certificates
            .iter()
            .position(|certificate| &certificate.id == id)
            .ok_or_else(|| RegistryError::NotFound(format!("Certificate `{id}` not found")))
    }

    fn period_of(&self, credential_type_id: Option<&CredentialTypeId>) -> ResolvedPeriod {
        let Some(credential_type) = credential_type_id.and_then(|id| {
            self.credential_types
                .iter()
                .find(|credential_type| &credential_type.id == id)
        }) else {
            return ResolvedPeriod::unresolved();
        };

        if credential_type.is_permanent {
            return ResolvedPeriod::permanent();
        }

        ResolvedPeriod {
            is_permanent: false,
            options: self
                .validity_options
                .iter()
                .filter(|option| option.credential_type_id == credential_type.id)
                .cloned()
                .collect(),
        }
    }
}

pub struct InMemoryRegistry {
    store: Arc<Mutex<Store>>,
    clock: Clock,
    verify_base_url: String,
}

impl InMemoryRegistry {
    pub fn new(verify_base_url: impl Into<String>) -> Self {
        Self::with_clock(verify_base_url, system_clock(UtcOffset::UTC))
    }

    pub fn with_clock(verify_base_url: impl Into<String>, clock: Clock) -> Self {
        Self {
            store: Arc::new(Mutex::new(Store::default())),
            clock,
            verify_base_url: verify_base_url.into().trim_end_matches('/').to_owned(),
        }
    }

    pub async fn insert_user(&self, user: User) {
        self.store.lock().await.users.insert(user.id.to_owned(), user);
    }

    pub async fn insert_credential_type(&self, credential_type: CredentialType) {
        self.store.lock().await.credential_types.push(credential_type);
    }

    pub async fn insert_validity_option(&self, option: ValidityOption) {
        self.store.lock().await.validity_options.push(option);
    }

    pub async fn insert_certificate(&self, certificate: Certificate) {
        self.store.lock().await.certificates.push(certificate);
    }

    pub async fn certificate(&self, id: &CertificateId) -> Option<Certificate> {
        self.store
            .lock()
            .await
            .certificates
            .iter()
            .find(|certificate| &certificate.id == id)
            .cloned()
    }

    fn context(&self, store: &Store, session: &Session) -> Result<TransitionContext, RegistryError> {
        Ok(TransitionContext {
            actor: authenticate(store, session)?,
            now: (self.clock)(),
        })
    }

    /// Applies `event` to the certificate and hands the resulting state to `commit` while
    /// the store is still locked.
    async fn transition<T>(
        &self,
        session: &Session,
        id: &CertificateId,
        event: impl FnOnce(&Store, &Certificate) -> CertificateEvent,
        commit: impl FnOnce(&mut Store, usize, CertificateState) -> Result<T, RegistryError>,
    ) -> Result<T, RegistryError> {
        let mut store = self.store.lock().await;
        let context = self.context(&store, session)?;
        let index = store.certificate_index(id)?;

        let certificate = &store.certificates[index];
        let state = CertificateState::try_from(certificate).map_err(transition_error)?;
        let event = event(&store, certificate);

        match apply(&state, event, &context).map_err(transition_error)? {
            Transitioned::Updated(state) => commit(&mut store, index, state),
            Transitioned::Superseded(state) => Err(unexpected_state(&state)),
        }
    }
}

/// The registry trusts its own copy of the account, not the role the client claims.
fn authenticate(store: &Store, session: &Session) -> Result<Actor, RegistryError> {
    if session.token().trim().is_empty() {
        return Err(RegistryError::Unauthorized("Missing token".to_owned()));
    }

    let user = store
        .users
        .get(&session.user.id)
        .ok_or_else(|| RegistryError::Unauthorized("Unknown account".to_owned()))?;

    Ok(Actor {
        id: user.id.to_owned(),
        role: user.role,
        enabled: user.enabled,
    })
}

fn ensure_administrative(actor: &Actor) -> Result<(), RegistryError> {
    if !actor.enabled {
        return Err(RegistryError::Forbidden("Account is disabled".to_owned()));
    }
    if !actor.role.is_administrative() {
        return Err(RegistryError::Forbidden(format!(
            "Role `{}` may not manage this resource",
            actor.role
        )));
    }

    Ok(())
}

fn transition_error(error: TransitionError) -> RegistryError {
    let message = error.to_string();

    match error {
        error if error.is_authorization() => RegistryError::Forbidden(message),
        TransitionError::InvalidState { .. }
        | TransitionError::Expired { .. }
        | TransitionError::PendingResubmission(_)
        | TransitionError::InconsistentRecord(_) => RegistryError::Conflict(message),
        _ => RegistryError::Rejected(message),
    }
}

fn expiration_choice(update: &ExpirationUpdate) -> Option<ExpirationChoice> {
    match (&update.validity_option_id, update.expiration_date) {
        (Some(id), _) => Some(ExpirationChoice::Option(id.to_owned())),
        (None, Some(date)) => Some(ExpirationChoice::Custom(date)),
        (None, None) => None,
    }
}

fn unexpected_state(state: &CertificateState) -> RegistryError {
    RegistryError::Conflict(format!("Unexpected state `{}`", state.status()))
}

fn approved_expiration(state: CertificateState) -> Result<ResolvedExpiration, RegistryError> {
    match state {
        CertificateState::Approved { expiration, .. } => Ok(expiration),
        other => Err(unexpected_state(&other)),
    }
}

fn new_certificate_id() -> CertificateId {
    Uuid::new_v4().to_string().into()
}

fn new_doc_hash() -> DocHash {
    Uuid::new_v4().simple().to_string().into()
}

fn matches_query(certificate: &Certificate, query: &str) -> bool {
    let query = query.to_lowercase();

    [
        Some(certificate.holder_name.as_str()),
        certificate.degree.as_deref(),
        certificate.credential_type_id.as_ref().map(|id| id.as_str()),
        Some(certificate.doc_hash.as_str()),
    ]
    .into_iter()
    .flatten()
    .any(|field| field.to_lowercase().contains(&query))
}

#[async_trait]
impl RegistryClient for InMemoryRegistry {
    async fn upload_certificate(
        &self,
        session: &Session,
        request: UploadCertificateRequest,
    ) -> Result<UploadedCertificate, RegistryError> {
        let mut store = self.store.lock().await;
        let context = self.context(&store, session)?;

        let state = begin(
            CreationEvent::Upload(Intake {
                has_file: !request.file.is_empty(),
                holder_name: request.holder_name.to_owned(),
                descriptor: request.descriptor.to_owned(),
            }),
            &context,
        )
        .map_err(transition_error)?;

        let certificate = Certificate {
            id: new_certificate_id(),
            doc_hash: new_doc_hash(),
            holder_name: request.holder_name.trim().to_owned(),
            degree: non_blank(request.descriptor.degree.as_deref()).map(str::to_owned),
            credential_type_id: request.descriptor.credential_type_id().cloned(),
            holder_id: (context.actor.role == UserRole::User).then(|| context.actor.id.to_owned()),
            uploader_id: Some(context.actor.id.to_owned()),
            issued_date: request.issued_date.unwrap_or(context.now.date()),
            certx_issued_date: Some(context.now),
            expiration_date: None,
            revoked_at: None,
            status: state.status(),
            rejection_reason: None,
            allow_reupload: false,
            reupload_note: None,
            reuploaded_from: None,
            validity_option_id: None,
        };

        let uploaded = UploadedCertificate {
            id: certificate.id.to_owned(),
            doc_hash: certificate.doc_hash.to_owned(),
            status: certificate.status,
        };
        store.certificates.push(certificate);

        Ok(uploaded)
    }

    async fn issue_certificate(
        &self,
        session: &Session,
        request: IssueCertificateRequest,
    ) -> Result<IssuedCertificate, RegistryError> {
        let mut store = self.store.lock().await;
        let context = self.context(&store, session)?;

        if let Some(recipient) = &request.recipient_user_id {
            if !store.users.contains_key(recipient) {
                return Err(RegistryError::NotFound(format!("User `{recipient}` not found")));
            }
        }

        let choice = expiration_choice(&ExpirationUpdate {
            issued_date: request.issued_date,
            expiration_date: request.expiration_date,
            validity_option_id: request.validity_option_id.to_owned(),
        });
        let state = begin(
            CreationEvent::Issue {
                intake: Intake {
                    has_file: !request.file.is_empty(),
                    holder_name: request.holder_name.to_owned(),
                    descriptor: request.descriptor.to_owned(),
                },
                issued_date: Some(request.issued_date),
                period: store.period_of(request.descriptor.credential_type_id()),
                choice,
            },
            &context,
        )
        .map_err(transition_error)?;
        let expiration = approved_expiration(state)?;

        let certificate = Certificate {
            id: new_certificate_id(),
            doc_hash: new_doc_hash(),
            holder_name: request.holder_name.trim().to_owned(),
            degree: non_blank(request.descriptor.degree.as_deref()).map(str::to_owned),
            credential_type_id: request.descriptor.credential_type_id().cloned(),
            holder_id: request.recipient_user_id,
            uploader_id: Some(context.actor.id.to_owned()),
            issued_date: request.issued_date,
            certx_issued_date: Some(context.now),
            expiration_date: expiration.expiration_date,
            revoked_at: None,
            status: CertificateStatus::Valid,
            rejection_reason: None,
            allow_reupload: false,
            reupload_note: None,
            reuploaded_from: None,
            validity_option_id: expiration.validity_option_id,
        };

        let issued = IssuedCertificate {
            verify_url: Some(format!("{}/{}", self.verify_base_url, certificate.doc_hash)),
            hash: certificate.doc_hash.to_owned(),
            qr_payload: None,
        };
        store.certificates.push(certificate);

        Ok(issued)
    }

    async fn approve_certificate(
        &self,
        session: &Session,
        id: &CertificateId,
        update: ExpirationUpdate,
    ) -> Result<(), RegistryError> {
        let issued_date = update.issued_date;

        self.transition(
            session,
            id,
            |store, certificate| CertificateEvent::Approve {
                issued_date: Some(issued_date),
                period: store.period_of(certificate.credential_type_id.as_ref()),
                choice: expiration_choice(&update),
            },
            |store, index, state| {
                let expiration = approved_expiration(state)?;
                let certificate = &mut store.certificates[index];
                certificate.status = CertificateStatus::Valid;
                certificate.issued_date = issued_date;
                certificate.expiration_date = expiration.expiration_date;
                certificate.validity_option_id = expiration.validity_option_id;
                certificate.rejection_reason = None;

                Ok(())
            },
        )
        .await
    }

    async fn reject_certificate(
        &self,
        session: &Session,
        id: &CertificateId,
        reason: &str,
        allow_reupload: bool,
    ) -> Result<(), RegistryError> {
        self.transition(
            session,
            id,
            |_, _| CertificateEvent::Reject {
                reason: reason.to_owned(),
                allow_reupload,
            },
            |store, index, state| {
                let (reason, allow_reupload) = match state {
                    CertificateState::Rejected {
                        reason,
                        allow_reupload,
                    } => (reason, allow_reupload),
                    other => return Err(unexpected_state(&other)),
                };

                let certificate = &mut store.certificates[index];
                certificate.status = CertificateStatus::Rejected;
                certificate.rejection_reason = Some(reason);
                certificate.allow_reupload = allow_reupload;

                Ok(())
            },
        )
        .await
    }

    async fn reupload_certificate(
        &self,
        session: &Session,
        id: &CertificateId,
        request: ReuploadCertificateRequest,
    ) -> Result<(), RegistryError> {
        let has_source = match &request.source {
            ReuploadSource::NewFile(file) => !file.is_empty(),
            ReuploadSource::OriginalFile => true,
        };

        let mut store = self.store.lock().await;
        let context = self.context(&store, session)?;
        let rejected = store.certificates[store.certificate_index(id)?].to_owned();
        let state = CertificateState::try_from(&rejected).map_err(transition_error)?;

        let event = CertificateEvent::Reupload {
            certificate_id: id.to_owned(),
            uploader: rejected.uploader_id.to_owned(),
            has_source,
            note: request.note.to_owned(),
            pending_resubmission: store
                .certificates
                .iter()
                .any(|certificate| certificate.is_pending_resubmission_of(id)),
        };
        let state = match apply(&state, event, &context).map_err(transition_error)? {
            Transitioned::Superseded(state) => state,
            Transitioned::Updated(state) => return Err(unexpected_state(&state)),
        };

        store.certificates.push(Certificate {
            id: new_certificate_id(),
            doc_hash: new_doc_hash(),
            holder_name: request.holder_name.trim().to_owned(),
            degree: non_blank(request.descriptor.degree.as_deref()).map(str::to_owned),
            credential_type_id: request.descriptor.credential_type_id().cloned(),
            holder_id: rejected.holder_id,
            uploader_id: Some(context.actor.id),
            issued_date: request.issued_date,
            certx_issued_date: Some(context.now),
            expiration_date: None,
            revoked_at: None,
            status: state.status(),
            rejection_reason: None,
            allow_reupload: false,
            reupload_note: Some(request.note.trim().to_owned()),
            reuploaded_from: Some(id.to_owned()),
            validity_option_id: None,
        });

        Ok(())
    }

    async fn revoke_certificate(
        &self,
        session: &Session,
        id: &CertificateId,
    ) -> Result<RevokedCertificate, RegistryError> {
        let at = (self.clock)();

        self.transition(
            session,
            id,
            |_, _| CertificateEvent::Revoke { at },
            |store, index, state| {
                let certificate = &mut store.certificates[index];
                certificate.status = state.status();
                certificate.revoked_at = Some(at);

                Ok(RevokedCertificate {
                    status: certificate.status,
                })
            },
        )
        .await
    }

    async fn update_expiration(
        &self,
        session: &Session,
        id: &CertificateId,
        update: ExpirationUpdate,
    ) -> Result<(), RegistryError> {
        let issued_date = update.issued_date;

        self.transition(
            session,
            id,
            |store, certificate| CertificateEvent::UpdateExpiration {
                issued_date: Some(issued_date),
                period: store.period_of(certificate.credential_type_id.as_ref()),
                choice: expiration_choice(&update),
            },
            |store, index, state| {
                let expiration = approved_expiration(state)?;
                let certificate = &mut store.certificates[index];
                certificate.issued_date = issued_date;
                certificate.expiration_date = expiration.expiration_date;
                certificate.validity_option_id = expiration.validity_option_id;

                Ok(())
            },
        )
        .await
    }

    async fn transfer_certificate(
        &self,
        session: &Session,
        id: &CertificateId,
        request: TransferCertificateRequest,
    ) -> Result<TransferredCertificate, RegistryError> {
        self.transition(
            session,
            id,
            |_, _| CertificateEvent::Transfer {
                new_holder: Some(request.new_user_id.to_owned()),
                note: request.note.to_owned(),
            },
            |store, index, _| {
                let new_holder = store.users.get(&request.new_user_id).cloned().ok_or_else(|| {
                    RegistryError::NotFound(format!("User `{}` not found", request.new_user_id))
                })?;

                let certificate = &mut store.certificates[index];
                certificate.holder_name = non_blank(request.display_name_override.as_deref())
                    .map(str::to_owned)
                    .unwrap_or(new_holder.name);
                certificate.holder_id = Some(new_holder.id);

                Ok(TransferredCertificate {
                    message: format!("Certificate `{id}` transferred"),
                })
            },
        )
        .await
    }

    async fn verify_by_hash(&self, hash: &DocHash) -> Result<VerificationRecord, RegistryError> {
        let store = self.store.lock().await;

        let found = store.certificates.iter().find_map(|certificate| {
            if &certificate.doc_hash != hash {
                return None;
            }
            let status = match certificate.status {
                CertificateStatus::Valid => VerifiedStatus::Valid,
                CertificateStatus::Revoked => VerifiedStatus::Revoked,
                CertificateStatus::Pending | CertificateStatus::Rejected => return None,
            };

            Some((status, certificate))
        });

        Ok(match found {
            Some((status, certificate)) => VerificationRecord {
                status,
                metadata_uri: None,
                source: VerificationSource::Db,
                certificate: Some(VerifiedCertificate {
                    holder_name: certificate.holder_name.to_owned(),
                    degree: certificate.degree.to_owned(),
                    credential_type_id: certificate.credential_type_id.to_owned(),
                    issued_date: Some(certificate.issued_date),
                    expiration_date: certificate.expiration_date.map(format_date),
                }),
            },
            None => VerificationRecord {
                status: VerifiedStatus::NotFound,
                metadata_uri: None,
                source: VerificationSource::Db,
                certificate: None,
            },
        })
    }

    async fn list_certificates(
        &self,
        session: &Session,
        filters: &CertificateFilters,
    ) -> Result<CertificatePage, RegistryError> {
        let store = self.store.lock().await;
        let actor = authenticate(&store, session)?;

        let matching: Vec<&Certificate> = store
            .certificates
            .iter()
            .rev()
            .filter(|certificate| {
                actor.role.is_administrative()
                    || certificate.holder_id.as_ref() == Some(&actor.id)
                    || certificate.uploader_id.as_ref() == Some(&actor.id)
            })
            .filter(|certificate| filters.status.map_or(true, |status| certificate.status == status))
            .filter(|certificate| {
                non_blank(filters.q.as_deref()).map_or(true, |q| matches_query(certificate, q))
            })
            .collect();

        let limit = filters.limit.max(1);
        let page = filters.page.max(1);
        let total = matching.len() as u64;
        let offset = (page as usize - 1).saturating_mul(limit as usize);

        Ok(CertificatePage {
            items: matching
                .into_iter()
                .skip(offset)
                .take(limit as usize)
                .cloned()
                .collect(),
            pagination: Pagination {
                page,
                limit,
                total,
                total_pages: u32::try_from(total.div_ceil(u64::from(limit))).unwrap_or(u32::MAX),
            },
        })
    }

    async fn list_credential_types(
        &self,
        session: &Session,
    ) -> Result<Vec<CredentialType>, RegistryError> {
        let store = self.store.lock().await;
        authenticate(&store, session)?;

        Ok(store.credential_types.to_owned())
    }

    async fn create_credential_type(
        &self,
        session: &Session,
        request: CreateCredentialTypeRequest,
    ) -> Result<CredentialType, RegistryError> {
        let mut store = self.store.lock().await;
        ensure_administrative(&authenticate(&store, session)?)?;

        let id = non_blank(Some(request.id.as_str()))
            .ok_or_else(|| RegistryError::Rejected("Credential type id is required".to_owned()))?;
        let name = non_blank(Some(request.name.as_str()))
            .ok_or_else(|| RegistryError::Rejected("Credential type name is required".to_owned()))?;

        let id = CredentialTypeId::from(id);
        if store.credential_types.iter().any(|existing| existing.id == id) {
            return Err(RegistryError::Conflict(format!(
                "Credential type `{id}` already exists"
            )));
        }

        let credential_type = CredentialType {
            id,
            name: name.to_owned(),
            is_permanent: request.is_permanent,
        };
        store.credential_types.push(credential_type.to_owned());

        Ok(credential_type)
    }

    async fn update_credential_type(
        &self,
        session: &Session,
        id: &CredentialTypeId,
        request: UpdateCredentialTypeRequest,
    ) -> Result<CredentialType, RegistryError> {
        let mut store = self.store.lock().await;
        ensure_administrative(&authenticate(&store, session)?)?;

        let credential_type = store
            .credential_types
            .iter_mut()
            .find(|credential_type| &credential_type.id == id)
            .ok_or_else(|| RegistryError::NotFound(format!("Credential type `{id}` not found")))?;

        if let Some(name) = request.name {
            credential_type.name = non_blank(Some(name.as_str()))
                .ok_or_else(|| {
                    RegistryError::Rejected("Credential type name is required".to_owned())
                })?
                .to_owned();
        }
        if let Some(is_permanent) = request.is_permanent {
            credential_type.is_permanent = is_permanent;
        }

        Ok(credential_type.to_owned())
    }

    async fn delete_credential_type(
        &self,
        session: &Session,
        id: &CredentialTypeId,
    ) -> Result<(), RegistryError> {
        let mut store = self.store.lock().await;
        ensure_administrative(&authenticate(&store, session)?)?;

        let before = store.credential_types.len();
        store.credential_types.retain(|credential_type| &credential_type.id != id);
        if store.credential_types.len() == before {
            return Err(RegistryError::NotFound(format!(
                "Credential type `{id}` not found"
            )));
        }
        store
            .validity_options
            .retain(|option| &option.credential_type_id != id);

        Ok(())
    }

    async fn list_validity_options(
        &self,
        session: &Session,
        credential_type_id: Option<CredentialTypeId>,
    ) -> Result<Vec<ValidityOption>, RegistryError> {
        let store = self.store.lock().await;
        authenticate(&store, session)?;

        Ok(store
            .validity_options
            .iter()
            .filter(|option| {
                credential_type_id
                    .as_ref()
                    .map_or(true, |id| &option.credential_type_id == id)
            })
            .cloned()
            .collect())
    }

    async fn create_validity_option(
        &self,
        session: &Session,
        request: CreateValidityOptionRequest,
    ) -> Result<ValidityOption, RegistryError> {
        let mut store = self.store.lock().await;
        ensure_administrative(&authenticate(&store, session)?)?;

        let credential_type = store
            .credential_types
            .iter()
            .find(|credential_type| credential_type.id == request.credential_type_id)
            .ok_or_else(|| {
                RegistryError::NotFound(format!(
                    "Credential type `{}` not found",
                    request.credential_type_id
                ))
            })?;
        if credential_type.is_permanent {
            return Err(RegistryError::Rejected(format!(
                "Credential type `{}` is permanent",
                credential_type.id
            )));
        }

        let option = ValidityOption {
            id: Uuid::new_v4().to_string().into(),
            credential_type_id: request.credential_type_id,
            period: request.period,
            note: request.note,
        };
        store.validity_options.push(option.to_owned());

        Ok(option)
    }

    async fn update_validity_option(
        &self,
        session: &Session,
        id: &ValidityOptionId,
        request: UpdateValidityOptionRequest,
    ) -> Result<ValidityOption, RegistryError> {
        let mut store = self.store.lock().await;
        ensure_administrative(&authenticate(&store, session)?)?;

        let option = store
            .validity_options
            .iter_mut()
            .find(|option| &option.id == id)
            .ok_or_else(|| RegistryError::NotFound(format!("Validity option `{id}` not found")))?;

        if let Some(period) = request.period {
            option.period = period;
        }
        if let Some(note) = request.note {
            option.note = note;
        }

        Ok(option.to_owned())
    }

    async fn delete_validity_option(
        &self,
        session: &Session,
        id: &ValidityOptionId,
    ) -> Result<(), RegistryError> {
        let mut store = self.store.lock().await;
        ensure_administrative(&authenticate(&store, session)?)?;

        let before = store.validity_options.len();
        store.validity_options.retain(|option| &option.id != id);
        if store.validity_options.len() == before {
            return Err(RegistryError::NotFound(format!(
                "Validity option `{id}` not found"
            )));
        }

        Ok(())
    }

    async fn get_user(
        &self,
        session: &Session,
        id: &UserId,
    ) -> Result<Option<User>, RegistryError> {
        let store = self.store.lock().await;
        let actor = authenticate(&store, session)?;

        if &actor.id != id {
            ensure_administrative(&actor)?;
        }

        Ok(store.users.get(id).cloned())
    }

    async fn create_user(
        &self,
        session: &Session,
        request: CreateUserRequest,
    ) -> Result<User, RegistryError> {
        let mut store = self.store.lock().await;
        let actor = authenticate(&store, session)?;
        ensure_administrative(&actor)?;
        if request.role.is_administrative() && actor.role != UserRole::SuperAdmin {
            return Err(RegistryError::Forbidden(
                "Only a super admin may create administrators".to_owned(),
            ));
        }

        let email = non_blank(Some(request.email.as_str()))
            .ok_or_else(|| RegistryError::Rejected("Email is required".to_owned()))?;
        if store
            .users
            .values()
            .any(|user| user.email.eq_ignore_ascii_case(email))
        {
            return Err(RegistryError::Conflict(format!("User `{email}` already exists")));
        }

        let user = User {
            id: Uuid::new_v4().to_string().into(),
            email: email.to_owned(),
            name: request.name.trim().to_owned(),
            address: normalize_address(request.role, request.address.as_deref())
                .map_err(|e| RegistryError::Rejected(e.to_string()))?,
            role: request.role,
            enabled: true,
        };
        store.users.insert(user.id.to_owned(), user.to_owned());

        Ok(user)
    }

    async fn update_user(
        &self,
        session: &Session,
        id: &UserId,
        request: UpdateUserRequest,
    ) -> Result<User, RegistryError> {
        let mut store = self.store.lock().await;
        let actor = authenticate(&store, session)?;
        ensure_administrative(&actor)?;
        if request.role.is_some_and(|role| role.is_administrative())
            && actor.role != UserRole::SuperAdmin
        {
            return Err(RegistryError::Forbidden(
                "Only a super admin may grant administrative roles".to_owned(),
            ));
        }

        let user = store
            .users
            .get_mut(id)
            .ok_or_else(|| RegistryError::NotFound(format!("User `{id}` not found")))?;

        let role = request.role.unwrap_or(user.role);
        let address = match request.address {
            Some(address) => address,
            None => user.address.to_owned(),
        };
        let address = normalize_address(role, address.as_deref())
            .map_err(|e| RegistryError::Rejected(e.to_string()))?;

        if let Some(name) = request.name {
            user.name = name.trim().to_owned();
        }
        if let Some(enabled) = request.enabled {
            user.enabled = enabled;
        }
        user.role = role;
        user.address = address;

        Ok(user.to_owned())
    }
}
