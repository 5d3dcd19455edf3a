//! Certificate transitions end to end.
//!
//! Each operation takes the certificate as the caller last saw it (usually from
//! [`CertificateListView`]) and checks the transition against it locally before the
//! registry gets to decide.

use std::sync::Arc;

use certx_providers::{
    certificate_state::{
        apply, begin, error::TransitionError, permission, CertificateEvent, CertificateState,
        CreationEvent, Intake, TransitionContext, TransitionKind,
    },
    common_models::{
        certificate::{Certificate, CertificateFile, CredentialDescriptor},
        non_blank,
    },
    registry::{
        error::RegistryError,
        model::{
            ExpirationUpdate, IssueCertificateRequest, IssuedCertificate,
            ReuploadCertificateRequest, ReuploadSource, RevokedCertificate,
            TransferCertificateRequest, TransferredCertificate, UploadCertificateRequest,
            UploadedCertificate,
        },
        RegistryClient,
    },
    session::Session,
    util::clock::Clock,
    validity::policy::ValidityPolicy,
};
use serde_json::json;

use crate::{
    model::{
        ExpirationInput, IssueCertificateInput, RejectCertificateInput,
        ReuploadCertificateInput, TransferCertificateInput, UploadCertificateInput,
    },
    service::{certificate_list::CertificateListView, error::ServiceError, Auditor},
};

#[cfg(test)]
mod test;

pub struct CertificateService {
    registry: Arc<dyn RegistryClient>,
    policy: Arc<ValidityPolicy>,
    list: Arc<CertificateListView>,
    auditor: Auditor,
    clock: Clock,
}

impl CertificateService {
    pub(crate) fn new(
        registry: Arc<dyn RegistryClient>,
        policy: Arc<ValidityPolicy>,
        list: Arc<CertificateListView>,
        auditor: Auditor,
        clock: Clock,
    ) -> Self {
        Self {
            registry,
            policy,
            list,
            auditor,
            clock,
        }
    }

    /// Transitions worth offering to the signed-in user at all.
    pub fn permitted_transitions(&self, session: &Session) -> Vec<TransitionKind> {
        if !session.user.enabled {
            return vec![];
        }

        permission::permitted_transitions(session.user.role)
    }

    pub async fn upload(
        &self,
        session: &Session,
        input: UploadCertificateInput,
    ) -> Result<UploadedCertificate, ServiceError> {
        let details = json!({ "holderName": input.holder_name.trim() });
        let result = self.upload_inner(session, input).await;

        self.finish(session, TransitionKind::Upload, "certificate".to_owned(), details, result)
            .await
    }

    /// Direct issuance: the certificate is `VALID` straight away.
    pub async fn issue(
        &self,
        session: &Session,
        input: IssueCertificateInput,
    ) -> Result<IssuedCertificate, ServiceError> {
        let details = json!({
            "holderName": input.holder_name.trim(),
            "recipientUserId": input.recipient_user_id,
        });
        let result = self.issue_inner(session, input).await;

        self.finish(session, TransitionKind::Issue, "certificate".to_owned(), details, result)
            .await
    }

    pub async fn approve(
        &self,
        session: &Session,
        certificate: &Certificate,
        input: ExpirationInput,
    ) -> Result<(), ServiceError> {
        let result = self
            .expiration_inner(session, certificate, TransitionKind::Approve, input)
            .await;

        self.finish(
            session,
            TransitionKind::Approve,
            resource(certificate),
            serde_json::Value::Null,
            result,
        )
        .await
    }

    pub async fn reject(
        &self,
        session: &Session,
        certificate: &Certificate,
        input: RejectCertificateInput,
    ) -> Result<(), ServiceError> {
        let details = json!({ "allowReupload": input.allow_reupload });
        let result = self.reject_inner(session, certificate, input).await;

        self.finish(
            session,
            TransitionKind::Reject,
            resource(certificate),
            details,
            result,
        )
        .await
    }

    /// Resubmits a rejected certificate as a new `PENDING` record linked back to it. The
    /// rejected record is left untouched.
    pub async fn reupload(
        &self,
        session: &Session,
        certificate: &Certificate,
        input: ReuploadCertificateInput,
    ) -> Result<(), ServiceError> {
        let details = json!({ "useOriginalFile": input.use_original_file });
        let result = self.reupload_inner(session, certificate, input).await;

        self.finish(
            session,
            TransitionKind::Reupload,
            resource(certificate),
            details,
            result,
        )
        .await
    }

    pub async fn revoke(
        &self,
        session: &Session,
        certificate: &Certificate,
    ) -> Result<RevokedCertificate, ServiceError> {
        let result = self.revoke_inner(session, certificate).await;

        self.finish(
            session,
            TransitionKind::Revoke,
            resource(certificate),
            serde_json::Value::Null,
            result,
        )
        .await
    }

    pub async fn update_expiration(
        &self,
        session: &Session,
        certificate: &Certificate,
        input: ExpirationInput,
    ) -> Result<(), ServiceError> {
        let details = json!({
            "previousIssuedDate": certificate.issued_date.to_string(),
            "previousExpirationDate": certificate.expiration_date.map(|date| date.to_string()),
        });
        let result = self
            .expiration_inner(session, certificate, TransitionKind::UpdateExpiration, input)
            .await;

        self.finish(
            session,
            TransitionKind::UpdateExpiration,
            resource(certificate),
            details,
            result,
        )
        .await
    }

    /// Reassigns the certificate to another user. The previous holder is kept in the
    /// audit trail only.
    pub async fn transfer(
        &self,
        session: &Session,
        certificate: &Certificate,
        input: TransferCertificateInput,
    ) -> Result<TransferredCertificate, ServiceError> {
        let details = json!({
            "previousHolderId": certificate.holder_id,
            "previousHolderName": certificate.holder_name,
            "newUserId": input.new_user_id,
        });
        let result = self.transfer_inner(session, certificate, input).await;

        self.finish(
            session,
            TransitionKind::Transfer,
            resource(certificate),
            details,
            result,
        )
        .await
    }

    fn context(&self, session: &Session) -> TransitionContext {
        TransitionContext {
            actor: session.actor(),
            now: (self.clock)(),
        }
    }

    async fn finish<T>(
        &self,
        session: &Session,
        transition: TransitionKind,
        resource: String,
        details: serde_json::Value,
        result: Result<T, ServiceError>,
    ) -> Result<T, ServiceError> {
        self.auditor
            .record(session, transition.into(), resource.to_owned(), details, &result)
            .await;

        match &result {
            Ok(_) => {
                tracing::info!(%transition, %resource, "certificate transition succeeded");
                self.refresh(session).await;
            }
            Err(error) => {
                tracing::debug!(
                    %transition,
                    %resource,
                    %error,
                    kind = %error.kind(),
                    "certificate transition failed"
                );
                if error.requires_refresh() {
                    self.refresh(session).await;
                }
            }
        }

        result
    }

    async fn refresh(&self, session: &Session) {
        if let Err(error) = self.list.reload(session).await {
            tracing::warn!(%error, "failed to refresh certificate list");
        }
    }

    async fn upload_inner(
        &self,
        session: &Session,
        input: UploadCertificateInput,
    ) -> Result<UploadedCertificate, ServiceError> {
        let context = self.context(session);

        let intake = intake(input.file.as_ref(), &input.holder_name, &input.descriptor);
        begin(CreationEvent::Upload(intake), &context)?;
        let file = required_file(input.file)?;

        Ok(self
            .registry
            .upload_certificate(
                session,
                UploadCertificateRequest {
                    file,
                    holder_name: input.holder_name,
                    descriptor: input.descriptor,
                    issued_date: Some(input.issued_date.unwrap_or(context.now.date())),
                },
            )
            .await?)
    }

    async fn issue_inner(
        &self,
        session: &Session,
        input: IssueCertificateInput,
    ) -> Result<IssuedCertificate, ServiceError> {
        let context = self.context(session);
        let period = self
            .policy
            .resolve_period(session, input.descriptor.credential_type_id())
            .await;

        let state = begin(
            CreationEvent::Issue {
                intake: intake(input.file.as_ref(), &input.holder_name, &input.descriptor),
                issued_date: input.issued_date,
                period,
                choice: input.expiration,
            },
            &context,
        )?;
        let update = expiration_update(&state)?;
        let file = required_file(input.file)?;

        Ok(self
            .registry
            .issue_certificate(
                session,
                IssueCertificateRequest {
                    file,
                    holder_name: input.holder_name,
                    descriptor: input.descriptor,
                    issued_date: update.issued_date,
                    expiration_date: update.expiration_date,
                    validity_option_id: update.validity_option_id,
                    recipient_user_id: input.recipient_user_id,
                },
            )
            .await?)
    }

    /// Approval and expiration updates resolve the expiration the same way.
    async fn expiration_inner(
        &self,
        session: &Session,
        certificate: &Certificate,
        transition: TransitionKind,
        input: ExpirationInput,
    ) -> Result<(), ServiceError> {
        let context = self.context(session);
        let state = CertificateState::try_from(certificate)?;
        let period = self
            .policy
            .resolve_period(session, certificate.credential_type_id.as_ref())
            .await;

        let event = match transition {
            TransitionKind::Approve => CertificateEvent::Approve {
                issued_date: input.issued_date,
                period,
                choice: input.expiration,
            },
            _ => CertificateEvent::UpdateExpiration {
                issued_date: input.issued_date,
                period,
                choice: input.expiration,
            },
        };
        let update = expiration_update(apply(&state, event, &context)?.state())?;

        match transition {
            TransitionKind::Approve => {
                self.registry
                    .approve_certificate(session, &certificate.id, update)
                    .await?
            }
            _ => {
                self.registry
                    .update_expiration(session, &certificate.id, update)
                    .await?
            }
        }

        Ok(())
    }

    async fn reject_inner(
        &self,
        session: &Session,
        certificate: &Certificate,
        input: RejectCertificateInput,
    ) -> Result<(), ServiceError> {
        let state = CertificateState::try_from(certificate)?;
        apply(
            &state,
            CertificateEvent::Reject {
                reason: input.reason.to_owned(),
                allow_reupload: input.allow_reupload,
            },
            &self.context(session),
        )?;

        self.registry
            .reject_certificate(
                session,
                &certificate.id,
                input.reason.trim(),
                input.allow_reupload,
            )
            .await?;

        Ok(())
    }

    async fn reupload_inner(
        &self,
        session: &Session,
        certificate: &Certificate,
        input: ReuploadCertificateInput,
    ) -> Result<(), ServiceError> {
        let context = self.context(session);
        let state = CertificateState::try_from(certificate)?;

        let ambiguous_source = input.file.is_some() && input.use_original_file;
        let source = match input.file {
            Some(file) if !file.is_empty() => Some(ReuploadSource::NewFile(file)),
            Some(_) => None,
            None => input.use_original_file.then_some(ReuploadSource::OriginalFile),
        };

        apply(
            &state,
            CertificateEvent::Reupload {
                certificate_id: certificate.id.to_owned(),
                uploader: certificate.uploader_id.to_owned(),
                has_source: source.is_some(),
                note: input.note.to_owned(),
                pending_resubmission: self.list.has_pending_resubmission(&certificate.id).await,
            },
            &context,
        )?;
        if ambiguous_source {
            return Err(ServiceError::Validation(
                "Choose either a new file or the original file, not both".to_owned(),
            ));
        }
        let source = source.ok_or(TransitionError::MissingReuploadSource)?;
        non_blank(Some(input.holder_name.as_str()))
            .ok_or(TransitionError::MissingField("holderName"))?;
        if !input.descriptor.is_present() {
            return Err(TransitionError::MissingField("degree or credentialTypeId").into());
        }

        let issued_date = match source {
            ReuploadSource::OriginalFile => context.now.date(),
            ReuploadSource::NewFile(_) => input.issued_date.unwrap_or(context.now.date()),
        };

        self.registry
            .reupload_certificate(
                session,
                &certificate.id,
                ReuploadCertificateRequest {
                    source,
                    note: input.note,
                    holder_name: input.holder_name,
                    descriptor: input.descriptor,
                    issued_date,
                },
            )
            .await?;

        Ok(())
    }

    async fn revoke_inner(
        &self,
        session: &Session,
        certificate: &Certificate,
    ) -> Result<RevokedCertificate, ServiceError> {
        let context = self.context(session);
        let state = CertificateState::try_from(certificate)?;
        apply(
            &state,
            CertificateEvent::Revoke { at: context.now },
            &context,
        )?;

        Ok(self
            .registry
            .revoke_certificate(session, &certificate.id)
            .await?)
    }

    async fn transfer_inner(
        &self,
        session: &Session,
        certificate: &Certificate,
        input: TransferCertificateInput,
    ) -> Result<TransferredCertificate, ServiceError> {
        let state = CertificateState::try_from(certificate)?;
        apply(
            &state,
            CertificateEvent::Transfer {
                new_holder: input.new_user_id.to_owned(),
                note: input.note.to_owned(),
            },
            &self.context(session),
        )?;
        let new_user_id = input
            .new_user_id
            .ok_or(TransitionError::MissingField("newUserId"))?;

        let target = self
            .registry
            .get_user(session, &new_user_id)
            .await?
            .ok_or_else(|| RegistryError::NotFound(format!("User `{new_user_id}` not found")))?;
        if !target.enabled {
            return Err(ServiceError::Validation(format!(
                "User `{}` is disabled",
                target.id
            )));
        }

        Ok(self
            .registry
            .transfer_certificate(
                session,
                &certificate.id,
                TransferCertificateRequest {
                    new_user_id: target.id,
                    note: input.note.trim().to_owned(),
                    display_name_override: non_blank(input.display_name_override.as_deref())
                        .map(str::to_owned),
                },
            )
            .await?)
    }
}

fn resource(certificate: &Certificate) -> String {
    format!("certificate/{}", certificate.id)
}

fn intake(
    file: Option<&CertificateFile>,
    holder_name: &str,
    descriptor: &CredentialDescriptor,
) -> Intake {
    Intake {
        has_file: file.is_some_and(|file| !file.is_empty()),
        holder_name: holder_name.to_owned(),
        descriptor: descriptor.to_owned(),
    }
}

fn required_file(file: Option<CertificateFile>) -> Result<CertificateFile, ServiceError> {
    Ok(file
        .filter(|file| !file.is_empty())
        .ok_or(TransitionError::MissingField("file"))?)
}

fn expiration_update(state: &CertificateState) -> Result<ExpirationUpdate, ServiceError> {
    match state {
        CertificateState::Approved {
            issued_date,
            expiration,
        } => Ok(ExpirationUpdate {
            issued_date: *issued_date,
            expiration_date: expiration.expiration_date,
            validity_option_id: expiration.validity_option_id.to_owned(),
        }),
        other => Err(TransitionError::InconsistentRecord(format!(
            "expected an approved state, got `{}`",
            other.status()
        ))
        .into()),
    }
}
