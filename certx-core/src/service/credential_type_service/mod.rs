//! Catalogue of credential types and their validity options.

use std::sync::Arc;

use certx_providers::{
    common_models::{
        audit::AuditAction,
        credential_type::{
            CredentialType, CredentialTypeId, ValidityOption, ValidityOptionId, ValidityPeriod,
        },
        non_blank,
    },
    registry::{
        model::{
            CreateCredentialTypeRequest, CreateValidityOptionRequest,
            UpdateCredentialTypeRequest, UpdateValidityOptionRequest,
        },
        RegistryClient,
    },
    session::Session,
    validity::{policy::ValidityPolicy, ResolvedPeriod},
};
use serde_json::json;

use crate::{
    model::{CreateValidityOptionInput, UpdateValidityOptionInput},
    service::{ensure_administrator, error::ServiceError, Auditor},
};


pub struct CredentialTypeService {
    registry: Arc<dyn RegistryClient>,
    policy: Arc<ValidityPolicy>,
    auditor: Auditor,
}

impl CredentialTypeService {
    pub(crate) fn new(
        registry: Arc<dyn RegistryClient>,
        policy: Arc<ValidityPolicy>,
        auditor: Auditor,
    ) -> Self {
        Self {
            registry,
            policy,
            auditor,
        }
    }

    pub async fn list_credential_types(
        &self,
        session: &Session,
    ) -> Result<Vec<CredentialType>, ServiceError> {
        Ok(self.registry.list_credential_types(session).await?)
    }

    /// The id is chosen here and never changes afterwards.
    pub async fn create_credential_type(
        &self,
        session: &Session,
        request: CreateCredentialTypeRequest,
    ) -> Result<CredentialType, ServiceError> {
        let details = json!({
            "name": request.name.trim(),
            "isPermanent": request.is_permanent,
        });
        let resource = format!("credential-type/{}", request.id.as_str().trim());
        let result = self.create_credential_type_inner(session, request).await;

        self.finish(session, AuditAction::CredentialTypeCreate, resource, details, result)
            .await
    }

    /// Only the name and permanence can change.
    pub async fn update_credential_type(
        &self,
        session: &Session,
        id: &CredentialTypeId,
        request: UpdateCredentialTypeRequest,
    ) -> Result<CredentialType, ServiceError> {
        let details = json!({
            "name": request.name,
            "isPermanent": request.is_permanent,
        });
        let result = self.update_credential_type_inner(session, id, request).await;

        self.finish(
            session,
            AuditAction::CredentialTypeUpdate,
            format!("credential-type/{id}"),
            details,
            result,
        )
        .await
    }

    /// Options of the type go with it.
    pub async fn delete_credential_type(
        &self,
        session: &Session,
        id: &CredentialTypeId,
    ) -> Result<(), ServiceError> {
        let result = match ensure_administrator(session) {
            Ok(()) => self
                .registry
                .delete_credential_type(session, id)
                .await
                .map_err(ServiceError::from),
            Err(error) => Err(error),
        };

        self.finish(
            session,
            AuditAction::CredentialTypeDelete,
            format!("credential-type/{id}"),
            serde_json::Value::Null,
            result,
        )
        .await
    }

    pub async fn list_validity_options(
        &self,
        session: &Session,
        credential_type_id: Option<CredentialTypeId>,
    ) -> Result<Vec<ValidityOption>, ServiceError> {
        Ok(self
            .registry
            .list_validity_options(session, credential_type_id)
            .await?)
    }

    pub async fn create_validity_option(
        &self,
        session: &Session,
        input: CreateValidityOptionInput,
    ) -> Result<ValidityOption, ServiceError> {
        let details = json!({
            "credentialTypeId": input.credential_type_id,
            "periodMonths": input.period_months,
            "periodDays": input.period_days,
        });
        let result = self.create_validity_option_inner(session, input).await;

        self.finish(
            session,
            AuditAction::ValidityOptionCreate,
            "validity-option".to_owned(),
            details,
            result,
        )
        .await
    }

    /// Certificates that already captured an expiration date keep it.
    pub async fn update_validity_option(
        &self,
        session: &Session,
        id: &ValidityOptionId,
        input: UpdateValidityOptionInput,
    ) -> Result<ValidityOption, ServiceError> {
        let details = json!({
            "periodMonths": input.period_months,
            "periodDays": input.period_days,
        });
        let result = self.update_validity_option_inner(session, id, input).await;

        self.finish(
            session,
            AuditAction::ValidityOptionUpdate,
            format!("validity-option/{id}"),
            details,
            result,
        )
        .await
    }

    pub async fn delete_validity_option(
        &self,
        session: &Session,
        id: &ValidityOptionId,
    ) -> Result<(), ServiceError> {
        let result = match ensure_administrator(session) {
            Ok(()) => self
                .registry
                .delete_validity_option(session, id)
                .await
                .map_err(ServiceError::from),
            Err(error) => Err(error),
        };

        self.finish(
            session,
            AuditAction::ValidityOptionDelete,
            format!("validity-option/{id}"),
            serde_json::Value::Null,
            result,
        )
        .await
    }

    /// See [`ValidityPolicy::resolve_period`]; never fails.
    pub async fn resolve_period(
        &self,
        session: &Session,
        credential_type_id: Option<&CredentialTypeId>,
    ) -> ResolvedPeriod {
        self.policy.resolve_period(session, credential_type_id).await
    }

    async fn finish<T>(
        &self,
        session: &Session,
        action: AuditAction,
        resource: String,
        details: serde_json::Value,
        result: Result<T, ServiceError>,
    ) -> Result<T, ServiceError> {
        self.auditor
            .record(session, action, resource.to_owned(), details, &result)
            .await;

        match &result {
            Ok(_) => tracing::info!(%action, %resource, "catalogue updated"),
            Err(error) => tracing::debug!(%action, %resource, %error, "catalogue update failed"),
        }

        result
    }

    async fn create_credential_type_inner(
        &self,
        session: &Session,
        request: CreateCredentialTypeRequest,
    ) -> Result<CredentialType, ServiceError> {
        ensure_administrator(session)?;
        let id = required("id", request.id.as_str())?;
        let name = required("name", &request.name)?;

        Ok(self
            .registry
            .create_credential_type(
                session,
                CreateCredentialTypeRequest {
                    id: id.into(),
                    name: name.to_owned(),
                    is_permanent: request.is_permanent,
                },
            )
            .await?)
    }

    async fn update_credential_type_inner(
        &self,
        session: &Session,
        id: &CredentialTypeId,
        request: UpdateCredentialTypeRequest,
    ) -> Result<CredentialType, ServiceError> {
        ensure_administrator(session)?;
        let name = request
            .name
            .as_deref()
            .map(|name| required("name", name).map(str::to_owned))
            .transpose()?;

        Ok(self
            .registry
            .update_credential_type(
                session,
                id,
                UpdateCredentialTypeRequest {
                    name,
                    is_permanent: request.is_permanent,
                },
            )
            .await?)
    }

    async fn create_validity_option_inner(
        &self,
        session: &Session,
        input: CreateValidityOptionInput,
    ) -> Result<ValidityOption, ServiceError> {
        ensure_administrator(session)?;
        required("credentialTypeId", input.credential_type_id.as_str())?;
        let period = ValidityPeriod::from_parts(input.period_months, input.period_days)?;

        Ok(self
            .registry
            .create_validity_option(
                session,
                CreateValidityOptionRequest {
                    credential_type_id: input.credential_type_id,
                    period,
                    note: note(input.note),
                },
            )
            .await?)
    }

    async fn update_validity_option_inner(
        &self,
        session: &Session,
        id: &ValidityOptionId,
        input: UpdateValidityOptionInput,
    ) -> Result<ValidityOption, ServiceError> {
        ensure_administrator(session)?;
        let period = match (input.period_months, input.period_days) {
            (None, None) => None,
            (months, days) => Some(ValidityPeriod::from_parts(months, days)?),
        };

        Ok(self
            .registry
            .update_validity_option(
                session,
                id,
                UpdateValidityOptionRequest {
                    period,
                    note: input.note.map(note),
                },
            )
            .await?)
    }
}

fn required<'a>(field: &str, value: &'a str) -> Result<&'a str, ServiceError> {
    non_blank(Some(value)).ok_or_else(|| ServiceError::Validation(format!("Missing `{field}`")))
}

fn note(note: Option<String>) -> Option<String> {
    non_blank(note.as_deref()).map(str::to_owned)
}
