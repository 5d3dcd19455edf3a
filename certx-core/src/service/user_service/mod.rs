//! Accounts and their roles.
//!
//! Administrators carry a chain address; plain users never do. Addresses are normalized
//! here before anything is sent, so a role change and its address travel together.

use std::sync::Arc;

use certx_providers::{
    common_models::{
        audit::AuditAction,
        non_blank,
        user::{normalize_address, User, UserId, UserRole, UserValidationError},
    },
    registry::{
        error::RegistryError,
        model::{CreateUserRequest, UpdateUserRequest},
        RegistryClient,
    },
    session::Session,
};
use serde_json::json;

use crate::{
    model::{CreateUserInput, UpdateUserInput},
    service::{ensure_administrator, error::ServiceError, Auditor},
};


pub struct UserService {
    registry: Arc<dyn RegistryClient>,
    auditor: Auditor,
}

impl UserService {
    pub(crate) fn new(registry: Arc<dyn RegistryClient>, auditor: Auditor) -> Self {
        Self { registry, auditor }
    }

    pub async fn get_user(
        &self,
        session: &Session,
        id: &UserId,
    ) -> Result<Option<User>, ServiceError> {
        Ok(self.registry.get_user(session, id).await?)
    }

    pub async fn create_user(
        &self,
        session: &Session,
        input: CreateUserInput,
    ) -> Result<User, ServiceError> {
        let details = json!({
            "email": input.email.trim(),
            "role": input.role,
        });
        let result = self.create_user_inner(session, input).await;

        self.finish(
            session,
            AuditAction::UserCreate,
            "user".to_owned(),
            details,
            result,
        )
        .await
    }

    /// Changing the role re-checks the address against the new role; demoting to `USER`
    /// clears it.
    pub async fn update_user(
        &self,
        session: &Session,
        id: &UserId,
        input: UpdateUserInput,
    ) -> Result<User, ServiceError> {
        let details = json!({
            "role": input.role,
            "enabled": input.enabled,
        });
        let result = self.update_user_inner(session, id, input).await;

        self.finish(
            session,
            AuditAction::UserUpdate,
            format!("user/{id}"),
            details,
            result,
        )
        .await
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

        if let Err(error) = &result {
            tracing::debug!(%action, %resource, %error, "user update failed");
        }

        result
    }

    async fn create_user_inner(
        &self,
        session: &Session,
        input: CreateUserInput,
    ) -> Result<User, ServiceError> {
        ensure_administrator(session)?;
        ensure_may_grant(session, input.role)?;

        let email = non_blank(Some(input.email.as_str()))
            .ok_or(UserValidationError::MissingField("email"))?;
        let name = non_blank(Some(input.name.as_str()))
            .ok_or(UserValidationError::MissingField("name"))?;
        let address = normalize_address(input.role, input.address.as_deref())?;

        Ok(self
            .registry
            .create_user(
                session,
                CreateUserRequest {
                    email: email.to_owned(),
                    name: name.to_owned(),
                    address,
                    role: input.role,
                },
            )
            .await?)
    }

    async fn update_user_inner(
        &self,
        session: &Session,
        id: &UserId,
        input: UpdateUserInput,
    ) -> Result<User, ServiceError> {
        ensure_administrator(session)?;
        if let Some(role) = input.role {
            ensure_may_grant(session, role)?;
        }

        let name = input
            .name
            .as_deref()
            .map(|name| {
                non_blank(Some(name))
                    .map(str::to_owned)
                    .ok_or(UserValidationError::MissingField("name"))
            })
            .transpose()?;

        let address = if input.role.is_some() || input.address.is_some() {
            let current = self
                .registry
                .get_user(session, id)
                .await?
                .ok_or_else(|| RegistryError::NotFound(format!("User `{id}` not found")))?;
            let role = input.role.unwrap_or(current.role);
            let address = input.address.as_deref().or(current.address.as_deref());

            Some(normalize_address(role, address)?)
        } else {
            None
        };

        Ok(self
            .registry
            .update_user(
                session,
                id,
                UpdateUserRequest {
                    name,
                    address,
                    role: input.role,
                    enabled: input.enabled,
                },
            )
            .await?)
    }
}

fn ensure_may_grant(session: &Session, role: UserRole) -> Result<(), ServiceError> {
    if role.is_administrative() && session.user.role != UserRole::SuperAdmin {
        return Err(ServiceError::Forbidden(format!(
            "Only a super admin may grant role `{role}`"
        )));
    }

    Ok(())
}
