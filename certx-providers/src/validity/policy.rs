use std::sync::Arc;

use crate::{
    common_models::credential_type::CredentialTypeId,
    registry::RegistryClient,
    session::Session,
    validity::ResolvedPeriod,
};

/// Looks up the validity rules of credential types in the registry.
pub struct ValidityPolicy {
    registry: Arc<dyn RegistryClient>,
}

impl ValidityPolicy {
    pub fn new(registry: Arc<dyn RegistryClient>) -> Self {
        Self { registry }
    }

    /// Resolves a credential type to whether it is permanent and which options it offers.
    ///
    /// Never fails: unknown types and registry errors fall back to
    /// [`ResolvedPeriod::unresolved`], which asks for a manual expiration date.
    pub async fn resolve_period(
        &self,
        session: &Session,
        credential_type_id: Option<&CredentialTypeId>,
    ) -> ResolvedPeriod {
        let Some(credential_type_id) =
            credential_type_id.filter(|id| !id.as_str().trim().is_empty())
        else {
            return ResolvedPeriod::unresolved();
        };

        let credential_types = match self.registry.list_credential_types(session).await {
            Ok(credential_types) => credential_types,
            Err(error) => {
                tracing::warn!(%credential_type_id, %error, "failed to load credential types");
                return ResolvedPeriod::unresolved();
            }
        };

        let Some(credential_type) = credential_types
            .into_iter()
            .find(|credential_type| &credential_type.id == credential_type_id)
        else {
            tracing::warn!(%credential_type_id, "unknown credential type");
            return ResolvedPeriod::unresolved();
        };

        if credential_type.is_permanent {
            return ResolvedPeriod::permanent();
        }

        match self
            .registry
            .list_validity_options(session, Some(credential_type.id.to_owned()))
            .await
        {
            Ok(options) => ResolvedPeriod {
                is_permanent: false,
                options: options
                    .into_iter()
                    .filter(|option| option.credential_type_id == credential_type.id)
                    .collect(),
            },
            Err(error) => {
                tracing::warn!(%credential_type_id, %error, "failed to load validity options");
                ResolvedPeriod::unresolved()
            }
        }
    }
}
