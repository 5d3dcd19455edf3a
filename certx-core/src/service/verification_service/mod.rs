//! Public verification by document hash.

use std::sync::Arc;

use certx_providers::{
    common_models::certificate::DocHash,
    registry::{model::VerifiedStatus, RegistryClient},
    status::{resolve_status_raw, BaseStatus, PresentationStatus},
    util::clock::Clock,
};

use crate::{model::Verification, service::error::ServiceError};

#[cfg(test)]
mod test;

pub struct VerificationService {
    registry: Arc<dyn RegistryClient>,
    clock: Clock,
}

impl VerificationService {
    pub(crate) fn new(registry: Arc<dyn RegistryClient>, clock: Clock) -> Self {
        Self { registry, clock }
    }

    /// Looks the hash up and resolves what to present. A valid record past its
    /// expiration day is presented as expired.
    pub async fn verify(&self, hash: &DocHash) -> Result<Verification, ServiceError> {
        let hash = hash.as_str().trim();
        if hash.is_empty() {
            return Err(ServiceError::Validation("Missing document hash".to_owned()));
        }

        let record = self.registry.verify_by_hash(&hash.into()).await?;

        let status = match record.status {
            VerifiedStatus::NotFound => PresentationStatus::NotFound,
            VerifiedStatus::Revoked => PresentationStatus::Revoked,
            VerifiedStatus::Valid => resolve_status_raw(
                BaseStatus::Valid,
                record
                    .certificate
                    .as_ref()
                    .and_then(|certificate| certificate.expiration_date.as_deref()),
                (self.clock)(),
            ),
        };
        tracing::debug!(%hash, %status, source = %record.source, "certificate verified");

        Ok(Verification {
            status,
            source: record.source,
            metadata_uri: record.metadata_uri,
            certificate: record.certificate,
        })
    }
}
