//! The **CertX Core** is a library for running the lifecycle of certificates held in a
//! credential registry: upload, review, direct issuance, revocation, expiration updates,
//! transfer and public verification.
//!
//! The registry is the authority on every record. This library validates each transition
//! locally before anything is sent, submits it, records an audit entry for the attempt
//! and refetches the affected list afterwards. It never retries on its own.
//!
//! ## Repository structure
//!
//! The library consists of two crates:
//!
//! * **Providers**
//!   * Domain models
//!   * Validity policy
//!   * Certificate state machine
//!   * Presentation status resolver
//!   * Registry client (HTTP and in-memory)
//!   * Audit log
//!   * HTTP client
//! * **Core**
//!   * Services
//!
//! The **Providers** can be used on their own, e.g. to compute an expiration date or to
//! check a transition without a registry at hand. The **Core** wires them into the
//! workflows.
//!
//! ## Getting started
//!
//! Initialize the core against a registry:
//!
//! ```ignore rust
//! /// `None` initializes the Core with the default configuration
//! let core = CertxCore::new(None, None).unwrap();
//! ```
//!
//! Then start using the services, e.g.:
//! ```ignore rust
//! core.certificate_list.load(&session).await?;
//! let verification = core
//!     .verification_service
//!     .verify(&"0xab12…".into())
//!     .await?;
//! ```

use std::sync::Arc;

use certx_providers::{
    audit::{imp::tracing_log::TracingAuditLog, AuditLog},
    http_client::{imp::reqwest_client::ReqwestClient, HttpClient},
    registry::{
        imp::http::{HttpRegistryClient, Params as HttpRegistryParams},
        RegistryClient,
    },
    util::clock::{system_clock, Clock},
    validity::policy::ValidityPolicy,
};
use config::CertxConfig;
use service::{
    certificate_list::CertificateListView, certificate_service::CertificateService,
    credential_type_service::CredentialTypeService, error::ServiceError,
    user_service::UserService, verification_service::VerificationService, Auditor,
};
use time::OffsetDateTime;

pub mod config;
pub mod model;
pub mod service;

#[cfg(test)]
mod test;

pub struct CertxCore {
    pub certificate_service: CertificateService,
    pub certificate_list: Arc<CertificateListView>,
    pub verification_service: VerificationService,
    pub credential_type_service: CredentialTypeService,
    pub user_service: UserService,
    clock: Clock,
}

impl CertxCore {
    /// Connects to the registry over HTTP. Audit records go to `tracing`.
    pub fn new(
        config: Option<CertxConfig>,
        client: Option<Arc<dyn HttpClient>>,
    ) -> Result<Self, ServiceError> {
        let config = config.unwrap_or_default();

        // initialize http client
        let client = match client {
            Some(client) => client,
            None => Arc::new(
                ReqwestClient::with_timeout(config.registry.timeout)
                    .map_err(|e| ServiceError::Config(e.to_string()))?,
            ),
        };

        // initialize registry client
        let registry = Arc::new(HttpRegistryClient::new(
            client,
            HttpRegistryParams {
                base_url: config.registry.base_url.to_owned(),
                verify_base_url: config.registry.verify_base_url.to_owned(),
            },
        )?);

        Self::with_registry(config, registry, Arc::new(TracingAuditLog))
    }

    /// Runs the services against any registry and audit log, e.g. the in-memory ones.
    pub fn with_registry(
        config: CertxConfig,
        registry: Arc<dyn RegistryClient>,
        audit: Arc<dyn AuditLog>,
    ) -> Result<Self, ServiceError> {
        let clock = system_clock(config.utc_offset()?);
        Ok(Self::assemble(config, registry, audit, clock))
    }

    /// Current time in the configured local offset.
    pub fn now(&self) -> OffsetDateTime {
        (self.clock)()
    }

    pub(crate) fn assemble(
        config: CertxConfig,
        registry: Arc<dyn RegistryClient>,
        audit: Arc<dyn AuditLog>,
        clock: Clock,
    ) -> Self {
        let auditor = Auditor::new(audit, clock.to_owned());
        let policy = Arc::new(ValidityPolicy::new(registry.to_owned()));

        let certificate_list = Arc::new(CertificateListView::new(
            registry.to_owned(),
            config.list.default_limit,
            config.list.search_debounce,
        ));

        let certificate_service = CertificateService::new(
            registry.to_owned(),
            policy.to_owned(),
            certificate_list.to_owned(),
            auditor.to_owned(),
            clock.to_owned(),
        );
        let verification_service = VerificationService::new(registry.to_owned(), clock.to_owned());
        let credential_type_service =
            CredentialTypeService::new(registry.to_owned(), policy, auditor.to_owned());
        let user_service = UserService::new(registry, auditor);

        Self {
            certificate_service,
            certificate_list,
            verification_service,
            credential_type_service,
            user_service,
            clock,
        }
    }
}
