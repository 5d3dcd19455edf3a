//! Domain models, lifecycle rules and pluggable seams of the certificate registry.
//!
//! The pure parts ([`validity`], [`certificate_state`], [`status`]) never touch the
//! network. Everything that does sits behind a trait: [`registry::RegistryClient`],
//! [`audit::AuditLog`] and [`http_client::HttpClient`].

pub mod audit;
pub mod certificate_state;
pub mod common_models;
pub mod http_client;
pub mod registry;
pub mod session;
pub mod status;
pub mod util;
pub mod validity;
