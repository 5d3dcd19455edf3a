use std::sync::Arc;

use certx_providers::{
    audit::imp::in_memory::InMemoryAuditLog,
    common_models::{
        audit::AuditOutcome,
        certificate::{CertificateFile, CertificateStatus, CredentialDescriptor},
        credential_type::{CredentialType, ValidityOption, ValidityPeriod},
        user::{User, UserRole},
    },
    registry::{imp::in_memory::InMemoryRegistry, model::VerificationSource},
    session::Session,
    status::PresentationStatus,
    util::clock::fixed_clock,
    validity::ExpirationChoice,
};
use time::macros::{date, datetime};

use crate::{
    config::CertxConfig,
    model::{ExpirationInput, UploadCertificateInput},
    service::error::ServiceError,
    CertxCore,
};

fn session(id: &str, role: UserRole) -> Session {
    Session::new(
        User {
            id: id.into(),
            email: format!("{id}@example.org"),
            name: id.to_owned(),
            address: role
                .is_administrative()
                .then(|| "0x52908400098527886E0F7030069857D2E4169EE7".to_owned()),
            role,
            enabled: true,
        },
        "token",
    )
}

#[test]
fn test_default_core_is_created() {
    let core = CertxCore::new(None, None).unwrap();
    assert_eq!(core.now().offset(), time::UtcOffset::UTC);
}

#[test]
fn test_invalid_configuration_is_refused() {
    let mut config = CertxConfig::default();
    config.utc_offset_seconds = 90_000;
    assert!(matches!(
        CertxCore::new(Some(config), None),
        Err(ServiceError::Config(_))
    ));

    let mut config = CertxConfig::default();
    config.registry.base_url = "not a url".to_owned();
    assert!(matches!(
        CertxCore::new(Some(config), None),
        Err(ServiceError::Registry(_))
    ));
}

#[test]
fn test_config_deserializes_with_defaults() {
    let config: CertxConfig = serde_json::from_value(serde_json::json!({
        "registry": { "baseUrl": "https://registry.example.org/api", "timeout": 5000 },
        "list": { "searchDebounce": 300 },
        "utcOffsetSeconds": 25200
    }))
    .unwrap();

    assert_eq!(config.registry.base_url, "https://registry.example.org/api");
    assert_eq!(config.registry.timeout, std::time::Duration::from_secs(5));
    assert_eq!(config.list.default_limit, 10);
    assert_eq!(
        config.list.search_debounce,
        std::time::Duration::from_millis(300)
    );
    assert_eq!(config.utc_offset().unwrap().whole_hours(), 7);
}

#[tokio::test]
async fn test_certificate_is_verifiable_once_approved() {
    let clock = fixed_clock(datetime!(2024-06-01 10:00 +7));
    let registry = Arc::new(InMemoryRegistry::with_clock(
        "https://verify.example.org",
        clock.to_owned(),
    ));
    let holder = session("holder", UserRole::User);
    let admin = session("admin", UserRole::Admin);
    registry.insert_user(holder.user.to_owned()).await;
    registry.insert_user(admin.user.to_owned()).await;
    registry
        .insert_credential_type(CredentialType {
            id: "bsc-it".into(),
            name: "Cử nhân CNTT".to_owned(),
            is_permanent: false,
        })
        .await;
    registry
        .insert_validity_option(ValidityOption {
            id: "12m".into(),
            credential_type_id: "bsc-it".into(),
            period: ValidityPeriod::Months(12),
            note: Some("Standard".to_owned()),
        })
        .await;
    let audit = InMemoryAuditLog::new();
    let core = CertxCore::assemble(
        CertxConfig::default(),
        registry,
        Arc::new(audit.to_owned()),
        clock,
    );

    core.certificate_service
        .upload(
            &holder,
            UploadCertificateInput {
                file: Some(CertificateFile {
                    file_name: "diploma.pdf".to_owned(),
                    content_type: "application/pdf".to_owned(),
                    content: b"%PDF-1.7".to_vec(),
                }),
                holder_name: "Nguyen Van A".to_owned(),
                descriptor: CredentialDescriptor::credential_type("bsc-it"),
                issued_date: None,
            },
        )
        .await
        .unwrap();

    core.certificate_list.load(&admin).await.unwrap();
    let pending = core.certificate_list.items().await.remove(0);
    let hash = pending.doc_hash.to_owned();

    let unverified = core.verification_service.verify(&hash).await.unwrap();
    assert_eq!(unverified.status, PresentationStatus::NotFound);

    core.certificate_service
        .approve(
            &admin,
            &pending,
            ExpirationInput {
                issued_date: Some(date!(2024 - 01 - 01)),
                expiration: Some(ExpirationChoice::Option("12m".into())),
            },
        )
        .await
        .unwrap();

    let verified = core.verification_service.verify(&hash).await.unwrap();
    assert_eq!(verified.status, PresentationStatus::Valid);
    let summary = verified.certificate.unwrap();
    assert_eq!(summary.holder_name, "Nguyen Van A");
    assert_eq!(summary.expiration_date.as_deref(), Some("2025-01-01"));

    let approved = core.certificate_list.items().await.remove(0);
    assert_eq!(approved.status, CertificateStatus::Valid);
    core.certificate_service
        .revoke(&admin, &approved)
        .await
        .unwrap();

    let revoked = core.verification_service.verify(&hash).await.unwrap();
    assert_eq!(revoked.status, PresentationStatus::Revoked);
    assert_eq!(revoked.source, VerificationSource::Db);

    let entries = audit.entries().await;
    assert_eq!(entries.len(), 3);
    assert!(entries
        .iter()
        .all(|entry| entry.outcome == AuditOutcome::Success));
}
