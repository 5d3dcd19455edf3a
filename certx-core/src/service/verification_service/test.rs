use std::sync::Arc;

use certx_providers::{
    common_models::certificate::DocHash,
    registry::{
        error::RegistryError,
        model::{VerificationRecord, VerificationSource, VerifiedCertificate, VerifiedStatus},
        MockRegistryClient,
    },
    status::PresentationStatus,
    util::clock::fixed_clock,
};
use time::macros::{date, datetime};

use super::VerificationService;
use crate::service::error::ErrorKind;

fn record(status: VerifiedStatus, expiration_date: Option<&str>) -> VerificationRecord {
    VerificationRecord {
        status,
        metadata_uri: Some("ipfs://bafy".to_owned()),
        source: VerificationSource::Chain,
        certificate: Some(VerifiedCertificate {
            holder_name: "Nguyen Van A".to_owned(),
            degree: Some("Cử nhân CNTT".to_owned()),
            credential_type_id: None,
            issued_date: Some(date!(2024 - 01 - 01)),
            expiration_date: expiration_date.map(str::to_owned),
        }),
    }
}

fn service(registry: MockRegistryClient) -> VerificationService {
    VerificationService::new(
        Arc::new(registry),
        fixed_clock(datetime!(2025-01-02 00:00:01 +7)),
    )
}

#[tokio::test]
async fn test_valid_record_past_expiration_day_is_expired() {
    let mut registry = MockRegistryClient::new();
    registry
        .expect_verify_by_hash()
        .withf(|hash| hash.as_str() == "abc")
        .once()
        .returning(|_| Ok(record(VerifiedStatus::Valid, Some("2025-01-01"))));

    let verification = service(registry)
        .verify(&DocHash::from(" abc "))
        .await
        .unwrap();

    assert_eq!(verification.status, PresentationStatus::Expired);
    assert_eq!(verification.source, VerificationSource::Chain);
    assert_eq!(verification.metadata_uri.as_deref(), Some("ipfs://bafy"));
}

#[tokio::test]
async fn test_expiration_day_itself_is_still_valid() {
    let mut registry = MockRegistryClient::new();
    registry
        .expect_verify_by_hash()
        .once()
        .returning(|_| Ok(record(VerifiedStatus::Valid, Some("2025-01-02"))));

    let verification = service(registry).verify(&"abc".into()).await.unwrap();

    assert_eq!(verification.status, PresentationStatus::Valid);
}

#[tokio::test]
async fn test_revoked_wins_over_expiration() {
    let mut registry = MockRegistryClient::new();
    registry
        .expect_verify_by_hash()
        .once()
        .returning(|_| Ok(record(VerifiedStatus::Revoked, Some("2020-01-01"))));

    let verification = service(registry).verify(&"abc".into()).await.unwrap();

    assert_eq!(verification.status, PresentationStatus::Revoked);
}

#[tokio::test]
async fn test_malformed_expiration_is_ignored() {
    let mut registry = MockRegistryClient::new();
    registry
        .expect_verify_by_hash()
        .once()
        .returning(|_| Ok(record(VerifiedStatus::Valid, Some("soon"))));

    let verification = service(registry).verify(&"abc".into()).await.unwrap();

    assert_eq!(verification.status, PresentationStatus::Valid);
}

#[tokio::test]
async fn test_unknown_hash_is_not_found() {
    let mut registry = MockRegistryClient::new();
    registry.expect_verify_by_hash().once().returning(|_| {
        Ok(VerificationRecord {
            status: VerifiedStatus::NotFound,
            metadata_uri: None,
            source: VerificationSource::Db,
            certificate: None,
        })
    });

    let verification = service(registry).verify(&"abc".into()).await.unwrap();

    assert_eq!(verification.status, PresentationStatus::NotFound);
    assert_eq!(verification.certificate, None);
}

#[tokio::test]
async fn test_blank_hash_is_not_sent() {
    let mut registry = MockRegistryClient::new();
    registry.expect_verify_by_hash().never();

    let error = service(registry).verify(&"  ".into()).await.unwrap_err();

    assert_eq!(error.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn test_unreachable_registry_is_transient() {
    let mut registry = MockRegistryClient::new();
    registry
        .expect_verify_by_hash()
        .once()
        .returning(|_| Err(RegistryError::Unavailable("timeout".to_owned())));

    let error = service(registry).verify(&"abc".into()).await.unwrap_err();

    assert_eq!(error.kind(), ErrorKind::Transient);
}
