use std::{sync::Arc, time::Duration};

use certx_providers::{
    audit::{imp::in_memory::InMemoryAuditLog, AuditError, AuditLog, MockAuditLog},
    certificate_state::TransitionKind,
    common_models::{
        audit::{AuditAction, AuditOutcome},
        certificate::{
            Certificate, CertificateFile, CertificateStatus, CredentialDescriptor, DocHash,
        },
        credential_type::{CredentialType, ValidityOption, ValidityPeriod},
        user::{User, UserRole},
    },
    registry::{
        error::RegistryError,
        imp::in_memory::InMemoryRegistry,
        model::{
            CertificatePage, Pagination, ReuploadSource, RevokedCertificate,
            TransferredCertificate,
        },
        MockRegistryClient, RegistryClient,
    },
    session::Session,
    status::{resolve_status, BaseStatus, PresentationStatus},
    util::clock::fixed_clock,
    validity::{policy::ValidityPolicy, ExpirationChoice},
};
use time::{
    macros::{date, datetime},
    OffsetDateTime,
};

use super::CertificateService;
use crate::{
    model::{
        ExpirationInput, IssueCertificateInput, RejectCertificateInput,
        ReuploadCertificateInput, TransferCertificateInput, UploadCertificateInput,
    },
    service::{certificate_list::CertificateListView, error::ErrorKind, Auditor},
};

const ADDRESS: &str = "0x52908400098527886E0F7030069857D2E4169EE7";
const NOW: OffsetDateTime = datetime!(2024-06-01 09:30 +7);

fn user(id: &str, role: UserRole) -> User {
    User {
        id: id.into(),
        email: format!("{id}@example.org"),
        name: id.to_owned(),
        address: role.is_administrative().then(|| ADDRESS.to_owned()),
        role,
        enabled: true,
    }
}

fn session(role: UserRole) -> Session {
    let id = match role {
        UserRole::User => "holder",
        UserRole::Admin => "admin",
        UserRole::SuperAdmin => "root",
    };
    Session::new(user(id, role), "token")
}

fn file() -> CertificateFile {
    CertificateFile {
        file_name: "diploma.pdf".to_owned(),
        content_type: "application/pdf".to_owned(),
        content: vec![0x25, 0x50, 0x44, 0x46],
    }
}

fn certificate(status: CertificateStatus) -> Certificate {
    Certificate {
        id: "c-1".into(),
        doc_hash: DocHash::from("hash-1"),
        holder_name: "Ana Holder".to_owned(),
        degree: Some("BSc".to_owned()),
        credential_type_id: None,
        holder_id: Some("holder".into()),
        uploader_id: Some("holder".into()),
        issued_date: date!(2024 - 01 - 01),
        certx_issued_date: None,
        expiration_date: None,
        revoked_at: None,
        status,
        rejection_reason: (status == CertificateStatus::Rejected).then(|| "blurry".to_owned()),
        allow_reupload: status == CertificateStatus::Rejected,
        reupload_note: None,
        reuploaded_from: None,
        validity_option_id: None,
    }
}

fn empty_page() -> CertificatePage {
    CertificatePage {
        items: vec![],
        pagination: Pagination {
            page: 1,
            limit: 10,
            total: 0,
            total_pages: 0,
        },
    }
}

fn service(
    registry: Arc<dyn RegistryClient>,
    audit: Arc<dyn AuditLog>,
) -> (CertificateService, Arc<CertificateListView>) {
    let clock = fixed_clock(NOW);
    let list = Arc::new(CertificateListView::new(
        registry.to_owned(),
        10,
        Duration::from_millis(400),
    ));
    let service = CertificateService::new(
        registry.to_owned(),
        Arc::new(ValidityPolicy::new(registry)),
        list.to_owned(),
        Auditor::new(audit, clock.to_owned()),
        clock,
    );

    (service, list)
}

fn audit_expecting(action: AuditAction, denied: bool) -> MockAuditLog {
    let mut audit = MockAuditLog::new();
    audit
        .expect_append()
        .withf(move |entry| {
            entry.action == action
                && matches!(entry.outcome, AuditOutcome::Denied { .. }) == denied
        })
        .once()
        .returning(|_| Ok(()));
    audit
}

async fn in_memory_registry() -> Arc<InMemoryRegistry> {
    let registry = Arc::new(InMemoryRegistry::with_clock(
        "https://verify.example.org",
        fixed_clock(NOW),
    ));
    for role in [UserRole::User, UserRole::Admin, UserRole::SuperAdmin] {
        registry.insert_user(session(role).user).await;
    }
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
            note: None,
        })
        .await;
    registry
        .insert_credential_type(CredentialType {
            id: "phd".into(),
            name: "Doctorate".to_owned(),
            is_permanent: true,
        })
        .await;

    registry
}

#[tokio::test]
async fn test_upload_approve_revoke_scenario() {
    let registry = in_memory_registry().await;
    let audit = InMemoryAuditLog::new();
    let (service, list) = service(registry.to_owned(), Arc::new(audit.to_owned()));

    let uploaded = service
        .upload(
            &session(UserRole::User),
            UploadCertificateInput {
                file: Some(file()),
                holder_name: "Nguyen Van A".to_owned(),
                descriptor: CredentialDescriptor {
                    degree: Some("Cử nhân CNTT".to_owned()),
                    credential_type_id: Some("bsc-it".into()),
                },
                issued_date: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(uploaded.status, CertificateStatus::Pending);

    // the list was refetched after the upload
    let pending = list.items().await.remove(0);
    assert_eq!(pending.id, uploaded.id);
    assert_eq!(pending.issued_date, NOW.date());

    service
        .approve(
            &session(UserRole::Admin),
            &pending,
            ExpirationInput {
                issued_date: Some(date!(2024 - 01 - 01)),
                expiration: Some(ExpirationChoice::Option("12m".into())),
            },
        )
        .await
        .unwrap();

    let valid = list.items().await.remove(0);
    assert_eq!(valid.status, CertificateStatus::Valid);
    assert_eq!(valid.expiration_date, Some(date!(2025 - 01 - 01)));
    assert_eq!(valid.rejection_reason, None);

    let revoked = service
        .revoke(&session(UserRole::Admin), &valid)
        .await
        .unwrap();
    assert_eq!(revoked.status, CertificateStatus::Revoked);

    let revoked = list.items().await.remove(0);
    assert!(revoked.revoked_at.is_some());
    assert_eq!(
        resolve_status(
            BaseStatus::Revoked,
            revoked.expiration_date,
            datetime!(2025-06-01 00:00 UTC)
        ),
        PresentationStatus::Revoked
    );

    let actions: Vec<_> = audit
        .entries()
        .await
        .into_iter()
        .map(|entry| (entry.action, entry.outcome))
        .collect();
    assert_eq!(
        actions,
        vec![
            (AuditAction::CertificateUpload, AuditOutcome::Success),
            (AuditAction::CertificateApprove, AuditOutcome::Success),
            (AuditAction::CertificateRevoke, AuditOutcome::Success),
        ]
    );
}

#[tokio::test]
async fn test_permanent_approval_has_no_expiration() {
    let registry = in_memory_registry().await;
    let (service, list) = service(registry.to_owned(), Arc::new(InMemoryAuditLog::new()));

    service
        .upload(
            &session(UserRole::User),
            UploadCertificateInput {
                file: Some(file()),
                holder_name: "Ana Holder".to_owned(),
                descriptor: CredentialDescriptor::credential_type("phd"),
                issued_date: None,
            },
        )
        .await
        .unwrap();

    let pending = list.items().await.remove(0);
    service
        .approve(
            &session(UserRole::SuperAdmin),
            &pending,
            ExpirationInput {
                issued_date: Some(date!(2024 - 05 - 20)),
                expiration: Some(ExpirationChoice::Custom(date!(2030 - 01 - 01))),
            },
        )
        .await
        .unwrap();

    let valid = registry.certificate(&pending.id).await.unwrap();
    assert_eq!(valid.status, CertificateStatus::Valid);
    assert_eq!(valid.expiration_date, None);
    assert_eq!(valid.validity_option_id, None);
}

#[tokio::test]
async fn test_blank_rejection_reason_is_denied_locally() {
    let registry = MockRegistryClient::new();
    let audit = audit_expecting(AuditAction::CertificateReject, true);
    let (service, _) = service(Arc::new(registry), Arc::new(audit));

    let error = service
        .reject(
            &session(UserRole::Admin),
            &certificate(CertificateStatus::Pending),
            RejectCertificateInput {
                reason: "   ".to_owned(),
                allow_reupload: true,
            },
        )
        .await
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn test_rejecting_twice_is_refused_by_precondition() {
    let mut registry = MockRegistryClient::new();
    // a local conflict refreshes the list, nothing is sent
    registry
        .expect_list_certificates()
        .once()
        .returning(|_, _| Ok(empty_page()));
    let audit = audit_expecting(AuditAction::CertificateReject, true);
    let (service, _) = service(Arc::new(registry), Arc::new(audit));

    let error = service
        .reject(
            &session(UserRole::Admin),
            &certificate(CertificateStatus::Rejected),
            RejectCertificateInput {
                reason: "again".to_owned(),
                allow_reupload: false,
            },
        )
        .await
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::NotFoundOrConflict);
}

#[tokio::test]
async fn test_user_may_not_approve() {
    let registry = MockRegistryClient::new();
    let audit = audit_expecting(AuditAction::CertificateApprove, true);
    let (service, _) = service(Arc::new(registry), Arc::new(audit));

    let error = service
        .approve(
            &session(UserRole::User),
            &certificate(CertificateStatus::Pending),
            ExpirationInput {
                issued_date: Some(date!(2024 - 01 - 01)),
                expiration: Some(ExpirationChoice::Custom(date!(2025 - 01 - 01))),
            },
        )
        .await
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::Authorization);
}

#[tokio::test]
async fn test_approve_without_expiration_is_blocked() {
    let registry = MockRegistryClient::new();
    let audit = audit_expecting(AuditAction::CertificateApprove, true);
    let (service, _) = service(Arc::new(registry), Arc::new(audit));

    // no credential type: the policy falls back to a manual expiration date
    let error = service
        .approve(
            &session(UserRole::Admin),
            &certificate(CertificateStatus::Pending),
            ExpirationInput {
                issued_date: Some(date!(2024 - 01 - 01)),
                expiration: None,
            },
        )
        .await
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn test_server_conflict_is_verbatim_and_refreshes() {
    let mut registry = MockRegistryClient::new();
    registry
        .expect_approve_certificate()
        .once()
        .returning(|_, _, _| {
            Err(RegistryError::Conflict(
                "Certificate was rejected by another admin".to_owned(),
            ))
        });
    registry
        .expect_list_certificates()
        .once()
        .returning(|_, _| Ok(empty_page()));
    let audit = audit_expecting(AuditAction::CertificateApprove, false);
    let (service, _) = service(Arc::new(registry), Arc::new(audit));

    let error = service
        .approve(
            &session(UserRole::Admin),
            &certificate(CertificateStatus::Pending),
            ExpirationInput {
                issued_date: Some(date!(2024 - 01 - 01)),
                expiration: Some(ExpirationChoice::Custom(date!(2025 - 01 - 01))),
            },
        )
        .await
        .unwrap_err();

    assert!(error.requires_refresh());
    assert_eq!(
        error.user_message(),
        "Certificate was rejected by another admin"
    );
}

#[tokio::test]
async fn test_transient_failure_is_not_retried() {
    let mut registry = MockRegistryClient::new();
    registry
        .expect_revoke_certificate()
        .once()
        .returning(|_, _| Err(RegistryError::Unavailable("502 Bad Gateway".to_owned())));
    registry.expect_list_certificates().never();
    let audit = audit_expecting(AuditAction::CertificateRevoke, false);
    let (service, _) = service(Arc::new(registry), Arc::new(audit));

    let error = service
        .revoke(
            &session(UserRole::Admin),
            &certificate(CertificateStatus::Valid),
        )
        .await
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::Transient);
    assert_eq!(
        error.user_message(),
        "The registry could not be reached. Please try again."
    );
}

#[tokio::test]
async fn test_expired_certificate_cannot_be_revoked() {
    let mut registry = MockRegistryClient::new();
    registry
        .expect_list_certificates()
        .once()
        .returning(|_, _| Ok(empty_page()));
    let audit = audit_expecting(AuditAction::CertificateRevoke, true);
    let (service, _) = service(Arc::new(registry), Arc::new(audit));

    let mut expired = certificate(CertificateStatus::Valid);
    expired.expiration_date = Some(date!(2024 - 05 - 31));

    let error = service
        .revoke(&session(UserRole::Admin), &expired)
        .await
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::NotFoundOrConflict);
}

#[tokio::test]
async fn test_reupload_blocked_by_pending_resubmission() {
    let mut registry = MockRegistryClient::new();
    let rejected = certificate(CertificateStatus::Rejected);
    let resubmission = Certificate {
        id: "c-2".into(),
        status: CertificateStatus::Pending,
        rejection_reason: None,
        allow_reupload: false,
        reuploaded_from: Some(rejected.id.to_owned()),
        ..rejected.to_owned()
    };
    let loaded = vec![resubmission, rejected.to_owned()];
    registry
        .expect_list_certificates()
        .times(2)
        .returning(move |_, _| {
            Ok(CertificatePage {
                items: loaded.to_owned(),
                ..empty_page()
            })
        });
    let audit = audit_expecting(AuditAction::CertificateReupload, true);
    let (service, list) = service(Arc::new(registry), Arc::new(audit));
    list.load(&session(UserRole::User)).await.unwrap();

    let error = service
        .reupload(
            &session(UserRole::User),
            &rejected,
            ReuploadCertificateInput {
                use_original_file: true,
                note: "better scan".to_owned(),
                holder_name: "Ana Holder".to_owned(),
                descriptor: CredentialDescriptor::degree("BSc"),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::NotFoundOrConflict);
}

#[tokio::test]
async fn test_reupload_source_must_be_unambiguous() {
    let registry = MockRegistryClient::new();
    let mut audit = MockAuditLog::new();
    audit.expect_append().times(2).returning(|_| Ok(()));
    let (service, _) = service(Arc::new(registry), Arc::new(audit));
    let rejected = certificate(CertificateStatus::Rejected);
    let input = ReuploadCertificateInput {
        note: "better scan".to_owned(),
        holder_name: "Ana Holder".to_owned(),
        descriptor: CredentialDescriptor::degree("BSc"),
        ..Default::default()
    };

    let neither = service
        .reupload(&session(UserRole::User), &rejected, input.to_owned())
        .await
        .unwrap_err();
    assert_eq!(neither.kind(), ErrorKind::Validation);

    let both = service
        .reupload(
            &session(UserRole::User),
            &rejected,
            ReuploadCertificateInput {
                file: Some(file()),
                use_original_file: true,
                ..input
            },
        )
        .await
        .unwrap_err();
    assert_eq!(both.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn test_reupload_with_original_file_is_dated_now() {
    let mut registry = MockRegistryClient::new();
    registry
        .expect_reupload_certificate()
        .withf(|_, id, request| {
            id.as_str() == "c-1"
                && request.source == ReuploadSource::OriginalFile
                && request.issued_date == NOW.date()
                && request.note == "better scan"
        })
        .once()
        .returning(|_, _, _| Ok(()));
    registry
        .expect_list_certificates()
        .once()
        .returning(|_, _| Ok(empty_page()));
    let audit = audit_expecting(AuditAction::CertificateReupload, false);
    let (service, _) = service(Arc::new(registry), Arc::new(audit));

    service
        .reupload(
            &session(UserRole::User),
            &certificate(CertificateStatus::Rejected),
            ReuploadCertificateInput {
                use_original_file: true,
                note: "better scan".to_owned(),
                holder_name: "Ana Holder".to_owned(),
                descriptor: CredentialDescriptor::degree("BSc"),
                issued_date: Some(date!(2020 - 01 - 01)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_transfer_resolves_target_and_audits_previous_holder() {
    let mut registry = MockRegistryClient::new();
    registry
        .expect_get_user()
        .withf(|_, id| id.as_str() == "heir")
        .once()
        .returning(|_, _| Ok(Some(user("heir", UserRole::User))));
    registry
        .expect_transfer_certificate()
        .withf(|_, _, request| {
            request.new_user_id.as_str() == "heir"
                && request.note == "name change"
                && request.display_name_override.as_deref() == Some("Ana New")
        })
        .once()
        .returning(|_, _, _| {
            Ok(TransferredCertificate {
                message: "Transferred".to_owned(),
            })
        });
    registry
        .expect_list_certificates()
        .once()
        .returning(|_, _| Ok(empty_page()));

    let mut audit = MockAuditLog::new();
    audit
        .expect_append()
        .withf(|entry| {
            entry.action == AuditAction::CertificateTransfer
                && entry.outcome == AuditOutcome::Success
                && entry.details["previousHolderId"] == "holder"
        })
        .once()
        .returning(|_| Ok(()));
    let (service, _) = service(Arc::new(registry), Arc::new(audit));

    let transferred = service
        .transfer(
            &session(UserRole::SuperAdmin),
            &certificate(CertificateStatus::Valid),
            TransferCertificateInput {
                new_user_id: Some("heir".into()),
                note: " name change ".to_owned(),
                display_name_override: Some("Ana New".to_owned()),
            },
        )
        .await
        .unwrap();

    assert_eq!(transferred.message, "Transferred");
}

#[tokio::test]
async fn test_transfer_to_unknown_user_refreshes() {
    let mut registry = MockRegistryClient::new();
    registry
        .expect_get_user()
        .once()
        .returning(|_, _| Ok(None));
    registry.expect_transfer_certificate().never();
    registry
        .expect_list_certificates()
        .once()
        .returning(|_, _| Ok(empty_page()));
    let audit = audit_expecting(AuditAction::CertificateTransfer, false);
    let (service, _) = service(Arc::new(registry), Arc::new(audit));

    let error = service
        .transfer(
            &session(UserRole::SuperAdmin),
            &certificate(CertificateStatus::Valid),
            TransferCertificateInput {
                new_user_id: Some("ghost".into()),
                note: "name change".to_owned(),
                display_name_override: None,
            },
        )
        .await
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::NotFoundOrConflict);
}

#[tokio::test]
async fn test_issue_rejects_expiration_before_issuance() {
    let mut registry = MockRegistryClient::new();
    registry.expect_list_credential_types().once().returning(|_| {
        Ok(vec![CredentialType {
            id: "license".into(),
            name: "License".to_owned(),
            is_permanent: false,
        }])
    });
    registry
        .expect_list_validity_options()
        .once()
        .returning(|_, _| Ok(vec![]));
    registry.expect_issue_certificate().never();
    let audit = audit_expecting(AuditAction::CertificateIssue, true);
    let (service, _) = service(Arc::new(registry), Arc::new(audit));

    let error = service
        .issue(
            &session(UserRole::Admin),
            IssueCertificateInput {
                file: Some(file()),
                holder_name: "Ana Holder".to_owned(),
                descriptor: CredentialDescriptor::credential_type("license"),
                issued_date: Some(date!(2024 - 03 - 01)),
                expiration: Some(ExpirationChoice::Custom(date!(2024 - 02 - 28))),
                recipient_user_id: None,
            },
        )
        .await
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn test_audit_failure_does_not_fail_the_operation() {
    let mut registry = MockRegistryClient::new();
    registry
        .expect_revoke_certificate()
        .once()
        .returning(|_, _| {
            Ok(RevokedCertificate {
                status: CertificateStatus::Revoked,
            })
        });
    registry
        .expect_list_certificates()
        .once()
        .returning(|_, _| Ok(empty_page()));
    let mut audit = MockAuditLog::new();
    audit
        .expect_append()
        .once()
        .returning(|_| Err(AuditError::Append("disk full".to_owned())));
    let (service, _) = service(Arc::new(registry), Arc::new(audit));

    let revoked = service
        .revoke(
            &session(UserRole::Admin),
            &certificate(CertificateStatus::Valid),
        )
        .await
        .unwrap();

    assert_eq!(revoked.status, CertificateStatus::Revoked);
}

#[test]
fn test_permitted_transitions_follow_role() {
    let (service, _) = service(
        Arc::new(MockRegistryClient::new()),
        Arc::new(MockAuditLog::new()),
    );

    assert_eq!(
        service.permitted_transitions(&session(UserRole::User)),
        vec![TransitionKind::Upload, TransitionKind::Reupload]
    );
    assert!(service
        .permitted_transitions(&session(UserRole::SuperAdmin))
        .contains(&TransitionKind::Transfer));

    let mut disabled = session(UserRole::Admin);
    disabled.user.enabled = false;
    assert!(service.permitted_transitions(&disabled).is_empty());
}
