use time::{
    macros::{date, datetime},
    OffsetDateTime,
};

use super::InMemoryRegistry;
use crate::{
    common_models::{
        certificate::{CertificateFile, CertificateId, CertificateStatus, CredentialDescriptor},
        credential_type::{CredentialType, ValidityOption, ValidityPeriod},
        user::{User, UserRole},
    },
    registry::{
        error::RegistryError,
        model::{
            CertificateFilters, CreateUserRequest, ExpirationUpdate, IssueCertificateRequest,
            ReuploadCertificateRequest, ReuploadSource, TransferCertificateRequest,
            UploadCertificateRequest, VerifiedStatus,
        },
        RegistryClient,
    },
    session::Session,
    util::clock::fixed_clock,
};

const ADDRESS: &str = "0x52908400098527886E0F7030069857D2E4169EE7";

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

fn session(user: &User) -> Session {
    Session::new(user.to_owned(), "token")
}

fn file() -> CertificateFile {
    CertificateFile {
        file_name: "scan.pdf".to_owned(),
        content_type: "application/pdf".to_owned(),
        content: vec![1, 2, 3],
    }
}

struct Fixture {
    registry: InMemoryRegistry,
    holder: User,
    admin: User,
    super_admin: User,
}

async fn fixture(now: OffsetDateTime) -> Fixture {
    let registry = InMemoryRegistry::with_clock("https://verify.example.org", fixed_clock(now));
    let holder = user("holder", UserRole::User);
    let admin = user("admin", UserRole::Admin);
    let super_admin = user("root", UserRole::SuperAdmin);

    for user in [&holder, &admin, &super_admin] {
        registry.insert_user(user.to_owned()).await;
    }
    registry
        .insert_credential_type(CredentialType {
            id: "license".into(),
            name: "License".to_owned(),
            is_permanent: false,
        })
        .await;
    registry
        .insert_validity_option(ValidityOption {
            id: "1y".into(),
            credential_type_id: "license".into(),
            period: ValidityPeriod::Months(12),
            note: None,
        })
        .await;

    Fixture {
        registry,
        holder,
        admin,
        super_admin,
    }
}

async fn upload(fixture: &Fixture) -> CertificateId {
    fixture
        .registry
        .upload_certificate(
            &session(&fixture.holder),
            UploadCertificateRequest {
                file: file(),
                holder_name: "Ana Holder".to_owned(),
                descriptor: CredentialDescriptor::credential_type("license"),
                issued_date: Some(date!(2024 - 01 - 31)),
            },
        )
        .await
        .unwrap()
        .id
}

fn approval() -> ExpirationUpdate {
    ExpirationUpdate {
        issued_date: date!(2024 - 01 - 31),
        expiration_date: None,
        validity_option_id: Some("1y".into()),
    }
}

fn reupload_request() -> ReuploadCertificateRequest {
    ReuploadCertificateRequest {
        source: ReuploadSource::OriginalFile,
        note: "better scan".to_owned(),
        holder_name: "Ana Holder".to_owned(),
        descriptor: CredentialDescriptor::credential_type("license"),
        issued_date: date!(2024 - 01 - 31),
    }
}

#[tokio::test]
async fn test_approve_computes_expiration_from_option() {
    let fixture = fixture(datetime!(2024-06-01 12:00 UTC)).await;
    let id = upload(&fixture).await;

    fixture
        .registry
        .approve_certificate(&session(&fixture.admin), &id, approval())
        .await
        .unwrap();

    let certificate = fixture.registry.certificate(&id).await.unwrap();
    assert_eq!(certificate.status, CertificateStatus::Valid);
    assert_eq!(certificate.expiration_date, Some(date!(2025 - 01 - 31)));
    assert_eq!(certificate.validity_option_id, Some("1y".into()));
    assert_eq!(certificate.uploader_id, Some(fixture.holder.id.to_owned()));
}

#[tokio::test]
async fn test_holder_may_not_approve() {
    let fixture = fixture(datetime!(2024-06-01 12:00 UTC)).await;
    let id = upload(&fixture).await;

    let error = fixture
        .registry
        .approve_certificate(&session(&fixture.holder), &id, approval())
        .await
        .unwrap_err();

    assert!(matches!(error, RegistryError::Forbidden(_)));
}

#[tokio::test]
async fn test_registry_uses_its_own_account_state() {
    let fixture = fixture(datetime!(2024-06-01 12:00 UTC)).await;
    let id = upload(&fixture).await;

    let mut disabled = fixture.admin.to_owned();
    disabled.enabled = false;
    fixture.registry.insert_user(disabled).await;

    // the session still claims an enabled account
    let error = fixture
        .registry
        .approve_certificate(&session(&fixture.admin), &id, approval())
        .await
        .unwrap_err();
    assert!(matches!(error, RegistryError::Forbidden(_)));

    let unknown = user("ghost", UserRole::SuperAdmin);
    let error = fixture
        .registry
        .list_certificates(&session(&unknown), &CertificateFilters::first_page(10))
        .await
        .unwrap_err();
    assert!(matches!(error, RegistryError::Unauthorized(_)));
}

#[tokio::test]
async fn test_reupload_lifecycle() {
    let fixture = fixture(datetime!(2024-06-01 12:00 UTC)).await;
    let id = upload(&fixture).await;

    fixture
        .registry
        .reject_certificate(&session(&fixture.admin), &id, "blurry", true)
        .await
        .unwrap();

    fixture
        .registry
        .reupload_certificate(&session(&fixture.holder), &id, reupload_request())
        .await
        .unwrap();

    let second = fixture
        .registry
        .reupload_certificate(&session(&fixture.holder), &id, reupload_request())
        .await
        .unwrap_err();
    assert!(matches!(second, RegistryError::Conflict(_)));

    let page = fixture
        .registry
        .list_certificates(&session(&fixture.holder), &CertificateFilters::first_page(10))
        .await
        .unwrap();
    assert_eq!(page.items.len(), 2);
    let resubmission = &page.items[0];
    assert!(resubmission.is_pending_resubmission_of(&id));
    assert_eq!(resubmission.reupload_note.as_deref(), Some("better scan"));

    let rejected = fixture.registry.certificate(&id).await.unwrap();
    assert_eq!(rejected.status, CertificateStatus::Rejected);
    assert_eq!(rejected.rejection_reason.as_deref(), Some("blurry"));
}

#[tokio::test]
async fn test_reupload_refused_when_not_allowed() {
    let fixture = fixture(datetime!(2024-06-01 12:00 UTC)).await;
    let id = upload(&fixture).await;

    fixture
        .registry
        .reject_certificate(&session(&fixture.admin), &id, "forged", false)
        .await
        .unwrap();

    let error = fixture
        .registry
        .reupload_certificate(&session(&fixture.holder), &id, reupload_request())
        .await
        .unwrap_err();

    assert!(matches!(error, RegistryError::Rejected(_)));
}

#[tokio::test]
async fn test_expired_certificate_cannot_be_revoked() {
    let fixture = fixture(datetime!(2025-02-01 00:00:01 UTC)).await;
    let id = upload(&fixture).await;

    fixture
        .registry
        .approve_certificate(&session(&fixture.admin), &id, approval())
        .await
        .unwrap();

    let error = fixture
        .registry
        .revoke_certificate(&session(&fixture.admin), &id)
        .await
        .unwrap_err();

    assert!(matches!(error, RegistryError::Conflict(_)));
}

#[tokio::test]
async fn test_issue_and_verify() {
    let fixture = fixture(datetime!(2024-06-01 12:00 UTC)).await;

    let issued = fixture
        .registry
        .issue_certificate(
            &session(&fixture.admin),
            IssueCertificateRequest {
                file: file(),
                holder_name: "Ana Holder".to_owned(),
                descriptor: CredentialDescriptor::credential_type("license"),
                issued_date: date!(2024 - 03 - 15),
                expiration_date: Some(date!(2024 - 12 - 31)),
                validity_option_id: None,
                recipient_user_id: Some(fixture.holder.id.to_owned()),
            },
        )
        .await
        .unwrap();

    assert_eq!(
        issued.verify_url,
        Some(format!("https://verify.example.org/{}", issued.hash))
    );

    let record = fixture.registry.verify_by_hash(&issued.hash).await.unwrap();
    assert_eq!(record.status, VerifiedStatus::Valid);
    assert_eq!(
        record.certificate.unwrap().expiration_date.as_deref(),
        Some("2024-12-31")
    );

    fixture
        .registry
        .revoke_certificate(
            &session(&fixture.super_admin),
            &fixture
                .registry
                .list_certificates(
                    &session(&fixture.admin),
                    &CertificateFilters::first_page(1),
                )
                .await
                .unwrap()
                .items[0]
                .id,
        )
        .await
        .unwrap();

    let record = fixture.registry.verify_by_hash(&issued.hash).await.unwrap();
    assert_eq!(record.status, VerifiedStatus::Revoked);
}

#[tokio::test]
async fn test_pending_certificate_is_not_verifiable() {
    let fixture = fixture(datetime!(2024-06-01 12:00 UTC)).await;
    let id = upload(&fixture).await;
    let certificate = fixture.registry.certificate(&id).await.unwrap();

    let record = fixture
        .registry
        .verify_by_hash(&certificate.doc_hash)
        .await
        .unwrap();

    assert_eq!(record.status, VerifiedStatus::NotFound);
}

#[tokio::test]
async fn test_transfer_reassigns_holder() {
    let fixture = fixture(datetime!(2024-06-01 12:00 UTC)).await;
    let id = upload(&fixture).await;
    let new_holder = user("heir", UserRole::User);
    fixture.registry.insert_user(new_holder.to_owned()).await;

    fixture
        .registry
        .approve_certificate(&session(&fixture.admin), &id, approval())
        .await
        .unwrap();

    let request = TransferCertificateRequest {
        new_user_id: new_holder.id.to_owned(),
        note: "name change".to_owned(),
        display_name_override: None,
    };

    let error = fixture
        .registry
        .transfer_certificate(&session(&fixture.admin), &id, request.to_owned())
        .await
        .unwrap_err();
    assert!(matches!(error, RegistryError::Forbidden(_)));

    fixture
        .registry
        .transfer_certificate(&session(&fixture.super_admin), &id, request)
        .await
        .unwrap();

    let certificate = fixture.registry.certificate(&id).await.unwrap();
    assert_eq!(certificate.holder_id, Some(new_holder.id));
    assert_eq!(certificate.holder_name, "heir");
}

#[tokio::test]
async fn test_list_pagination_and_visibility() {
    let fixture = fixture(datetime!(2024-06-01 12:00 UTC)).await;
    for _ in 0..3 {
        upload(&fixture).await;
    }

    let page = fixture
        .registry
        .list_certificates(
            &session(&fixture.admin),
            &CertificateFilters {
                page: 2,
                limit: 2,
                q: Some("ANA".to_owned()),
                status: Some(CertificateStatus::Pending),
            },
        )
        .await
        .unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.pagination.total, 3);
    assert_eq!(page.pagination.total_pages, 2);

    let stranger = user("stranger", UserRole::User);
    fixture.registry.insert_user(stranger.to_owned()).await;
    let page = fixture
        .registry
        .list_certificates(&session(&stranger), &CertificateFilters::first_page(10))
        .await
        .unwrap();
    assert!(page.items.is_empty());
}

#[tokio::test]
async fn test_only_super_admin_creates_administrators() {
    let fixture = fixture(datetime!(2024-06-01 12:00 UTC)).await;
    let request = CreateUserRequest {
        email: "new-admin@example.org".to_owned(),
        name: "New Admin".to_owned(),
        address: Some(ADDRESS.to_owned()),
        role: UserRole::Admin,
    };

    let error = fixture
        .registry
        .create_user(&session(&fixture.admin), request.to_owned())
        .await
        .unwrap_err();
    assert!(matches!(error, RegistryError::Forbidden(_)));

    let created = fixture
        .registry
        .create_user(&session(&fixture.super_admin), request.to_owned())
        .await
        .unwrap();
    assert_eq!(created.address.as_deref(), Some(ADDRESS));

    let duplicate = fixture
        .registry
        .create_user(&session(&fixture.super_admin), request)
        .await
        .unwrap_err();
    assert!(matches!(duplicate, RegistryError::Conflict(_)));
}
