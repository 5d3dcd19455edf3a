//! Paginated, filtered view over the registry's certificate list.
//!
//! Every filter, page or limit change refetches the whole page. Fetches are numbered as
//! they are triggered and a response is only applied if no later fetch was triggered in
//! the meantime, so whatever was asked for last is what ends up in the view, regardless
//! of the order responses arrive in.

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use certx_providers::{
    common_models::certificate::{Certificate, CertificateId, CertificateStatus},
    registry::{
        model::{CertificateFilters, Pagination},
        RegistryClient,
    },
    session::Session,
};
use tokio::sync::Mutex;

use crate::service::error::ServiceError;


#[derive(Default)]
struct Loaded {
    items: Vec<Certificate>,
    pagination: Option<Pagination>,
}

pub struct CertificateListView {
    registry: Arc<dyn RegistryClient>,
    search_debounce: Duration,
    filters: Mutex<CertificateFilters>,
    loaded: Mutex<Loaded>,
    fetch_sequence: AtomicU64,
    search_sequence: AtomicU64,
}

impl CertificateListView {
    pub fn new(
        registry: Arc<dyn RegistryClient>,
        default_limit: u32,
        search_debounce: Duration,
    ) -> Self {
        Self {
            registry,
            search_debounce,
            filters: Mutex::new(CertificateFilters::first_page(default_limit.max(1))),
            loaded: Mutex::new(Loaded::default()),
            fetch_sequence: AtomicU64::new(0),
            search_sequence: AtomicU64::new(0),
        }
    }

    /// Fetches the page for the current filters.
    pub async fn load(&self, session: &Session) -> Result<(), ServiceError> {
        self.fetch(session).await
    }

    /// Refetches after a transition. Nothing local is patched.
    pub async fn reload(&self, session: &Session) -> Result<(), ServiceError> {
        self.fetch(session).await
    }

    pub async fn set_page(&self, session: &Session, page: u32) -> Result<(), ServiceError> {
        self.filters.lock().await.page = page.max(1);
        self.fetch(session).await
    }

    /// Changing the page size starts over at the first page.
    pub async fn set_limit(&self, session: &Session, limit: u32) -> Result<(), ServiceError> {
        {
            let mut filters = self.filters.lock().await;
            filters.limit = limit.max(1);
            filters.page = 1;
        }
        self.fetch(session).await
    }

    pub async fn set_status(
        &self,
        session: &Session,
        status: Option<CertificateStatus>,
    ) -> Result<(), ServiceError> {
        {
            let mut filters = self.filters.lock().await;
            filters.status = status;
            filters.page = 1;
        }
        self.fetch(session).await
    }

    /// Debounced: waits for the input to settle and only the last call within the
    /// window triggers a fetch. Superseded calls return `Ok` without fetching.
    pub async fn search(&self, session: &Session, query: &str) -> Result<(), ServiceError> {
        let sequence = self.search_sequence.fetch_add(1, Ordering::SeqCst) + 1;

        tokio::time::sleep(self.search_debounce).await;
        if self.search_sequence.load(Ordering::SeqCst) != sequence {
            tracing::trace!(query, "search superseded");
            return Ok(());
        }

        {
            let mut filters = self.filters.lock().await;
            let query = query.trim();
            filters.q = (!query.is_empty()).then(|| query.to_owned());
            filters.page = 1;
        }
        self.fetch(session).await
    }

    pub async fn filters(&self) -> CertificateFilters {
        self.filters.lock().await.to_owned()
    }

    pub async fn items(&self) -> Vec<Certificate> {
        self.loaded.lock().await.items.to_owned()
    }

    pub async fn pagination(&self) -> Option<Pagination> {
        self.loaded.lock().await.pagination.to_owned()
    }

    /// Best effort: only the loaded page is scanned. The registry enforces the rule
    /// globally.
    pub async fn has_pending_resubmission(&self, rejected: &CertificateId) -> bool {
        self.loaded
            .lock()
            .await
            .items
            .iter()
            .any(|certificate| certificate.is_pending_resubmission_of(rejected))
    }

    async fn fetch(&self, session: &Session) -> Result<(), ServiceError> {
        let sequence = self.fetch_sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let filters = self.filters().await;

        let result = self.registry.list_certificates(session, &filters).await;

        let mut loaded = self.loaded.lock().await;
        if self.fetch_sequence.load(Ordering::SeqCst) != sequence {
            tracing::debug!(sequence, "discarding out-of-date certificate page");
            return Ok(());
        }

        let page = result?;
        tracing::debug!(
            sequence,
            items = page.items.len(),
            total = page.pagination.total,
            "certificate page loaded"
        );
        loaded.items = page.items;
        loaded.pagination = Some(page.pagination);

        Ok(())
    }
}
