#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use mongodb::bson::oid::ObjectId;
use wifibank::config::AppConfig;
use wifibank::models::admin::{AdminAccount, AdminRole};
use wifibank::models::credential::{
    ClaimOutcome, ClaimRequest, Credential, CredentialFilter, NewCredential,
};
use wifibank::models::transaction::{NewTransaction, Transaction, TransactionFilter};
use wifibank::routes::build_router;
use wifibank::services::assignment::{AssignmentEngine, EngineConfig};
use wifibank::services::auth_service::{hash_password, issue_token};
use wifibank::services::catalog::Catalog;
use wifibank::state::AppState;
use wifibank::store::memory::InMemoryStore;
use wifibank::store::{
    AdminStore, CredentialStore, LedgerStore, Page, Paged, StoreError, StoreResult,
};

pub const SUPER_ADMIN: &str = "owner@example.com";

pub async fn read_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

pub fn json_request(
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
    token: Option<&str>,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let body = body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty);
    builder.body(body).expect("request")
}

pub fn test_config() -> AppConfig {
    AppConfig {
        super_admin_email: Some(SUPER_ADMIN.to_string()),
        ..AppConfig::default()
    }
}

pub async fn stock(store: &InMemoryStore, package_id: &str, username: &str, password: &str) {
    store
        .insert_credential(NewCredential {
            package_id: package_id.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            description: None,
        })
        .await
        .expect("stock credential");
}

pub struct TestApp {
    pub store: Arc<InMemoryStore>,
    pub state: AppState,
    pub router: axum::Router,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let state = AppState::new(store.clone(), test_config());
        let router = build_router(state.clone());
        TestApp {
            store,
            state,
            router,
        }
    }

    /// Storefront whose ledger rejects every write.
    pub fn with_offline_ledger() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let config = test_config();
        let engine = AssignmentEngine::new(
            store.clone(),
            Arc::new(OfflineLedger),
            Catalog::new(store.clone()),
            EngineConfig {
                ledger_retry_backoff: Duration::ZERO,
                ..config.engine.clone()
            },
        );
        let state = AppState::new(store.clone(), config).with_engine(engine);
        let router = build_router(state.clone());
        TestApp {
            store,
            state,
            router,
        }
    }

    pub async fn token_for(&self, email: &str, role: AdminRole) -> String {
        let hash = hash_password("secret-pass").expect("hash");
        let account = self
            .store
            .create_admin(AdminAccount::new(email, hash, role))
            .await
            .expect("create admin");
        issue_token(&account, &self.state.config.jwt_secret).expect("token")
    }

    pub async fn admin_token(&self) -> String {
        self.token_for("ops@example.com", AdminRole::Admin).await
    }
}

/// Ledger whose writes always fail.
pub struct OfflineLedger;

#[async_trait]
impl LedgerStore for OfflineLedger {
    async fn create_transaction(&self, _tx: NewTransaction) -> StoreResult<Transaction> {
        Err(StoreError::Unexpected(anyhow::anyhow!("ledger offline")))
    }

    async fn find_transaction_by_reference(
        &self,
        _reference: &str,
    ) -> StoreResult<Option<Transaction>> {
        Ok(None)
    }

    async fn list_transactions(
        &self,
        _filter: &TransactionFilter,
        page: Page,
    ) -> StoreResult<Paged<Transaction>> {
        Ok(Paged::from_vec(Vec::new(), page))
    }

    async fn delete_transaction(&self, id: &ObjectId) -> StoreResult<()> {
        Err(StoreError::NotFound(format!("transaction {id}")))
    }

    async fn delete_all_transactions(&self) -> StoreResult<u64> {
        Ok(0)
    }
}

/// Takes one from `counter` while it is positive.
fn take_one(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

/// Ledger that rejects the first `failures` writes, then delegates to the store.
pub struct FlakyLedger {
    inner: Arc<InMemoryStore>,
    failures: AtomicU32,
}

impl FlakyLedger {
    pub fn new(inner: Arc<InMemoryStore>, failures: u32) -> Self {
        Self {
            inner,
            failures: AtomicU32::new(failures),
        }
    }
}

#[async_trait]
impl LedgerStore for FlakyLedger {
    async fn create_transaction(&self, tx: NewTransaction) -> StoreResult<Transaction> {
        if take_one(&self.failures) {
            return Err(StoreError::Unexpected(anyhow::anyhow!("write timed out")));
        }
        self.inner.create_transaction(tx).await
    }

    async fn find_transaction_by_reference(
        &self,
        reference: &str,
    ) -> StoreResult<Option<Transaction>> {
        self.inner.find_transaction_by_reference(reference).await
    }

    async fn list_transactions(
        &self,
        filter: &TransactionFilter,
        page: Page,
    ) -> StoreResult<Paged<Transaction>> {
        self.inner.list_transactions(filter, page).await
    }

    async fn delete_transaction(&self, id: &ObjectId) -> StoreResult<()> {
        self.inner.delete_transaction(id).await
    }

    async fn delete_all_transactions(&self) -> StoreResult<u64> {
        self.inner.delete_all_transactions().await
    }
}

/// Credential store whose first `conflicts` claims lose the race to another sale.
pub struct ContendedStore {
    inner: Arc<InMemoryStore>,
    conflicts: AtomicU32,
    pub claims: AtomicU32,
    pub selects: AtomicU32,
}

impl ContendedStore {
    pub fn new(inner: Arc<InMemoryStore>, conflicts: u32) -> Self {
        Self {
            inner,
            conflicts: AtomicU32::new(conflicts),
            claims: AtomicU32::new(0),
            selects: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl CredentialStore for ContendedStore {
    async fn find_one_unused(&self, package_id: &str) -> StoreResult<Option<Credential>> {
        self.selects.fetch_add(1, Ordering::SeqCst);
        self.inner.find_one_unused(package_id).await
    }

    async fn claim(&self, id: &ObjectId, claim: &ClaimRequest) -> StoreResult<ClaimOutcome> {
        self.claims.fetch_add(1, Ordering::SeqCst);
        if take_one(&self.conflicts) {
            return Ok(ClaimOutcome::Conflict);
        }
        self.inner.claim(id, claim).await
    }

    async fn find_by_assigned_reference(
        &self,
        reference: &str,
    ) -> StoreResult<Option<Credential>> {
        self.inner.find_by_assigned_reference(reference).await
    }

    async fn insert_credential(&self, credential: NewCredential) -> StoreResult<Credential> {
        self.inner.insert_credential(credential).await
    }

    async fn get_credential(&self, id: &ObjectId) -> StoreResult<Credential> {
        self.inner.get_credential(id).await
    }

    async fn reset_credential(&self, id: &ObjectId) -> StoreResult<Credential> {
        self.inner.reset_credential(id).await
    }

    async fn delete_credential(&self, id: &ObjectId) -> StoreResult<()> {
        self.inner.delete_credential(id).await
    }

    async fn list_credentials(
        &self,
        filter: &CredentialFilter,
        page: Page,
    ) -> StoreResult<Paged<Credential>> {
        self.inner.list_credentials(filter, page).await
    }

    async fn count_credentials(&self, package_id: &str, used: Option<bool>) -> StoreResult<u64> {
        self.inner.count_credentials(package_id, used).await
    }
}
