//! Persistence seams for inventory, ledger, catalog and admin accounts.
//!
//! All mutual exclusion between buyers lives behind these traits: the credential claim is a
//! conditional write on the store, never a read followed by a plain update.
use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use thiserror::Error;

use crate::models::admin::{AdminAccount, AdminRole};
use crate::models::credential::{
    ClaimOutcome, ClaimRequest, Credential, CredentialFilter, NewCredential,
};
use crate::models::package::Package;
use crate::models::transaction::{NewTransaction, Transaction, TransactionFilter};

pub mod memory;
pub mod mongo;

pub const DEFAULT_PER_PAGE: u64 = 20;
pub const MAX_PER_PAGE: u64 = 200;
/// Keeps `offset()` within the signed range MongoDB accepts for `skip`.
const MAX_PAGE: u64 = i64::MAX as u64 / MAX_PER_PAGE;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        StoreError::Unexpected(err.into())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// 1-based page request, clamped to `MAX_PER_PAGE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u64,
    pub per_page: u64,
}

impl Page {
    pub fn new(page: Option<u64>, per_page: Option<u64>) -> Self {
        Self {
            page: page.unwrap_or(1).clamp(1, MAX_PAGE),
            per_page: per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE),
        }
    }

    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.per_page)
    }
}

impl Default for Page {
    fn default() -> Self {
        Page::new(None, None)
    }
}

#[derive(Debug, Clone)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: Page,
}

impl<T> Paged<T> {
    /// Slices an already filtered and ordered list.
    pub fn from_vec(items: Vec<T>, page: Page) -> Self {
        let total = items.len() as u64;
        let items = items
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.per_page as usize)
            .collect();
        Self { items, total, page }
    }
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Any unused credential for the package, first in store order.
    async fn find_one_unused(&self, package_id: &str) -> StoreResult<Option<Credential>>;
    /// Marks the credential used only if it is still unused.
    async fn claim(&self, id: &ObjectId, claim: &ClaimRequest) -> StoreResult<ClaimOutcome>;
    async fn find_by_assigned_reference(&self, reference: &str)
        -> StoreResult<Option<Credential>>;
    async fn insert_credential(&self, credential: NewCredential) -> StoreResult<Credential>;
    async fn get_credential(&self, id: &ObjectId) -> StoreResult<Credential>;
    /// Admin path: used → unused, clearing every assignment field.
    async fn reset_credential(&self, id: &ObjectId) -> StoreResult<Credential>;
    async fn delete_credential(&self, id: &ObjectId) -> StoreResult<()>;
    async fn list_credentials(
        &self,
        filter: &CredentialFilter,
        page: Page,
    ) -> StoreResult<Paged<Credential>>;
    async fn count_credentials(&self, package_id: &str, used: Option<bool>) -> StoreResult<u64>;
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn create_transaction(&self, tx: NewTransaction) -> StoreResult<Transaction>;
    async fn find_transaction_by_reference(
        &self,
        reference: &str,
    ) -> StoreResult<Option<Transaction>>;
    /// Newest first by `createdAt`.
    async fn list_transactions(
        &self,
        filter: &TransactionFilter,
        page: Page,
    ) -> StoreResult<Paged<Transaction>>;
    async fn delete_transaction(&self, id: &ObjectId) -> StoreResult<()>;
    async fn delete_all_transactions(&self) -> StoreResult<u64>;
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Stored packages only; the fallback set is applied by `services::catalog`.
    async fn list_packages(&self) -> StoreResult<Vec<Package>>;
    async fn upsert_package(&self, package: Package) -> StoreResult<Package>;
    async fn delete_package(&self, id: &str) -> StoreResult<()>;
}

#[async_trait]
pub trait AdminStore: Send + Sync {
    /// Newest first by `createdAt`.
    async fn list_admins(&self) -> StoreResult<Vec<AdminAccount>>;
    async fn find_admin_by_email(&self, email: &str) -> StoreResult<Option<AdminAccount>>;
    async fn get_admin(&self, id: &ObjectId) -> StoreResult<AdminAccount>;
    async fn create_admin(&self, account: AdminAccount) -> StoreResult<AdminAccount>;
    async fn set_admin_role(&self, id: &ObjectId, role: AdminRole) -> StoreResult<AdminAccount>;
    async fn delete_admin(&self, id: &ObjectId) -> StoreResult<()>;
}

#[async_trait]
pub trait Store: CredentialStore + LedgerStore + CatalogStore + AdminStore {
    async fn health_check(&self) -> StoreResult<()>;
    fn is_durable(&self) -> bool;
    fn backend_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_is_clamped() {
        assert_eq!(Page::new(Some(0), Some(0)), Page { page: 1, per_page: 1 });
        assert_eq!(Page::new(None, Some(10_000)).per_page, MAX_PER_PAGE);
        assert_eq!(Page::new(Some(3), Some(10)).offset(), 20);
        assert!(Page::new(Some(u64::MAX), Some(200)).offset() <= i64::MAX as u64);
    }

    #[test]
    fn page_past_the_end_is_empty() {
        let paged = Paged::from_vec((1..=5).collect::<Vec<_>>(), Page::new(Some(u64::MAX), Some(200)));
        assert_eq!(paged.total, 5);
        assert!(paged.items.is_empty());
    }

    #[test]
    fn paged_slices_after_filtering() {
        let paged = Paged::from_vec((1..=45).collect::<Vec<_>>(), Page::new(Some(3), Some(20)));
        assert_eq!(paged.total, 45);
        assert_eq!(paged.items, vec![41, 42, 43, 44, 45]);
    }
}
