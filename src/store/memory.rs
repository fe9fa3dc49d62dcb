//! In-memory implementation of the store traits.
//!
//! State lives in `Vec`s guarded by `tokio::sync::RwLock`, so it is shared across request
//! handlers but lost on restart. Insertion order is the store order used by
//! `find_one_unused`. The claim and the duplicate-reference check run under one write lock,
//! which gives the same compare-and-swap semantics as the Mongo backend.
use async_trait::async_trait;
use chrono::Utc;
use mongodb::bson::oid::ObjectId;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{
    AdminStore, CatalogStore, CredentialStore, LedgerStore, Page, Paged, Store, StoreError,
    StoreResult,
};
use crate::models::admin::{AdminAccount, AdminRole};
use crate::models::credential::{
    ClaimOutcome, ClaimRequest, Credential, CredentialFilter, NewCredential,
};
use crate::models::package::Package;
use crate::models::transaction::{NewTransaction, Transaction, TransactionFilter};

#[derive(Default, Clone)]
pub struct InMemoryStore {
    credentials: Arc<RwLock<Vec<Credential>>>,
    transactions: Arc<RwLock<Vec<Transaction>>>,
    packages: Arc<RwLock<Vec<Package>>>,
    admins: Arc<RwLock<Vec<AdminAccount>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn credential_not_found(id: &ObjectId) -> StoreError {
    StoreError::NotFound(format!("credential {}", id.to_hex()))
}

#[async_trait]
impl CredentialStore for InMemoryStore {
    async fn find_one_unused(&self, package_id: &str) -> StoreResult<Option<Credential>> {
        let credentials = self.credentials.read().await;
        Ok(credentials
            .iter()
            .find(|c| c.package_id == package_id && !c.used)
            .cloned())
    }

    async fn claim(&self, id: &ObjectId, claim: &ClaimRequest) -> StoreResult<ClaimOutcome> {
        let mut credentials = self.credentials.write().await;
        if let Some(reference) = &claim.reference {
            let taken = credentials
                .iter()
                .any(|c| c.assigned_reference.as_ref() == Some(reference));
            if taken {
                return Ok(ClaimOutcome::DuplicateReference);
            }
        }
        // A deleted credential is indistinguishable from a lost race for the caller.
        match credentials.iter_mut().find(|c| &c.id == id && !c.used) {
            Some(credential) => {
                credential.apply_claim(claim);
                Ok(ClaimOutcome::Claimed(credential.clone()))
            }
            None => Ok(ClaimOutcome::Conflict),
        }
    }

    async fn find_by_assigned_reference(
        &self,
        reference: &str,
    ) -> StoreResult<Option<Credential>> {
        let credentials = self.credentials.read().await;
        Ok(credentials
            .iter()
            .find(|c| c.used && c.assigned_reference.as_deref() == Some(reference))
            .cloned())
    }

    async fn insert_credential(&self, credential: NewCredential) -> StoreResult<Credential> {
        let credential = Credential::from_new(credential, Utc::now());
        self.credentials.write().await.push(credential.clone());
        Ok(credential)
    }

    async fn get_credential(&self, id: &ObjectId) -> StoreResult<Credential> {
        let credentials = self.credentials.read().await;
        credentials
            .iter()
            .find(|c| &c.id == id)
            .cloned()
            .ok_or_else(|| credential_not_found(id))
    }

    async fn reset_credential(&self, id: &ObjectId) -> StoreResult<Credential> {
        let mut credentials = self.credentials.write().await;
        let credential = credentials
            .iter_mut()
            .find(|c| &c.id == id)
            .ok_or_else(|| credential_not_found(id))?;
        credential.clear_assignment();
        Ok(credential.clone())
    }

    async fn delete_credential(&self, id: &ObjectId) -> StoreResult<()> {
        let mut credentials = self.credentials.write().await;
        let before = credentials.len();
        credentials.retain(|c| &c.id != id);
        if credentials.len() == before {
            return Err(credential_not_found(id));
        }
        Ok(())
    }

    async fn list_credentials(
        &self,
        filter: &CredentialFilter,
        page: Page,
    ) -> StoreResult<Paged<Credential>> {
        let credentials = self.credentials.read().await;
        let mut matching: Vec<Credential> = credentials
            .iter()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(Paged::from_vec(matching, page))
    }

    async fn count_credentials(&self, package_id: &str, used: Option<bool>) -> StoreResult<u64> {
        let credentials = self.credentials.read().await;
        Ok(credentials
            .iter()
            .filter(|c| c.package_id == package_id && used.map_or(true, |u| c.used == u))
            .count() as u64)
    }
}

#[async_trait]
impl LedgerStore for InMemoryStore {
    async fn create_transaction(&self, tx: NewTransaction) -> StoreResult<Transaction> {
        let tx = Transaction::from_new(tx, Utc::now());
        self.transactions.write().await.push(tx.clone());
        Ok(tx)
    }

    async fn find_transaction_by_reference(
        &self,
        reference: &str,
    ) -> StoreResult<Option<Transaction>> {
        let transactions = self.transactions.read().await;
        Ok(transactions
            .iter()
            .find(|t| t.reference == reference)
            .cloned())
    }

    async fn list_transactions(
        &self,
        filter: &TransactionFilter,
        page: Page,
    ) -> StoreResult<Paged<Transaction>> {
        let transactions = self.transactions.read().await;
        let mut matching: Vec<Transaction> = transactions
            .iter()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(Paged::from_vec(matching, page))
    }

    async fn delete_transaction(&self, id: &ObjectId) -> StoreResult<()> {
        let mut transactions = self.transactions.write().await;
        let before = transactions.len();
        transactions.retain(|t| &t.id != id);
        if transactions.len() == before {
            return Err(StoreError::NotFound(format!("transaction {}", id.to_hex())));
        }
        Ok(())
    }

    async fn delete_all_transactions(&self) -> StoreResult<u64> {
        let mut transactions = self.transactions.write().await;
        let removed = transactions.len() as u64;
        transactions.clear();
        Ok(removed)
    }
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn list_packages(&self) -> StoreResult<Vec<Package>> {
        Ok(self.packages.read().await.clone())
    }

    async fn upsert_package(&self, package: Package) -> StoreResult<Package> {
        let mut packages = self.packages.write().await;
        match packages.iter_mut().find(|p| p.id == package.id) {
            Some(existing) => *existing = package.clone(),
            None => packages.push(package.clone()),
        }
        Ok(package)
    }

    async fn delete_package(&self, id: &str) -> StoreResult<()> {
        let mut packages = self.packages.write().await;
        let before = packages.len();
        packages.retain(|p| p.id != id);
        if packages.len() == before {
            return Err(StoreError::NotFound(format!("package {id}")));
        }
        Ok(())
    }
}

#[async_trait]
impl AdminStore for InMemoryStore {
    async fn list_admins(&self) -> StoreResult<Vec<AdminAccount>> {
        let mut admins = self.admins.read().await.clone();
        admins.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(admins)
    }

    async fn find_admin_by_email(&self, email: &str) -> StoreResult<Option<AdminAccount>> {
        let email = crate::models::admin::normalize_email(email);
        let admins = self.admins.read().await;
        Ok(admins.iter().find(|a| a.email == email).cloned())
    }

    async fn get_admin(&self, id: &ObjectId) -> StoreResult<AdminAccount> {
        let admins = self.admins.read().await;
        admins
            .iter()
            .find(|a| &a.id == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("admin {}", id.to_hex())))
    }

    async fn create_admin(&self, account: AdminAccount) -> StoreResult<AdminAccount> {
        let mut admins = self.admins.write().await;
        if admins.iter().any(|a| a.email == account.email) {
            return Err(StoreError::Conflict(format!("admin {} exists", account.email)));
        }
        admins.push(account.clone());
        Ok(account)
    }

    async fn set_admin_role(&self, id: &ObjectId, role: AdminRole) -> StoreResult<AdminAccount> {
        let mut admins = self.admins.write().await;
        let account = admins
            .iter_mut()
            .find(|a| &a.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("admin {}", id.to_hex())))?;
        account.role = role;
        Ok(account.clone())
    }

    async fn delete_admin(&self, id: &ObjectId) -> StoreResult<()> {
        let mut admins = self.admins.write().await;
        let before = admins.len();
        admins.retain(|a| &a.id != id);
        if admins.len() == before {
            return Err(StoreError::NotFound(format!("admin {}", id.to_hex())));
        }
        Ok(())
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    fn is_durable(&self) -> bool {
        false
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
