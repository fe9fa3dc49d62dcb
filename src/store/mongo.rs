//! MongoDB implementation of the store traits.
//!
//! Collections keep the names and camelCase field layout of the existing deployment:
//! `credentials`, `transactions`, `packages` and `adminUsers`. Documents are read as raw
//! `Document`s and decoded one by one, so a malformed entry is logged and skipped instead of
//! failing a whole listing.
use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::bson::{self, doc, oid::ObjectId, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{IndexOptions, ReturnDocument};
use mongodb::{Collection, Database, IndexModel};
use serde::de::DeserializeOwned;
use tracing::{error, info, warn};

use super::{
    AdminStore, CatalogStore, CredentialStore, LedgerStore, Page, Paged, Store, StoreError,
    StoreResult,
};
use crate::models::admin::{normalize_email, AdminAccount, AdminRole};
use crate::models::credential::{
    ClaimOutcome, ClaimRequest, Credential, CredentialFilter, NewCredential,
};
use crate::models::package::Package;
use crate::models::transaction::{NewTransaction, Transaction, TransactionFilter};

const CREDENTIALS: &str = "credentials";
const TRANSACTIONS: &str = "transactions";
const PACKAGES: &str = "packages";
const ADMIN_USERS: &str = "adminUsers";

const DUPLICATE_KEY: i32 = 11000;

#[derive(Clone)]
pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn raw(&self, name: &str) -> Collection<Document> {
        self.db.collection(name)
    }

    /// Creates the indexes the claim path and admin listings rely on.
    ///
    /// The partial unique index on `assignedReference` is what makes a replayed payment
    /// reference fail atomically inside the claim write.
    pub async fn ensure_indexes(&self) -> StoreResult<()> {
        let credentials = self.raw(CREDENTIALS);
        credentials
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "packageId": 1, "used": 1, "createdAt": 1 })
                    .build(),
            )
            .await?;
        credentials
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "assignedReference": 1 })
                    .options(
                        IndexOptions::builder()
                            .unique(true)
                            .partial_filter_expression(
                                doc! { "assignedReference": { "$type": "string" } },
                            )
                            .build(),
                    )
                    .build(),
            )
            .await?;

        let transactions = self.raw(TRANSACTIONS);
        transactions
            .create_index(IndexModel::builder().keys(doc! { "createdAt": -1 }).build())
            .await?;
        transactions
            .create_index(IndexModel::builder().keys(doc! { "reference": 1 }).build())
            .await?;

        self.raw(ADMIN_USERS)
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "email": 1 })
                    .options(IndexOptions::builder().unique(true).build())
                    .build(),
            )
            .await?;

        info!("MongoDB indexes ensured");
        Ok(())
    }

    async fn collect_page<T: DeserializeOwned>(
        &self,
        collection: &str,
        filter: Document,
        page: Page,
    ) -> StoreResult<Paged<T>> {
        let coll = self.raw(collection);
        let total = coll.count_documents(filter.clone()).await?;
        let mut cursor = coll
            .find(filter)
            .sort(doc! { "createdAt": -1 })
            .skip(page.offset())
            .limit(page.per_page as i64)
            .await?;

        let mut items = Vec::new();
        while let Some(document) = cursor.try_next().await? {
            if let Some(item) = decode(collection, document) {
                items.push(item);
            }
        }
        Ok(Paged { items, total, page })
    }
}

fn decode<T: DeserializeOwned>(collection: &str, document: Document) -> Option<T> {
    let id = document.get("_id").map(|id| id.to_string()).unwrap_or_default();
    match bson::from_document(document) {
        Ok(item) => Some(item),
        Err(e) => {
            warn!("Skipping malformed {} document {}: {}", collection, id, e);
            None
        }
    }
}

fn encode<T: serde::Serialize>(value: &T) -> StoreResult<Document> {
    bson::to_document(value).map_err(|e| StoreError::Unexpected(e.into()))
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) => e.code == DUPLICATE_KEY,
        ErrorKind::Command(e) => e.code == DUPLICATE_KEY,
        _ => false,
    }
}

/// Decodes the document returned by a successful claim. The write has already happened, so a
/// failure here leaves a used credential nobody received.
fn decode_claimed(
    id: &ObjectId,
    claim: &ClaimRequest,
    document: Document,
) -> StoreResult<Credential> {
    bson::from_document::<Credential>(document).map_err(|e| {
        error!(
            reconcile = true,
            credential_id = %id,
            buyer_name = %claim.buyer_name,
            buyer_phone = %claim.buyer_phone,
            reference = claim.reference.as_deref().unwrap_or(""),
            assigned_at = %claim.at.to_rfc3339(),
            error = %e,
            "Claimed credential could not be decoded"
        );
        StoreError::Unexpected(e.into())
    })
}

/// Escapes user input for use inside a `$regex`.
fn regex_escape(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        if "\\.+*?()|[]{}^$#&-~".contains(ch) {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn credential_filter(filter: &CredentialFilter) -> Document {
    let mut query = doc! {};
    if let Some(package_id) = &filter.package_id {
        query.insert("packageId", package_id);
    }
    if let Some(used) = filter.used {
        query.insert("used", used);
    }
    if let Some(search) = &filter.search {
        let pattern = regex_escape(search);
        query.insert(
            "$or",
            vec![
                doc! { "username": { "$regex": &pattern, "$options": "i" } },
                doc! { "assignedTo": { "$regex": &pattern } },
            ],
        );
    }
    query
}

fn transaction_filter(filter: &TransactionFilter) -> Document {
    let mut query = doc! {};
    if let Some(package_id) = &filter.package_id {
        query.insert("packageId", package_id);
    }
    if let Some(phone) = &filter.phone {
        query.insert("phone", phone);
    }
    if let Some(reference) = &filter.reference {
        query.insert("reference", reference);
    }
    query
}

#[async_trait]
impl CredentialStore for MongoStore {
    async fn find_one_unused(&self, package_id: &str) -> StoreResult<Option<Credential>> {
        let mut cursor = self
            .raw(CREDENTIALS)
            .find(doc! { "packageId": package_id, "used": false })
            .sort(doc! { "createdAt": 1 })
            .batch_size(1)
            .await?;
        while let Some(document) = cursor.try_next().await? {
            if let Some(credential) = decode(CREDENTIALS, document) {
                return Ok(Some(credential));
            }
        }
        Ok(None)
    }

    async fn claim(&self, id: &ObjectId, claim: &ClaimRequest) -> StoreResult<ClaimOutcome> {
        let filter = doc! { "_id": *id, "used": false };
        let update = doc! {
            "$set": {
                "used": true,
                "assignedTo": &claim.buyer_phone,
                "assignedName": &claim.buyer_name,
                "assignedAt": bson::DateTime::from_chrono(claim.at),
                "assignedReference": claim.reference.clone(),
            }
        };

        let result = self
            .raw(CREDENTIALS)
            .find_one_and_update(filter, update)
            .return_document(ReturnDocument::After)
            .await;

        match result {
            Ok(Some(document)) => decode_claimed(id, claim, document).map(ClaimOutcome::Claimed),
            Ok(None) => Ok(ClaimOutcome::Conflict),
            Err(e) if is_duplicate_key(&e) => Ok(ClaimOutcome::DuplicateReference),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_assigned_reference(
        &self,
        reference: &str,
    ) -> StoreResult<Option<Credential>> {
        let document = self
            .raw(CREDENTIALS)
            .find_one(doc! { "assignedReference": reference, "used": true })
            .await?;
        Ok(document.and_then(|d| decode(CREDENTIALS, d)))
    }

    async fn insert_credential(&self, credential: NewCredential) -> StoreResult<Credential> {
        let credential = Credential::from_new(credential, chrono::Utc::now());
        self.raw(CREDENTIALS).insert_one(encode(&credential)?).await?;
        Ok(credential)
    }

    async fn get_credential(&self, id: &ObjectId) -> StoreResult<Credential> {
        self.raw(CREDENTIALS)
            .find_one(doc! { "_id": *id })
            .await?
            .and_then(|d| decode(CREDENTIALS, d))
            .ok_or_else(|| StoreError::NotFound(format!("credential {}", id.to_hex())))
    }

    async fn reset_credential(&self, id: &ObjectId) -> StoreResult<Credential> {
        let update = doc! {
            "$set": {
                "used": false,
                "assignedTo": null,
                "assignedName": null,
                "assignedAt": null,
                "assignedReference": null,
            }
        };
        self.raw(CREDENTIALS)
            .find_one_and_update(doc! { "_id": *id }, update)
            .return_document(ReturnDocument::After)
            .await?
            .and_then(|d| decode(CREDENTIALS, d))
            .ok_or_else(|| StoreError::NotFound(format!("credential {}", id.to_hex())))
    }

    async fn delete_credential(&self, id: &ObjectId) -> StoreResult<()> {
        let result = self.raw(CREDENTIALS).delete_one(doc! { "_id": *id }).await?;
        if result.deleted_count == 0 {
            return Err(StoreError::NotFound(format!("credential {}", id.to_hex())));
        }
        Ok(())
    }

    async fn list_credentials(
        &self,
        filter: &CredentialFilter,
        page: Page,
    ) -> StoreResult<Paged<Credential>> {
        self.collect_page(CREDENTIALS, credential_filter(filter), page)
            .await
    }

    async fn count_credentials(&self, package_id: &str, used: Option<bool>) -> StoreResult<u64> {
        let mut filter = doc! { "packageId": package_id };
        if let Some(used) = used {
            filter.insert("used", used);
        }
        Ok(self.raw(CREDENTIALS).count_documents(filter).await?)
    }
}

#[async_trait]
impl LedgerStore for MongoStore {
    async fn create_transaction(&self, tx: NewTransaction) -> StoreResult<Transaction> {
        let tx = Transaction::from_new(tx, chrono::Utc::now());
        self.raw(TRANSACTIONS).insert_one(encode(&tx)?).await?;
        Ok(tx)
    }

    async fn find_transaction_by_reference(
        &self,
        reference: &str,
    ) -> StoreResult<Option<Transaction>> {
        let document = self
            .raw(TRANSACTIONS)
            .find_one(doc! { "reference": reference })
            .await?;
        Ok(document.and_then(|d| decode(TRANSACTIONS, d)))
    }

    async fn list_transactions(
        &self,
        filter: &TransactionFilter,
        page: Page,
    ) -> StoreResult<Paged<Transaction>> {
        self.collect_page(TRANSACTIONS, transaction_filter(filter), page)
            .await
    }

    async fn delete_transaction(&self, id: &ObjectId) -> StoreResult<()> {
        let result = self.raw(TRANSACTIONS).delete_one(doc! { "_id": *id }).await?;
        if result.deleted_count == 0 {
            return Err(StoreError::NotFound(format!("transaction {}", id.to_hex())));
        }
        Ok(())
    }

    async fn delete_all_transactions(&self) -> StoreResult<u64> {
        let result = self.raw(TRANSACTIONS).delete_many(doc! {}).await?;
        Ok(result.deleted_count)
    }
}

#[async_trait]
impl CatalogStore for MongoStore {
    async fn list_packages(&self) -> StoreResult<Vec<Package>> {
        let mut cursor = self
            .raw(PACKAGES)
            .find(doc! {})
            .sort(doc! { "price": 1 })
            .await?;
        let mut packages = Vec::new();
        while let Some(document) = cursor.try_next().await? {
            if let Some(package) = decode(PACKAGES, document) {
                packages.push(package);
            }
        }
        Ok(packages)
    }

    async fn upsert_package(&self, package: Package) -> StoreResult<Package> {
        self.raw(PACKAGES)
            .replace_one(doc! { "_id": &package.id }, encode(&package)?)
            .upsert(true)
            .await?;
        Ok(package)
    }

    async fn delete_package(&self, id: &str) -> StoreResult<()> {
        let result = self.raw(PACKAGES).delete_one(doc! { "_id": id }).await?;
        if result.deleted_count == 0 {
            return Err(StoreError::NotFound(format!("package {id}")));
        }
        Ok(())
    }
}

#[async_trait]
impl AdminStore for MongoStore {
    async fn list_admins(&self) -> StoreResult<Vec<AdminAccount>> {
        let mut cursor = self
            .raw(ADMIN_USERS)
            .find(doc! {})
            .sort(doc! { "createdAt": -1 })
            .await?;
        let mut admins = Vec::new();
        while let Some(document) = cursor.try_next().await? {
            if let Some(admin) = decode(ADMIN_USERS, document) {
                admins.push(admin);
            }
        }
        Ok(admins)
    }

    async fn find_admin_by_email(&self, email: &str) -> StoreResult<Option<AdminAccount>> {
        let document = self
            .raw(ADMIN_USERS)
            .find_one(doc! { "email": normalize_email(email) })
            .await?;
        Ok(document.and_then(|d| decode(ADMIN_USERS, d)))
    }

    async fn get_admin(&self, id: &ObjectId) -> StoreResult<AdminAccount> {
        self.raw(ADMIN_USERS)
            .find_one(doc! { "_id": *id })
            .await?
            .and_then(|d| decode(ADMIN_USERS, d))
            .ok_or_else(|| StoreError::NotFound(format!("admin {}", id.to_hex())))
    }

    async fn create_admin(&self, account: AdminAccount) -> StoreResult<AdminAccount> {
        match self.raw(ADMIN_USERS).insert_one(encode(&account)?).await {
            Ok(_) => Ok(account),
            Err(e) if is_duplicate_key(&e) => Err(StoreError::Conflict(format!(
                "admin {} exists",
                account.email
            ))),
            Err(e) => Err(e.into()),
        }
    }

    async fn set_admin_role(&self, id: &ObjectId, role: AdminRole) -> StoreResult<AdminAccount> {
        self.raw(ADMIN_USERS)
            .find_one_and_update(doc! { "_id": *id }, doc! { "$set": { "role": role.as_str() } })
            .return_document(ReturnDocument::After)
            .await?
            .and_then(|d| decode(ADMIN_USERS, d))
            .ok_or_else(|| StoreError::NotFound(format!("admin {}", id.to_hex())))
    }

    async fn delete_admin(&self, id: &ObjectId) -> StoreResult<()> {
        let result = self.raw(ADMIN_USERS).delete_one(doc! { "_id": *id }).await?;
        if result.deleted_count == 0 {
            return Err(StoreError::NotFound(format!("admin {}", id.to_hex())));
        }
        Ok(())
    }
}

#[async_trait]
impl Store for MongoStore {
    async fn health_check(&self) -> StoreResult<()> {
        self.db.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }

    fn is_durable(&self) -> bool {
        true
    }

    fn backend_name(&self) -> &'static str {
        "mongodb"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regex_escape_neutralizes_metacharacters() {
        assert_eq!(regex_escape("a.b*"), "a\\.b\\*");
        assert_eq!(regex_escape("plain"), "plain");
    }

    #[test]
    fn credential_filter_builds_expected_query() {
        let query = credential_filter(&CredentialFilter {
            package_id: Some("gold-3w".into()),
            used: Some(false),
            search: None,
        });
        assert_eq!(query, doc! { "packageId": "gold-3w", "used": false });
    }

    #[test]
    fn malformed_document_is_skipped() {
        let broken = doc! { "_id": ObjectId::new(), "username": 42 };
        assert!(decode::<Credential>(CREDENTIALS, broken).is_none());
    }

    #[test]
    fn undecodable_claim_result_is_an_error() {
        let id = ObjectId::new();
        let claim = ClaimRequest {
            buyer_name: "Ama".into(),
            buyer_phone: "0241234567".into(),
            reference: Some("PSK-1".into()),
            at: chrono::Utc::now(),
        };
        let broken = doc! { "_id": id, "used": true, "username": 42 };
        assert!(matches!(
            decode_claimed(&id, &claim, broken),
            Err(StoreError::Unexpected(_))
        ));
    }
}
