//! Turns a confirmed payment into exactly one consumed credential plus one ledger entry.
//!
//! Mutual exclusion between concurrent buyers is delegated to `CredentialStore::claim`, a
//! conditional write that only succeeds while the credential is still unused. Selection is
//! re-read from the store after every lost race, so a sale either claims a credential or
//! observes the package empty. Once a claim succeeds it is never rolled back: a failing
//! ledger write is retried, then reported with the claimed credential attached.
use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::models::credential::{ClaimOutcome, ClaimRequest, Credential};
use crate::models::transaction::NewTransaction;
use crate::services::catalog::Catalog;
use crate::store::{CredentialStore, LedgerStore, StoreError, StoreResult};

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub claim_max_attempts: u32,
    pub ledger_write_attempts: u32,
    pub ledger_retry_backoff: Duration,
    /// Dedupe sales by payment reference.
    pub idempotent_references: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            claim_max_attempts: 16,
            ledger_write_attempts: 3,
            ledger_retry_backoff: Duration::from_millis(250),
            idempotent_references: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AssignmentRequest {
    pub package_id: String,
    pub buyer_name: String,
    pub buyer_phone: String,
    pub payment_reference: String,
    pub amount: f64,
}

impl AssignmentRequest {
    fn normalized(self) -> Result<Self, AssignmentError> {
        let request = AssignmentRequest {
            package_id: self.package_id.trim().to_string(),
            buyer_name: self.buyer_name.trim().to_string(),
            buyer_phone: self.buyer_phone.trim().to_string(),
            payment_reference: self.payment_reference.trim().to_string(),
            amount: self.amount,
        };
        let missing = [
            ("package id", &request.package_id),
            ("buyer name", &request.buyer_name),
            ("buyer phone", &request.buyer_phone),
            ("payment reference", &request.payment_reference),
        ]
        .into_iter()
        .find(|(_, value)| value.is_empty());
        if let Some((field, _)) = missing {
            return Err(AssignmentError::InvalidInput(format!("{field} is required")));
        }
        if !request.amount.is_finite() || request.amount < 0.0 {
            return Err(AssignmentError::InvalidInput(
                "amount must be a non-negative number".to_string(),
            ));
        }
        Ok(request)
    }
}

/// A credential handed to a buyer.
#[derive(Debug, Clone)]
pub struct Assignment {
    pub credential_id: ObjectId,
    pub package_id: String,
    pub username: String,
    pub password: String,
    pub reference: String,
    pub buyer_name: String,
    pub buyer_phone: String,
    pub assigned_at: DateTime<Utc>,
    /// `None` until the ledger entry is written.
    pub transaction_id: Option<ObjectId>,
    /// The payment reference had already been served; nothing new was claimed.
    pub replayed: bool,
}

impl Assignment {
    fn from_credential(credential: Credential, reference: &str) -> Self {
        Assignment {
            credential_id: credential.id,
            package_id: credential.package_id,
            username: credential.username,
            password: credential.password,
            reference: reference.to_string(),
            buyer_name: credential.assigned_name.unwrap_or_default(),
            buyer_phone: credential.assigned_to.unwrap_or_default(),
            assigned_at: credential.assigned_at.unwrap_or_else(Utc::now),
            transaction_id: None,
            replayed: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum AssignmentError {
    #[error("invalid assignment request: {0}")]
    InvalidInput(String),

    #[error("unknown package: {0}")]
    UnknownPackage(String),

    #[error("package {package_id} is out of stock")]
    OutOfStock { package_id: String },

    #[error("no credential claimed for {package_id} after {attempts} contended attempts")]
    AssignmentConflict { package_id: String, attempts: u32 },

    #[error(
        "credential {} claimed for reference {} but the ledger write failed: {source}",
        .assignment.credential_id,
        .assignment.reference
    )]
    LedgerWriteFailed {
        assignment: Box<Assignment>,
        source: StoreError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct AssignmentEngine {
    credentials: Arc<dyn CredentialStore>,
    ledger: Arc<dyn LedgerStore>,
    catalog: Catalog,
    config: EngineConfig,
}

impl AssignmentEngine {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        ledger: Arc<dyn LedgerStore>,
        catalog: Catalog,
        config: EngineConfig,
    ) -> Self {
        Self {
            credentials,
            ledger,
            catalog,
            config,
        }
    }

    pub async fn assign(&self, request: AssignmentRequest) -> Result<Assignment, AssignmentError> {
        let request = request.normalized()?;
        let package = self
            .catalog
            .find_package(&request.package_id)
            .await?
            .ok_or_else(|| AssignmentError::UnknownPackage(request.package_id.clone()))?;

        if self.config.idempotent_references {
            if let Some(existing) = self.replayed(&request).await? {
                return Ok(existing);
            }
        }

        let claim = ClaimRequest {
            buyer_name: request.buyer_name.clone(),
            buyer_phone: request.buyer_phone.clone(),
            reference: self
                .config
                .idempotent_references
                .then(|| request.payment_reference.clone()),
            at: Utc::now(),
        };

        let mut attempts = 0;
        let credential = loop {
            if attempts >= self.config.claim_max_attempts {
                warn!(
                    "Giving up on {} for reference {} after {} conflicting claims",
                    package.id, request.payment_reference, attempts
                );
                return Err(AssignmentError::AssignmentConflict {
                    package_id: package.id,
                    attempts,
                });
            }
            attempts += 1;

            let Some(candidate) = self.credentials.find_one_unused(&package.id).await? else {
                info!(
                    "Package {} out of stock for reference {}",
                    package.id, request.payment_reference
                );
                return Err(AssignmentError::OutOfStock {
                    package_id: package.id,
                });
            };

            match self.credentials.claim(&candidate.id, &claim).await? {
                ClaimOutcome::Claimed(credential) => break credential,
                ClaimOutcome::Conflict => {
                    debug!(
                        "Credential {} taken by a concurrent sale, reselecting (attempt {})",
                        candidate.id, attempts
                    );
                }
                ClaimOutcome::DuplicateReference => {
                    if let Some(existing) = self.replayed(&request).await? {
                        return Ok(existing);
                    }
                    // The holder was reset between the claim and the lookup; the reference is free again.
                }
            }
        };

        // Logged independently of the ledger so the sale can be rebuilt by hand.
        info!(
            credential_id = %credential.id,
            package_id = %credential.package_id,
            buyer_name = %request.buyer_name,
            buyer_phone = %request.buyer_phone,
            reference = %request.payment_reference,
            assigned_at = %claim.at.to_rfc3339(),
            "Credential claimed"
        );

        let mut assignment = Assignment::from_credential(credential, &request.payment_reference);
        match self.record_sale(&assignment, request.amount).await {
            Ok(transaction_id) => {
                assignment.transaction_id = Some(transaction_id);
                Ok(assignment)
            }
            Err(source) => {
                error!(
                    reconcile = true,
                    credential_id = %assignment.credential_id,
                    package_id = %assignment.package_id,
                    buyer_name = %assignment.buyer_name,
                    buyer_phone = %assignment.buyer_phone,
                    reference = %assignment.reference,
                    assigned_at = %assignment.assigned_at.to_rfc3339(),
                    error = %source,
                    "Ledger write failed after claim; credential stays assigned"
                );
                Err(AssignmentError::LedgerWriteFailed {
                    assignment: Box::new(assignment),
                    source,
                })
            }
        }
    }

    pub async fn remaining_stock(&self, package_id: &str) -> StoreResult<u64> {
        self.credentials
            .count_credentials(package_id, Some(false))
            .await
    }

    async fn record_sale(&self, assignment: &Assignment, amount: f64) -> StoreResult<ObjectId> {
        let entry = NewTransaction {
            reference: assignment.reference.clone(),
            package_id: assignment.package_id.clone(),
            name: assignment.buyer_name.clone(),
            phone: assignment.buyer_phone.clone(),
            amount,
            username: assignment.username.clone(),
            password: Some(assignment.password.clone()),
            credential_id: Some(assignment.credential_id),
            assigned_at: assignment.assigned_at,
        };

        let attempts = self.config.ledger_write_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.ledger.create_transaction(entry.clone()).await {
                Ok(tx) => return Ok(tx.id),
                Err(e) if attempt < attempts => {
                    warn!(
                        "Ledger write for {} failed (attempt {}/{}): {}",
                        entry.reference, attempt, attempts, e
                    );
                    tokio::time::sleep(self.config.ledger_retry_backoff * attempt).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn replayed(
        &self,
        request: &AssignmentRequest,
    ) -> Result<Option<Assignment>, AssignmentError> {
        let Some(credential) = self
            .credentials
            .find_by_assigned_reference(&request.payment_reference)
            .await?
        else {
            return Ok(None);
        };

        if credential.package_id != request.package_id {
            warn!(
                "Reference {} replayed for {} but was sold as {}",
                request.payment_reference, request.package_id, credential.package_id
            );
        }
        let transaction = self
            .ledger
            .find_transaction_by_reference(&request.payment_reference)
            .await?;
        info!(
            "Reference {} already served credential {}; returning the original sale",
            request.payment_reference, credential.id
        );

        let mut assignment = Assignment::from_credential(credential, &request.payment_reference);
        assignment.replayed = true;
        if let Some(tx) = transaction {
            assignment.transaction_id = Some(tx.id);
            return Ok(Some(assignment));
        }

        // The first attempt claimed but never reached the ledger.
        warn!(
            credential_id = %assignment.credential_id,
            reference = %assignment.reference,
            "Backfilling missing ledger entry for replayed reference"
        );
        match self.record_sale(&assignment, request.amount).await {
            Ok(transaction_id) => {
                assignment.transaction_id = Some(transaction_id);
                Ok(Some(assignment))
            }
            Err(source) => {
                error!(
                    reconcile = true,
                    credential_id = %assignment.credential_id,
                    package_id = %assignment.package_id,
                    buyer_name = %assignment.buyer_name,
                    buyer_phone = %assignment.buyer_phone,
                    reference = %assignment.reference,
                    assigned_at = %assignment.assigned_at.to_rfc3339(),
                    error = %source,
                    "Ledger backfill failed; credential stays assigned"
                );
                Err(AssignmentError::LedgerWriteFailed {
                    assignment: Box::new(assignment),
                    source,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::credential::NewCredential;
    use crate::store::memory::InMemoryStore;

    fn engine(store: Arc<InMemoryStore>) -> AssignmentEngine {
        AssignmentEngine::new(
            store.clone(),
            store.clone(),
            Catalog::new(store),
            EngineConfig {
                ledger_retry_backoff: Duration::ZERO,
                ..EngineConfig::default()
            },
        )
    }

    fn request(reference: &str) -> AssignmentRequest {
        AssignmentRequest {
            package_id: "bronze-1w".into(),
            buyer_name: "Ama".into(),
            buyer_phone: "+233500000000".into(),
            payment_reference: reference.into(),
            amount: 20.0,
        }
    }

    async fn stock(store: &InMemoryStore, username: &str) -> Credential {
        store
            .insert_credential(NewCredential {
                package_id: "bronze-1w".into(),
                username: username.into(),
                password: format!("{username}-pw"),
                description: None,
            })
            .await
            .expect("insert")
    }

    #[tokio::test]
    async fn blank_phone_is_rejected_before_touching_stock() {
        let store = Arc::new(InMemoryStore::new());
        stock(&store, "u1").await;
        let mut bad = request("REF1");
        bad.buyer_phone = "   ".into();

        let err = engine(store.clone()).assign(bad).await.unwrap_err();
        assert!(matches!(err, AssignmentError::InvalidInput(_)));
        assert_eq!(store.count_credentials("bronze-1w", Some(false)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn unknown_package_is_rejected() {
        let store = Arc::new(InMemoryStore::new());
        let mut bad = request("REF1");
        bad.package_id = "diamond".into();
        let err = engine(store).assign(bad).await.unwrap_err();
        assert!(matches!(err, AssignmentError::UnknownPackage(id) if id == "diamond"));
    }

    #[tokio::test]
    async fn replayed_reference_returns_original_sale() {
        let store = Arc::new(InMemoryStore::new());
        stock(&store, "u1").await;
        stock(&store, "u2").await;
        let engine = engine(store.clone());

        let first = engine.assign(request("REF1")).await.expect("first");
        let again = engine.assign(request("REF1")).await.expect("replay");

        assert!(!first.replayed);
        assert!(again.replayed);
        assert_eq!(again.username, first.username);
        assert_eq!(again.transaction_id, first.transaction_id);
        assert_eq!(store.count_credentials("bronze-1w", Some(false)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn duplicates_allowed_when_idempotency_disabled() {
        let store = Arc::new(InMemoryStore::new());
        stock(&store, "u1").await;
        stock(&store, "u2").await;
        let engine = AssignmentEngine::new(
            store.clone(),
            store.clone(),
            Catalog::new(store.clone()),
            EngineConfig {
                idempotent_references: false,
                ledger_retry_backoff: Duration::ZERO,
                ..EngineConfig::default()
            },
        );

        let first = engine.assign(request("REF1")).await.expect("first");
        let second = engine.assign(request("REF1")).await.expect("second");
        assert_ne!(first.username, second.username);
    }
}
