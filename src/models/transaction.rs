// models/transaction.rs
use chrono::{DateTime, Utc};
use mongodb::bson::{oid::ObjectId, serde_helpers};
use serde::{Deserialize, Serialize};

/// One completed sale in the ledger.
///
/// `username` is a display back-reference to the consumed credential; `credentialId` is
/// recorded when known but the ledger does not own the credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub reference: String,
    pub package_id: String,
    #[serde(default)]
    pub name: String,
    pub phone: String,
    pub amount: f64,
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub credential_id: Option<ObjectId>,

    #[serde(with = "serde_helpers::chrono_datetime_as_bson_datetime")]
    pub assigned_at: DateTime<Utc>,

    #[serde(with = "serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub reference: String,
    pub package_id: String,
    pub name: String,
    pub phone: String,
    pub amount: f64,
    pub username: String,
    pub password: Option<String>,
    pub credential_id: Option<ObjectId>,
    pub assigned_at: DateTime<Utc>,
}

impl Transaction {
    pub fn from_new(new: NewTransaction, created_at: DateTime<Utc>) -> Self {
        Transaction {
            id: ObjectId::new(),
            reference: new.reference,
            package_id: new.package_id,
            name: new.name,
            phone: new.phone,
            amount: new.amount,
            username: new.username,
            password: new.password,
            credential_id: new.credential_id,
            assigned_at: new.assigned_at,
            created_at,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct TransactionFilter {
    pub package_id: Option<String>,
    pub phone: Option<String>,
    pub reference: Option<String>,
}

impl TransactionFilter {
    pub fn matches(&self, tx: &Transaction) -> bool {
        self.package_id.as_ref().map_or(true, |p| &tx.package_id == p)
            && self.phone.as_ref().map_or(true, |p| &tx.phone == p)
            && self.reference.as_ref().map_or(true, |r| &tx.reference == r)
    }
}
