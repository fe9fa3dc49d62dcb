use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::credential::Credential;
use crate::models::transaction::Transaction;
use crate::services::import::LineError;
use crate::store::{Page, Paged};

#[derive(Debug, Serialize)]
pub struct PageResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

impl<T> PageResponse<T> {
    pub fn from_paged<S>(paged: Paged<S>) -> Self
    where
        T: From<S>,
    {
        PageResponse {
            items: paged.items.into_iter().map(T::from).collect(),
            total: paged.total,
            page: paged.page.page,
            per_page: paged.page.per_page,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CredentialQuery {
    pub package_id: Option<String>,
    pub used: Option<bool>,
    pub search: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

impl CredentialQuery {
    pub fn page(&self) -> Page {
        Page::new(self.page, self.per_page)
    }
}

#[derive(Debug, Serialize)]
pub struct CredentialResponse {
    pub id: String,
    pub package_id: String,
    pub username: String,
    pub password: String,
    pub description: Option<String>,
    pub used: bool,
    pub assigned_to: Option<String>,
    pub assigned_name: Option<String>,
    pub assigned_at: Option<String>,
    pub assigned_reference: Option<String>,
    pub created_at: String,
}

impl From<Credential> for CredentialResponse {
    fn from(c: Credential) -> Self {
        CredentialResponse {
            id: c.id.to_hex(),
            package_id: c.package_id,
            username: c.username,
            password: c.password,
            description: c.description,
            used: c.used,
            assigned_to: c.assigned_to,
            assigned_name: c.assigned_name,
            assigned_at: c.assigned_at.map(|at| at.to_rfc3339()),
            assigned_reference: c.assigned_reference,
            created_at: c.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCredentialRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,

    #[serde(default)]
    pub package_id: Option<String>,

    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ImportRequest {
    #[validate(length(min = 1, message = "Paste at least one line"))]
    pub text: String,

    #[serde(default)]
    pub default_package_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub success: bool,
    pub inserted: usize,
    pub errors: Vec<LineError>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TransactionQuery {
    pub package_id: Option<String>,
    pub phone: Option<String>,
    pub reference: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    pub id: String,
    pub reference: String,
    pub package_id: String,
    pub name: String,
    pub phone: String,
    pub amount: f64,
    pub username: String,
    pub password: Option<String>,
    pub credential_id: Option<String>,
    pub assigned_at: String,
    pub created_at: String,
}

impl From<Transaction> for TransactionResponse {
    fn from(t: Transaction) -> Self {
        TransactionResponse {
            id: t.id.to_hex(),
            reference: t.reference,
            package_id: t.package_id,
            name: t.name,
            phone: t.phone,
            amount: t.amount,
            username: t.username,
            password: t.password,
            credential_id: t.credential_id.map(|id| id.to_hex()),
            assigned_at: t.assigned_at.to_rfc3339(),
            created_at: t.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpsertPackageRequest {
    #[validate(length(min = 1, message = "Package name is required"))]
    pub name: String,

    pub price: f64,

    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Serialize)]
pub struct PackageStock {
    pub package_id: String,
    pub name: String,
    pub total: u64,
    pub unused: u64,
    pub used: u64,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub packages: Vec<PackageStock>,
    pub transactions: u64,
    pub revenue: f64,
}
