use chrono::{DateTime, Utc};
use mongodb::bson::{oid::ObjectId, serde_helpers};
use serde::{Deserialize, Serialize};

use crate::models::optional_bson_datetime;

/// A provisioned WiFi login belonging to one package.
///
/// Field names follow the existing `credentials` collection (camelCase). Passwords are
/// plaintext; they are handed to buyers verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub package_id: String,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub used: bool,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub assigned_name: Option<String>,
    #[serde(default, with = "optional_bson_datetime")]
    pub assigned_at: Option<DateTime<Utc>>,
    /// Payment reference of the sale that consumed this credential.
    #[serde(default)]
    pub assigned_reference: Option<String>,
    #[serde(with = "serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl Credential {
    pub fn from_new(new: NewCredential, created_at: DateTime<Utc>) -> Self {
        Self {
            id: ObjectId::new(),
            package_id: new.package_id,
            username: new.username,
            password: new.password,
            description: new.description,
            used: false,
            assigned_to: None,
            assigned_name: None,
            assigned_at: None,
            assigned_reference: None,
            created_at,
        }
    }

    /// A used credential must say who got it and when.
    pub fn is_consistent(&self) -> bool {
        !self.used || (self.assigned_to.is_some() && self.assigned_at.is_some())
    }

    pub(crate) fn apply_claim(&mut self, claim: &ClaimRequest) {
        self.used = true;
        self.assigned_to = Some(claim.buyer_phone.clone());
        self.assigned_name = Some(claim.buyer_name.clone());
        self.assigned_at = Some(claim.at);
        self.assigned_reference = claim.reference.clone();
    }

    pub(crate) fn clear_assignment(&mut self) {
        self.used = false;
        self.assigned_to = None;
        self.assigned_name = None;
        self.assigned_at = None;
        self.assigned_reference = None;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewCredential {
    pub package_id: String,
    pub username: String,
    pub password: String,
    pub description: Option<String>,
}

/// Attribution written onto a credential when a sale claims it.
#[derive(Debug, Clone)]
pub struct ClaimRequest {
    pub buyer_name: String,
    pub buyer_phone: String,
    /// `None` disables reference de-duplication for this claim.
    pub reference: Option<String>,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub enum ClaimOutcome {
    Claimed(Credential),
    /// The credential was no longer unused when the conditional write ran.
    Conflict,
    /// Another credential already carries this payment reference.
    DuplicateReference,
}

#[derive(Debug, Default, Clone)]
pub struct CredentialFilter {
    pub package_id: Option<String>,
    pub used: Option<bool>,
    pub search: Option<String>,
}

impl CredentialFilter {
    pub fn matches(&self, credential: &Credential) -> bool {
        if let Some(package_id) = &self.package_id {
            if &credential.package_id != package_id {
                return false;
            }
        }
        if let Some(used) = self.used {
            if credential.used != used {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let hit = credential.username.to_lowercase().contains(&needle)
                || credential
                    .assigned_to
                    .as_deref()
                    .is_some_and(|phone| phone.contains(search.as_str()));
            if !hit {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Credential {
        Credential::from_new(
            NewCredential {
                package_id: "bronze-1w".into(),
                username: "u1".into(),
                password: "p1".into(),
                description: None,
            },
            Utc::now(),
        )
    }

    #[test]
    fn claim_and_reset_keep_invariant() {
        let mut credential = sample();
        assert!(credential.is_consistent());

        credential.apply_claim(&ClaimRequest {
            buyer_name: "Ama".into(),
            buyer_phone: "+233500000000".into(),
            reference: Some("REF1".into()),
            at: Utc::now(),
        });
        assert!(credential.used);
        assert!(credential.is_consistent());
        assert_eq!(credential.assigned_reference.as_deref(), Some("REF1"));

        credential.clear_assignment();
        assert!(!credential.used);
        assert!(credential.assigned_to.is_none());
        assert!(credential.assigned_at.is_none());
    }

    #[test]
    fn document_with_missing_optionals_decodes() {
        let doc = mongodb::bson::doc! {
            "_id": ObjectId::new(),
            "packageId": "gold-3w",
            "username": "bob",
            "password": "pw2",
            "assignedTo": null,
            "createdAt": mongodb::bson::DateTime::now(),
        };
        let credential: Credential = mongodb::bson::from_document(doc).expect("decode");
        assert!(!credential.used);
        assert!(credential.assigned_at.is_none());
    }

    #[test]
    fn filter_matches_package_and_state() {
        let credential = sample();
        let filter = CredentialFilter {
            package_id: Some("bronze-1w".into()),
            used: Some(false),
            search: Some("U1".into()),
        };
        assert!(filter.matches(&credential));

        let other = CredentialFilter {
            package_id: Some("vip-1m".into()),
            ..Default::default()
        };
        assert!(!other.matches(&credential));
    }
}
