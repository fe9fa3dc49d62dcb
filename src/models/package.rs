use serde::{Deserialize, Serialize};

/// A purchasable WiFi plan.
///
/// The store keys packages by a stable string id (`bronze-1w`), so `_id` is a string rather
/// than an `ObjectId`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub description: String,
}

impl Package {
    pub fn new(id: &str, name: &str, price: f64, description: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            price,
            description: description.to_string(),
        }
    }

    pub fn price_label(&self) -> String {
        format_ghs(self.price)
    }
}

pub fn format_ghs(amount: f64) -> String {
    format!("GHS {:.2}", amount)
}

/// Catalog served when the `packages` collection is empty.
pub fn fallback_packages() -> Vec<Package> {
    vec![
        Package::new("bronze-1w", "Bronze — 1 Week", 20.0, "1 Week Unlimited"),
        Package::new("silver-2w", "Silver — 2 Weeks", 40.0, "2 Weeks Unlimited"),
        Package::new("gold-3w", "Gold — 3 Weeks", 60.0, "3 Weeks Unlimited"),
        Package::new("vip-1m", "Platinum — 1 Month", 90.0, "1 Month, 2 devices Unlimited"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_catalog_is_fixed() {
        let ids: Vec<_> = fallback_packages().into_iter().map(|p| (p.id, p.price)).collect();
        assert_eq!(
            ids,
            vec![
                ("bronze-1w".to_string(), 20.0),
                ("silver-2w".to_string(), 40.0),
                ("gold-3w".to_string(), 60.0),
                ("vip-1m".to_string(), 90.0),
            ]
        );
    }

    #[test]
    fn price_label_uses_two_decimals() {
        assert_eq!(format_ghs(20.0), "GHS 20.00");
        assert_eq!(format_ghs(40.8), "GHS 40.80");
    }
}
