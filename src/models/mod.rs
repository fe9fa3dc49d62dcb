pub mod admin;
pub mod credential;
pub mod package;
pub mod ticket;
pub mod transaction;

/// Serde adapter for optional timestamps stored as BSON dates.
///
/// `bson::serde_helpers` only covers the required case; a missing field or an explicit
/// `null` both decode to `None`.
pub(crate) mod optional_bson_datetime {
    use chrono::{DateTime, Utc};
    use mongodb::bson;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(at) => bson::DateTime::from_chrono(*at).serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<bson::DateTime>::deserialize(deserializer)?.map(|at| at.to_chrono()))
    }
}
