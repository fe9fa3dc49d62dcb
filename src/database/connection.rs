use mongodb::{bson::doc, Client, Database};
use tracing::{info, warn};

use crate::errors::{AppError, Result};

pub async fn get_db_client(database_url: &str, db_name: &str) -> Result<Database> {
    let client = Client::with_uri_str(database_url)
        .await
        .map_err(|e| AppError::configuration(format!("Failed to connect to MongoDB: {}", e)))?;

    let db = client.database(db_name);

    match db.list_collection_names().await {
        Ok(collections) => {
            info!("✅ Connected to database: {}", db_name);
            info!("📂 Collections found: {:?}", collections);

            if !collections.iter().any(|c| c == "credentials") {
                warn!("⚠️ 'credentials' collection not found; inventory is empty");
            }
        }
        Err(e) => {
            warn!("❌ Database '{}' may not exist or is inaccessible: {}", db_name, e);
        }
    }

    db.run_command(doc! { "ping": 1 })
        .await
        .map_err(|e| AppError::ServiceUnavailable(format!("MongoDB ping failed: {}", e)))?;

    Ok(db)
}
