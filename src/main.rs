use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use wifibank::config::AppConfig;
use wifibank::database::connection::get_db_client;
use wifibank::routes::build_router;
use wifibank::services::auth_service::seed_super_admin;
use wifibank::services::notifier::NotificationDispatcher;
use wifibank::services::sms_service::{Notifier, SMSService};
use wifibank::state::AppState;
use wifibank::store::memory::InMemoryStore;
use wifibank::store::mongo::MongoStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env().context("loading configuration")?;
    info!("Configuration: {}", config.get_config_info());

    let app_state = initialize_app_state(config).await?;
    seed_super_admin(app_state.store.as_ref(), &app_state.config)
        .await
        .context("seeding the super admin")?;

    let addr: SocketAddr = format!("{}:{}", app_state.config.host, app_state.config.port)
        .parse()
        .context("HOST/PORT do not form a socket address")?;
    let app = build_router(app_state);

    info!("🚀 Server starting on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    axum::serve(listener, app).await.context("serving requests")?;
    Ok(())
}

async fn initialize_app_state(config: AppConfig) -> anyhow::Result<AppState> {
    let notifications = build_notifications(&config);

    let state = match config.database_url.clone() {
        Some(url) => {
            let db = get_db_client(&url, &config.database_name).await?;
            let store = MongoStore::new(db);
            store
                .ensure_indexes()
                .await
                .context("creating MongoDB indexes")?;
            AppState::new(Arc::new(store), config)
        }
        None => {
            warn!("DATABASE_URL not set; inventory and ledger live in memory only");
            AppState::new(Arc::new(InMemoryStore::new()), config)
        }
    };

    Ok(state.with_notifications(notifications))
}

fn build_notifications(config: &AppConfig) -> NotificationDispatcher {
    let Some(key) = config.mnotify_key.clone() else {
        warn!("MNOTIFY_KEY not set; SMS delivery is disabled");
        return NotificationDispatcher::disabled();
    };

    match SMSService::new(key, config.mnotify_sender.clone(), config.mnotify_url.clone()) {
        Ok(sms) => {
            info!("✅ SMS service initialized (sender {})", config.mnotify_sender);
            let notifier: Arc<dyn Notifier> = Arc::new(sms);
            NotificationDispatcher::new(Some(notifier), config.admin_alert_phone.clone())
        }
        Err(e) => {
            error!("❌ Failed to initialize SMS service: {}", e);
            NotificationDispatcher::disabled()
        }
    }
}
