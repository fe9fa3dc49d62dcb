use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::assignment::AssignmentEngine;
use crate::services::catalog::Catalog;
use crate::services::notifier::NotificationDispatcher;
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn Store>,
    pub catalog: Catalog,
    pub engine: Arc<AssignmentEngine>,
    pub notifications: NotificationDispatcher,
}

impl AppState {
    pub fn new<S: Store + 'static>(store: Arc<S>, config: AppConfig) -> Self {
        let catalog = Catalog::new(store.clone());
        let engine = AssignmentEngine::new(
            store.clone(),
            store.clone(),
            catalog.clone(),
            config.engine.clone(),
        );
        AppState {
            config: Arc::new(config),
            store,
            catalog,
            engine: Arc::new(engine),
            notifications: NotificationDispatcher::disabled(),
        }
    }

    pub fn with_engine(mut self, engine: AssignmentEngine) -> Self {
        self.engine = Arc::new(engine);
        self
    }

    pub fn with_notifications(mut self, notifications: NotificationDispatcher) -> Self {
        self.notifications = notifications;
        self
    }
}
