use std::sync::Arc;

use crate::{config::Config, db::Store, services::MovieCatalogProvider};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub catalog: Arc<dyn MovieCatalogProvider>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        catalog: Arc<dyn MovieCatalogProvider>,
        config: Config,
    ) -> Self {
        Self {
            store,
            catalog,
            config: Arc::new(config),
        }
    }

    pub fn featured_genre(&self) -> &str {
        &self.config.featured_genre
    }
}
