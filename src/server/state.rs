use std::sync::Arc;

use crate::adapters::http_model::HttpPredictionModel;
use crate::adapters::memory_store::InMemoryListingStore;
use crate::config::toml_config::TomlConfig;
use crate::core::gateway::PredictionGateway;
use crate::core::locator::ListingLocator;
use crate::core::query::GridDefaults;
use crate::utils::error::Result;

pub struct AppState {
    pub gateway: PredictionGateway<HttpPredictionModel>,
    pub locator: ListingLocator<InMemoryListingStore>,
    pub grid_defaults: GridDefaults,
    pub listing_limit: usize,
}

impl AppState {
    pub fn new(
        gateway: PredictionGateway<HttpPredictionModel>,
        locator: ListingLocator<InMemoryListingStore>,
        grid_defaults: GridDefaults,
        listing_limit: usize,
    ) -> Arc<Self> {
        Arc::new(Self {
            gateway,
            locator,
            grid_defaults,
            listing_limit,
        })
    }

    /// Builds the model client and listing store, seeding listings if configured.
    pub async fn from_config(config: &TomlConfig) -> Result<Arc<Self>> {
        let model = HttpPredictionModel::new(
            config.prediction.endpoint.clone(),
            config.prediction_timeout(),
        );
        tracing::info!(
            "🔗 Prediction service: {} (timeout {:?})",
            model.endpoint(),
            model.timeout()
        );

        let store = InMemoryListingStore::new();
        if let Some(path) = &config.listings.seed_file {
            let count = store.load_file(path).await?;
            tracing::info!("📂 Loaded {} listings from {}", count, path);
        }
        if let Some(seed) = &config.listings.demo_seed {
            store.seed_demo(seed).await;
        }

        Ok(Self::new(
            PredictionGateway::new(model),
            ListingLocator::new(store),
            config.grid_defaults(),
            config.listings.default_limit,
        ))
    }
}
