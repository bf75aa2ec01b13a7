use std::sync::Arc;
use std::time::Duration;

use foodlink_heatmap::adapters::http_model::HttpPredictionModel;
use foodlink_heatmap::adapters::memory_store::InMemoryListingStore;
use foodlink_heatmap::core::query::{GridDefaults, DEFAULT_LISTING_LIMIT};
use foodlink_heatmap::domain::model::Listing;
use foodlink_heatmap::domain::ports::ListingStore;
use foodlink_heatmap::{build_router, AppState, ListingLocator, PredictionGateway};
use tokio::net::TcpListener;

/// Starts the API on an ephemeral port and returns its base URL.
#[allow(dead_code)]
pub async fn spawn_server(
    prediction_url: String,
    timeout: Duration,
    listings: Vec<Listing>,
) -> String {
    let store = InMemoryListingStore::new();
    for listing in listings {
        store.insert(listing).await.unwrap();
    }

    let state: Arc<AppState> = AppState::new(
        PredictionGateway::new(HttpPredictionModel::new(prediction_url, timeout)),
        ListingLocator::new(store),
        GridDefaults::default(),
        DEFAULT_LISTING_LIMIT,
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, build_router(state)).await.unwrap();
    });

    format!("http://{}", address)
}

#[allow(dead_code)]
pub fn listing(id: &str, lat: f64, lon: f64) -> Listing {
    serde_json::from_value(serde_json::json!({
        "_id": id,
        "title": format!("Surplus {}", id),
        "quantity": 5,
        "lat": lat,
        "lon": lon,
        "status": "available",
        "createdAt": "2024-03-01T18:30:00Z"
    }))
    .unwrap()
}
