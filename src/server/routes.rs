use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, RawQuery, State},
    Json,
};
use serde_json::{json, Value};

use crate::core::query::{HeatmapParams, ListingsParams};
use crate::domain::model::{ClaimResponse, HeatmapResponse, ListingsResponse};

use super::{error::ApiError, state::AppState};

/// Decodes the query string without ever rejecting it.
fn query_map(raw: Option<String>) -> HashMap<String, String> {
    raw.map(|q| {
        url::form_urlencoded::parse(q.as_bytes())
            .into_owned()
            .collect()
    })
    .unwrap_or_default()
}

pub async fn heatmap_handler(
    State(state): State<Arc<AppState>>,
    RawQuery(raw): RawQuery,
) -> Json<HeatmapResponse> {
    let params = HeatmapParams::from_query(&query_map(raw), &state.grid_defaults);
    let result = state
        .gateway
        .get_grid(&params.bbox, &params.grid, &params.features)
        .await;

    tracing::info!(
        "🗺️ Heatmap {}x{} served from {} ({} cells)",
        params.grid.rows,
        params.grid.cols,
        result.source.as_str(),
        result.cells.len()
    );

    Json(HeatmapResponse::from(result))
}

pub async fn listings_handler(
    State(state): State<Arc<AppState>>,
    RawQuery(raw): RawQuery,
) -> Result<Json<ListingsResponse>, ApiError> {
    let params = ListingsParams::from_query(&query_map(raw), state.listing_limit);
    let listings = state.locator.find_listings(&params).await?;

    Ok(Json(ListingsResponse { ok: true, listings }))
}

pub async fn claim_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ClaimResponse>, ApiError> {
    let listing = state.locator.claim(&id).await?;

    Ok(Json(ClaimResponse {
        ok: true,
        listing: Some(listing),
        error: None,
    }))
}

pub async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
