mod common;

use common::{listing, spawn_server};
use foodlink_heatmap::domain::model::{GridSource, HeatmapResponse, ListingStatus, ListingsResponse};
use httpmock::prelude::*;
use serde_json::Value;
use std::time::Duration;

const DELHI_QUERY: &str = "min_lat=28.5&max_lat=28.8&min_lon=77.05&max_lon=77.35";

async fn get_json<T: serde::de::DeserializeOwned>(url: String) -> (u16, T) {
    let response = reqwest::get(url).await.unwrap();
    let status = response.status().as_u16();
    (status, response.json().await.unwrap())
}

#[tokio::test]
async fn test_heatmap_uses_model_cells_unmodified() {
    let ml = MockServer::start();
    let cells = serde_json::json!([
        {"row": 0, "col": 0, "lat": 28.5, "lon": 77.05, "score": 12.5, "intensity": 0.125, "demand_band": "low"},
        {"row": 0, "col": 1, "lat": 28.5, "lon": 77.35, "score": 88, "intensity": 0.88}
    ]);
    let ml_mock = ml.mock(|when, then| {
        when.method(POST)
            .path("/predict_grid")
            .json_body_partial(r#"{"min_lat": 28.5, "max_lon": 77.35, "rows": 1, "cols": 2}"#);
        then.status(200).json_body(serde_json::json!({ "cells": cells }));
    });

    let base = spawn_server(ml.url("/predict_grid"), Duration::from_secs(2), vec![]).await;
    let (status, body): (u16, Value) =
        get_json(format!("{}/api/heatmap?{}&rows=1&cols=2", base, DELHI_QUERY)).await;

    ml_mock.assert();
    assert_eq!(status, 200);
    assert_eq!(body["used"], "ml");
    assert_eq!(body["raw"], cells);
    assert_eq!(body["heat"][1], serde_json::json!([28.5, 77.35, 0.88]));
    assert_eq!(body["summary"]["min"], 12.5);
    assert_eq!(body["summary"]["max"], 88.0);
}

#[tokio::test]
async fn test_heatmap_accepts_cells_with_only_position_and_intensity() {
    let ml = MockServer::start();
    ml.mock(|when, then| {
        when.method(POST).path("/predict_grid");
        then.status(200).json_body(serde_json::json!({
            "cells": [{"lat": 28.6, "lon": 77.2, "intensity": 0.4}]
        }));
    });

    let base = spawn_server(ml.url("/predict_grid"), Duration::from_secs(2), vec![]).await;
    let (status, body): (u16, Value) =
        get_json(format!("{}/api/heatmap?{}&rows=1&cols=1", base, DELHI_QUERY)).await;

    assert_eq!(status, 200);
    assert_eq!(body["used"], "ml");
    assert_eq!(body["raw"], serde_json::json!([{"lat": 28.6, "lon": 77.2, "intensity": 0.4}]));
    assert_eq!(body["heat"], serde_json::json!([[28.6, 77.2, 0.4]]));
    assert_eq!(body["summary"], serde_json::json!({"min": null, "max": null}));
}

#[tokio::test]
async fn test_extreme_bounds_still_return_parseable_grid() {
    let base = spawn_server(
        "http://127.0.0.1:9/predict_grid".to_string(),
        Duration::from_millis(200),
        vec![],
    )
    .await;
    let (status, body): (u16, Value) = get_json(format!(
        "{}/api/heatmap?min_lat=-1e308&max_lat=1e308&rows=2&cols=2",
        base
    ))
    .await;

    assert_eq!(status, 200);
    let parsed: HeatmapResponse = serde_json::from_value(body).unwrap();
    assert_eq!(parsed.raw.len(), 4);
    assert!(parsed.raw.iter().all(|c| c.lat >= 8.0 && c.lat <= 37.0));
    assert!(parsed.heat.iter().all(|p| p.lat.is_finite()));
}

#[tokio::test]
async fn test_heatmap_falls_back_on_timeout() {
    let ml = MockServer::start();
    ml.mock(|when, then| {
        when.method(POST).path("/predict_grid");
        then.status(200)
            .delay(Duration::from_secs(2))
            .json_body(serde_json::json!({ "cells": [] }));
    });

    let base = spawn_server(ml.url("/predict_grid"), Duration::from_millis(150), vec![]).await;
    let (status, body): (u16, HeatmapResponse) =
        get_json(format!("{}/api/heatmap?{}&rows=4&cols=5", base, DELHI_QUERY)).await;

    assert_eq!(status, 200);
    assert_eq!(body.used, GridSource::Synthetic);
    assert_eq!(body.raw.len(), 20);
    assert_eq!(body.heat.len(), 20);
    assert!(body.raw.iter().all(|c| (0.0..=1.0).contains(&c.intensity)));
    assert!(body
        .raw
        .iter()
        .all(|c| c.score.is_some_and(|s| (0.0..=100.0).contains(&s))));
    assert_eq!(body.summary.min, Some(0.0));
    assert_eq!(body.summary.max, Some(100.0));
}

#[tokio::test]
async fn test_heatmap_falls_back_on_upstream_error() {
    let ml = MockServer::start();
    ml.mock(|when, then| {
        when.method(POST).path("/predict_grid");
        then.status(500).body("model crashed");
    });

    let base = spawn_server(ml.url("/predict_grid"), Duration::from_secs(2), vec![]).await;
    let (status, body): (u16, HeatmapResponse) =
        get_json(format!("{}/api/heatmap?{}&rows=2&cols=2", base, DELHI_QUERY)).await;

    assert_eq!(status, 200);
    assert_eq!(body.used, GridSource::Synthetic);
    assert_eq!(body.raw.len(), 4);
}

#[tokio::test]
async fn test_heatmap_falls_back_when_service_is_down() {
    // 沒有任何服務監聽的埠
    let base = spawn_server(
        "http://127.0.0.1:9/predict_grid".to_string(),
        Duration::from_secs(1),
        vec![],
    )
    .await;
    let (status, body): (u16, HeatmapResponse) =
        get_json(format!("{}/api/heatmap?{}&rows=3&cols=3", base, DELHI_QUERY)).await;

    assert_eq!(status, 200);
    assert_eq!(body.used, GridSource::Synthetic);
    assert_eq!(body.raw.len(), 9);
}

#[tokio::test]
async fn test_malformed_params_are_defaulted() {
    let ml = MockServer::start();
    let ml_mock = ml.mock(|when, then| {
        when.method(POST)
            .path("/predict_grid")
            .json_body_partial(r#"{"min_lat": 8.0, "max_lat": 37.0, "rows": 30, "cols": 30}"#);
        then.status(503);
    });

    let base = spawn_server(ml.url("/predict_grid"), Duration::from_secs(2), vec![]).await;
    let (status, body): (u16, HeatmapResponse) = get_json(format!(
        "{}/api/heatmap?min_lat=abc&max_lat=&rows=-4&cols=lots",
        base
    ))
    .await;

    ml_mock.assert();
    assert_eq!(status, 200);
    assert_eq!(body.raw.len(), 900);
}

#[tokio::test]
async fn test_listings_filter_by_bbox_and_status() {
    let base = spawn_server(
        "http://127.0.0.1:9/predict_grid".to_string(),
        Duration::from_millis(100),
        vec![
            listing("inside", 28.6, 77.2),
            listing("outside", 19.07, 72.87),
        ],
    )
    .await;

    let (status, body): (u16, ListingsResponse) = get_json(format!(
        "{}/api/listings?status=available&{}",
        base, DELHI_QUERY
    ))
    .await;
    assert_eq!(status, 200);
    assert!(body.ok);
    assert_eq!(body.listings.len(), 1);
    assert_eq!(body.listings[0].id, "inside");

    let (_, body): (u16, ListingsResponse) =
        get_json(format!("{}/api/listings?status=unknown", base)).await;
    assert!(body.listings.is_empty());

    let (_, body): (u16, ListingsResponse) =
        get_json(format!("{}/api/listings?limit=1", base)).await;
    assert_eq!(body.listings.len(), 1);
}

#[tokio::test]
async fn test_claim_flow() {
    let base = spawn_server(
        "http://127.0.0.1:9/predict_grid".to_string(),
        Duration::from_millis(100),
        vec![listing("l1", 28.6, 77.2)],
    )
    .await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/listings/l1/claim", base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["ok"], true);
    assert_eq!(body["listing"]["status"], "claimed");

    let (_, available): (u16, ListingsResponse) =
        get_json(format!("{}/api/listings?status=available", base)).await;
    assert!(available.listings.is_empty());

    let (_, claimed): (u16, ListingsResponse) =
        get_json(format!("{}/api/listings?status=claimed", base)).await;
    assert_eq!(claimed.listings.len(), 1);
    assert_eq!(claimed.listings[0].status, ListingStatus::Claimed);

    // 重複認領仍然成功
    let again = client
        .post(format!("{}/api/listings/l1/claim", base))
        .send()
        .await
        .unwrap();
    assert_eq!(again.status().as_u16(), 200);
}

#[tokio::test]
async fn test_claim_missing_listing_is_404() {
    let base = spawn_server(
        "http://127.0.0.1:9/predict_grid".to_string(),
        Duration::from_millis(100),
        vec![],
    )
    .await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/listings/nope/claim", base))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 404);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, serde_json::json!({"ok": false, "error": "Not found"}));
}

#[tokio::test]
async fn test_health() {
    let base = spawn_server(
        "http://127.0.0.1:9/predict_grid".to_string(),
        Duration::from_millis(100),
        vec![],
    )
    .await;
    let (status, body): (u16, Value) = get_json(format!("{}/api/health", base)).await;

    assert_eq!(status, 200);
    assert_eq!(body["status"], "ok");
}
