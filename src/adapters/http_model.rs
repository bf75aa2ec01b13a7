use crate::domain::model::{GridCell, PredictionRequest, PredictionResponse};
use crate::domain::ports::PredictionModel;
use crate::utils::error::{HeatmapError, Result};
use reqwest::Client;
use std::time::Duration;

pub const DEFAULT_PREDICTION_URL: &str = "http://127.0.0.1:8001/predict_grid";
pub const DEFAULT_PREDICTION_TIMEOUT: Duration = Duration::from_secs(8);

/// Prediction service reached over HTTP with a hard per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpPredictionModel {
    endpoint: String,
    timeout: Duration,
    client: Client,
}

impl HttpPredictionModel {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout,
            client: Client::new(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait::async_trait]
impl PredictionModel for HttpPredictionModel {
    async fn predict_grid(&self, request: &PredictionRequest) -> Result<Vec<GridCell>> {
        tracing::debug!(
            "Making prediction request to: {} ({}x{})",
            self.endpoint,
            request.rows,
            request.cols
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .timeout(self.timeout)
            .send()
            .await?;

        tracing::debug!("Prediction response status: {}", response.status());

        if !response.status().is_success() {
            return Err(HeatmapError::UpstreamStatusError {
                status: response.status().as_u16(),
            });
        }

        // 先取字串再解析，才能回報格式錯誤的細節
        let body = response.text().await?;
        let parsed: PredictionResponse =
            serde_json::from_str(&body).map_err(|e| HeatmapError::MalformedResponseError {
                message: e.to_string(),
            })?;

        Ok(parsed.cells)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{BoundingBox, ContextFeatures, GridSpec};
    use httpmock::prelude::*;

    fn request() -> PredictionRequest {
        PredictionRequest::new(
            &BoundingBox::new(28.5, 28.8, 77.05, 77.35),
            &GridSpec::new(1, 2),
            &ContextFeatures::default(),
        )
    }

    #[tokio::test]
    async fn test_predict_grid_success() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/predict_grid")
                .json_body_partial(r#"{"rows": 1, "cols": 2, "hour": 12}"#);
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({
                    "cells": [
                        {"row": 0, "col": 0, "lat": 28.5, "lon": 77.05, "score": 4.2, "intensity": 0.0},
                        {"row": 0, "col": 1, "lat": 28.5, "lon": 77.35, "score": 9.1, "intensity": 1.0}
                    ],
                    "summary": {"min": 4.2, "max": 9.1}
                }));
        });

        let model = HttpPredictionModel::new(server.url("/predict_grid"), DEFAULT_PREDICTION_TIMEOUT);
        let cells = model.predict_grid(&request()).await.unwrap();

        api_mock.assert();
        assert_eq!(cells.len(), 2);
        assert_eq!(cells[1].score, Some(9.1));
    }

    #[tokio::test]
    async fn test_predict_grid_non_success_status() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST).path("/predict_grid");
            then.status(500);
        });

        let model = HttpPredictionModel::new(server.url("/predict_grid"), DEFAULT_PREDICTION_TIMEOUT);
        let err = model.predict_grid(&request()).await.unwrap_err();

        api_mock.assert();
        assert!(matches!(err, HeatmapError::UpstreamStatusError { status: 500 }));
    }

    #[tokio::test]
    async fn test_predict_grid_malformed_body() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/predict_grid");
            then.status(200).body("<html>gateway</html>");
        });

        let model = HttpPredictionModel::new(server.url("/predict_grid"), DEFAULT_PREDICTION_TIMEOUT);
        let err = model.predict_grid(&request()).await.unwrap_err();
        assert!(matches!(err, HeatmapError::MalformedResponseError { .. }));
    }

    #[tokio::test]
    async fn test_predict_grid_timeout() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/predict_grid");
            then.status(200)
                .delay(Duration::from_secs(2))
                .json_body(serde_json::json!({"cells": []}));
        });

        let model = HttpPredictionModel::new(server.url("/predict_grid"), Duration::from_millis(100));
        let err = model.predict_grid(&request()).await.unwrap_err();
        assert!(matches!(err, HeatmapError::ApiError(ref e) if e.is_timeout()));
    }
}
