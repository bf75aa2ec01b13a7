use crate::domain::model::{
    BoundingBox, ClaimResponse, GridSpec, HeatmapResponse, Listing, ListingStatus,
    ListingsResponse,
};
use crate::utils::error::{HeatmapError, Result};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use std::time::Duration;
use url::Url;

const HEATMAP_TIMEOUT: Duration = Duration::from_secs(20);
const LISTINGS_TIMEOUT: Duration = Duration::from_secs(10);

/// Client-side view of the heatmap server.
#[async_trait]
pub trait HeatmapApi: Send + Sync + 'static {
    async fn fetch_heatmap(&self, bbox: &BoundingBox, grid: &GridSpec) -> Result<HeatmapResponse>;

    /// Available listings inside `bbox`.
    async fn fetch_listings(&self, bbox: &BoundingBox) -> Result<Vec<Listing>>;

    async fn claim_listing(&self, id: &str) -> Result<Listing>;
}

#[derive(Debug, Serialize)]
struct HeatmapQuery {
    min_lat: f64,
    max_lat: f64,
    min_lon: f64,
    max_lon: f64,
    rows: u32,
    cols: u32,
}

#[derive(Debug, Serialize)]
struct ListingsQuery {
    status: &'static str,
    min_lat: f64,
    max_lat: f64,
    min_lon: f64,
    max_lon: f64,
}

#[derive(Debug, Clone)]
pub struct HttpHeatmapApi {
    base_url: Url,
    client: Client,
}

impl HttpHeatmapApi {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(|e| HeatmapError::InvalidConfigValueError {
            field: "client.base_url".to_string(),
            value: base_url.to_string(),
            reason: format!("Invalid URL format: {}", e),
        })?;
        Ok(Self {
            base_url,
            client: Client::new(),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| HeatmapError::ConfigError {
                message: format!("Base URL cannot carry a path: {}", self.base_url),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

/// 非 2xx 時盡量取出伺服器的 `error` 訊息
async fn error_for_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string));
    tracing::debug!("Server answered {}: {}", status, message.as_deref().unwrap_or(&body));

    Err(HeatmapError::UpstreamStatusError {
        status: status.as_u16(),
    })
}

#[async_trait]
impl HeatmapApi for HttpHeatmapApi {
    async fn fetch_heatmap(&self, bbox: &BoundingBox, grid: &GridSpec) -> Result<HeatmapResponse> {
        let query = HeatmapQuery {
            min_lat: bbox.min_lat,
            max_lat: bbox.max_lat,
            min_lon: bbox.min_lon,
            max_lon: bbox.max_lon,
            rows: grid.rows,
            cols: grid.cols,
        };
        let response = self
            .client
            .get(self.endpoint(&["api", "heatmap"])?)
            .query(&query)
            .timeout(HEATMAP_TIMEOUT)
            .send()
            .await?;

        Ok(error_for_status(response).await?.json().await?)
    }

    async fn fetch_listings(&self, bbox: &BoundingBox) -> Result<Vec<Listing>> {
        let query = ListingsQuery {
            status: ListingStatus::Available.as_str(),
            min_lat: bbox.min_lat,
            max_lat: bbox.max_lat,
            min_lon: bbox.min_lon,
            max_lon: bbox.max_lon,
        };
        let response = self
            .client
            .get(self.endpoint(&["api", "listings"])?)
            .query(&query)
            .timeout(LISTINGS_TIMEOUT)
            .send()
            .await?;

        let body: ListingsResponse = error_for_status(response).await?.json().await?;
        Ok(body.listings)
    }

    async fn claim_listing(&self, id: &str) -> Result<Listing> {
        let response = self
            .client
            .post(self.endpoint(&["api", "listings", id, "claim"])?)
            .timeout(LISTINGS_TIMEOUT)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(HeatmapError::NotFound { id: id.to_string() });
        }

        let body: ClaimResponse = error_for_status(response).await?.json().await?;
        body.listing.ok_or_else(|| HeatmapError::MalformedResponseError {
            message: body
                .error
                .unwrap_or_else(|| "claim response without listing".to_string()),
        })
    }
}
