use crate::domain::model::{Listing, ListingStatus};
use crate::domain::ports::{ListingFilter, ListingStore};
use crate::utils::error::Result;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

pub const DEMO_TITLE_PREFIX: &str = "Demo surplus #";

/// Process-local listing store. Clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryListingStore {
    listings: Arc<RwLock<Vec<Listing>>>,
}

impl InMemoryListingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.listings.read().await.len()
    }

    /// 從 JSON 陣列檔載入 listing
    pub async fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<usize> {
        let content = tokio::fs::read_to_string(path).await?;
        let loaded: Vec<Listing> = serde_json::from_str(&content)?;
        let count = loaded.len();
        self.listings.write().await.extend(loaded);
        Ok(count)
    }

    pub async fn seed_demo(&self, seed: &DemoSeed) -> Vec<Listing> {
        let created = seed.generate();
        self.listings.write().await.extend(created.iter().cloned());
        tracing::info!(
            "🌱 Seeded {} demo listings around ({}, {})",
            created.len(),
            seed.center_lat,
            seed.center_lon
        );
        created
    }
}

#[async_trait::async_trait]
impl ListingStore for InMemoryListingStore {
    async fn find(&self, filter: &ListingFilter) -> Result<Vec<Listing>> {
        let listings = self.listings.read().await;
        Ok(listings
            .iter()
            .filter(|l| filter.matches(l))
            .take(filter.limit)
            .cloned()
            .collect())
    }

    async fn set_status(&self, id: &str, status: ListingStatus) -> Result<Option<Listing>> {
        let mut listings = self.listings.write().await;
        Ok(listings.iter_mut().find(|l| l.id == id).map(|listing| {
            listing.status = status;
            listing.clone()
        }))
    }

    async fn insert(&self, listing: Listing) -> Result<Listing> {
        self.listings.write().await.push(listing.clone());
        Ok(listing)
    }
}

/// Demo listings scattered around a centre point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemoSeed {
    pub count: usize,
    pub center_lat: f64,
    pub center_lon: f64,
    pub spread: f64,
}

impl Default for DemoSeed {
    /// Central Delhi.
    fn default() -> Self {
        Self {
            count: 50,
            center_lat: 28.6448,
            center_lon: 77.216721,
            spread: 0.12,
        }
    }
}

impl DemoSeed {
    /// Points follow a golden-angle spiral so the layout is stable between
    /// runs and always stays within `spread / 2` of the centre.
    pub fn generate(&self) -> Vec<Listing> {
        let golden_angle = std::f64::consts::PI * (3.0 - 5f64.sqrt());
        let half = self.spread / 2.0;
        let now = Utc::now();

        (0..self.count)
            .map(|i| {
                let radius = half * ((i as f64 + 0.5) / self.count.max(1) as f64).sqrt();
                let theta = i as f64 * golden_angle;
                Listing {
                    id: uuid::Uuid::new_v4().to_string(),
                    title: format!("{}{}", DEMO_TITLE_PREFIX, i + 1),
                    description: "Ready-to-eat surplus food (demo)".to_string(),
                    quantity: (i % 10) as u32 + 1,
                    lat: self.center_lat + radius * theta.sin(),
                    lon: self.center_lon + radius * theta.cos(),
                    address: "Demo address".to_string(),
                    status: ListingStatus::Available,
                    created_at: now,
                    pickup_time: Some(now + Duration::hours((i % 4) as i64)),
                }
            })
            .collect()
    }
}
