use crate::core::query::ListingsParams;
use crate::domain::model::{Listing, ListingStatus};
use crate::domain::ports::ListingStore;
use crate::utils::error::{HeatmapError, Result};

pub struct ListingLocator<S: ListingStore> {
    store: S,
}

impl<S: ListingStore> ListingLocator<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn find_listings(&self, params: &ListingsParams) -> Result<Vec<Listing>> {
        let Some(filter) = params.to_filter() else {
            return Ok(Vec::new());
        };
        let listings = self.store.find(&filter).await?;
        tracing::debug!(
            "🔎 Found {} listings (status={:?}, bbox={:?}, limit={})",
            listings.len(),
            filter.status,
            filter.bbox,
            filter.limit
        );
        Ok(listings)
    }

    /// Idempotent: claiming an already claimed listing returns it unchanged.
    pub async fn claim(&self, id: &str) -> Result<Listing> {
        match self.store.set_status(id, ListingStatus::Claimed).await? {
            Some(listing) => {
                tracing::info!("✅ Listing {} claimed", id);
                Ok(listing)
            }
            None => Err(HeatmapError::NotFound { id: id.to_string() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_store::InMemoryListingStore;
    use crate::core::query::DEFAULT_LISTING_LIMIT;
    use chrono::Utc;
    use std::collections::HashMap;

    fn listing(id: &str, lat: f64, lon: f64) -> Listing {
        Listing {
            id: id.to_string(),
            title: format!("Surplus {}", id),
            description: String::new(),
            quantity: 3,
            lat,
            lon,
            address: String::new(),
            status: ListingStatus::Available,
            created_at: Utc::now(),
            pickup_time: None,
        }
    }

    async fn locator() -> ListingLocator<InMemoryListingStore> {
        let store = InMemoryListingStore::new();
        store.insert(listing("a", 28.60, 77.20)).await.unwrap();
        store.insert(listing("b", 28.70, 77.30)).await.unwrap();
        store.insert(listing("c", 19.07, 72.87)).await.unwrap();
        ListingLocator::new(store)
    }

    fn query(pairs: &[(&str, &str)]) -> ListingsParams {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ListingsParams::from_query(&map, DEFAULT_LISTING_LIMIT)
    }

    #[tokio::test]
    async fn test_bbox_filter() {
        let locator = locator().await;
        let found = locator
            .find_listings(&query(&[
                ("min_lat", "28.5"),
                ("max_lat", "28.8"),
                ("min_lon", "77.05"),
                ("max_lon", "77.35"),
            ]))
            .await
            .unwrap();
        let ids: Vec<&str> = found.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_claim_missing_listing_is_not_found() {
        let locator = locator().await;
        let err = locator.claim("nope").await.unwrap_err();
        assert!(matches!(err, HeatmapError::NotFound { ref id } if id == "nope"));
    }

    #[tokio::test]
    async fn test_claimed_listing_leaves_available_query() {
        let locator = locator().await;
        let claimed = locator.claim("a").await.unwrap();
        assert_eq!(claimed.status, ListingStatus::Claimed);

        let again = locator.claim("a").await.unwrap();
        assert_eq!(again.status, ListingStatus::Claimed);

        let available = locator.find_listings(&query(&[])).await.unwrap();
        assert!(available.iter().all(|l| l.id != "a"));
        assert_eq!(available.len(), 2);

        let claimed_only = locator
            .find_listings(&query(&[("status", "claimed")]))
            .await
            .unwrap();
        assert_eq!(claimed_only.len(), 1);
    }

    #[tokio::test]
    async fn test_limit_and_unknown_status() {
        let locator = locator().await;
        let limited = locator
            .find_listings(&query(&[("limit", "1")]))
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);

        let none = locator
            .find_listings(&query(&[("status", "eaten")]))
            .await
            .unwrap();
        assert!(none.is_empty());
    }
}
