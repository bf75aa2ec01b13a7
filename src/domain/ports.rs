use crate::domain::model::{BoundingBox, GridCell, Listing, ListingStatus, PredictionRequest};
use crate::utils::error::Result;
use async_trait::async_trait;

/// External demand model. Implementations may fail in any way; the gateway
/// absorbs every failure.
#[async_trait]
pub trait PredictionModel: Send + Sync {
    async fn predict_grid(&self, request: &PredictionRequest) -> Result<Vec<GridCell>>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListingFilter {
    pub status: Option<ListingStatus>,
    pub bbox: Option<BoundingBox>,
    pub limit: usize,
}

impl ListingFilter {
    pub fn matches(&self, listing: &Listing) -> bool {
        if let Some(status) = self.status {
            if listing.status != status {
                return false;
            }
        }
        match &self.bbox {
            Some(bbox) => bbox.contains(listing.lat, listing.lon),
            None => true,
        }
    }
}

#[async_trait]
pub trait ListingStore: Send + Sync {
    async fn find(&self, filter: &ListingFilter) -> Result<Vec<Listing>>;

    /// Returns the updated listing, or `None` when the id is unknown.
    async fn set_status(&self, id: &str, status: ListingStatus) -> Result<Option<Listing>>;

    async fn insert(&self, listing: Listing) -> Result<Listing>;
}
