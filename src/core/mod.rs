pub mod gateway;
pub mod locator;
pub mod query;
pub mod synthesizer;

pub use crate::domain::model::{BoundingBox, GridCell, GridResult, GridSource, GridSpec};
pub use crate::domain::ports::{ListingStore, PredictionModel};
pub use crate::utils::error::Result;
