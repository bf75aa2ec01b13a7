//! Permissive query-string parsing for the heatmap and listings endpoints.
//!
//! Bad input is never rejected: each field that is missing, non-numeric or
//! out of range silently falls back to its documented default.

use crate::domain::model::{BoundingBox, ContextFeatures, GridSpec, ListingStatus};
use crate::domain::ports::ListingFilter;
use std::collections::HashMap;
use std::str::FromStr;

pub const DEFAULT_LISTING_LIMIT: usize = 200;

const MAX_LAT: f64 = 90.0;
const MAX_LON: f64 = 180.0;

/// Fallback values used when a query parameter is unusable.
#[derive(Debug, Clone, PartialEq)]
pub struct GridDefaults {
    pub bbox: BoundingBox,
    pub grid: GridSpec,
    pub max_grid_dim: u32,
    pub features: ContextFeatures,
}

impl Default for GridDefaults {
    fn default() -> Self {
        Self {
            bbox: BoundingBox::default(),
            grid: GridSpec::default(),
            max_grid_dim: 200,
            features: ContextFeatures::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeatmapParams {
    pub bbox: BoundingBox,
    pub grid: GridSpec,
    pub features: ContextFeatures,
}

impl HeatmapParams {
    pub fn from_query(query: &HashMap<String, String>, defaults: &GridDefaults) -> Self {
        let (min_lat, max_lat) = ordered(
            coord_or(query, "min_lat", defaults.bbox.min_lat, MAX_LAT),
            coord_or(query, "max_lat", defaults.bbox.max_lat, MAX_LAT),
        );
        let (min_lon, max_lon) = ordered(
            coord_or(query, "min_lon", defaults.bbox.min_lon, MAX_LON),
            coord_or(query, "max_lon", defaults.bbox.max_lon, MAX_LON),
        );

        let grid = GridSpec::new(
            dim_or(query, "rows", defaults.grid.rows, defaults.max_grid_dim),
            dim_or(query, "cols", defaults.grid.cols, defaults.max_grid_dim),
        );

        let base = &defaults.features;
        let features = ContextFeatures {
            pop_density: float_or(query, "pop_density", base.pop_density),
            has_event: int_or(query, "has_event", base.has_event),
            temp_celsius: float_or(query, "temp", base.temp_celsius),
            hour: int_or(query, "hour", base.hour),
            dayofweek: int_or(query, "dayofweek", base.dayofweek),
        };

        Self {
            bbox: BoundingBox::new(min_lat, max_lat, min_lon, max_lon),
            grid,
            features,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    Any,
    Only(ListingStatus),
    /// Unknown status string; matches nothing.
    Unmatched,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListingsParams {
    pub status: StatusFilter,
    pub bbox: Option<BoundingBox>,
    pub limit: usize,
}

impl ListingsParams {
    pub fn from_query(query: &HashMap<String, String>, default_limit: usize) -> Self {
        let status = match query.get("status").map(|s| s.trim()) {
            None => StatusFilter::Only(ListingStatus::Available),
            Some("") => StatusFilter::Any,
            Some(raw) => match ListingStatus::from_str(raw) {
                Ok(status) => StatusFilter::Only(status),
                Err(e) => {
                    tracing::debug!("{}", e);
                    StatusFilter::Unmatched
                }
            },
        };

        // 四個邊界都有效才套用範圍篩選
        let bbox = match (
            parse::<f64>(query, "min_lat"),
            parse::<f64>(query, "max_lat"),
            parse::<f64>(query, "min_lon"),
            parse::<f64>(query, "max_lon"),
        ) {
            (Some(min_lat), Some(max_lat), Some(min_lon), Some(max_lon)) => {
                Some(BoundingBox::new(min_lat, max_lat, min_lon, max_lon))
            }
            _ => None,
        };

        let limit = parse::<usize>(query, "limit")
            .filter(|limit| *limit > 0)
            .unwrap_or(default_limit);

        Self {
            status,
            bbox,
            limit,
        }
    }

    /// `None` when the status can never match.
    pub fn to_filter(&self) -> Option<ListingFilter> {
        let status = match self.status {
            StatusFilter::Any => None,
            StatusFilter::Only(status) => Some(status),
            StatusFilter::Unmatched => return None,
        };
        Some(ListingFilter {
            status,
            bbox: self.bbox,
            limit: self.limit,
        })
    }
}

fn parse<T: FromStr>(query: &HashMap<String, String>, key: &str) -> Option<T> {
    query.get(key).and_then(|raw| raw.trim().parse::<T>().ok())
}

fn float_or(query: &HashMap<String, String>, key: &str, default: f64) -> f64 {
    parse::<f64>(query, key)
        .filter(|v| v.is_finite())
        .unwrap_or(default)
}

/// Coordinates outside `[-limit, limit]` are treated as unusable.
fn coord_or(query: &HashMap<String, String>, key: &str, default: f64, limit: f64) -> f64 {
    parse::<f64>(query, key)
        .filter(|v| v.is_finite() && v.abs() <= limit)
        .unwrap_or(default)
}

fn int_or(query: &HashMap<String, String>, key: &str, default: i64) -> i64 {
    parse::<i64>(query, key).unwrap_or(default)
}

/// Fractional sizes are truncated (`2.5` → 2).
fn dim_or(query: &HashMap<String, String>, key: &str, default: u32, max: u32) -> u32 {
    match parse::<f64>(query, key).filter(|v| v.is_finite()).map(f64::trunc) {
        Some(v) if v >= 1.0 => v.min(max as f64) as u32,
        _ => default,
    }
}

fn ordered(a: f64, b: f64) -> (f64, f64) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}
