use crate::domain::model::{BoundingBox, GridCell, GridResult, GridSource, GridSpec, GridSummary};

/// Theoretical score range of the synthetic surface.
pub const SYNTHETIC_SUMMARY: GridSummary = GridSummary {
    min: Some(0.0),
    max: Some(100.0),
};

/// 無模型時的合成格點：以範圍中心為峰值，往外線性遞減
#[derive(Debug, Clone, Copy, Default)]
pub struct GridSynthesizer;

impl GridSynthesizer {
    pub fn synthesize(bbox: &BoundingBox, grid: &GridSpec) -> GridResult {
        let lat_step = step(bbox.lat_span(), grid.rows);
        let lon_step = step(bbox.lon_span(), grid.cols);
        let (center_lat, center_lon) = bbox.center();
        let normalizer = bbox.lat_span().abs().max(bbox.lon_span().abs());

        let mut cells = Vec::with_capacity(grid.cell_count());
        for row in 0..grid.rows {
            for col in 0..grid.cols {
                let lat = bbox.min_lat + row as f64 * lat_step;
                let lon = bbox.min_lon + col as f64 * lon_step;

                // degree space, not geodesic
                let dist = (lat - center_lat).hypot(lon - center_lon);
                let intensity = if normalizer > 0.0 && normalizer.is_finite() {
                    (1.0 - dist / normalizer).clamp(0.0, 1.0)
                } else {
                    0.0
                };

                cells.push(GridCell::new(row, col, lat, lon, intensity * 100.0, intensity));
            }
        }

        GridResult {
            cells,
            summary: SYNTHETIC_SUMMARY,
            source: GridSource::Synthetic,
        }
    }
}

/// Non-finite spans collapse onto the min edge.
fn step(span: f64, samples: u32) -> f64 {
    if samples > 1 && span.is_finite() {
        span / (samples - 1) as f64
    } else {
        0.0
    }
}
