//! Character-cell map surface with a Web-Mercator viewport.

use crate::client::renderer::{MapSurface, Overlay, OverlayId, OverlayRegistry};
use crate::domain::model::BoundingBox;
use std::f64::consts::PI;

const RAMP: &[u8] = b" .:-=+*#%@";
const MARKER: char = 'o';
/// Screen pixels covered by one character cell.
const PIXELS_PER_CELL: f64 = 8.0;

fn mercator_y(lat: f64) -> f64 {
    let lat = lat.clamp(-85.0511, 85.0511).to_radians();
    (PI / 4.0 + lat / 2.0).tan().ln()
}

/// Fixed-zoom surface: heat layer `max_zoom` has no effect here since every
/// frame is normalised by its own peak.
pub struct TileMap {
    width: usize,
    height: usize,
    viewport: BoundingBox,
    overlays: OverlayRegistry,
}

impl TileMap {
    pub fn new(width: usize, height: usize, viewport: BoundingBox) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            viewport,
            overlays: OverlayRegistry::new(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn fit_bounds(&mut self, bbox: BoundingBox) {
        self.viewport = bbox;
    }

    /// Fractional (column, row) for a coordinate, `None` outside the viewport.
    pub fn project(&self, lat: f64, lon: f64) -> Option<(f64, f64)> {
        if !lat.is_finite() || !lon.is_finite() || !self.viewport.contains(lat, lon) {
            return None;
        }

        let lon_span = self.viewport.lon_span();
        let x = if lon_span > 0.0 {
            (lon - self.viewport.min_lon) / lon_span
        } else {
            0.5
        };

        let top = mercator_y(self.viewport.max_lat);
        let bottom = mercator_y(self.viewport.min_lat);
        let y = if top > bottom {
            (top - mercator_y(lat)) / (top - bottom)
        } else {
            0.5
        };

        Some((
            x * (self.width - 1) as f64,
            y * (self.height - 1) as f64,
        ))
    }

    fn heat_field(&self) -> Vec<f64> {
        let mut field = vec![0.0; self.width * self.height];

        for (_, overlay) in self.overlays.iter() {
            let Overlay::Heat { points, options } = overlay else {
                continue;
            };
            let radius = options.radius as f64 / PIXELS_PER_CELL;
            let blur = options.blur as f64 / PIXELS_PER_CELL;
            let reach = radius + blur;

            for point in points {
                let Some((px, py)) = self.project(point.lat, point.lon) else {
                    continue;
                };
                let col_lo = (px - reach).floor().max(0.0) as usize;
                let col_hi = ((px + reach).ceil() as usize).min(self.width - 1);
                let row_lo = (py - reach).floor().max(0.0) as usize;
                let row_hi = ((py + reach).ceil() as usize).min(self.height - 1);

                for row in row_lo..=row_hi {
                    for col in col_lo..=col_hi {
                        // 字元格約為 1:2，縱向距離加倍
                        let dx = col as f64 - px;
                        let dy = (row as f64 - py) * 2.0;
                        let d = (dx * dx + dy * dy).sqrt();
                        let weight = if d <= radius {
                            1.0
                        } else if blur > 0.0 && d <= reach {
                            1.0 - (d - radius) / blur
                        } else {
                            0.0
                        };
                        field[row * self.width + col] += point.intensity * weight;
                    }
                }
            }
        }
        field
    }

    /// Draws heat with a normalised ramp, then listing markers on top.
    pub fn render_ascii(&self) -> String {
        let field = self.heat_field();
        let peak = field.iter().cloned().fold(0.0_f64, f64::max);

        let mut canvas: Vec<Vec<char>> = (0..self.height)
            .map(|row| {
                (0..self.width)
                    .map(|col| {
                        let value = field[row * self.width + col];
                        if peak <= 0.0 || value <= 0.0 {
                            return ' ';
                        }
                        let level = ((value / peak) * (RAMP.len() - 1) as f64).round() as usize;
                        RAMP[level.min(RAMP.len() - 1)] as char
                    })
                    .collect()
            })
            .collect();

        for (_, overlay) in self.overlays.iter() {
            if let Overlay::Marker(marker) = overlay {
                if let Some((x, y)) = self.project(marker.lat, marker.lon) {
                    canvas[y.round() as usize][x.round() as usize] = MARKER;
                }
            }
        }

        canvas
            .into_iter()
            .map(|row| row.into_iter().collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl MapSurface for TileMap {
    fn add_overlay(&mut self, overlay: Overlay) -> OverlayId {
        self.overlays.add_overlay(overlay)
    }

    fn remove_overlay(&mut self, id: OverlayId) -> Option<Overlay> {
        self.overlays.remove_overlay(id)
    }

    fn overlay(&self, id: OverlayId) -> Option<&Overlay> {
        self.overlays.overlay(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::renderer::{HeatLayerOptions, ListingMarker};
    use crate::domain::model::HeatPoint;

    fn delhi() -> BoundingBox {
        BoundingBox::new(28.5, 28.8, 77.05, 77.35)
    }

    #[test]
    fn test_projection_corners() {
        let map = TileMap::new(41, 21, delhi());
        assert_eq!(map.project(28.8, 77.05), Some((0.0, 0.0)));
        let (x, y) = map.project(28.5, 77.35).unwrap();
        assert!((x - 40.0).abs() < 1e-9);
        assert!((y - 20.0).abs() < 1e-9);
        assert!(map.project(30.0, 77.1).is_none());
        assert!(map.project(f64::NAN, 77.1).is_none());
    }

    #[test]
    fn test_mercator_stretches_north() {
        let map = TileMap::new(10, 101, BoundingBox::new(0.0, 60.0, 0.0, 10.0));
        let (_, y_mid) = map.project(30.0, 5.0).unwrap();
        // 高緯度被拉長，30° 會落在畫面中線以下
        assert!(y_mid > 50.0);
    }

    #[test]
    fn test_empty_map_renders_blank() {
        let map = TileMap::new(8, 4, delhi());
        let out = map.render_ascii();
        assert_eq!(out.lines().count(), 4);
        assert!(out.chars().all(|c| c == ' ' || c == '\n'));
    }

    #[test]
    fn test_heat_peak_and_marker() {
        let mut map = TileMap::new(31, 15, delhi());
        map.add_overlay(Overlay::Heat {
            points: vec![HeatPoint::new(28.65, 77.2, 1.0)],
            options: HeatLayerOptions::default(),
        });
        map.add_overlay(Overlay::Marker(ListingMarker {
            listing_id: "l1".to_string(),
            lat: 28.8,
            lon: 77.05,
            popup: String::new(),
        }));

        let out = map.render_ascii();
        let rows: Vec<&str> = out.lines().collect();
        assert_eq!(rows.len(), 15);
        assert!(rows.iter().all(|r| r.chars().count() == 31));
        assert!(out.contains('@'));
        assert_eq!(rows[0].chars().next(), Some('o'));
    }

    #[test]
    fn test_fit_bounds_moves_viewport() {
        let mut map = TileMap::new(10, 10, BoundingBox::default());
        assert!(map.project(28.6, 77.2).is_some());
        map.fit_bounds(delhi());
        assert_eq!(map.project(28.8, 77.05), Some((0.0, 0.0)));
        assert!(map.project(20.0, 77.2).is_none());
    }
}
