// Client side: fetch lifecycle, map rendering and the terminal surface.

pub mod api;
pub mod controller;
pub mod renderer;
pub mod tile_map;

pub use api::{HeatmapApi, HttpHeatmapApi};
pub use controller::{ControllerOptions, FetchPhase, HeatFetchController, HeatmapView};
pub use renderer::{ClaimAction, HeatLayerOptions, MapRenderer, MapSurface, Overlay, OverlayId};
pub use tile_map::TileMap;
