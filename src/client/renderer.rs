use crate::client::api::HeatmapApi;
use crate::client::controller::{HeatFetchController, HeatmapView};
use crate::domain::model::{HeatPoint, Listing};
use crate::utils::error::Result;
use std::collections::BTreeMap;

/// Heat layer tuning. `radius` and `blur` are in screen pixels; `max_zoom` is
/// the zoom at which intensities reach full scale, for surfaces that zoom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeatLayerOptions {
    pub radius: u32,
    pub blur: u32,
    pub max_zoom: u8,
}

impl Default for HeatLayerOptions {
    fn default() -> Self {
        Self {
            radius: 25,
            blur: 18,
            max_zoom: 12,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OverlayId(pub u64);

#[derive(Debug, Clone, PartialEq)]
pub struct ListingMarker {
    pub listing_id: String,
    pub lat: f64,
    pub lon: f64,
    pub popup: String,
}

impl ListingMarker {
    pub fn from_listing(listing: &Listing) -> Self {
        let mut popup = listing.title.clone();
        if !listing.description.is_empty() {
            popup.push('\n');
            popup.push_str(&listing.description);
        }
        popup.push_str(&format!("\nQty: {}", listing.quantity));
        popup.push_str(&format!(
            "\nPickup: {}",
            listing.pickup_or_created().format("%Y-%m-%d %H:%M")
        ));

        Self {
            listing_id: listing.id.clone(),
            lat: listing.lat,
            lon: listing.lon,
            popup,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Overlay {
    Heat {
        points: Vec<HeatPoint>,
        options: HeatLayerOptions,
    },
    Marker(ListingMarker),
}

/// Anything overlays can be drawn onto.
pub trait MapSurface {
    fn add_overlay(&mut self, overlay: Overlay) -> OverlayId;

    fn remove_overlay(&mut self, id: OverlayId) -> Option<Overlay>;

    fn overlay(&self, id: OverlayId) -> Option<&Overlay>;
}

/// Minimal surface that only keeps track of overlays.
#[derive(Debug, Default)]
pub struct OverlayRegistry {
    next_id: u64,
    overlays: BTreeMap<OverlayId, Overlay>,
}

impl OverlayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.overlays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overlays.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OverlayId, &Overlay)> {
        self.overlays.iter()
    }
}

impl MapSurface for OverlayRegistry {
    fn add_overlay(&mut self, overlay: Overlay) -> OverlayId {
        self.next_id += 1;
        let id = OverlayId(self.next_id);
        self.overlays.insert(id, overlay);
        id
    }

    fn remove_overlay(&mut self, id: OverlayId) -> Option<Overlay> {
        self.overlays.remove(&id)
    }

    fn overlay(&self, id: OverlayId) -> Option<&Overlay> {
        self.overlays.get(&id)
    }
}

/// Claim triggered from a listing marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimAction {
    pub listing_id: String,
}

impl ClaimAction {
    pub async fn execute<A: HeatmapApi>(&self, controller: &HeatFetchController<A>) -> Result<Listing> {
        tracing::info!("🙋 Claiming listing {}", self.listing_id);
        controller.claim_listing(&self.listing_id).await
    }
}

/// Owns the heat and marker overlays on a surface. The heat layer is never
/// patched: any change to the point set removes it and adds a fresh one.
pub struct MapRenderer<S: MapSurface> {
    surface: S,
    options: HeatLayerOptions,
    heat_layer: Option<OverlayId>,
    heat_points: Vec<HeatPoint>,
    markers: Vec<OverlayId>,
    listings: Vec<Listing>,
    show_listings: bool,
}

impl<S: MapSurface> MapRenderer<S> {
    pub fn new(surface: S, options: HeatLayerOptions) -> Self {
        Self {
            surface,
            options,
            heat_layer: None,
            heat_points: Vec::new(),
            markers: Vec::new(),
            listings: Vec::new(),
            show_listings: true,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn heat_layer(&self) -> Option<OverlayId> {
        self.heat_layer
    }

    pub fn markers(&self) -> &[OverlayId] {
        &self.markers
    }

    /// Returns true when the heat layer was rebuilt.
    pub fn render_heat(&mut self, points: &[HeatPoint]) -> bool {
        if points == self.heat_points.as_slice() {
            return false;
        }

        if let Some(id) = self.heat_layer.take() {
            self.surface.remove_overlay(id);
        }
        self.heat_points = points.to_vec();

        if !points.is_empty() {
            let id = self.surface.add_overlay(Overlay::Heat {
                points: self.heat_points.clone(),
                options: self.options,
            });
            self.heat_layer = Some(id);
        }
        true
    }

    pub fn render_listings(&mut self, listings: &[Listing]) -> bool {
        if listings == self.listings.as_slice() {
            return false;
        }
        self.listings = listings.to_vec();
        self.rebuild_markers();
        true
    }

    pub fn set_show_listings(&mut self, show: bool) {
        if self.show_listings == show {
            return;
        }
        self.show_listings = show;
        self.rebuild_markers();
    }

    fn rebuild_markers(&mut self) {
        for id in self.markers.drain(..) {
            self.surface.remove_overlay(id);
        }
        if !self.show_listings {
            return;
        }
        for listing in &self.listings {
            let id = self
                .surface
                .add_overlay(Overlay::Marker(ListingMarker::from_listing(listing)));
            self.markers.push(id);
        }
    }

    pub fn render(&mut self, view: &HeatmapView) {
        if self.render_heat(&view.heat_points) {
            tracing::debug!("Heat layer rebuilt with {} points", view.heat_points.len());
        }
        self.render_listings(&view.listings);
    }

    pub fn claim_action(&self, overlay: OverlayId) -> Option<ClaimAction> {
        match self.surface.overlay(overlay)? {
            Overlay::Marker(marker) => Some(ClaimAction {
                listing_id: marker.listing_id.clone(),
            }),
            Overlay::Heat { .. } => None,
        }
    }

    pub fn marker_for_listing(&self, listing_id: &str) -> Option<OverlayId> {
        self.markers.iter().copied().find(|id| {
            matches!(
                self.surface.overlay(*id),
                Some(Overlay::Marker(marker)) if marker.listing_id == listing_id
            )
        })
    }

    /// Removes every overlay this renderer owns.
    pub fn clear(&mut self) {
        if let Some(id) = self.heat_layer.take() {
            self.surface.remove_overlay(id);
        }
        self.heat_points.clear();
        for id in self.markers.drain(..) {
            self.surface.remove_overlay(id);
        }
        self.listings.clear();
    }
}
