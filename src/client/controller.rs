//! Fetch lifecycle for the heatmap view.
//!
//! Two independent streams (grid and listings) each keep a generation counter
//! and a cancellation token. Starting a fetch bumps the generation and cancels
//! the previous request, which drops its future and releases the connection.
//! A result is applied only while its generation is still current and the
//! controller has not been destroyed.

use crate::client::api::HeatmapApi;
use crate::domain::model::{
    BoundingBox, GridCell, GridSource, GridSpec, GridSummary, HeatPoint, HeatmapResponse, Listing,
};
use crate::utils::error::{HeatmapError, Result};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(20_000);

#[derive(Debug, Clone, PartialEq)]
pub struct ControllerOptions {
    pub bbox: BoundingBox,
    pub grid: GridSpec,
    pub poll_interval: Duration,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            bbox: BoundingBox::default(),
            grid: GridSpec::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FetchPhase {
    #[default]
    Idle,
    Loading,
    Ready,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeatSummary {
    pub cells: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub source: GridSource,
}

/// Snapshot published to renderers on every state change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeatmapView {
    pub heat_phase: FetchPhase,
    pub heat_points: Vec<HeatPoint>,
    pub summary: Option<HeatSummary>,
    pub listings_phase: FetchPhase,
    pub listings: Vec<Listing>,
    pub claim_error: Option<String>,
}

impl HeatmapView {
    pub fn status_line(&self) -> String {
        match (&self.heat_phase, &self.summary) {
            (FetchPhase::Loading, _) => "Loading…".to_string(),
            (FetchPhase::Failed(message), _) => format!("Error: {}", message),
            (_, Some(summary)) => format!("Ready ({} cells, {})", summary.cells, summary.source.as_str()),
            _ => "Idle".to_string(),
        }
    }

    pub fn min_max_line(&self) -> String {
        match &self.summary {
            Some(HeatSummary {
                min: Some(min),
                max: Some(max),
                ..
            }) => format!("{:.2} / {:.2}", min, max),
            _ => "—".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct FetchParams {
    bbox: BoundingBox,
    grid: GridSpec,
}

#[derive(Debug, Default)]
struct FetchSlot {
    generation: u64,
    token: Option<CancellationToken>,
}

impl FetchSlot {
    fn begin(&mut self, parent: &CancellationToken) -> (u64, CancellationToken) {
        if let Some(previous) = self.token.take() {
            previous.cancel();
        }
        self.generation += 1;
        let token = parent.child_token();
        self.token = Some(token.clone());
        (self.generation, token)
    }

    /// Marks `generation` finished; false when it has been superseded.
    fn finish(&mut self, generation: u64) -> bool {
        if self.generation != generation {
            return false;
        }
        self.token = None;
        true
    }

    fn cancel(&mut self) {
        if let Some(token) = self.token.take() {
            token.cancel();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct Shared<A: HeatmapApi> {
    api: A,
    params: Mutex<FetchParams>,
    view: watch::Sender<HeatmapView>,
    heat: Mutex<FetchSlot>,
    listings: Mutex<FetchSlot>,
    teardown: CancellationToken,
}

impl<A: HeatmapApi> Shared<A> {
    fn params(&self) -> FetchParams {
        *lock(&self.params)
    }

    fn fetch_heat(self: &Arc<Self>) -> JoinHandle<()> {
        let (generation, token) = {
            let mut slot = lock(&self.heat);
            if self.teardown.is_cancelled() {
                return tokio::spawn(async {});
            }
            let started = slot.begin(&self.teardown);
            self.view.send_modify(|view| view.heat_phase = FetchPhase::Loading);
            started
        };
        let params = self.params();
        let shared = Arc::clone(self);

        tokio::spawn(async move {
            let outcome = tokio::select! {
                _ = token.cancelled() => {
                    tracing::debug!("[Heatmap] fetch #{} canceled", generation);
                    return;
                }
                outcome = shared.api.fetch_heatmap(&params.bbox, &params.grid) => outcome,
            };
            shared.apply_heat(generation, outcome);
        })
    }

    fn apply_heat(&self, generation: u64, outcome: Result<HeatmapResponse>) {
        let mut slot = lock(&self.heat);
        if self.teardown.is_cancelled() || !slot.finish(generation) {
            tracing::debug!("[Heatmap] discarding stale result #{}", generation);
            return;
        }

        match outcome {
            Ok(response) => {
                let (points, summary) = project_response(response);
                tracing::info!("[Heatmap] loaded {} points", points.len());
                self.view.send_modify(|view| {
                    view.heat_points = points;
                    view.summary = Some(summary);
                    view.heat_phase = FetchPhase::Ready;
                });
            }
            Err(e) => {
                tracing::warn!("[Heatmap] error: {}", e);
                // 失敗時清空舊資料，不顯示未經確認的熱區
                self.view.send_modify(|view| {
                    view.heat_points.clear();
                    view.summary = None;
                    view.heat_phase = FetchPhase::Failed(e.user_friendly_message());
                });
            }
        }
    }

    fn fetch_listings(self: &Arc<Self>) -> JoinHandle<()> {
        let (generation, token) = {
            let mut slot = lock(&self.listings);
            if self.teardown.is_cancelled() {
                return tokio::spawn(async {});
            }
            let started = slot.begin(&self.teardown);
            self.view
                .send_modify(|view| view.listings_phase = FetchPhase::Loading);
            started
        };
        let params = self.params();
        let shared = Arc::clone(self);

        tokio::spawn(async move {
            let outcome = tokio::select! {
                _ = token.cancelled() => return,
                outcome = shared.api.fetch_listings(&params.bbox) => outcome,
            };
            shared.apply_listings(generation, outcome);
        })
    }

    fn apply_listings(&self, generation: u64, outcome: Result<Vec<Listing>>) {
        let mut slot = lock(&self.listings);
        if self.teardown.is_cancelled() || !slot.finish(generation) {
            return;
        }

        match outcome {
            Ok(listings) => self.view.send_modify(|view| {
                view.listings = listings;
                view.listings_phase = FetchPhase::Ready;
            }),
            Err(e) => {
                tracing::warn!("Failed to fetch listings: {}", e);
                self.view.send_modify(|view| {
                    view.listings.clear();
                    view.listings_phase = FetchPhase::Failed(e.user_friendly_message());
                });
            }
        }
    }

    fn refresh(self: &Arc<Self>) -> [JoinHandle<()>; 2] {
        [self.fetch_heat(), self.fetch_listings()]
    }

    fn publish_claim_error(&self, message: Option<String>) {
        if self.teardown.is_cancelled() {
            return;
        }
        self.view.send_if_modified(|view| {
            if view.claim_error == message {
                return false;
            }
            view.claim_error = message;
            true
        });
    }
}

fn project_response(response: HeatmapResponse) -> (Vec<HeatPoint>, HeatSummary) {
    let points: Vec<HeatPoint> = if response.heat.is_empty() {
        response.raw.iter().map(GridCell::heat_point).collect()
    } else {
        response.heat
    };
    let points: Vec<HeatPoint> = points.into_iter().map(HeatPoint::clamped).collect();

    let scores = GridSummary::from_cells(&response.raw);
    let summary = HeatSummary {
        cells: if response.raw.is_empty() {
            points.len()
        } else {
            response.raw.len()
        },
        min: scores.min,
        max: scores.max,
        source: response.used,
    };
    (points, summary)
}

/// 管理熱區圖的抓取、取消與輪詢
pub struct HeatFetchController<A: HeatmapApi> {
    shared: Arc<Shared<A>>,
    poll_interval: Duration,
    poll: Mutex<Option<JoinHandle<()>>>,
}

impl<A: HeatmapApi> HeatFetchController<A> {
    pub fn new(api: A, options: ControllerOptions) -> Self {
        let (view, _) = watch::channel(HeatmapView::default());
        Self {
            shared: Arc::new(Shared {
                api,
                params: Mutex::new(FetchParams {
                    bbox: options.bbox,
                    grid: options.grid,
                }),
                view,
                heat: Mutex::new(FetchSlot::default()),
                listings: Mutex::new(FetchSlot::default()),
                teardown: CancellationToken::new(),
            }),
            poll_interval: options.poll_interval,
            poll: Mutex::new(None),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<HeatmapView> {
        self.shared.view.subscribe()
    }

    pub fn snapshot(&self) -> HeatmapView {
        self.shared.view.borrow().clone()
    }

    pub fn bbox(&self) -> BoundingBox {
        self.shared.params().bbox
    }

    pub fn is_destroyed(&self) -> bool {
        self.shared.teardown.is_cancelled()
    }

    /// Starts the poll loop. The first tick fires immediately.
    pub fn start(&self) {
        if self.is_destroyed() {
            return;
        }
        let period = self.poll_interval;
        let shared = Arc::clone(&self.shared);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = shared.teardown.cancelled() => break,
                    _ = ticker.tick() => {
                        let _ = shared.refresh();
                    }
                }
            }
            tracing::debug!("Poll loop stopped");
        });

        if let Some(previous) = lock(&self.poll).replace(handle) {
            previous.abort();
        }
    }

    pub fn is_polling(&self) -> bool {
        lock(&self.poll)
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// New bbox/grid, fetched immediately. A running poll loop is restarted
    /// so its schedule follows the new params.
    pub fn set_params(&self, bbox: BoundingBox, grid: GridSpec) {
        *lock(&self.shared.params) = FetchParams { bbox, grid };
        if self.is_polling() {
            self.start();
        } else {
            let _ = self.shared.refresh();
        }
    }

    pub fn fetch_heat(&self) -> JoinHandle<()> {
        self.shared.fetch_heat()
    }

    pub fn fetch_listings(&self) -> JoinHandle<()> {
        self.shared.fetch_listings()
    }

    /// Manual refresh of both streams.
    pub fn refresh(&self) -> [JoinHandle<()>; 2] {
        self.shared.refresh()
    }

    /// Claims a listing, then reloads the listings stream. Failures are
    /// surfaced through `claim_error` and leave heat data untouched.
    pub async fn claim_listing(&self, id: &str) -> Result<Listing> {
        if self.is_destroyed() {
            return Err(HeatmapError::Cancelled);
        }

        match self.shared.api.claim_listing(id).await {
            Ok(listing) => {
                self.shared.publish_claim_error(None);
                if let Err(e) = self.shared.fetch_listings().await {
                    tracing::warn!("Listings refresh after claim aborted: {}", e);
                }
                Ok(listing)
            }
            Err(e) => {
                tracing::error!("claim failed: {}", e);
                self.shared
                    .publish_claim_error(Some(format!("Claim failed: {}", e.user_friendly_message())));
                Err(e)
            }
        }
    }

    /// Releases the poll timer and every pending request. Idempotent.
    pub fn destroy(&self) {
        self.shared.teardown.cancel();
        lock(&self.shared.heat).cancel();
        lock(&self.shared.listings).cancel();
        if let Some(handle) = lock(&self.poll).take() {
            handle.abort();
        }
    }
}

impl<A: HeatmapApi> Drop for HeatFetchController<A> {
    fn drop(&mut self) {
        self.destroy();
    }
}
