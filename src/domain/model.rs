use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 經緯度矩形範圍
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    pub fn new(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> Self {
        Self {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        }
    }

    pub fn lat_span(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    pub fn lon_span(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lon + self.max_lon) / 2.0,
        )
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lon >= self.min_lon && lon <= self.max_lon
    }
}

impl Default for BoundingBox {
    /// Roughly the Indian subcontinent.
    fn default() -> Self {
        Self::new(8.0, 37.0, 68.0, 97.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSpec {
    pub rows: u32,
    pub cols: u32,
}

impl GridSpec {
    pub fn new(rows: u32, cols: u32) -> Self {
        Self { rows, cols }
    }

    pub fn cell_count(&self) -> usize {
        self.rows as usize * self.cols as usize
    }
}

impl Default for GridSpec {
    fn default() -> Self {
        Self::new(30, 30)
    }
}

/// One grid sample. Only `lat`, `lon` and `intensity` are required on input;
/// any field received from the model is written back out unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct GridCell {
    pub row: Option<u32>,
    pub col: Option<u32>,
    pub lat: f64,
    pub lon: f64,
    pub score: Option<f64>,
    pub intensity: f64,
    received: Map<String, Value>,
}

impl GridCell {
    pub fn new(row: u32, col: u32, lat: f64, lon: f64, score: f64, intensity: f64) -> Self {
        Self {
            row: Some(row),
            col: Some(col),
            lat,
            lon,
            score: Some(score),
            intensity,
            received: Map::new(),
        }
    }

    pub fn heat_point(&self) -> HeatPoint {
        HeatPoint::new(self.lat, self.lon, self.intensity)
    }
}

fn required_number(fields: &Map<String, Value>, key: &str) -> Result<f64, String> {
    fields
        .get(key)
        .and_then(Value::as_f64)
        .ok_or_else(|| format!("grid cell is missing numeric `{}`", key))
}

fn optional_index(fields: &Map<String, Value>, key: &str) -> Option<u32> {
    fields
        .get(key)
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
}

impl TryFrom<Map<String, Value>> for GridCell {
    type Error = String;

    fn try_from(fields: Map<String, Value>) -> Result<Self, Self::Error> {
        Ok(Self {
            row: optional_index(&fields, "row"),
            col: optional_index(&fields, "col"),
            lat: required_number(&fields, "lat")?,
            lon: required_number(&fields, "lon")?,
            score: fields.get("score").and_then(Value::as_f64),
            intensity: required_number(&fields, "intensity")?,
            received: fields,
        })
    }
}

impl From<GridCell> for Map<String, Value> {
    fn from(cell: GridCell) -> Self {
        let mut fields = cell.received;
        // 數值未變時保留原始表示 (例如整數 28 不改寫成 28.0)
        let mut put = |key: &str, value: Value| {
            let unchanged = match (fields.get(key), &value) {
                (Some(old), Value::Number(new)) => old.as_f64() == new.as_f64(),
                _ => false,
            };
            if !unchanged {
                fields.insert(key.to_string(), value);
            }
        };
        if let Some(row) = cell.row {
            put("row", Value::from(row));
        }
        if let Some(col) = cell.col {
            put("col", Value::from(col));
        }
        put("lat", Value::from(cell.lat));
        put("lon", Value::from(cell.lon));
        if let Some(score) = cell.score {
            put("score", Value::from(score));
        }
        put("intensity", Value::from(cell.intensity));
        fields
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GridSummary {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl GridSummary {
    /// min/max of the finite scores; both `None` when there are none.
    pub fn from_cells(cells: &[GridCell]) -> Self {
        let mut scores = cells.iter().filter_map(|c| c.score).filter(|s| s.is_finite());
        let Some(first) = scores.next() else {
            return Self::default();
        };
        let (min, max) = scores.fold((first, first), |(lo, hi), s| (lo.min(s), hi.max(s)));
        Self {
            min: Some(min),
            max: Some(max),
        }
    }
}

/// 格點資料來源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GridSource {
    #[serde(rename = "ml")]
    Model,
    #[serde(rename = "synthetic")]
    Synthetic,
}

impl GridSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            GridSource::Model => "ml",
            GridSource::Synthetic => "synthetic",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridResult {
    pub cells: Vec<GridCell>,
    pub summary: GridSummary,
    pub source: GridSource,
}

impl GridResult {
    pub fn heat_points(&self) -> Vec<HeatPoint> {
        self.cells.iter().map(GridCell::heat_point).collect()
    }
}

/// `[lat, lon, intensity]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 3]", into = "[f64; 3]")]
pub struct HeatPoint {
    pub lat: f64,
    pub lon: f64,
    pub intensity: f64,
}

impl HeatPoint {
    pub fn new(lat: f64, lon: f64, intensity: f64) -> Self {
        Self {
            lat,
            lon,
            intensity,
        }
    }

    /// Intensity forced into [0, 1]; non-finite values become 0.
    pub fn clamped(self) -> Self {
        let intensity = if self.intensity.is_finite() {
            self.intensity.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self { intensity, ..self }
    }
}

impl From<[f64; 3]> for HeatPoint {
    fn from(v: [f64; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

impl From<HeatPoint> for [f64; 3] {
    fn from(p: HeatPoint) -> Self {
        [p.lat, p.lon, p.intensity]
    }
}

/// 預測模型的情境特徵
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextFeatures {
    pub pop_density: f64,
    pub has_event: i64,
    pub temp_celsius: f64,
    pub hour: i64,
    pub dayofweek: i64,
}

impl Default for ContextFeatures {
    fn default() -> Self {
        Self {
            pop_density: 1000.0,
            has_event: 0,
            temp_celsius: 30.0,
            hour: 12,
            dayofweek: 2,
        }
    }
}

/// Body POSTed to the prediction service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
    pub rows: u32,
    pub cols: u32,
    pub pop_density_default: f64,
    pub has_event: i64,
    pub temp_celsius: f64,
    pub hour: i64,
    pub dayofweek: i64,
}

impl PredictionRequest {
    pub fn new(bbox: &BoundingBox, grid: &GridSpec, features: &ContextFeatures) -> Self {
        Self {
            min_lat: bbox.min_lat,
            max_lat: bbox.max_lat,
            min_lon: bbox.min_lon,
            max_lon: bbox.max_lon,
            rows: grid.rows,
            cols: grid.cols,
            pop_density_default: features.pop_density,
            has_event: features.has_event,
            temp_celsius: features.temp_celsius,
            hour: features.hour,
            dayofweek: features.dayofweek,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PredictionResponse {
    #[serde(default)]
    pub cells: Vec<GridCell>,
}

/// `GET /api/heatmap` response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatmapResponse {
    #[serde(default)]
    pub heat: Vec<HeatPoint>,
    #[serde(default)]
    pub raw: Vec<GridCell>,
    pub used: GridSource,
    #[serde(default)]
    pub summary: GridSummary,
}

impl From<GridResult> for HeatmapResponse {
    fn from(result: GridResult) -> Self {
        Self {
            heat: result.heat_points(),
            summary: result.summary,
            used: result.source,
            raw: result.cells,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    Available,
    Claimed,
    Picked,
    Cancelled,
}

impl ListingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingStatus::Available => "available",
            ListingStatus::Claimed => "claimed",
            ListingStatus::Picked => "picked",
            ListingStatus::Cancelled => "cancelled",
        }
    }
}

impl std::str::FromStr for ListingStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "available" => Ok(ListingStatus::Available),
            "claimed" => Ok(ListingStatus::Claimed),
            "picked" => Ok(ListingStatus::Picked),
            "cancelled" => Ok(ListingStatus::Cancelled),
            other => Err(format!("unknown listing status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    #[serde(alias = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub address: String,
    #[serde(default = "default_status")]
    pub status: ListingStatus,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub pickup_time: Option<DateTime<Utc>>,
}

fn default_quantity() -> u32 {
    1
}

fn default_status() -> ListingStatus {
    ListingStatus::Available
}

impl Listing {
    /// 顯示用的取貨時間；未指定時退回建立時間
    pub fn pickup_or_created(&self) -> DateTime<Utc> {
        self.pickup_time.unwrap_or(self.created_at)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingsResponse {
    pub ok: bool,
    #[serde(default)]
    pub listings: Vec<Listing>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimResponse {
    pub ok: bool,
    #[serde(default)]
    pub listing: Option<Listing>,
    #[serde(default)]
    pub error: Option<String>,
}
