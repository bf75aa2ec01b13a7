use crate::adapters::http_model::DEFAULT_PREDICTION_URL;
use crate::adapters::memory_store::DemoSeed;
use crate::client::controller::ControllerOptions;
use crate::client::renderer::HeatLayerOptions;
use crate::core::query::{GridDefaults, DEFAULT_LISTING_LIMIT};
use crate::domain::model::{BoundingBox, ContextFeatures, GridSpec};
use crate::utils::error::{HeatmapError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub server: ServerConfig,
    pub prediction: PredictionConfig,
    pub grid: GridConfig,
    pub listings: ListingsConfig,
    pub client: ClientConfig,
    pub render: RenderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictionConfig {
    pub endpoint: String,
    pub timeout_ms: u64,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_PREDICTION_URL.to_string(),
            timeout_ms: 8000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub bbox: BoundingBox,
    pub rows: u32,
    pub cols: u32,
    pub max_dim: u32,
    pub features: ContextFeatures,
}

impl Default for GridConfig {
    fn default() -> Self {
        let defaults = GridDefaults::default();
        Self {
            bbox: defaults.bbox,
            rows: defaults.grid.rows,
            cols: defaults.grid.cols,
            max_dim: defaults.max_grid_dim,
            features: defaults.features,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingsConfig {
    pub default_limit: usize,
    pub seed_file: Option<String>,
    pub demo_seed: Option<DemoSeed>,
}

impl Default for ListingsConfig {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_LISTING_LIMIT,
            seed_file: None,
            demo_seed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    pub poll_interval_ms: u64,
    pub bbox: BoundingBox,
    pub rows: u32,
    pub cols: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            poll_interval_ms: 20_000,
            bbox: BoundingBox::default(),
            rows: 30,
            cols: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub radius: u32,
    pub blur: u32,
    pub max_zoom: u8,
    pub width: usize,
    pub height: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        let heat = HeatLayerOptions::default();
        Self {
            radius: heat.radius,
            blur: heat.blur,
            max_zoom: heat.max_zoom,
            width: 72,
            height: 28,
        }
    }
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(HeatmapError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| HeatmapError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${ML_SERVICE_URL})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| HeatmapError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// `ML_SERVICE_URL` and `PORT` win over the file.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("ML_SERVICE_URL") {
            tracing::info!("🔧 ML_SERVICE_URL overrides prediction endpoint: {}", url);
            self.prediction.endpoint = url;
        }
        if let Ok(port) = std::env::var("PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(e) => tracing::warn!("Ignoring invalid PORT value {}: {}", port, e),
            }
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn prediction_timeout(&self) -> Duration {
        Duration::from_millis(self.prediction.timeout_ms)
    }

    pub fn grid_defaults(&self) -> GridDefaults {
        GridDefaults {
            bbox: self.grid.bbox,
            grid: GridSpec::new(self.grid.rows, self.grid.cols),
            max_grid_dim: self.grid.max_dim,
            features: self.grid.features,
        }
    }

    pub fn controller_options(&self) -> ControllerOptions {
        ControllerOptions {
            bbox: self.client.bbox,
            grid: GridSpec::new(self.client.rows, self.client.cols),
            poll_interval: Duration::from_millis(self.client.poll_interval_ms),
        }
    }

    pub fn heat_layer_options(&self) -> HeatLayerOptions {
        HeatLayerOptions {
            radius: self.render.radius,
            blur: self.render.blur,
            max_zoom: self.render.max_zoom,
        }
    }
}

impl Validate for TomlConfig {
    /// 驗證配置的合理性
    fn validate(&self) -> Result<()> {
        validation::validate_url("prediction.endpoint", &self.prediction.endpoint)?;
        validation::validate_positive_number("prediction.timeout_ms", self.prediction.timeout_ms, 1)?;

        validation::validate_span("grid.bbox.lat", self.grid.bbox.min_lat, self.grid.bbox.max_lat)?;
        validation::validate_span("grid.bbox.lon", self.grid.bbox.min_lon, self.grid.bbox.max_lon)?;
        validation::validate_positive_number("grid.max_dim", self.grid.max_dim as u64, 1)?;
        validation::validate_range("grid.rows", self.grid.rows, 1, self.grid.max_dim)?;
        validation::validate_range("grid.cols", self.grid.cols, 1, self.grid.max_dim)?;
        validation::validate_range("grid.features.hour", self.grid.features.hour, 0, 23)?;
        validation::validate_range("grid.features.dayofweek", self.grid.features.dayofweek, 0, 6)?;

        validation::validate_positive_number(
            "listings.default_limit",
            self.listings.default_limit as u64,
            1,
        )?;

        validation::validate_url("client.base_url", &self.client.base_url)?;
        validation::validate_positive_number("client.poll_interval_ms", self.client.poll_interval_ms, 1)?;
        validation::validate_span("client.bbox.lat", self.client.bbox.min_lat, self.client.bbox.max_lat)?;
        validation::validate_span("client.bbox.lon", self.client.bbox.min_lon, self.client.bbox.max_lon)?;
        validation::validate_positive_number("client.rows", self.client.rows as u64, 1)?;
        validation::validate_positive_number("client.cols", self.client.cols as u64, 1)?;

        validation::validate_positive_number("render.width", self.render.width as u64, 8)?;
        validation::validate_positive_number("render.height", self.render.height as u64, 4)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = TomlConfig::from_toml_str("").unwrap();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.prediction.endpoint, DEFAULT_PREDICTION_URL);
        assert_eq!(config.prediction_timeout(), Duration::from_secs(8));
        assert_eq!(config.grid_defaults(), GridDefaults::default());
        assert_eq!(config.controller_options().poll_interval, Duration::from_secs(20));
        assert_eq!(config.heat_layer_options(), HeatLayerOptions::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_sections() {
        let toml_content = r#"
[server]
port = 8080

[prediction]
endpoint = "http://ml:8001/predict_grid"
timeout_ms = 2500

[grid]
rows = 12
cols = 14
bbox = { min_lat = 28.5, max_lat = 28.8, min_lon = 77.05, max_lon = 77.35 }

[client]
poll_interval_ms = 5000

[render]
radius = 30
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.prediction_timeout(), Duration::from_millis(2500));
        let defaults = config.grid_defaults();
        assert_eq!(defaults.grid, GridSpec::new(12, 14));
        assert_eq!(defaults.bbox.max_lon, 77.35);
        assert_eq!(defaults.features.hour, 12);
        assert_eq!(config.render.radius, 30);
        assert_eq!(config.render.blur, 18);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("FOODLINK_TEST_ML_URL", "https://ml.example.com/predict_grid");

        let toml_content = r#"
[prediction]
endpoint = "${FOODLINK_TEST_ML_URL}"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.prediction.endpoint, "https://ml.example.com/predict_grid");

        std::env::remove_var("FOODLINK_TEST_ML_URL");
    }

    #[test]
    fn test_config_validation() {
        let invalid_url = TomlConfig::from_toml_str(
            r#"
[prediction]
endpoint = "invalid-url"
"#,
        )
        .unwrap();
        assert!(invalid_url.validate().is_err());

        let inverted = TomlConfig::from_toml_str(
            r#"
[grid]
bbox = { min_lat = 37.0, max_lat = 8.0, min_lon = 68.0, max_lon = 97.0 }
"#,
        )
        .unwrap();
        assert!(inverted.validate().is_err());

        let too_big = TomlConfig::from_toml_str(
            r#"
[grid]
rows = 500
"#,
        )
        .unwrap();
        assert!(too_big.validate().is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();

        let toml_content = r#"
[listings]
default_limit = 50
demo_seed = { count = 5, center_lat = 28.6, center_lon = 77.2, spread = 0.1 }
"#;

        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.listings.default_limit, 50);
        assert_eq!(config.listings.demo_seed.unwrap().count, 5);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = TomlConfig::from_toml_str("[server\nport = ").unwrap_err();
        assert!(matches!(err, HeatmapError::ConfigError { .. }));
    }
}
