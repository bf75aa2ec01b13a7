use crate::config::toml_config::TomlConfig;
use crate::utils::error::Result;
use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "foodlink-heatmap")]
#[command(about = "Demand heatmap and listing locator server")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Override server port
    #[arg(long)]
    pub port: Option<u16>,

    /// Override prediction service URL
    #[arg(long)]
    pub ml_service_url: Option<String>,

    /// Override prediction timeout in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Seed N demo listings around central Delhi
    #[arg(long)]
    pub seed_demo: Option<usize>,

    /// Emit JSON log lines
    #[arg(long)]
    pub log_json: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl CliConfig {
    /// 合併優先序: 命令列 > 環境變數 > 設定檔 > 預設值
    pub fn resolve(&self) -> Result<TomlConfig> {
        let mut config = match &self.config {
            Some(path) => {
                tracing::info!("📁 Loading configuration from: {}", path);
                TomlConfig::from_file(path)?
            }
            None => TomlConfig::default(),
        };

        config.apply_env_overrides();

        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(url) = &self.ml_service_url {
            config.prediction.endpoint = url.clone();
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.prediction.timeout_ms = timeout_ms;
        }
        if let Some(count) = self.seed_demo {
            let mut seed = config.listings.demo_seed.clone().unwrap_or_default();
            seed.count = count;
            config.listings.demo_seed = Some(seed);
        }

        Ok(config)
    }
}
