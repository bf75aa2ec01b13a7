pub mod adapters;
pub mod client;
pub mod config;
pub mod core;
pub mod domain;
pub mod server;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::TomlConfig;

pub use crate::core::{gateway::PredictionGateway, locator::ListingLocator, synthesizer::GridSynthesizer};
pub use server::{build_router, serve, state::AppState};
pub use utils::error::{HeatmapError, Result};
