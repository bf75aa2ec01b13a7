use anyhow::Context;
use clap::Parser;
use foodlink_heatmap::client::{
    FetchPhase, HeatFetchController, HeatmapView, HttpHeatmapApi, MapRenderer, TileMap,
};
use foodlink_heatmap::config::toml_config::TomlConfig;
use foodlink_heatmap::domain::model::{BoundingBox, GridSpec};
use foodlink_heatmap::utils::{logger, validation::Validate};

#[derive(Parser, Debug)]
#[command(name = "heatmap-watch")]
#[command(about = "Poll the heatmap server and draw the demand map in the terminal")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Heatmap server base URL
    #[arg(long)]
    base_url: Option<String>,

    /// Bounding box as min_lat,max_lat,min_lon,max_lon
    #[arg(long, value_delimiter = ',', num_args = 4)]
    bbox: Option<Vec<f64>>,

    #[arg(long)]
    rows: Option<u32>,

    #[arg(long)]
    cols: Option<u32>,

    /// Poll interval in milliseconds
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Hide listing markers
    #[arg(long)]
    hide_listings: bool,

    /// Claim this listing once it shows up on the map
    #[arg(long)]
    claim: Option<String>,

    /// Draw the first complete frame and exit
    #[arg(long)]
    once: bool,

    #[arg(short, long, help = "Enable verbose output")]
    verbose: bool,
}

impl Args {
    fn resolve(&self) -> foodlink_heatmap::Result<TomlConfig> {
        let mut config = match &self.config {
            Some(path) => TomlConfig::from_file(path)?,
            None => TomlConfig::default(),
        };

        if let Some(url) = &self.base_url {
            config.client.base_url = url.clone();
        }
        if let Some([min_lat, max_lat, min_lon, max_lon]) = self.bbox.as_deref() {
            config.client.bbox = BoundingBox::new(*min_lat, *max_lat, *min_lon, *max_lon);
        }
        if let Some(rows) = self.rows {
            config.client.rows = rows;
        }
        if let Some(cols) = self.cols {
            config.client.cols = cols;
        }
        if let Some(interval) = self.interval_ms {
            config.client.poll_interval_ms = interval;
        }
        Ok(config)
    }
}

fn draw(map: &TileMap, view: &HeatmapView, grid: GridSpec) {
    // 清除畫面後重畫
    print!("\x1b[2J\x1b[H");
    println!("{}", map.render_ascii());
    println!("{}", "─".repeat(map.width()));
    println!("Status:  {}", view.status_line());
    println!(
        "Cells:   {}",
        view.summary
            .as_ref()
            .map(|s| s.cells.to_string())
            .unwrap_or_else(|| "—".to_string())
    );
    println!("Score:   {} (min / max)", view.min_max_line());
    println!("Grid:    {}x{}", grid.rows, grid.cols);
    match &view.listings_phase {
        FetchPhase::Failed(message) => println!("Listings: unavailable ({})", message),
        _ => println!("Listings: {}", view.listings.len()),
    }
    if let Some(error) = &view.claim_error {
        println!("⚠️  {}", error);
    }
}

fn frame_complete(view: &HeatmapView) -> bool {
    let settled = |phase: &FetchPhase| matches!(phase, FetchPhase::Ready | FetchPhase::Failed(_));
    settled(&view.heat_phase) && settled(&view.listings_phase)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logger::init_cli_logger(args.verbose);

    let config = match args.resolve().and_then(|c| c.validate().map(|_| c)) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
    };

    let api = HttpHeatmapApi::new(&config.client.base_url).context("invalid server URL")?;
    let options = config.controller_options();
    let grid = options.grid;
    tracing::info!(
        "👀 Watching {} every {:?}",
        config.client.base_url,
        options.poll_interval
    );

    let controller = HeatFetchController::new(api, options.clone());
    let mut map = TileMap::new(config.render.width, config.render.height, options.bbox);
    map.fit_bounds(controller.bbox());
    let mut renderer = MapRenderer::new(map, config.heat_layer_options());
    renderer.set_show_listings(!args.hide_listings);

    let mut updates = controller.subscribe();
    let mut pending_claim = args.claim.clone();
    controller.start();

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = updates.borrow_and_update().clone();
                renderer.render(&view);
                draw(renderer.surface(), &view, grid);

                if let Some(id) = pending_claim.as_deref() {
                    let action = renderer
                        .marker_for_listing(id)
                        .and_then(|marker| renderer.claim_action(marker));
                    if let Some(action) = action {
                        pending_claim = None;
                        match action.execute(&controller).await {
                            Ok(listing) => tracing::info!("✅ Claimed {}", listing.title),
                            Err(e) => tracing::warn!("Claim failed: {}", e),
                        }
                    }
                }

                if args.once && pending_claim.is_none() && frame_complete(&view) {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received Ctrl+C, stopping");
                break;
            }
        }
    }

    controller.destroy();
    Ok(())
}
