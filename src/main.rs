mod aa_controllers;
mod aa_gui;
mod aa_models;
mod aa_overlay;
mod aa_state;
mod aa_summary;
mod aa_views;

use aa_controllers::AAControllers;
use aa_models::{coordinate_string, parse_coordinate_pair, AirAwareClient};
use aa_summary::SummaryView;
use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(
    name = "airaware",
    version,
    about = "Clean-air route viewer for the AirAware prediction backend"
)]
struct Cli {
    /// Base URL of the AirAware backend
    #[arg(long, env = "AIRAWARE_API_URL", default_value = AirAwareClient::DEFAULT_BASE_URL)]
    api_url: String,

    /// Request timeout in seconds
    #[arg(long, default_value_t = AirAwareClient::REQUEST_TIMEOUT_SECS)]
    timeout: u64,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Open the desktop map viewer (default)
    Gui,
    /// Interactive terminal menu
    Terminal,
    /// Print the station list
    Stations,
    /// Predict a route between two "lat,lon" points
    Predict {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        /// Write route lines as GeoJSON
        #[arg(long)]
        geojson: Option<PathBuf>,
        /// Write the route summary table as CSV
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Check backend availability
    Health,
}

fn main() -> anyhow::Result<()> {
    // A missing .env is fine
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("\n{}", "═".repeat(70));
        eprintln!("❌ APPLICATION PANIC");
        eprintln!("{}", "═".repeat(70));
        eprintln!("\n{}", panic_info);
        eprintln!("\n💡 Please restart the application and report this issue if it persists");
        eprintln!("\n{}", "═".repeat(70));
    }));

    let cli = Cli::parse();
    let client = AirAwareClient::new(&cli.api_url, Duration::from_secs(cli.timeout))?;
    log::info!("Using backend {}", client.base_url());

    match cli.command.unwrap_or(Command::Gui) {
        Command::Gui => {
            aa_gui::run_gui(client).map_err(|e| anyhow::anyhow!("GUI error: {}", e))?;
        }
        Command::Terminal => AAControllers::new(client).run(),
        Command::Stations => {
            let stations = client.list_stations()?;
            let mut state = aa_state::AppState::new();
            state.set_stations(stations);
            aa_views::AAViews::show_all_stations(state.stations(), state.selection());
        }
        Command::Predict { from, to, geojson, csv } => {
            let (from_lat, from_lon) = parse_coordinate_pair(&from)?;
            let (to_lat, to_lon) = parse_coordinate_pair(&to)?;

            let result = client.predict_route(
                &coordinate_string(from_lat, from_lon),
                &coordinate_string(to_lat, to_lon),
            )?;

            if let Some(path) = geojson {
                let collection = aa_overlay::overlays_to_geojson(&aa_overlay::build_overlays(&result));
                let file = File::create(&path)
                    .with_context(|| format!("Failed to create {}", path.display()))?;
                serde_json::to_writer_pretty(file, &collection)?;
                println!("✓ Route lines written to {}", path.display());
            }

            if let Some(path) = csv {
                let rows = match aa_summary::summarize(Some(&result)) {
                    SummaryView::Routes(rows) => rows,
                    _ => Vec::new(),
                };
                let file = File::create(&path)
                    .with_context(|| format!("Failed to create {}", path.display()))?;
                aa_summary::write_csv(&rows, file)?;
                println!("✓ Route summary written to {}", path.display());
            }

            let mut state = aa_state::AppState::new();
            state.set_result(result);
            aa_views::AAViews::show_prediction(&state);
        }
        Command::Health => {
            if client.health()? {
                println!("✓ Backend at {} is healthy", client.base_url());
            } else {
                bail!("backend at {} reported an unhealthy status", client.base_url());
            }
        }
    }

    Ok(())
}
