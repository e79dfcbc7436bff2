use anyhow::{bail, Context, Result};
use canyon_cli::{apply_token_override, init_tracing, load_waypoints};
use canyon_router::{Config, RouteEngine};
use clap::Parser;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[command(author, version, about = "Generate a walking route for a canyon entry", long_about = None)]
struct Args {
    /// JSON array of waypoints: {"id"?, "coordinate": [lon, lat], "segment_mode"?}
    #[arg(long)]
    waypoints: PathBuf,

    /// Write the GeoJSON feature here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Access token for the directions and terrain services (defaults to CANYON_ACCESS_TOKEN)
    #[arg(long)]
    token: Option<String>,

    /// Terrain tile zoom level
    #[arg(long)]
    zoom: Option<u8>,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing()?;
    let args = Args::parse();

    let mut config = Config::from_env();
    if let Some(zoom) = args.zoom {
        config.terrain_zoom = zoom.min(15);
    }
    let engine = RouteEngine::from_config(config);
    apply_token_override(&engine, args.token);

    let waypoints = load_waypoints(&args.waypoints)?;
    if !waypoints.is_routable() {
        bail!(
            "{} has {} waypoint(s); at least 2 are required",
            args.waypoints.display(),
            waypoints.len()
        );
    }

    tracing::info!("Loaded {} waypoints from {}", waypoints.len(), args.waypoints.display());

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let outcome = engine
        .generate(&waypoints, &cancel)
        .await
        .context("route generation failed")?;
    for warning in &outcome.warnings {
        eprintln!("warning: {}", warning);
    }

    let feature = serde_json::to_string_pretty(&outcome.route.to_feature())?;
    match args.output {
        Some(path) => {
            std::fs::write(&path, feature)
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!(
                "Wrote {} ({:.0} m, {:.0} min)",
                path.display(),
                outcome.route.distance_m,
                outcome.route.duration_s / 60.0
            );
        }
        None => println!("{}", feature),
    }

    Ok(())
}
