use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use critterscope::{
    config::ViewerConfig,
    hittest::HitTestParams,
    poll::Pollers,
    service::HttpWorldService,
    ui::{self, UiOptions},
    viewer::ViewerState,
    viewport::Viewport,
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Live terminal viewer for a critter world server")]
struct Cli {
    /// Base URL of the world server
    #[arg(long)]
    server_url: Option<String>,

    /// Path to a YAML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Initial viewport as a query string, e.g. "x=0&y=0&w=50&h=50"
    #[arg(long)]
    viewport: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Open the interactive viewer (the default)
    View,
    /// Fetch one live frame and print a summary
    Snapshot,
    /// Save a critter's portrait SVG to a file
    Portrait {
        /// Critter id
        id: u64,
        /// Output path
        #[arg(long, default_value = "portrait.svg")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so they never corrupt the terminal UI on stdout.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    config.validate().context("invalid configuration")?;

    let service = HttpWorldService::new(config.server_url.clone())
        .context("failed to build HTTP client")?;

    match cli.command.unwrap_or(Command::View) {
        Command::View => run_view(service, config).await,
        Command::Snapshot => run_snapshot(service, config).await,
        Command::Portrait { id, out } => run_portrait(service, id, out).await,
    }
}

fn load_config(cli: &Cli) -> Result<ViewerConfig> {
    let mut config = match &cli.config {
        Some(path) => ViewerConfig::load_from_path(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => ViewerConfig::default(),
    };
    if let Some(url) = &cli.server_url {
        config.server_url = url.clone();
    }
    if let Some(query) = &cli.viewport {
        config.viewport =
            Viewport::from_query(query).context("invalid --viewport query string")?;
    }
    Ok(config)
}

async fn run_view(service: HttpWorldService, config: ViewerConfig) -> Result<()> {
    let viewport = config.viewport;
    let state = ViewerState::new(viewport);
    let (updates_tx, updates_rx) = tokio::sync::mpsc::channel(64);
    let pollers = Pollers::spawn(service, config.poll_intervals(), viewport, updates_tx);

    let options = UiOptions {
        smoothing: config.smoothing,
        frame: config.frame_interval(),
        hit_params: HitTestParams {
            tolerance: config.hit_tolerance,
            ..HitTestParams::default()
        },
    };
    ui::run(state, pollers, updates_rx, options).await
}

async fn run_snapshot(service: HttpWorldService, config: ViewerConfig) -> Result<()> {
    let viewport = config.viewport;
    let critters = service
        .critters(viewport)
        .await
        .context("failed to fetch critters")?;
    let season = service.current_season().await.ok();

    println!("viewport {}", viewport.to_query());
    if let Some(season) = season {
        println!("season {}", season.name);
    }
    println!("{} critters in view", critters.len());
    for critter in &critters {
        println!(
            "  #{:<6} {:?} at ({:.0}, {:.0})  health {:.0}/{:.0}  energy {:.0}  goal {}",
            critter.id,
            critter.diet,
            critter.x,
            critter.y,
            critter.health,
            critter.max_health,
            critter.energy,
            critter.goal,
        );
    }
    Ok(())
}

async fn run_portrait(service: HttpWorldService, id: u64, out: PathBuf) -> Result<()> {
    let bytes = service
        .critter_portrait(id)
        .await
        .with_context(|| format!("failed to fetch portrait for critter {id}"))?;
    tokio::fs::write(&out, &bytes)
        .await
        .with_context(|| format!("failed to write {}", out.display()))?;
    println!("wrote {} bytes to {}", bytes.len(), out.display());
    Ok(())
}
