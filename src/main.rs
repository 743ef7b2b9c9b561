//! voxview command-line client.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use voxview::constants::METADATA_ENDPOINT;
use voxview::voxview_cache::{HttpSource, SliceSource};
use voxview::{
    Plane, PlaybackSpeed, SliceLoad, ViewerAction, ViewerConfig, ViewerSession, VolumeInfo,
    VolumeShape, WindowSettings, default_viewer_shortcuts,
};

#[derive(Parser)]
#[command(name = "voxview", about = "Volumetric slice viewer client")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to the platform config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open a volume, show a slice and optionally play through it
    View(ViewArgs),
    /// List keyboard shortcuts
    Shortcuts,
    /// Print the effective configuration, optionally saving it
    Config {
        /// Write the configuration to the config file
        #[arg(long)]
        save: bool,
    },
}

#[derive(Args)]
struct ViewArgs {
    /// Viewer API base URL (overrides the config file)
    #[arg(long)]
    base_url: Option<String>,

    /// Volume shape as axial,coronal,sagittal; fetched from the API if omitted
    #[arg(long, value_delimiter = ',', num_args = 3)]
    shape: Option<Vec<usize>>,

    /// Plane to view
    #[arg(long, default_value = "axial")]
    plane: Plane,

    /// Slice index (defaults to the middle slice)
    #[arg(long)]
    slice: Option<i64>,

    /// Window center
    #[arg(long, allow_hyphen_values = true)]
    window_center: Option<f64>,

    /// Window width
    #[arg(long)]
    window_width: Option<f64>,

    /// Also load the combined view with these ROI ids
    #[arg(long, value_delimiter = ',')]
    rois: Option<Vec<u32>>,

    /// Play through the volume for this many seconds
    #[arg(long)]
    play: Option<u64>,

    /// Playback frame delay in ms (50, 100, 200 or 500)
    #[arg(long)]
    speed: Option<u64>,
}

fn load_config(path: Option<&PathBuf>) -> Result<ViewerConfig> {
    match path {
        Some(path) => ViewerConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(ViewerConfig::load_from_default_path().unwrap_or_default()),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        config.log_level.to_level_filter()
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    match cli.command {
        Commands::View(args) => {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            let local = tokio::task::LocalSet::new();
            local.block_on(&runtime, view(args, config))
        }
        Commands::Shortcuts => {
            for entry in default_viewer_shortcuts().help_entries() {
                println!("{:<16} {}", entry.keys, entry.description);
            }
            Ok(())
        }
        Commands::Config { save } => {
            println!("{}", config.to_json()?);
            if save {
                match &cli.config {
                    Some(path) => config.save(path)?,
                    None => config.save_to_default_path()?,
                }
            }
            Ok(())
        }
    }
}

async fn fetch_volume_info(source: &HttpSource) -> Result<VolumeInfo> {
    let bytes = source
        .fetch(METADATA_ENDPOINT)
        .await
        .context("Failed to fetch volume metadata")?;
    let json = std::str::from_utf8(&bytes).context("Volume metadata is not UTF-8")?;
    Ok(VolumeInfo::from_json(json)?)
}

async fn view(args: ViewArgs, mut config: ViewerConfig) -> Result<()> {
    if let Some(base_url) = args.base_url {
        config.base_url = base_url;
    }
    if let Some(millis) = args.speed {
        config.playback_speed = match PlaybackSpeed::from_millis(millis) {
            Some(speed) => speed,
            None => bail!("Unsupported playback speed {} ms", millis),
        };
    }

    let source = HttpSource::new(config.base_url.clone())?;
    let info = match args.shape.as_deref() {
        Some(&[axial, coronal, sagittal]) => VolumeInfo::new(VolumeShape::new(axial, coronal, sagittal)),
        Some(other) => bail!("Expected three shape values, got {}", other.len()),
        None => fetch_volume_info(&source).await?,
    };

    let mut session = ViewerSession::new(source, &config);
    session.open_volume(info);
    session.set_active_plane(args.plane);
    if let Some(slice) = args.slice {
        session.apply(ViewerAction::GoToSlice(slice));
    }
    if args.window_center.is_some() || args.window_width.is_some() {
        let current = session.navigation().window();
        session.set_window(WindowSettings::new(
            args.window_center.unwrap_or(current.center),
            args.window_width.unwrap_or(current.width),
        ));
    }
    session.set_visible_rois(args.rois);
    log::info!(
        "{} plane, slice {} of {}",
        args.plane.label(),
        session.navigation().current_slice(),
        session.navigation().max_slice_index(args.plane)
    );

    report(session.show_current().await?);
    if let Some(overlay) = session.show_overlay().await? {
        report(overlay);
    }

    if let Some(seconds) = args.play {
        session.apply(ViewerAction::TogglePlayback);
        let deadline = tokio::time::Instant::now() + Duration::from_secs(seconds);
        while tokio::time::Instant::now() < deadline {
            tokio::time::sleep(session.playback().speed().interval()).await;
            match session.sync_display().await {
                Some(Ok(load)) => report(load),
                Some(Err(err)) => log::error!("{}", err),
                None => {}
            }
        }
        session.apply(ViewerAction::TogglePlayback);
    }

    let stats = session.cache().stats();
    log::info!(
        "Cache: {} entries, {} hits, {} misses, {} joined, {} evictions, {} failures",
        session.cache().len(),
        stats.hits,
        stats.misses,
        stats.joined,
        stats.evictions,
        stats.failures
    );
    session.close();
    Ok(())
}

fn report(load: SliceLoad) {
    let Some(handle) = load.handle() else {
        return;
    };
    match handle.image() {
        Some(image) => println!("{} ({}x{})", handle.key(), image.width(), image.height()),
        None => println!("{} (evicted)", handle.key()),
    }
}
