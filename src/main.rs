//! `heightmapper` - auto-expose a terrarium heightmap from the command line
//!
//! Loads a terrarium-encoded PNG, renders it through the exposure loop until
//! the mapping converges (or the frame budget runs out), and reports the final
//! elevation window and scale factor. Optionally writes the final greyscale
//! frame and simulates a camera pan to exercise re-exposure.

use anyhow::{Context, Result};
use clap::Parser;
use heightmapper::{
    config::{ConfigManager, ExposureConfig},
    error::{HeightmapperError, get_user_friendly_error},
    exposure::{ExposureController, FrameOutcome, ViewSettleDebouncer},
    render::{ElevationGrid, HeightfieldRenderer, RenderPipeline, terrarium},
    utils,
};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Number of intermediate camera moves in a simulated pan
const PAN_STEPS: u32 = 8;

#[derive(Parser, Debug)]
#[command(name = "heightmapper", author, version, about)]
struct Cli {
    /// Terrarium-encoded heightmap PNG
    terrarium: PathBuf,

    /// Write the final greyscale frame to this PNG
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Let the mapping extend below sea level
    #[arg(long, default_value_t = false)]
    include_oceans: bool,

    /// Stop after this many rendered frames per exposure pass
    #[arg(long, default_value_t = 64)]
    max_frames: u32,

    /// Width of the visible area in meters, used for the scale factor
    #[arg(long, default_value_t = 10_000.0)]
    view_width_meters: f64,

    /// Configuration file [default: Heightmapper/config.json in the per-user
    /// config directory (APPDATA, ~/Library/Application Support, or
    /// $XDG_CONFIG_HOME / ~/.config), else the working directory]
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write logs to this directory instead of stderr
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// After converging, pan the view right by this many cells and re-expose
    #[arg(long)]
    pan: Option<u32>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    utils::init_logging(cli.log_dir.as_deref()).context("Failed to initialize logging system")?;

    if let Err(e) = run(&cli) {
        error!("heightmapper failed: {e:#}");
        match e.downcast_ref::<HeightmapperError>() {
            Some(inner) => eprintln!("{}", get_user_friendly_error(inner)),
            None => eprintln!("{e:#}"),
        }
        return Err(e);
    }

    Ok(())
}

fn run(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;

    let grid = terrarium::load(&cli.terrarium)
        .with_context(|| format!("Failed to load heightmap {}", cli.terrarium.display()))?;
    match grid.elevation_range() {
        Some((low, high)) => info!("Heightmap elevations span [{:.1}, {:.1}] m", low, high),
        None => warn!("Heightmap contains no elevation data"),
    }

    let renderer =
        HeightfieldRenderer::new(grid.clone(), config.initial_mapping, cli.view_width_meters);
    let mut controller = ExposureController::new(renderer, &config);

    expose(&mut controller, cli.max_frames);

    if let Some(step) = cli.pan {
        pan(&mut controller, &grid, step, &config, cli.view_width_meters);
        expose(&mut controller, cli.max_frames);
    }

    let mapping = controller.pipeline().mapping();
    info!(
        "Final mapping [{:.1}, {:.1}] m, scale factor {}",
        mapping.u_min,
        mapping.u_max,
        controller.scale_factor()
    );
    println!(
        "u_min={:.1} u_max={:.1} scale_factor={}",
        mapping.u_min,
        mapping.u_max,
        controller.scale_factor()
    );

    if let Some(output) = &cli.output {
        write_frame(&mut controller, output)?;
    }

    Ok(())
}

/// Load the configuration and apply command line overrides
fn load_config(cli: &Cli) -> Result<ExposureConfig> {
    let mut config = match &cli.config {
        Some(path) => ConfigManager::load_from(path),
        None => ConfigManager::load(),
    }
    .context("Failed to load configuration")?;

    if cli.include_oceans {
        config.include_negative_elevations = true;
    }
    // The tool has nothing to do without auto-exposure
    config.auto_exposure = true;

    Ok(config)
}

/// Render and analyse frames until no redraw is pending or the budget is spent
fn expose(controller: &mut ExposureController<HeightfieldRenderer>, max_frames: u32) {
    let mut frames = 0;
    while frames < max_frames && controller.pipeline_mut().take_redraw_request() {
        let frame = controller.pipeline_mut().render();
        frames += 1;

        match controller.on_frame_complete(&frame) {
            FrameOutcome::Converged => {
                info!("Converged after {} frames", frames);
                return;
            }
            FrameOutcome::Empty => {
                warn!("Frame {} has no valid pixels, mapping left unchanged", frames);
            }
            FrameOutcome::Remapped(_) | FrameOutcome::Ignored => {}
        }
    }

    if frames == max_frames && controller.phase().is_searching() {
        warn!(
            "Frame budget of {} exhausted in phase {}",
            max_frames,
            controller.phase()
        );
    }
}

/// Simulate a camera drag; the search re-arms once the view has settled
fn pan(
    controller: &mut ExposureController<HeightfieldRenderer>,
    grid: &ElevationGrid,
    step: u32,
    config: &ExposureConfig,
    view_width_meters: f64,
) {
    let quiet_period = Duration::from_millis(config.view_settle_ms);
    let move_interval = quiet_period / 4;
    let mut debouncer = ViewSettleDebouncer::new(quiet_period);
    let mut now = Instant::now();

    for i in 1..=PAN_STEPS {
        debouncer.move_started();
        let view = grid.crop(step.saturating_mul(i), 0, grid.width(), grid.height());
        controller.pipeline_mut().set_view(view, view_width_meters);
        debouncer.move_ended(now);

        if debouncer.poll(now) {
            controller.on_view_settled();
        }
        now += move_interval;
    }

    if debouncer.poll(now + quiet_period) {
        info!("View settled after a {} step pan", PAN_STEPS);
        controller.on_view_settled();
    }
}

/// Render the current mapping and save it as a greyscale PNG with alpha
fn write_frame(controller: &mut ExposureController<HeightfieldRenderer>, path: &Path) -> Result<()> {
    let frame = controller.pipeline_mut().render();
    image::DynamicImage::ImageRgba8(frame)
        .into_luma_alpha8()
        .save(path)
        .map_err(|source| HeightmapperError::ImageError {
            path: path.to_path_buf(),
            source,
        })?;
    info!("Wrote {}", path.display());
    Ok(())
}
