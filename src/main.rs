//! cartoon-head - desktop host
//!
//! Receives Face Landmarker results as JSON over UDP, runs them through the
//! blendshape adapter into the native face engine, and ticks a simulated
//! render surface.

use clap::Parser;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cartoon_head::{
    adapter::BlendshapeAdapter,
    bridge::FaceEngine,
    config::Config,
    error::{CartoonHeadError, TrackingError},
    face::FaceModel,
    render::SurfaceRenderer,
    tracking::receiver::ResultReceiver,
    SharedFace,
};

/// cartoon-head - blendshape-driven cartoon head renderer
#[derive(Parser, Debug)]
#[command(name = "cartoon-head", version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Head model path (overrides config)
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// UDP port for landmarker results (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Do not listen for landmarker results
    #[arg(long)]
    no_tracking: bool,

    /// Stop after this many frames
    #[arg(long)]
    frames: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(log_level.into())
                .from_env_lossy(),
        )
        .init();

    info!("Starting {} v{}", cartoon_head::NAME, cartoon_head::VERSION);

    let mut config = if let Some(ref path) = args.config {
        Config::from_file(path)?
    } else {
        Config::load()?
    };

    if let Some(ref model) = args.model {
        config.face.model_path = model.display().to_string();
    }
    if let Some(port) = args.port {
        config.tracking.port = port;
    }
    if args.no_tracking {
        config.tracking.enabled = false;
    }

    config.validate()?;

    let shared = SharedFace::new(config.clone());

    match FaceModel::load(&config.face.model_path) {
        Ok(model) => shared.set_model(model),
        Err(e) => warn!("Running without a head model: {}", e),
    }

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run(shared, config, args.frames))?;

    info!("cartoon-head stopped");
    Ok(())
}

async fn run(shared: Arc<SharedFace>, config: Config, max_frames: Option<u64>) -> anyhow::Result<()> {
    if config.tracking.enabled {
        let receiver = ResultReceiver::bind(&config.tracking).await?;
        let adapter = BlendshapeAdapter::new(Arc::clone(&shared));
        tokio::spawn(async move {
            if let Err(e) = run_tracking(receiver, adapter).await {
                error!("Tracking error: {}", e);
            }
        });
    } else {
        info!("Tracking disabled");
    }

    let mut surface = SurfaceRenderer::new(FaceEngine::headless(Arc::clone(&shared)), &config.surface);
    surface.on_surface_created()?;
    surface.on_surface_changed(config.surface.width as i32, config.surface.height as i32)?;
    debug!("Projection: {:?}", surface.projection());

    let period = std::time::Duration::from_secs_f64(1.0 / config.tracking.frame_rate as f64);
    let ticks = run_frames(&mut surface, period, max_frames, shutdown_signal()).await;
    info!("Stopped after {} ticks ({} frames drawn)", ticks, surface.native().frames());

    surface.native_mut().release();
    surface.on_surface_destroyed();
    Ok(())
}

/// Tick the surface until `max_frames` ticks have run or `shutdown` resolves.
///
/// Ticks are counted whether or not a model is loaded. Returns the tick count.
async fn run_frames(
    surface: &mut SurfaceRenderer<FaceEngine>,
    period: std::time::Duration,
    max_frames: Option<u64>,
    shutdown: impl Future<Output = ()>,
) -> u64 {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    tokio::pin!(shutdown);
    let mut ticks = 0u64;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = surface.on_draw_frame() {
                    error!("Frame error: {}", e);
                }
                ticks += 1;

                if let Some(frame) = surface.native().last_frame() {
                    debug!("Frame {}: influences {:?}", ticks, frame.influences);
                }

                if max_frames.is_some_and(|max| ticks >= max) {
                    info!("Reached {} frames", ticks);
                    break;
                }
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    ticks
}

async fn run_tracking(
    mut receiver: ResultReceiver,
    mut adapter: BlendshapeAdapter<Arc<SharedFace>>,
) -> anyhow::Result<()> {
    loop {
        match receiver.recv().await {
            Ok(result) => {
                adapter.update_results(Some(&result))?;
                if let Some(row) = adapter.row(0) {
                    debug!("Top blendshape: {} {}", row.label, row.score);
                }
            }
            Err(CartoonHeadError::Tracking(TrackingError::Parse(e))) => {
                warn!("Dropping malformed result: {}", e);
            }
            Err(e) => {
                error!("Result receive error: {}", e);
                tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
            }
        }
    }
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
