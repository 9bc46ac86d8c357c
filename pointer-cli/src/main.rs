//! `pointer`: announce the object the user is pointing at

mod settings;
mod stop;

use anyhow::Context;
use clap::Parser;
use pointer_core::ShutdownSignal;
use pointer_eye::pipeline::CAMERA_UNAVAILABLE_MESSAGE;
use pointer_eye::{
    load_models, open_camera, open_display, FrameSource, ImageSequenceSource, PointingPipeline,
    SessionOutcome, VisionError,
};
use pointer_spk::engines::build_engine;
use pointer_spk::{AnnouncementQueue, SpeechSink};
use settings::Settings;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pointer")]
#[command(about = "Point at an object and hear what it is", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Configuration file (TOML or JSON)
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Camera device index
    #[arg(long)]
    pub camera: Option<u32>,

    /// Object detection model (ONNX)
    #[arg(long)]
    pub model: Option<PathBuf>,

    /// Palm detection model (ONNX)
    #[arg(long)]
    pub palm_model: Option<PathBuf>,

    /// Hand landmark model (ONNX)
    #[arg(long)]
    pub hand_model: Option<PathBuf>,

    /// Replay images from a directory instead of opening a camera
    #[arg(long)]
    pub frames_dir: Option<PathBuf>,

    /// Restart the image sequence when it ends
    #[arg(long)]
    pub loop_frames: bool,

    /// File whose appearance stops the session
    #[arg(long)]
    pub stop_file: Option<PathBuf>,

    /// Do not open a display window
    #[arg(long)]
    pub headless: bool,

    /// Speak walking directions after each announcement
    #[arg(long)]
    pub guidance: bool,

    /// Log utterances instead of speaking them
    #[arg(long)]
    pub silent: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long)]
    pub log_level: Option<String>,
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();
}

fn open_source(settings: &Settings) -> Result<Box<dyn FrameSource>, VisionError> {
    match settings.frames_dir {
        Some(ref dir) => Ok(Box::new(ImageSequenceSource::open(dir, settings.loop_frames)?)),
        None => open_camera(&settings.vision),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(&cli).context("Failed to load settings")?;
    init_logging(&settings.log_level);

    let grace = settings.vision.shutdown_grace();
    let engine = build_engine(&settings.speech).context("Failed to set up speech")?;
    info!("Speaking through the {} engine", engine.name());
    let queue = Arc::new(AnnouncementQueue::start(engine, &settings.speech)?);

    let source = match open_source(&settings) {
        Ok(source) => source,
        Err(e) => {
            error!("{}", e);
            queue.speak(CAMERA_UNAVAILABLE_MESSAGE);
            queue.close(grace).await;
            return Err(e).context("Cannot start without a frame source");
        }
    };

    let pipeline = match load_models(&settings.vision)
        .and_then(|(hand, detector)| PointingPipeline::new(settings.vision.clone(), hand, detector))
    {
        Ok(pipeline) => pipeline,
        Err(e) => {
            queue.close(grace).await;
            return Err(e).context("Failed to load models");
        }
    };
    let display = open_display(settings.vision.display)?;

    let shutdown = ShutdownSignal::new();
    let stop_watcher = tokio::spawn(stop::watch_stop_file(
        settings.stop_file.clone(),
        shutdown.clone(),
        stop::STOP_FILE_POLL,
    ));
    let ctrl_c = tokio::spawn(stop::watch_ctrl_c(shutdown.clone()));

    let sink: Arc<dyn SpeechSink> = queue.clone();
    let session_shutdown = shutdown.clone();
    let result = tokio::task::spawn_blocking(move || pipeline.run(source, display, sink, session_shutdown)).await;

    shutdown.cancel();
    stop_watcher.abort();
    ctrl_c.abort();
    if !queue.close(grace).await {
        warn!("Speech queue closed before all utterances were spoken");
    }
    if queue.dropped() > 0 {
        warn!("{} utterances were dropped", queue.dropped());
    }

    match result.context("Capture role panicked")? {
        Ok(SessionOutcome::Shutdown) => {
            info!("Stopped");
            Ok(())
        }
        Ok(SessionOutcome::CameraLost) => {
            warn!("Stopped after losing the camera");
            Ok(())
        }
        Err(e) => Err(e).context("Pointing session failed"),
    }
}
