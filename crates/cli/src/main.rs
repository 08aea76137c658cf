mod settings;

use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;

use maskwatch_core::capture::domain::frame_clock::FrameClock;
use maskwatch_core::capture::domain::frame_source::{FrameSource, StreamRequest};
use maskwatch_core::capture::infrastructure::ffmpeg_frame_source::{list_devices, FfmpegFrameSource};
use maskwatch_core::capture::infrastructure::frame_clocks::{TickerFrameClock, UnthrottledClock};
use maskwatch_core::detection::domain::mask_detector::MaskDetector;
use maskwatch_core::detection::infrastructure::model_resolver::{self, ModelSource};
use maskwatch_core::detection::infrastructure::onnx_mask_detector::OnnxMaskDetector;
use maskwatch_core::overlay::domain::layout_context::{LayoutContext, LayoutOverrides};
use maskwatch_core::overlay::infrastructure::page_compositor::PageCompositor;
use maskwatch_core::overlay::infrastructure::scene_surface::SceneSurface;
use maskwatch_core::pipeline::capture_controller::{CaptureController, EnableOptions};
use maskwatch_core::pipeline::frame_sink::FrameSink;
use maskwatch_core::pipeline::infrastructure::composite_video_sink::CompositeVideoSink;
use maskwatch_core::pipeline::infrastructure::overlay_log_sink::OverlayLogSink;
use maskwatch_core::pipeline::infrastructure::snapshot_sink::SnapshotSink;
use maskwatch_core::pipeline::model_slot::{ModelSlot, ModelState};
use maskwatch_core::pipeline::pipeline_logger::{LogPipelineLogger, PipelineLogger};
use maskwatch_core::pipeline::prediction_loop::LoopConfig;
use maskwatch_core::pipeline::session::MaskSession;
use maskwatch_core::shared::constants::{MASK_MODEL_NAME, VIDEO_EXTENSIONS};
use maskwatch_core::video::infrastructure::ffmpeg_writer::FfmpegWriter;
use maskwatch_core::video::infrastructure::image_file_writer::ImageFileWriter;

use settings::Settings;

/// Live face-mask detection overlays for a webcam or recorded video.
#[derive(Parser)]
#[command(name = "maskwatch")]
struct Cli {
    /// Recorded video to use instead of the camera.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Camera device (e.g. /dev/video0 on Linux, 0 on macOS).
    #[arg(long)]
    device: Option<String>,

    /// List capture devices and exit.
    #[arg(long)]
    list_devices: bool,

    /// Mask detector ONNX model file.
    #[arg(long)]
    model: Option<PathBuf>,

    /// URL to download the model from when it is not cached.
    #[arg(long)]
    model_url: Option<String>,

    /// Confidence percentage a detection must exceed to be drawn (0-100).
    #[arg(long)]
    threshold: Option<f32>,

    #[arg(long)]
    display_width: Option<u32>,

    #[arg(long)]
    display_height: Option<u32>,

    /// Page width (defaults to the display width).
    #[arg(long)]
    viewport_width: Option<u32>,

    /// Page height (defaults to the display height).
    #[arg(long)]
    viewport_height: Option<u32>,

    /// Horizontal position of the video on the page.
    #[arg(long, allow_hyphen_values = true)]
    video_left: Option<i32>,

    /// Vertical position of the video on the page.
    #[arg(long, allow_hyphen_values = true)]
    video_top: Option<i32>,

    /// Amount overlays are shifted up from their mapped position.
    #[arg(long, allow_hyphen_values = true)]
    y_offset: Option<i32>,

    /// Camera refresh rate.
    #[arg(long)]
    fps: Option<f64>,

    /// Stop after this many frames.
    #[arg(long)]
    max_frames: Option<usize>,

    /// Record the composited page to a video file.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Save composited pages as PNG files in this directory.
    #[arg(long)]
    snapshot_dir: Option<PathBuf>,

    /// Save every Nth page when --snapshot-dir is set.
    #[arg(long)]
    snapshot_every: Option<usize>,

    /// Write each cycle's overlays as JSON lines.
    #[arg(long)]
    overlay_log: Option<PathBuf>,

    /// TrueType font for caption text.
    #[arg(long)]
    font: Option<PathBuf>,

    /// Settings file to use instead of the user config.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Persist the effective settings to the config file.
    #[arg(long)]
    save_config: bool,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.list_devices {
        let devices = list_devices();
        if devices.is_empty() {
            println!("No capture devices found");
        }
        for device in devices {
            println!("{device}");
        }
        return Ok(());
    }

    let base = match &cli.config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load(),
    };
    let settings = apply_overrides(base, &cli);
    settings.validate()?;
    validate(&cli)?;

    if cli.save_config {
        let path = cli
            .config
            .clone()
            .or_else(Settings::config_path)
            .ok_or("Could not determine config directory")?;
        settings.save_to(&path)?;
        log::info!("Settings saved to {}", path.display());
    }

    let cancelled = Arc::new(AtomicBool::new(false));
    {
        let flag = cancelled.clone();
        ctrlc::set_handler(move || {
            log::info!("Stopping...");
            flag.store(true, Ordering::Relaxed);
        })?;
    }

    let slot = load_model(&settings);
    match slot.wait(&download_progress, &cancelled) {
        ModelState::Ready(_) => {
            if slot.progress().1 > 0 {
                eprintln!();
            }
        }
        ModelState::Failed(msg) => return Err(msg.into()),
        ModelState::Loading => return Ok(()),
    }

    let source: Box<dyn FrameSource> = match &cli.input {
        Some(path) => Box::new(FfmpegFrameSource::file(path)),
        None => Box::new(FfmpegFrameSource::camera()),
    };
    let options = EnableOptions {
        request: StreamRequest {
            device: settings.device.clone(),
            width: settings.display_width,
            height: settings.display_height,
            fps: cli.input.is_none().then_some(settings.fps),
        },
        display: settings.display(),
        viewport: settings.viewport(),
        overrides: LayoutOverrides {
            video_left: settings.video_left,
            video_top: settings.video_top,
            y_offset: settings.y_offset,
        },
        threshold: settings.threshold,
    };
    let mut controller = CaptureController::new(source, MaskSession::new(slot), options);
    let mut prediction_loop = controller.enable()?;

    let (mut clock, record_fps): (Box<dyn FrameClock>, f64) = if cli.input.is_some() {
        let native = prediction_loop.metadata().fps;
        let fps = if native > 0.0 { native } else { settings.fps };
        (Box::new(UnthrottledClock), fps)
    } else {
        (Box::new(TickerFrameClock::new(settings.fps)), settings.fps)
    };

    let mut sinks = build_sinks(&cli, &settings, prediction_loop.layout(), record_fps)?;
    if sinks.is_empty() {
        log::info!("No outputs configured; use --output, --snapshot-dir or --overlay-log to keep results");
    }

    let config = LoopConfig {
        max_frames: cli.max_frames,
        cancelled,
    };
    let mut logger = LogPipelineLogger::default();
    let report = prediction_loop.run(
        &mut SceneSurface::new(),
        clock.as_mut(),
        &mut sinks,
        &mut logger,
        &config,
    )?;
    logger.summary();
    log::info!(
        "Stopped ({:?}) after {} frames, {} detections drawn, {} frames skipped",
        report.stop,
        report.frames,
        report.overlays_drawn,
        report.skipped_frames
    );
    Ok(())
}

fn apply_overrides(mut settings: Settings, cli: &Cli) -> Settings {
    fn set<T: Clone>(field: &mut Option<T>, value: &Option<T>) {
        if value.is_some() {
            *field = value.clone();
        }
    }

    set(&mut settings.device, &cli.device);
    set(&mut settings.model, &cli.model);
    set(&mut settings.model_url, &cli.model_url);
    set(&mut settings.display_width, &cli.display_width);
    set(&mut settings.display_height, &cli.display_height);
    set(&mut settings.viewport_width, &cli.viewport_width);
    set(&mut settings.viewport_height, &cli.viewport_height);
    set(&mut settings.video_left, &cli.video_left);
    set(&mut settings.video_top, &cli.video_top);
    set(&mut settings.y_offset, &cli.y_offset);
    set(&mut settings.font, &cli.font);
    if let Some(threshold) = cli.threshold {
        settings.threshold = threshold;
    }
    if let Some(fps) = cli.fps {
        settings.fps = fps;
    }
    if let Some(every) = cli.snapshot_every {
        settings.snapshot_every = every;
    }
    settings
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(input) = &cli.input {
        if !input.exists() {
            return Err(format!("Input file not found: {}", input.display()).into());
        }
        if cli.device.is_some() {
            return Err("--input and --device are mutually exclusive".into());
        }
    }
    if let Some(output) = &cli.output {
        if !is_video(output) {
            return Err(format!(
                "Output must be a video file ({}), got {}",
                VIDEO_EXTENSIONS.join(", "),
                output.display()
            )
            .into());
        }
        if cli.input.as_ref() == Some(output) {
            return Err("Output would overwrite the input video".into());
        }
        if cli.overlay_log.as_ref() == Some(output) {
            return Err("--output and --overlay-log must be different files".into());
        }
    }
    if let Some(dir) = &cli.snapshot_dir {
        if dir.is_file() {
            return Err(format!("Snapshot directory is a file: {}", dir.display()).into());
        }
    }
    if cli.max_frames == Some(0) {
        return Err("--max-frames must be at least 1".into());
    }
    Ok(())
}

fn is_video(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn load_model(settings: &Settings) -> Arc<ModelSlot> {
    let source = ModelSource {
        path: settings.model.clone(),
        name: MASK_MODEL_NAME.to_string(),
        bundled_dir: bundled_model_dir(),
        url: settings.model_url.clone(),
    };
    log::info!("Resolving model: {MASK_MODEL_NAME}");

    ModelSlot::load_in_background(move |progress| {
        let path = model_resolver::resolve(&source, Some(progress)).map_err(|e| e.to_string())?;
        let detector = OnnxMaskDetector::new(&path).map_err(|e| e.to_string())?;
        Ok(Box::new(detector) as Box<dyn MaskDetector>)
    })
}

/// `models/` next to the executable.
fn bundled_model_dir() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("models")))
}

fn build_sinks(
    cli: &Cli,
    settings: &Settings,
    layout: &LayoutContext,
    fps: f64,
) -> Result<Vec<Box<dyn FrameSink>>, Box<dyn std::error::Error>> {
    let mut sinks: Vec<Box<dyn FrameSink>> = Vec::new();

    if cli.output.is_some() || cli.snapshot_dir.is_some() {
        let mut compositor = PageCompositor::new(*layout);
        if let Some(font) = &settings.font {
            compositor = compositor.with_font_file(font)?;
        }
        let compositor = Arc::new(compositor);

        if let Some(output) = &cli.output {
            sinks.push(Box::new(CompositeVideoSink::new(
                compositor.clone(),
                Box::new(FfmpegWriter::new()),
                output,
                fps,
            )));
        }
        if let Some(dir) = &cli.snapshot_dir {
            sinks.push(Box::new(SnapshotSink::new(
                compositor,
                Box::new(ImageFileWriter::new()),
                dir,
                settings.snapshot_every,
            )));
        }
    }

    if let Some(path) = &cli.overlay_log {
        sinks.push(Box::new(OverlayLogSink::create(path)?));
    }

    Ok(sinks)
}

fn download_progress(downloaded: u64, total: u64) {
    let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
    eprint!("\rDownloading mask detection model... {pct}%");
}
