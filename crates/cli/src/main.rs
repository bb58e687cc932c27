use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::{Parser, ValueEnum};

use framesight_core::annotate::infrastructure::box_annotator::BoxAnnotator;
use framesight_core::detect::domain::object_detector::ObjectDetector;
use framesight_core::detect::infrastructure::iou_tracker::TrackerVariant;
use framesight_core::detect::infrastructure::model_resolver;
use framesight_core::detect::infrastructure::onnx_detector::OnnxDetector;
use framesight_core::detect::infrastructure::tracking_detector::TrackingDetector;
use framesight_core::error::SinkError;
use framesight_core::pipeline::detect_image_use_case::DetectImageUseCase;
use framesight_core::pipeline::detect_stream_use_case::DetectStreamUseCase;
use framesight_core::pipeline::invoker::DetectionInvoker;
use framesight_core::pipeline::run_config::RunConfig;
use framesight_core::pipeline::stream_logger::{StdoutStreamLogger, StreamLogger};
use framesight_core::shared::constants::{
    IMAGE_EXTENSIONS, VIDEO_EXTENSIONS, YOLO_MODEL_NAME, YOLO_MODEL_URL,
};
use framesight_core::shared::detection::Detection;
use framesight_core::shared::frame::Frame;
use framesight_core::shared::source_metadata::SourceMetadata;
use framesight_core::sink::domain::display_sink::DisplaySink;
use framesight_core::sink::infrastructure::image_file_sink::ImageFileSink;
use framesight_core::sink::infrastructure::video_file_sink::VideoFileSink;
use framesight_core::source::domain::frame_source::FrameSource;
use framesight_core::source::infrastructure::image_source::ImageSource;
use framesight_core::source::infrastructure::video_stream_source::VideoStreamSource;
#[cfg(all(feature = "webcam", target_os = "linux"))]
use framesight_core::source::infrastructure::webcam_source::WebcamSource;

mod youtube;

/// Object detection and tracking for images, videos, and live streams.
#[derive(Parser)]
#[command(name = "framesight")]
struct Cli {
    /// Image path, video path, webcam device, or stream URL.
    target: String,

    /// Kind of source (inferred from the target when omitted).
    #[arg(long, value_enum)]
    source: Option<SourceKind>,

    /// Annotated output file.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Detection confidence threshold (0.0-1.0).
    #[arg(long, default_value = "0.4")]
    confidence: f64,

    /// Assign persistent track IDs across frames.
    #[arg(long)]
    track: bool,

    /// Tracker association strategy.
    #[arg(long, value_enum, default_value = "bytetrack")]
    tracker: Tracker,

    /// Print the raw detection records (images only).
    #[arg(long)]
    list_detections: bool,

    /// Stop after this many frames.
    #[arg(long)]
    max_frames: Option<usize>,

    /// Local ONNX model instead of the cached/downloaded one.
    #[arg(long)]
    model: Option<PathBuf>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SourceKind {
    Image,
    Video,
    Webcam,
    Rtsp,
    Youtube,
}

#[derive(Clone, Copy, ValueEnum)]
enum Tracker {
    Bytetrack,
    Greedy,
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
    let kind = source_kind(&cli)?;
    validate(&cli, kind)?;

    let config = RunConfig {
        confidence: cli.confidence,
        tracking: cli.track,
        tracker_variant: tracker_variant(cli.tracker),
        max_frames: cli.max_frames,
    };

    let detector = build_detector(&cli, &config)?;
    let invoker =
        DetectionInvoker::new(detector, Box::new(BoxAnnotator::new()), config.confidence);

    if kind == SourceKind::Image {
        run_image(&cli, invoker)
    } else {
        run_stream(&cli, kind, invoker, config)
    }
}

fn run_image(cli: &Cli, invoker: DetectionInvoker) -> Result<(), Box<dyn std::error::Error>> {
    let source: Box<dyn FrameSource> = Box::new(ImageSource::new());
    let sink: Box<dyn DisplaySink> = match &cli.output {
        Some(path) => Box::new(ImageFileSink::new(path)),
        None => Box::new(DiscardSink),
    };

    let mut use_case = DetectImageUseCase::new(source, invoker, sink);
    let detections = use_case.execute(Path::new(&cli.target))?;

    if cli.list_detections {
        print_detections(&detections);
    }
    log::info!("{} objects detected", detections.len());
    if let Some(output) = &cli.output {
        log::info!("Output written to {}", output.display());
    }
    Ok(())
}

fn run_stream(
    cli: &Cli,
    kind: SourceKind,
    invoker: DetectionInvoker,
    config: RunConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let target = resolve_target(&cli.target, kind)?;
    let source = open_source(kind)?;
    let output = cli.output.as_ref().unwrap();
    let sink: Box<dyn DisplaySink> = Box::new(VideoFileSink::new(output));
    let logger: Box<dyn StreamLogger> = Box::new(StdoutStreamLogger::default());

    let cancelled = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancelled);
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))?;

    let mut use_case =
        DetectStreamUseCase::new(source, invoker, sink, logger, config, Some(cancelled));
    let summary = use_case.execute(Path::new(&target))?;

    log::info!(
        "{} frames, {} detections, output written to {}",
        summary.frames_processed,
        summary.detections_total,
        output.display()
    );
    Ok(())
}

fn build_detector(
    cli: &Cli,
    config: &RunConfig,
) -> Result<Box<dyn ObjectDetector>, Box<dyn std::error::Error>> {
    let model_path = match &cli.model {
        Some(path) => path.clone(),
        None => {
            log::info!("Resolving model: {YOLO_MODEL_NAME}");
            let path = model_resolver::resolve(
                YOLO_MODEL_NAME,
                YOLO_MODEL_URL,
                None,
                Some(Box::new(download_progress)),
            )?;
            eprintln!();
            path
        }
    };

    let base: Box<dyn ObjectDetector> = Box::new(OnnxDetector::new(&model_path)?);
    if config.tracking {
        Ok(Box::new(TrackingDetector::new(base, config.tracker_variant)))
    } else {
        Ok(base)
    }
}

fn open_source(kind: SourceKind) -> Result<Box<dyn FrameSource>, Box<dyn std::error::Error>> {
    match kind {
        SourceKind::Image => Ok(Box::new(ImageSource::new())),
        SourceKind::Video | SourceKind::Rtsp | SourceKind::Youtube => {
            Ok(Box::new(VideoStreamSource::new()))
        }
        SourceKind::Webcam => {
            #[cfg(all(feature = "webcam", target_os = "linux"))]
            {
                Ok(Box::new(WebcamSource::new()))
            }
            #[cfg(not(all(feature = "webcam", target_os = "linux")))]
            {
                Err("webcam capture requires the 'webcam' feature on Linux".into())
            }
        }
    }
}

fn resolve_target(target: &str, kind: SourceKind) -> Result<String, Box<dyn std::error::Error>> {
    match kind {
        SourceKind::Youtube => youtube::resolve_stream_url(target),
        SourceKind::Webcam => match target.parse::<u32>() {
            Ok(index) => Ok(format!("/dev/video{index}")),
            Err(_) => Ok(target.to_string()),
        },
        _ => Ok(target.to_string()),
    }
}

fn source_kind(cli: &Cli) -> Result<SourceKind, Box<dyn std::error::Error>> {
    if let Some(kind) = cli.source {
        return Ok(kind);
    }
    let target = cli.target.as_str();
    if target.starts_with("rtsp://") || target.starts_with("rtmp://") {
        return Ok(SourceKind::Rtsp);
    }
    if target.contains("youtube.com/") || target.contains("youtu.be/") {
        return Ok(SourceKind::Youtube);
    }
    if target.starts_with("/dev/video") {
        return Ok(SourceKind::Webcam);
    }
    if has_extension(target, IMAGE_EXTENSIONS) {
        return Ok(SourceKind::Image);
    }
    if has_extension(target, VIDEO_EXTENSIONS) {
        return Ok(SourceKind::Video);
    }
    Err(format!("Cannot infer source kind for '{target}', pass --source").into())
}

fn validate(cli: &Cli, kind: SourceKind) -> Result<(), Box<dyn std::error::Error>> {
    if !(0.0..=1.0).contains(&cli.confidence) {
        return Err(format!(
            "Confidence must be between 0.0 and 1.0, got {}",
            cli.confidence
        )
        .into());
    }
    if cli.list_detections && kind != SourceKind::Image {
        return Err("--list-detections only applies to image targets".into());
    }
    if kind == SourceKind::Image {
        if cli.output.is_none() && !cli.list_detections {
            return Err("Pass --output or --list-detections for image targets".into());
        }
    } else if cli.output.is_none() {
        return Err("Output file is required for video and stream sources".into());
    }
    if matches!(kind, SourceKind::Image | SourceKind::Video)
        && !Path::new(&cli.target).exists()
    {
        return Err(format!("Input file not found: {}", cli.target).into());
    }
    if let Some(model) = &cli.model {
        if !model.exists() {
            return Err(format!("Model file not found: {}", model.display()).into());
        }
    }
    Ok(())
}

fn has_extension(target: &str, extensions: &[&str]) -> bool {
    Path::new(target)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn tracker_variant(tracker: Tracker) -> TrackerVariant {
    match tracker {
        Tracker::Bytetrack => TrackerVariant::ByteTrack,
        Tracker::Greedy => TrackerVariant::Greedy,
    }
}

fn print_detections(detections: &[Detection]) {
    for det in detections {
        println!(
            "{:<14} score={:.3} box=({:.0}, {:.0}, {:.0}, {:.0})",
            det.label, det.score, det.bbox.x1, det.bbox.y1, det.bbox.x2, det.bbox.y2
        );
    }
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading detection model... {pct}%");
    } else {
        eprint!("\rDownloading detection model... {downloaded} bytes");
    }
}

/// Sink for image runs where only the detection listing was requested.
struct DiscardSink;

impl DisplaySink for DiscardSink {
    fn open(&mut self, _metadata: &SourceMetadata) -> Result<(), SinkError> {
        Ok(())
    }

    fn push(&mut self, _frame: &Frame) -> Result<(), SinkError> {
        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}
