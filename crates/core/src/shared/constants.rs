pub const YOLO_MODEL_NAME: &str = "yolov8n.onnx";
pub const YOLO_MODEL_URL: &str =
    "https://github.com/framesight/framesight/releases/download/v0.1.0/yolov8n.onnx";

/// Default confidence threshold for detection runs.
pub const DEFAULT_CONFIDENCE: f64 = 0.40;

/// Max frames a track can be lost before removal (~1 second at 30 fps).
pub const TRACKER_MAX_LOST: usize = 30;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "webp"];
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "wmv"];
