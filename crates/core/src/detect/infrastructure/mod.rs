pub mod iou_tracker;
pub mod model_resolver;
pub mod onnx_detector;
pub mod tracking_detector;
