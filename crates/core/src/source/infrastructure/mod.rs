pub mod image_source;
pub mod video_stream_source;
#[cfg(all(feature = "webcam", target_os = "linux"))]
pub mod webcam_source;
