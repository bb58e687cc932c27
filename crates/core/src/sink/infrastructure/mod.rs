pub mod image_file_sink;
pub mod video_file_sink;
