pub mod detect_image_use_case;
pub mod detect_stream_use_case;
pub mod invoker;
pub mod run_config;
pub mod stream_logger;
