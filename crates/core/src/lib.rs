pub mod annotate;
pub mod detect;
pub mod error;
pub mod pipeline;
pub mod shared;
pub mod sink;
pub mod source;
