pub mod api;
pub mod config;
pub mod ffmpeg;
pub mod files;
pub mod operation;
pub mod otel;
pub mod service;

pub const SERVICE_NAME: &str = "video-process-rs";

#[cfg(all(test, unix))]
mod test_support;
