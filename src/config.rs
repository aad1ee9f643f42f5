use std::path::PathBuf;

/// Extra room on top of the file cap for multipart framing and the text fields.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Directory holding the per-request input and output files.
    pub temp_dir: PathBuf,
    /// Engine program name or path.
    pub ffmpeg: String,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn new(port: u16, temp_dir: Option<PathBuf>, ffmpeg: String, max_upload_mb: usize) -> Self {
        Self {
            port,
            temp_dir: temp_dir.unwrap_or_else(std::env::temp_dir),
            ffmpeg,
            max_upload_bytes: max_upload_mb.saturating_mul(1024 * 1024),
        }
    }

    pub fn max_request_bytes(&self) -> usize {
        self.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(3000, None, "ffmpeg".to_string(), 500)
    }
}
