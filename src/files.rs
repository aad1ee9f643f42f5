use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncRead, AsyncWriteExt};
use uuid::Uuid;

/// The two temp files owned by one request.
///
/// Allocating touches nothing on disk. Both paths are removed by `cleanup`,
/// or by `Drop` if the request never got that far (early error, panic, or the
/// handler future dropped after a client disconnect).
#[derive(Debug)]
pub struct RequestFiles {
    input: PathBuf,
    output: PathBuf,
    cleaned: bool,
}

impl RequestFiles {
    /// `prefix` names the output file, see [`crate::operation::Operation::output_prefix`].
    pub fn new(dir: &Path, prefix: &str) -> Self {
        let stamp = chrono::Utc::now().timestamp_millis();
        let id = Uuid::new_v4().simple();
        Self {
            input: dir.join(format!("upload_{stamp}_{id}")),
            output: dir.join(format!("{prefix}_{stamp}_{id}.mp4")),
            cleaned: false,
        }
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Streams the upload into the input file, returns the byte count.
    #[tracing::instrument(skip(self, reader), fields(file = %self.input.display()))]
    pub async fn stage<R>(&self, reader: &mut R) -> std::io::Result<u64>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.input)
            .await?;
        let len = tokio::io::copy(reader, &mut file).await?;
        file.flush().await?;
        tracing::debug!(len, "upload staged");
        Ok(len)
    }

    pub async fn read_output(&self) -> std::io::Result<Vec<u8>> {
        tracing::debug!(file = %self.output.display(), "reading file");
        fs::read(&self.output).await
    }

    /// Removes both files. Failures are logged and dropped.
    pub async fn cleanup(mut self) {
        remove_quietly(&self.input).await;
        remove_quietly(&self.output).await;
        self.cleaned = true;
    }
}

/// Only reached when `cleanup` never ran, so the blocking removal stays off
/// the normal path.
impl Drop for RequestFiles {
    fn drop(&mut self) {
        if self.cleaned {
            return;
        }
        for path in [&self.input, &self.output] {
            if let Err(e) = std::fs::remove_file(path) {
                log_remove_error(path, e);
            }
        }
    }
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        log_remove_error(path, e);
    }
}

fn log_remove_error(path: &Path, e: std::io::Error) {
    if e.kind() != ErrorKind::NotFound {
        tracing::warn!(file = %path.display(), error = %e, "can't remove temp file");
    }
}
