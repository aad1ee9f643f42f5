use std::path::PathBuf;

use anyhow::Context;
use thiserror::Error;
use tracing::instrument;

use crate::{
    ffmpeg::{EngineError, FFMpegWrapper, Invocation},
    files::RequestFiles,
    operation::Operation,
};

#[derive(Debug, Clone)]
pub struct Service {
    transcoder: FFMpegWrapper,
    temp_dir: PathBuf,
}

impl Service {
    pub fn new(transcoder: FFMpegWrapper, temp_dir: PathBuf) -> Self {
        tracing::info!(temp_dir = %temp_dir.display(), "new service");
        Self {
            transcoder,
            temp_dir,
        }
    }

    /// Reserves the temp paths for one request; nothing is created yet.
    pub fn request_files(&self, prefix: &str) -> RequestFiles {
        RequestFiles::new(&self.temp_dir, prefix)
    }

    /// Runs the engine on an already staged upload and returns the produced
    /// file. Both temp files are gone when this returns, whatever the outcome.
    #[instrument(skip(self, op, files), fields(op = op.name()))]
    pub async fn transcode(&self, op: &Operation, files: RequestFiles) -> Result<Vec<u8>, SrvError> {
        let res = self.transcode_staged(op, &files).await;
        files.cleanup().await;
        res
    }

    async fn transcode_staged(&self, op: &Operation, files: &RequestFiles) -> Result<Vec<u8>, SrvError> {
        let invocation = Invocation::for_operation(op, files.input(), files.output());
        self.transcoder.transcode(&invocation, None).await?;

        let res = files
            .read_output()
            .await
            .with_context(|| format!("failed to read file: {:?}", files.output()))?;
        tracing::info!(
            size_mb = format!("{:.2}", res.len() as f64 / 1024.0 / 1024.0),
            "sending result"
        );
        Ok(res)
    }
}

#[derive(Debug, Error)]
pub enum SrvError {
    #[error("No video uploaded")]
    NoUpload,
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    PayloadTooLarge(String),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[cfg(all(test, unix))]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::operation::ProcessParams;
    use crate::test_support::scripts;

    async fn staged(srv: &Service, op: &Operation) -> RequestFiles {
        let files = srv.request_files(op.output_prefix());
        let mut data: &[u8] = b"input";
        files.stage(&mut data).await.unwrap();
        files
    }

    fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[tokio::test]
    async fn returns_output_and_cleans_up() {
        let tmp = tempfile::tempdir().unwrap();
        let srv = Service::new(FFMpegWrapper::new(scripts().progress()), tmp.path().to_path_buf());
        let op = Operation::Process(ProcessParams::default());
        let files = staged(&srv, &op).await;
        assert_eq!(entries(tmp.path()), 1);

        let out = srv.transcode(&op, files).await.unwrap();

        assert_eq!(out, b"mp4");
        assert_eq!(entries(tmp.path()), 0);
    }

    #[tokio::test]
    async fn engine_failure_cleans_partial_output() {
        let tmp = tempfile::tempdir().unwrap();
        let srv = Service::new(FFMpegWrapper::new(scripts().fail()), tmp.path().to_path_buf());
        let files = staged(&srv, &Operation::Convert).await;

        let err = srv.transcode(&Operation::Convert, files).await.unwrap_err();

        assert!(matches!(err, SrvError::Engine(EngineError::Exit { code: 69, .. })));
        assert!(err.to_string().contains("Conversion failed!"));
        assert_eq!(entries(tmp.path()), 0);
    }

    #[tokio::test]
    async fn missing_output_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let srv = Service::new(FFMpegWrapper::new(scripts().noop()), tmp.path().to_path_buf());
        let files = staged(&srv, &Operation::Convert).await;

        let err = srv.transcode(&Operation::Convert, files).await.unwrap_err();

        assert!(matches!(err, SrvError::Other(_)));
        assert_eq!(entries(tmp.path()), 0);
    }
}
