use std::collections::VecDeque;
use std::process::Stdio;
use std::time::Instant;

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

use super::args::Invocation;
use super::progress::{Progress, ProgressTracker};

/// Stderr lines kept for the failure message.
const STDERR_TAIL: usize = 10;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("cannot run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} exited with code {code}: {stderr}")]
    Exit {
        program: String,
        code: i32,
        stderr: String,
    },
    #[error("{program} was terminated by a signal: {stderr}")]
    Killed { program: String, stderr: String },
    #[error("{program} io: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Runs the ffmpeg binary as a child process.
#[derive(Clone, Debug)]
pub struct FFMpegWrapper {
    program: String,
}

impl FFMpegWrapper {
    pub fn new(program: impl Into<String>) -> Self {
        let program = program.into();
        tracing::debug!(program, "Initializing FFMpegWrapper");
        Self { program }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Returns the first line of `ffmpeg -version`.
    pub async fn check(&self) -> Result<String, EngineError> {
        let out = Command::new(&self.program)
            .arg("-version")
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| self.spawn_error(source))?;
        let stdout = String::from_utf8_lossy(&out.stdout);
        let first = stdout.lines().next().unwrap_or_default().to_string();
        if !out.status.success() {
            return Err(EngineError::Exit {
                program: self.program.clone(),
                code: out.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
            });
        }
        Ok(first)
    }

    /// Runs one invocation to completion.
    ///
    /// Progress goes to the log and, when given, to `progress`; a full or closed
    /// channel never slows the engine down. The child is killed if the returned
    /// future is dropped.
    #[tracing::instrument(skip(self, invocation, progress))]
    pub async fn transcode(
        &self,
        invocation: &Invocation,
        progress: Option<mpsc::Sender<Progress>>,
    ) -> Result<(), EngineError> {
        let started = Instant::now();
        let mut child = Command::new(&self.program)
            .args(invocation.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| self.spawn_error(source))?;
        tracing::info!(command = invocation.command_line(&self.program), "ffmpeg started");

        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            return Err(self.io_error(std::io::Error::other("ffmpeg pipes not captured")));
        };
        let mut stdout = BufReader::new(stdout);
        let mut stderr = BufReader::new(stderr);
        let (mut out_buf, mut err_buf) = (Vec::new(), Vec::new());
        let (mut out_done, mut err_done) = (false, false);

        let mut tracker = ProgressTracker::new();
        let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL);

        while !(out_done && err_done) {
            tokio::select! {
                line = next_line(&mut stdout, &mut out_buf), if !out_done => match line {
                    Ok(Some(line)) => {
                        if let Some(p) = tracker.on_progress_line(&line) {
                            tracing::info!(percent = p.percent, "progress");
                            if let Some(tx) = &progress {
                                let _ = tx.try_send(p);
                            }
                        }
                    }
                    Ok(None) => out_done = true,
                    Err(e) => return Err(self.io_error(e)),
                },
                line = next_line(&mut stderr, &mut err_buf), if !err_done => match line {
                    Ok(Some(line)) => {
                        tracing::trace!(target: "ffmpeg", "{}", line);
                        tracker.on_stderr_line(&line);
                        if !line.trim().is_empty() {
                            if tail.len() == STDERR_TAIL {
                                tail.pop_front();
                            }
                            tail.push_back(line);
                        }
                    }
                    Ok(None) => err_done = true,
                    Err(e) => return Err(self.io_error(e)),
                },
            }
        }

        let status = child.wait().await.map_err(|e| self.io_error(e))?;
        let elapsed = format!("{:.2}s", started.elapsed().as_secs_f64());
        if status.success() {
            tracing::info!(elapsed, "ffmpeg done");
            return Ok(());
        }

        let stderr = Vec::from(tail).join("\n");
        let err = match status.code() {
            Some(code) => EngineError::Exit {
                program: self.program.clone(),
                code,
                stderr,
            },
            None => EngineError::Killed {
                program: self.program.clone(),
                stderr,
            },
        };
        tracing::error!(elapsed, error = %err, "ffmpeg failed");
        Err(err)
    }

    fn spawn_error(&self, source: std::io::Error) -> EngineError {
        EngineError::Spawn {
            program: self.program.clone(),
            source,
        }
    }

    fn io_error(&self, source: std::io::Error) -> EngineError {
        EngineError::Io {
            program: self.program.clone(),
            source,
        }
    }
}

/// Reads one line, tolerating non UTF-8 output. `buf` must be kept between
/// calls so a read interrupted by `select!` resumes where it stopped.
async fn next_line<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    buf: &mut Vec<u8>,
) -> std::io::Result<Option<String>> {
    let n = reader.read_until(b'\n', buf).await?;
    if n == 0 && buf.is_empty() {
        return Ok(None);
    }
    let line = String::from_utf8_lossy(&buf[..])
        .trim_end_matches(['\r', '\n'])
        .to_string();
    buf.clear();
    Ok(Some(line))
}
