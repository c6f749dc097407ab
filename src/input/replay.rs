//! Frame replay
//!
//! Reads recorded frames, one JSON object per line, and feeds them through the
//! same channel a live touchscreen would use.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use super::traits::{FrameSource, InputError, InputResult, FRAME_CHANNEL_CAPACITY};
use crate::gesture::EventFrame;

/// Parse one line of a recording. Blank lines and `#` comments yield `None`.
pub fn parse_frame_line(line: &str, line_no: usize) -> InputResult<Option<EventFrame>> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    serde_json::from_str(trimmed)
        .map(Some)
        .map_err(|source| InputError::Malformed {
            line: line_no,
            source,
        })
}

/// Replays a JSON-lines recording
pub struct ReplaySource {
    path: PathBuf,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl ReplaySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            task: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl FrameSource for ReplaySource {
    async fn start(&mut self) -> InputResult<mpsc::Receiver<EventFrame>> {
        if self.task.is_some() {
            return Err(InputError::AlreadyStarted);
        }

        let file = tokio::fs::File::open(&self.path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                InputError::DeviceNotFound(self.path.display().to_string())
            } else {
                InputError::Io(e)
            }
        })?;

        tracing::info!("Replaying frames from {}", self.path.display());

        let (tx, rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);
        let mut lines = BufReader::new(file).lines();

        self.task = Some(tokio::spawn(async move {
            let mut line_no = 0;
            loop {
                line_no += 1;
                let line = match lines.next_line().await {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!("Error reading recording: {}", e);
                        break;
                    }
                };
                match parse_frame_line(&line, line_no) {
                    Ok(Some(frame)) => {
                        if tx.send(frame).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => tracing::warn!("Skipping frame: {}", e),
                }
            }
            tracing::debug!("Replay finished after {} lines", line_no - 1);
        }));

        Ok(rx)
    }

    async fn stop(&mut self) -> InputResult<()> {
        let task = self.task.take().ok_or(InputError::NotStarted)?;
        task.abort();
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}
