//! Host collaborator definitions
//!
//! The detector never talks to the system directly. Everything it needs from the
//! host is injected through the traits below.

use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::mpsc;

use super::frame::EventTime;

/// Errors raised by host collaborators
#[derive(Error, Debug)]
pub enum HostError {
    #[error("Host facility unavailable: {0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type HostResult<T> = Result<T, HostError>;

/// Signal produced when a three-finger swipe is recognized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwipeRecognized {
    /// Time of the frame that crossed the threshold
    pub event_time: EventTime,
}

/// Receives the "swipe recognized" notification
pub trait SwipeCallbacks: Send + Sync {
    fn on_swipe_three_finger(&self);
}

impl<F> SwipeCallbacks for F
where
    F: Fn() + Send + Sync,
{
    fn on_swipe_three_finger(&self) {
        self()
    }
}

/// Forwards recognized swipes into a channel for the main loop
pub struct ChannelCallbacks {
    tx: mpsc::Sender<()>,
}

impl ChannelCallbacks {
    pub fn new(tx: mpsc::Sender<()>) -> Self {
        Self { tx }
    }
}

impl SwipeCallbacks for ChannelCallbacks {
    fn on_swipe_three_finger(&self) {
        if let Err(e) = self.tx.try_send(()) {
            tracing::warn!("Dropping swipe notification: {}", e);
        }
    }
}

/// Privileged host facility told whether a swipe is being tracked, so that
/// competing gestures can be suppressed
pub trait GestureActivitySink: Send + Sync {
    fn set_gesture_active(&self, active: bool) -> HostResult<()>;
}

/// Publishes the activity flag as `1`/`0` in a file
pub struct StateFileSink {
    path: PathBuf,
}

impl StateFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl GestureActivitySink for StateFileSink {
    fn set_gesture_active(&self, active: bool) -> HostResult<()> {
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)?;
        file.write_all(if active { b"1\n" } else { b"0\n" })?;
        Ok(())
    }
}

/// Only logs activity changes
#[derive(Debug, Default)]
pub struct LogSink;

impl GestureActivitySink for LogSink {
    fn set_gesture_active(&self, active: bool) -> HostResult<()> {
        tracing::debug!("Three-finger swipe tracking active: {}", active);
        Ok(())
    }
}

/// A boolean system condition polled until it becomes true
pub trait ReadinessCheck: Send + Sync {
    fn is_ready(&self) -> bool;
}

impl<F> ReadinessCheck for F
where
    F: Fn() -> bool + Send + Sync,
{
    fn is_ready(&self) -> bool {
        self()
    }
}

#[derive(Debug, Default)]
pub struct AlwaysReady;

impl ReadinessCheck for AlwaysReady {
    fn is_ready(&self) -> bool {
        true
    }
}

/// Ready once the flag file exists and holds something other than `0`
#[derive(Debug, Clone)]
pub struct FlagFile {
    path: PathBuf,
}

impl FlagFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ReadinessCheck for FlagFile {
    fn is_ready(&self) -> bool {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => {
                let value = contents.trim();
                !value.is_empty() && value != "0" && value != "false"
            }
            Err(_) => false,
        }
    }
}
