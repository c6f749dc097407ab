//! Input trait definitions
//!
//! Defines the common interface for anything that produces touch frames.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::gesture::EventFrame;

/// Capacity of the frame channel between a source and the detector loop
pub const FRAME_CHANNEL_CAPACITY: usize = 1024;

/// Errors that can occur during input operations
#[derive(Error, Debug)]
pub enum InputError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Not a multi-touch device: {0}")]
    NotMultiTouch(String),

    #[error("Not supported on this platform")]
    NotSupported,

    #[error("Input source already started")]
    AlreadyStarted,

    #[error("Input source not started")]
    NotStarted,

    #[error("Malformed frame on line {line}: {source}")]
    Malformed {
        line: usize,
        source: serde_json::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type InputResult<T> = Result<T, InputError>;

/// Trait for anything that delivers touch frames in arrival order
#[async_trait]
pub trait FrameSource: Send {
    /// Start producing frames
    /// Returns a receiver that will emit frames until the source ends or is stopped
    async fn start(&mut self) -> InputResult<mpsc::Receiver<EventFrame>>;

    /// Stop producing frames
    async fn stop(&mut self) -> InputResult<()>;

    /// Check if the source is currently running
    fn is_running(&self) -> bool;
}
