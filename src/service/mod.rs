//! Service module - Wires a frame source to the detector
//!
//! Provides:
//! - Detector construction from configuration
//! - The screenshot action run on recognition
//! - The event loop shared by live capture and replay

use std::path::PathBuf;
use std::process::ExitStatus;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::config::{Config, ConfigError, ScreenshotConfig};
use crate::gesture::{
    ChannelCallbacks, FlagFile, GestureActivitySink, LogSink, ReadinessCheck, StateFileSink,
    SwipeCallbacks, ThreeFingerSwipeDetector,
};
use crate::input::{FrameSource, InputError};

/// Service errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Input error: {0}")]
    Input(#[from] InputError),

    #[error("Screenshot command failed: {0}")]
    Screenshot(#[from] std::io::Error),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Counters reported when the loop ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceStats {
    pub frames: u64,
    pub recognized: u64,
    pub screenshots: u64,
}

/// Build a detector wired to the configured host collaborators
pub fn build_detector(
    config: &Config,
    callbacks: Arc<dyn SwipeCallbacks>,
) -> ServiceResult<ThreeFingerSwipeDetector> {
    let metrics = config.display.metrics()?;

    let sink: Arc<dyn GestureActivitySink> = match &config.gesture.active_state_file {
        Some(path) => Arc::new(StateFileSink::new(path)),
        None => Arc::new(LogSink),
    };

    let mut detector = ThreeFingerSwipeDetector::new(metrics, callbacks).with_activity_sink(sink);

    let readiness = &config.readiness;
    if readiness.boot_completed_flag.is_some() || readiness.device_provisioned_flag.is_some() {
        detector = detector.with_readiness(
            flag_check(readiness.boot_completed_flag.clone()),
            flag_check(readiness.device_provisioned_flag.clone()),
        );
    }

    let thresholds = detector.thresholds();
    tracing::info!(
        "Detector ready: {}x{} @ {}x, edge {}px, swipe {}px",
        metrics.width,
        metrics.height,
        metrics.density,
        thresholds.edge,
        thresholds.gesture
    );

    Ok(detector)
}

fn flag_check(path: Option<PathBuf>) -> Box<dyn ReadinessCheck> {
    match path {
        Some(path) => Box::new(FlagFile::new(path)),
        None => Box::new(crate::gesture::AlwaysReady),
    }
}

/// Runs the configured screenshot command
#[derive(Debug, Clone)]
pub struct ScreenshotAction {
    command: Vec<String>,
    output_dir: Option<PathBuf>,
}

impl ScreenshotAction {
    pub fn new(config: &ScreenshotConfig) -> ServiceResult<Self> {
        if config.command.is_empty() {
            return Err(ConfigError::EmptyCommand.into());
        }
        Ok(Self {
            command: config.command.clone(),
            output_dir: config.output_dir.clone(),
        })
    }

    pub async fn run(&self) -> ServiceResult<ExitStatus> {
        let (program, args) = self
            .command
            .split_first()
            .ok_or(ServiceError::Config(ConfigError::EmptyCommand))?;

        let mut command = tokio::process::Command::new(program);
        command.args(args);
        if let Some(dir) = &self.output_dir {
            command.current_dir(dir);
        }

        tracing::debug!("Running screenshot command: {:?}", self.command);
        let status = command.status().await?;
        Ok(status)
    }
}

/// Owns the detector and drives it from a frame source
pub struct GestureService {
    detector: ThreeFingerSwipeDetector,
    swipe_rx: mpsc::Receiver<()>,
    screenshot: Option<ScreenshotAction>,
    stats: ServiceStats,
}

impl GestureService {
    pub fn new(config: &Config, screenshot: Option<ScreenshotAction>) -> ServiceResult<Self> {
        let (tx, swipe_rx) = mpsc::channel(16);
        let detector = build_detector(config, Arc::new(ChannelCallbacks::new(tx)))?;
        Ok(Self {
            detector,
            swipe_rx,
            screenshot,
            stats: ServiceStats::default(),
        })
    }

    pub fn detector(&self) -> &ThreeFingerSwipeDetector {
        &self.detector
    }

    pub fn stats(&self) -> ServiceStats {
        self.stats
    }

    /// Process frames until the source ends or `shutdown` resolves
    pub async fn run<S>(
        &mut self,
        source: &mut dyn FrameSource,
        shutdown: S,
    ) -> ServiceResult<ServiceStats>
    where
        S: std::future::Future<Output = ()>,
    {
        let mut frames = source.start().await?;
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                frame = frames.recv() => {
                    let Some(frame) = frame else {
                        tracing::info!("Frame source ended");
                        break;
                    };
                    self.stats.frames += 1;
                    if let Some(signal) = self.detector.on_event(&frame) {
                        tracing::info!("Swipe recognized at {}", signal.event_time);
                        self.stats.recognized += 1;
                    }
                }
                Some(()) = self.swipe_rx.recv() => {
                    self.take_screenshot().await;
                }
                _ = &mut shutdown => {
                    tracing::info!("Shutting down");
                    break;
                }
            }
        }

        // Deliver swipes recognized by the last frames
        while let Ok(()) = self.swipe_rx.try_recv() {
            self.take_screenshot().await;
        }

        if source.is_running() {
            source.stop().await?;
        }
        self.detector.cleanup();

        Ok(self.stats)
    }

    async fn take_screenshot(&mut self) {
        let Some(action) = &self.screenshot else {
            tracing::debug!("No screenshot action configured");
            return;
        };
        match action.run().await {
            Ok(status) if status.success() => {
                self.stats.screenshots += 1;
                tracing::info!("Screenshot taken");
            }
            Ok(status) => tracing::warn!("Screenshot command exited with {}", status),
            Err(e) => tracing::error!("{}", e),
        }
    }
}
