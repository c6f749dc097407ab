//! Linux touchscreen capture
//!
//! Uses evdev to read multi-touch events from a touchscreen and decodes them
//! into frames on a dedicated reader thread.
//!
//! Requirements:
//! - User must be in the 'input' group or run as root

use async_trait::async_trait;
use evdev::{AbsoluteAxisType, Device, InputEvent};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};
use tokio::sync::mpsc;

use super::multitouch::MtFrameBuilder;
use super::traits::{FrameSource, InputError, InputResult, FRAME_CHANNEL_CAPACITY};
use crate::gesture::{EventFrame, EventTime};

/// A touchscreen found on the system
#[derive(Debug, Clone)]
pub struct TouchscreenInfo {
    pub path: PathBuf,
    pub name: String,
}

fn is_multitouch(device: &Device) -> bool {
    device
        .supported_absolute_axes()
        .is_some_and(|axes| axes.contains(AbsoluteAxisType::ABS_MT_SLOT))
}

/// Discover multi-touch devices on the system
pub fn discover_touchscreens() -> InputResult<Vec<TouchscreenInfo>> {
    if !Path::new("/dev/input").exists() {
        return Err(InputError::DeviceNotFound(
            "/dev/input directory not found".to_string(),
        ));
    }

    let devices: Vec<TouchscreenInfo> = evdev::enumerate()
        .filter(|(_, device)| is_multitouch(device))
        .map(|(path, device)| {
            let name = device.name().unwrap_or("unknown").to_string();
            tracing::debug!("Found touchscreen: {} ({})", path.display(), name);
            TouchscreenInfo { path, name }
        })
        .collect();

    if devices.is_empty() {
        return Err(InputError::DeviceNotFound(
            "No multi-touch devices found. Make sure you're in the 'input' group.".to_string(),
        ));
    }

    Ok(devices)
}

fn timestamp_ms(event: &InputEvent) -> EventTime {
    event
        .timestamp()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as EventTime)
        .unwrap_or_default()
}

fn set_nonblocking(device: &Device) -> std::io::Result<()> {
    let fd = device.as_raw_fd();
    // SAFETY: fd is owned by `device` and stays open for the duration of the call
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return Err(std::io::Error::last_os_error());
    }
    if unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) } < 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

/// Decode events into frames and send them on. Returns false once the
/// receiver is gone; remaining events are left unread.
fn forward(
    builder: &mut MtFrameBuilder,
    tx: &mpsc::Sender<EventFrame>,
    events: impl IntoIterator<Item = InputEvent>,
) -> bool {
    for event in events {
        let time = timestamp_ms(&event);
        for frame in builder.push(event.event_type().0, event.code(), event.value(), time) {
            if tx.blocking_send(frame).is_err() {
                return false;
            }
        }
    }
    true
}

/// Touch frame capture from an evdev touchscreen
pub struct TouchscreenSource {
    device_path: Option<PathBuf>,
    running: Arc<AtomicBool>,
}

impl TouchscreenSource {
    /// Capture from the given device, or the first touchscreen found
    pub fn new(device_path: Option<PathBuf>) -> Self {
        Self {
            device_path,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    fn open(&self) -> InputResult<Device> {
        let path = match &self.device_path {
            Some(path) => path.clone(),
            None => discover_touchscreens()?.remove(0).path,
        };

        let device = Device::open(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::PermissionDenied => InputError::PermissionDenied(format!(
                "Cannot open {}. Add user to 'input' group: sudo usermod -aG input $USER",
                path.display()
            )),
            std::io::ErrorKind::NotFound => InputError::DeviceNotFound(path.display().to_string()),
            _ => InputError::Io(e),
        })?;

        if !is_multitouch(&device) {
            return Err(InputError::NotMultiTouch(path.display().to_string()));
        }

        tracing::info!(
            "Opened touchscreen {} ({})",
            path.display(),
            device.name().unwrap_or("unknown")
        );
        Ok(device)
    }
}

#[async_trait]
impl FrameSource for TouchscreenSource {
    async fn start(&mut self) -> InputResult<mpsc::Receiver<EventFrame>> {
        if self.running.load(Ordering::SeqCst) {
            return Err(InputError::AlreadyStarted);
        }

        let mut device = self.open()?;
        set_nonblocking(&device)?;

        let (tx, rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);
        let running = self.running.clone();
        running.store(true, Ordering::SeqCst);

        // Spawn the reader thread
        std::thread::spawn(move || {
            let mut builder = MtFrameBuilder::new();

            while running.load(Ordering::SeqCst) {
                let events = match device.fetch_events() {
                    Ok(events) => events,
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        std::thread::sleep(Duration::from_millis(2));
                        continue;
                    }
                    Err(e) => {
                        tracing::error!("Error reading touchscreen: {}", e);
                        break;
                    }
                };

                if !forward(&mut builder, &tx, events) {
                    tracing::debug!("Frame receiver closed");
                    break;
                }
            }

            running.store(false, Ordering::SeqCst);
            tracing::info!("Touchscreen capture stopped");
        });

        Ok(rx)
    }

    async fn stop(&mut self) -> InputResult<()> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Err(InputError::NotStarted);
        }
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::multitouch::{ABS_MT_SLOT, ABS_MT_TRACKING_ID, SYN_REPORT};
    use evdev::EventType;

    fn landing(slot: i32, id: i32) -> Vec<InputEvent> {
        vec![
            InputEvent::new(EventType::ABSOLUTE, ABS_MT_SLOT, slot),
            InputEvent::new(EventType::ABSOLUTE, ABS_MT_TRACKING_ID, id),
            InputEvent::new(EventType::SYNCHRONIZATION, SYN_REPORT, 0),
        ]
    }

    #[test]
    fn test_forward_sends_frames() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut builder = MtFrameBuilder::new();

        assert!(forward(&mut builder, &tx, landing(0, 10)));
        let frame = rx.try_recv().unwrap();
        assert_eq!(frame.phase, crate::gesture::Phase::Down);
    }

    #[test]
    fn test_forward_stops_when_receiver_closed() {
        let (tx, rx) = mpsc::channel(4);
        drop(rx);
        let mut builder = MtFrameBuilder::new();

        let mut events = landing(0, 10);
        events.extend(landing(1, 11));
        assert!(!forward(&mut builder, &tx, events));

        // The second landing was never decoded
        assert_eq!(builder.active_contacts(), 1);
    }
}
