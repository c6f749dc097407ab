//! Input module - Touch frame sources
//!
//! This module provides:
//! - Decoding of kernel multi-touch events into frames
//! - Live capture from a touchscreen
//! - Replay of recorded frames

mod multitouch;
mod replay;
mod traits;

#[cfg(target_os = "linux")]
mod linux;

// Re-export common types
pub use multitouch::*;
pub use replay::*;
pub use traits::*;

// Re-export platform-specific implementations
#[cfg(target_os = "linux")]
pub use linux::{discover_touchscreens, TouchscreenInfo, TouchscreenSource};

/// Get the current platform name
pub fn platform_name() -> &'static str {
    #[cfg(target_os = "linux")]
    return "Linux";

    #[cfg(not(target_os = "linux"))]
    return "Unknown";
}

/// Whether live touchscreen capture is available on this platform
pub fn live_capture_supported() -> bool {
    cfg!(target_os = "linux")
}

/// Fail with [`InputError::NotSupported`] where live capture is unavailable
pub fn ensure_live_capture() -> InputResult<()> {
    if live_capture_supported() {
        Ok(())
    } else {
        Err(InputError::NotSupported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_live_capture_check_matches_platform() {
        match ensure_live_capture() {
            Ok(()) => assert!(live_capture_supported()),
            Err(e) => {
                assert!(!live_capture_supported());
                assert!(matches!(e, InputError::NotSupported));
            }
        }
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_live_capture_on_linux() {
        assert!(ensure_live_capture().is_ok());
        assert_eq!(platform_name(), "Linux");
    }
}
