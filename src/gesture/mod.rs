//! Gesture module - Three-finger swipe recognition
//!
//! Handles:
//! - Touch frame representation
//! - The swipe detection state machine
//! - Host collaborators the detector reports to

mod detector;
mod frame;
mod host;

pub use detector::*;
pub use frame::*;
pub use host::*;
