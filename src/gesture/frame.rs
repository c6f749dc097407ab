//! Touch event frames
//!
//! Platform-independent representation of multi-touch input.

use serde::{Deserialize, Serialize};

/// Timestamp for frames (milliseconds, monotonic within a session)
pub type EventTime = u64;

/// Phase of a touch frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// First finger touched the screen; starts a new gesture epoch
    Down,
    /// Another finger joined while at least one was already down
    PointerDown,
    /// One or more pointers moved
    Move,
    /// A finger lifted while others stay down
    PointerUp,
    /// Last finger lifted
    Up,
    /// The gesture was aborted by the input system
    Cancel,
}

/// One touch point within a frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerSample {
    /// Stable identity for the duration of the touch
    pub id: i32,
    /// X position in device pixels
    pub x: f32,
    /// Y position in device pixels
    pub y: f32,
}

impl PointerSample {
    pub fn new(id: i32, x: f32, y: f32) -> Self {
        Self { id, x, y }
    }
}

/// All concurrently active pointers at one instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventFrame {
    pub phase: Phase,
    /// Time of this frame
    pub event_time: EventTime,
    /// Time at which the current multi-touch gesture began
    pub down_time: EventTime,
    #[serde(default)]
    pub pointers: Vec<PointerSample>,
}

impl EventFrame {
    pub fn new(
        phase: Phase,
        event_time: EventTime,
        down_time: EventTime,
        pointers: Vec<PointerSample>,
    ) -> Self {
        Self {
            phase,
            event_time,
            down_time,
            pointers,
        }
    }

    pub fn pointer_count(&self) -> usize {
        self.pointers.len()
    }

    /// Index of the pointer with the given identity in this frame
    pub fn find_pointer_index(&self, id: i32) -> Option<usize> {
        self.pointers.iter().position(|p| p.id == id)
    }

    pub fn pointer(&self, id: i32) -> Option<&PointerSample> {
        self.pointers.iter().find(|p| p.id == id)
    }

    /// Milliseconds since the gesture began
    pub fn elapsed_since_down(&self) -> EventTime {
        self.event_time.saturating_sub(self.down_time)
    }
}
