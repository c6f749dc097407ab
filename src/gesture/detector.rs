//! Three-finger swipe detection
//!
//! Recognizes three fingers landing close together and sliding down the
//! screen. Frames must be fed in arrival order from a single thread.

use std::sync::Arc;

use super::frame::{EventFrame, EventTime, Phase};
use super::host::{GestureActivitySink, LogSink, ReadinessCheck, SwipeCallbacks, SwipeRecognized};
use crate::screen::DisplayMetrics;

/// Number of fingers making up the gesture
pub const GESTURE_POINTERS: usize = 3;

/// Maximum time between first touch and the third finger landing (ms)
pub const START_WINDOW_MS: EventTime = 500;

/// Bottom edge reservation, in density-independent pixels
const EDGE_DP: f32 = 50.0;

/// Maximum vertical spread of the fingers at start, in density-independent pixels
const VERTICAL_SPREAD_DP: f32 = 150.0;

/// Thresholds derived from the display metrics
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Distance fingers must keep from the bottom edge (px)
    pub edge: i32,
    /// Summed downward travel of all three fingers required (px)
    pub gesture: i32,
    /// Maximum vertical spread at start (px)
    pub max_vertical_spread: f32,
    /// Maximum horizontal spread at start (px)
    pub max_horizontal_spread: f32,
}

impl Thresholds {
    pub fn from_metrics(metrics: &DisplayMetrics) -> Self {
        let edge = (EDGE_DP * metrics.density) as i32;
        Self {
            edge,
            gesture: edge * GESTURE_POINTERS as i32,
            max_vertical_spread: metrics.density * VERTICAL_SPREAD_DP,
            max_horizontal_spread: metrics.short_side() as f32,
        }
    }
}

/// Detection state for the current gesture epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GestureState {
    #[default]
    None,
    Detecting,
    DetectedFalse,
    DetectedTrue,
    NoDetect,
}

impl GestureState {
    /// Whether competing gestures should be suppressed in this state
    pub fn is_tracking_active(&self) -> bool {
        matches!(self, GestureState::Detecting | GestureState::DetectedTrue)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct TrackedPointer {
    id: i32,
    initial_y: f32,
}

/// The three fingers selected when detection started
#[derive(Debug, Clone, PartialEq)]
struct TrackedPointers([TrackedPointer; GESTURE_POINTERS]);

impl TrackedPointers {
    fn capture(frame: &EventFrame) -> Option<Self> {
        let mut slots = [TrackedPointer { id: 0, initial_y: 0.0 }; GESTURE_POINTERS];
        for (slot, pointer) in slots.iter_mut().zip(frame.pointers.iter()) {
            *slot = TrackedPointer {
                id: pointer.id,
                initial_y: pointer.y,
            };
        }
        (frame.pointer_count() == GESTURE_POINTERS).then_some(Self(slots))
    }

    /// Summed downward travel since capture, or `None` if a tracked finger
    /// cannot be resolved in the frame
    fn travel(&self, frame: &EventFrame) -> Option<f32> {
        let mut distance = 0.0;
        for tracked in &self.0 {
            let index = frame.find_pointer_index(tracked.id)?;
            if index >= GESTURE_POINTERS {
                return None;
            }
            distance += frame.pointers[index].y - tracked.initial_y;
        }
        Some(distance)
    }
}

/// A readiness condition latched once it reports true
struct Latch {
    check: Option<Box<dyn ReadinessCheck>>,
    ready: bool,
}

impl Latch {
    fn ready() -> Self {
        Self {
            check: None,
            ready: true,
        }
    }

    fn polling(check: Box<dyn ReadinessCheck>) -> Self {
        Self {
            check: Some(check),
            ready: false,
        }
    }

    fn poll(&mut self) {
        if let Some(check) = &self.check {
            self.ready = check.is_ready();
        }
        if self.ready {
            self.check = None;
        }
    }
}

/// Detects the three-finger swipe-down gesture
pub struct ThreeFingerSwipeDetector {
    metrics: DisplayMetrics,
    thresholds: Thresholds,
    state: GestureState,
    tracked: Option<TrackedPointers>,
    boot_completed: Latch,
    device_provisioned: Latch,
    callbacks: Arc<dyn SwipeCallbacks>,
    activity: Option<Arc<dyn GestureActivitySink>>,
}

impl ThreeFingerSwipeDetector {
    /// Create a detector that is ready immediately and logs activity changes
    pub fn new(metrics: DisplayMetrics, callbacks: Arc<dyn SwipeCallbacks>) -> Self {
        Self {
            metrics,
            thresholds: Thresholds::from_metrics(&metrics),
            state: GestureState::None,
            tracked: None,
            boot_completed: Latch::ready(),
            device_provisioned: Latch::ready(),
            callbacks,
            activity: Some(Arc::new(LogSink)),
        }
    }

    /// Gate detection on the boot-completed and device-provisioned conditions
    pub fn with_readiness(
        mut self,
        boot_completed: Box<dyn ReadinessCheck>,
        device_provisioned: Box<dyn ReadinessCheck>,
    ) -> Self {
        self.boot_completed = Latch::polling(boot_completed);
        self.device_provisioned = Latch::polling(device_provisioned);
        self
    }

    pub fn with_activity_sink(mut self, sink: Arc<dyn GestureActivitySink>) -> Self {
        self.activity = Some(sink);
        self
    }

    pub fn state(&self) -> GestureState {
        self.state
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Whether both readiness conditions have latched
    pub fn is_ready(&self) -> bool {
        self.boot_completed.ready && self.device_provisioned.ready
    }

    /// Feed one input frame. Returns the recognition signal when this frame
    /// completed the gesture.
    pub fn on_event(&mut self, frame: &EventFrame) -> Option<SwipeRecognized> {
        // A poll consumes the frame even when the condition turns out to hold
        if !self.boot_completed.ready {
            self.boot_completed.poll();
            return None;
        }
        if !self.device_provisioned.ready {
            self.device_provisioned.poll();
            return None;
        }

        if frame.phase == Phase::Down {
            self.change_state(GestureState::None);
        } else if self.state == GestureState::None
            && frame.pointer_count() == GESTURE_POINTERS
        {
            if self.check_is_start_three_gesture(frame) {
                self.change_state(GestureState::Detecting);
                self.tracked = TrackedPointers::capture(frame);
            } else {
                self.change_state(GestureState::NoDetect);
            }
        }

        if self.state != GestureState::Detecting {
            return None;
        }

        if frame.pointer_count() != GESTURE_POINTERS {
            tracing::debug!(
                "Three-finger swipe aborted: {} pointers",
                frame.pointer_count()
            );
            self.change_state(GestureState::DetectedFalse);
            return None;
        }

        if frame.phase != Phase::Move {
            return None;
        }

        let travel = self.tracked.as_ref().and_then(|tracked| tracked.travel(frame));
        match travel {
            None => {
                tracing::debug!("Three-finger swipe aborted: tracked pointer lost");
                self.change_state(GestureState::DetectedFalse);
                None
            }
            Some(distance) if distance >= self.thresholds.gesture as f32 => {
                tracing::info!("Three-finger swipe recognized ({:.0}px)", distance);
                self.change_state(GestureState::DetectedTrue);
                self.callbacks.on_swipe_three_finger();
                Some(SwipeRecognized {
                    event_time: frame.event_time,
                })
            }
            Some(_) => None,
        }
    }

    /// Decide whether the fingers currently down may start a swipe
    pub fn check_is_start_three_gesture(&self, frame: &EventFrame) -> bool {
        if frame.elapsed_since_down() > START_WINDOW_MS {
            return false;
        }

        let bottom_limit = self.metrics.height as f32 - self.thresholds.edge as f32;
        let mut min_x = f32::MAX;
        let mut max_x = f32::MIN;
        let mut min_y = f32::MAX;
        let mut max_y = f32::MIN;
        for pointer in &frame.pointers {
            if pointer.y > bottom_limit {
                return false;
            }
            min_x = min_x.min(pointer.x);
            max_x = max_x.max(pointer.x);
            min_y = min_y.min(pointer.y);
            max_y = max_y.max(pointer.y);
        }

        max_y - min_y <= self.thresholds.max_vertical_spread
            && max_x - min_x <= self.thresholds.max_horizontal_spread
    }

    /// Release the host context. Later state changes are no longer published.
    pub fn cleanup(&mut self) {
        self.activity = None;
    }

    fn change_state(&mut self, state: GestureState) {
        if self.state == state {
            return;
        }
        tracing::trace!("Gesture state {:?} -> {:?}", self.state, state);
        self.state = state;
        if state != GestureState::Detecting {
            self.tracked = None;
        }

        let Some(sink) = &self.activity else {
            return;
        };
        if let Err(e) = sink.set_gesture_active(state.is_tracking_active()) {
            tracing::error!("Failed to publish swipe gesture activity: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::frame::PointerSample;
    use crate::gesture::host::{HostError, HostResult};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    const HEIGHT: u32 = 1920;
    const WIDTH: u32 = 1080;

    #[derive(Default)]
    struct Counter(AtomicUsize);

    impl SwipeCallbacks for Counter {
        fn on_swipe_three_finger(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        calls: Mutex<Vec<bool>>,
        fail: bool,
    }

    impl GestureActivitySink for RecordingSink {
        fn set_gesture_active(&self, active: bool) -> HostResult<()> {
            self.calls.lock().unwrap().push(active);
            if self.fail {
                Err(HostError::Unavailable("activity manager".to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn detector() -> (ThreeFingerSwipeDetector, Arc<Counter>) {
        let counter = Arc::new(Counter::default());
        let detector =
            ThreeFingerSwipeDetector::new(DisplayMetrics::new(2.0, WIDTH, HEIGHT), counter.clone());
        (detector, counter)
    }

    fn frame(phase: Phase, time: EventTime, points: &[(i32, f32, f32)]) -> EventFrame {
        EventFrame::new(
            phase,
            time,
            0,
            points
                .iter()
                .map(|&(id, x, y)| PointerSample::new(id, x, y))
                .collect(),
        )
    }

    fn at_y(y: [f32; 3]) -> [(i32, f32, f32); 3] {
        [(0, 300.0, y[0]), (1, 500.0, y[1]), (2, 700.0, y[2])]
    }

    /// Drive a detector into the detecting state with fingers at y=500
    fn start(detector: &mut ThreeFingerSwipeDetector) {
        detector.on_event(&frame(Phase::Down, 0, &[(0, 300.0, 500.0)]));
        detector.on_event(&frame(
            Phase::PointerDown,
            20,
            &[(0, 300.0, 500.0), (1, 500.0, 500.0)],
        ));
        detector.on_event(&frame(Phase::PointerDown, 40, &at_y([500.0; 3])));
        assert_eq!(detector.state(), GestureState::Detecting);
    }

    #[test]
    fn test_thresholds_from_density() {
        let t = Thresholds::from_metrics(&DisplayMetrics::new(2.0, WIDTH, HEIGHT));
        assert_eq!(t.edge, 100);
        assert_eq!(t.gesture, 300);
        assert_eq!(t.max_vertical_spread, 300.0);
        assert_eq!(t.max_horizontal_spread, 1080.0);
    }

    #[test]
    fn test_swipe_at_threshold_recognized() {
        let (mut detector, counter) = detector();
        start(&mut detector);

        let signal = detector.on_event(&frame(Phase::Move, 60, &at_y([600.0; 3])));

        assert_eq!(signal, Some(SwipeRecognized { event_time: 60 }));
        assert_eq!(detector.state(), GestureState::DetectedTrue);
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_swipe_below_threshold_not_recognized() {
        let (mut detector, counter) = detector();
        start(&mut detector);

        let signal = detector.on_event(&frame(Phase::Move, 60, &at_y([600.0, 600.0, 599.0])));

        assert!(signal.is_none());
        assert_eq!(detector.state(), GestureState::Detecting);
        assert_eq!(counter.0.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_signal_fires_once_per_epoch() {
        let (mut detector, counter) = detector();
        start(&mut detector);

        detector.on_event(&frame(Phase::Move, 60, &at_y([600.0; 3])));
        detector.on_event(&frame(Phase::Move, 70, &at_y([500.0; 3])));
        detector.on_event(&frame(Phase::Move, 80, &at_y([700.0; 3])));

        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_pointer_order_does_not_matter() {
        let (mut detector, counter) = detector();
        start(&mut detector);

        let reordered = [(2, 700.0, 600.0), (0, 300.0, 600.0), (1, 500.0, 600.0)];
        detector.on_event(&frame(Phase::Move, 60, &reordered));

        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_upward_motion_cancels_out() {
        let (mut detector, counter) = detector();
        start(&mut detector);

        detector.on_event(&frame(Phase::Move, 60, &at_y([650.0, 650.0, 100.0])));

        assert_eq!(detector.state(), GestureState::Detecting);
        assert_eq!(counter.0.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_finger_lift_aborts() {
        let (mut detector, counter) = detector();
        start(&mut detector);

        detector.on_event(&frame(
            Phase::Move,
            60,
            &[(0, 300.0, 700.0), (1, 500.0, 700.0)],
        ));
        assert_eq!(detector.state(), GestureState::DetectedFalse);

        detector.on_event(&frame(Phase::Move, 70, &at_y([900.0; 3])));
        assert_eq!(detector.state(), GestureState::DetectedFalse);
        assert_eq!(counter.0.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_replaced_pointer_aborts() {
        let (mut detector, _) = detector();
        start(&mut detector);

        let replaced = [(0, 300.0, 700.0), (1, 500.0, 700.0), (9, 700.0, 700.0)];
        detector.on_event(&frame(Phase::Move, 60, &replaced));

        assert_eq!(detector.state(), GestureState::DetectedFalse);
    }

    #[test]
    fn test_start_rejected_after_window() {
        let (mut detector, _) = detector();

        assert!(!detector.check_is_start_three_gesture(&frame(
            Phase::PointerDown,
            501,
            &at_y([500.0; 3])
        )));
        assert!(detector.check_is_start_three_gesture(&frame(
            Phase::PointerDown,
            500,
            &at_y([500.0; 3])
        )));

        detector.on_event(&frame(Phase::Down, 0, &[(0, 300.0, 500.0)]));
        detector.on_event(&frame(Phase::PointerDown, 600, &at_y([500.0; 3])));
        assert_eq!(detector.state(), GestureState::NoDetect);
    }

    #[test]
    fn test_start_rejected_near_bottom_edge() {
        let (detector, _) = detector();
        let near_edge = HEIGHT as f32 - 50.0;

        assert!(!detector.check_is_start_three_gesture(&frame(
            Phase::PointerDown,
            10,
            &at_y([near_edge - 100.0, near_edge - 100.0, near_edge])
        )));
        assert!(detector.check_is_start_three_gesture(&frame(
            Phase::PointerDown,
            10,
            &at_y([HEIGHT as f32 - 100.0; 3])
        )));
    }

    #[test]
    fn test_start_rejected_on_spread() {
        let (detector, _) = detector();

        assert!(!detector.check_is_start_three_gesture(&frame(
            Phase::PointerDown,
            10,
            &at_y([500.0, 500.0, 801.0])
        )));
        assert!(detector.check_is_start_three_gesture(&frame(
            Phase::PointerDown,
            10,
            &at_y([500.0, 500.0, 800.0])
        )));

        let wide = [(0, 0.0, 500.0), (1, 500.0, 500.0), (2, 1081.0, 500.0)];
        assert!(!detector.check_is_start_three_gesture(&frame(Phase::PointerDown, 10, &wide)));
    }

    #[test]
    fn test_no_detect_is_terminal_until_down() {
        let (mut detector, counter) = detector();
        detector.on_event(&frame(Phase::Down, 0, &[(0, 300.0, 500.0)]));
        detector.on_event(&frame(Phase::PointerDown, 600, &at_y([500.0; 3])));
        assert_eq!(detector.state(), GestureState::NoDetect);

        detector.on_event(&frame(Phase::Move, 620, &at_y([900.0; 3])));
        assert_eq!(detector.state(), GestureState::NoDetect);
        assert_eq!(counter.0.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_down_resets_after_detection() {
        let (mut detector, counter) = detector();
        start(&mut detector);
        detector.on_event(&frame(Phase::Move, 60, &at_y([600.0; 3])));
        assert_eq!(detector.state(), GestureState::DetectedTrue);

        detector.on_event(&frame(Phase::Up, 80, &[(0, 300.0, 600.0)]));
        assert_eq!(detector.state(), GestureState::DetectedTrue);

        start(&mut detector);
        detector.on_event(&frame(Phase::Move, 60, &at_y([600.0; 3])));
        assert_eq!(counter.0.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_readiness_gates_input() {
        let booted = Arc::new(AtomicBool::new(false));
        let provisioned = Arc::new(AtomicBool::new(false));
        let counter = Arc::new(Counter::default());
        let (b, p) = (booted.clone(), provisioned.clone());
        let mut detector =
            ThreeFingerSwipeDetector::new(DisplayMetrics::new(2.0, WIDTH, HEIGHT), counter.clone())
                .with_readiness(
                    Box::new(move || b.load(Ordering::SeqCst)),
                    Box::new(move || p.load(Ordering::SeqCst)),
                );

        for _ in 0..3 {
            detector.on_event(&frame(Phase::Down, 0, &[(0, 300.0, 500.0)]));
            detector.on_event(&frame(Phase::PointerDown, 40, &at_y([500.0; 3])));
            detector.on_event(&frame(Phase::Move, 60, &at_y([900.0; 3])));
        }
        assert!(!detector.is_ready());
        assert_eq!(detector.state(), GestureState::None);

        booted.store(true, Ordering::SeqCst);
        detector.on_event(&frame(Phase::Move, 60, &at_y([900.0; 3])));
        assert_eq!(detector.state(), GestureState::None);

        provisioned.store(true, Ordering::SeqCst);
        detector.on_event(&frame(Phase::Move, 60, &at_y([900.0; 3])));
        assert!(detector.is_ready());
        assert_eq!(detector.state(), GestureState::None);
        assert_eq!(counter.0.load(Ordering::SeqCst), 0);

        // Latched: later check answers are ignored
        booted.store(false, Ordering::SeqCst);
        start(&mut detector);
    }

    #[test]
    fn test_activity_published_on_real_changes() {
        let (detector, _) = detector();
        let sink = Arc::new(RecordingSink::default());
        let mut detector = detector.with_activity_sink(sink.clone());

        detector.on_event(&frame(Phase::Down, 0, &[(0, 300.0, 500.0)]));
        assert!(sink.calls.lock().unwrap().is_empty());

        start(&mut detector);
        detector.on_event(&frame(Phase::Move, 60, &at_y([600.0; 3])));
        detector.on_event(&frame(Phase::Down, 100, &[(0, 300.0, 500.0)]));

        assert_eq!(*sink.calls.lock().unwrap(), vec![true, true, false]);
    }

    #[test]
    fn test_activity_failure_does_not_block_transition() {
        let (detector, counter) = detector();
        let sink = Arc::new(RecordingSink {
            fail: true,
            ..Default::default()
        });
        let mut detector = detector.with_activity_sink(sink.clone());

        start(&mut detector);
        detector.on_event(&frame(Phase::Move, 60, &at_y([600.0; 3])));

        assert_eq!(detector.state(), GestureState::DetectedTrue);
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
        assert_eq!(sink.calls.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_cleanup_stops_publishing() {
        let (detector, _) = detector();
        let sink = Arc::new(RecordingSink::default());
        let mut detector = detector.with_activity_sink(sink.clone());

        detector.cleanup();
        start(&mut detector);

        assert!(sink.calls.lock().unwrap().is_empty());
    }
}
