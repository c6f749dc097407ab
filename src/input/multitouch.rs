//! Multi-touch protocol B decoding
//!
//! Turns the kernel's slot-based ABS_MT event stream into [`EventFrame`]s with
//! one phase per frame: new contacts produce `Down`/`PointerDown`, lifted ones
//! `PointerUp`/`Up`, and position changes `Move`.

use std::collections::BTreeMap;

use crate::gesture::{EventFrame, EventTime, Phase, PointerSample};

// Linux input event constants
pub const EV_SYN: u16 = 0x00;
pub const EV_ABS: u16 = 0x03;

pub const SYN_REPORT: u16 = 0x00;
pub const SYN_DROPPED: u16 = 0x03;

pub const ABS_MT_SLOT: u16 = 0x2f;
pub const ABS_MT_POSITION_X: u16 = 0x35;
pub const ABS_MT_POSITION_Y: u16 = 0x36;
pub const ABS_MT_TRACKING_ID: u16 = 0x39;

#[derive(Debug, Clone, Copy)]
struct Contact {
    id: i32,
    x: f32,
    y: f32,
    /// Landed during the current report
    fresh: bool,
    moved: bool,
}

impl Contact {
    fn sample(&self) -> PointerSample {
        PointerSample::new(self.id, self.x, self.y)
    }
}

/// Accumulates raw events between SYN_REPORTs
#[derive(Debug, Default)]
pub struct MtFrameBuilder {
    slot: i32,
    contacts: BTreeMap<i32, Contact>,
    lifted: BTreeMap<i32, Contact>,
    /// Last reported position per slot; the kernel keeps these across
    /// tracking id changes and suppresses repeated values
    positions: BTreeMap<i32, (f32, f32)>,
    down_time: Option<EventTime>,
}

impl MtFrameBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of contacts currently on the panel
    pub fn active_contacts(&self) -> usize {
        self.contacts.values().filter(|c| !c.fresh).count()
    }

    /// Feed one raw input event, returning any frames completed by it
    pub fn push(&mut self, type_: u16, code: u16, value: i32, time: EventTime) -> Vec<EventFrame> {
        match (type_, code) {
            (EV_ABS, ABS_MT_SLOT) => {
                self.slot = value;
                Vec::new()
            }
            (EV_ABS, ABS_MT_TRACKING_ID) => {
                self.set_tracking_id(value);
                Vec::new()
            }
            (EV_ABS, ABS_MT_POSITION_X) => {
                self.update_position(Some(value as f32), None);
                Vec::new()
            }
            (EV_ABS, ABS_MT_POSITION_Y) => {
                self.update_position(None, Some(value as f32));
                Vec::new()
            }
            (EV_SYN, SYN_REPORT) => self.report(time),
            (EV_SYN, SYN_DROPPED) => self.cancel(time),
            _ => Vec::new(),
        }
    }

    fn set_tracking_id(&mut self, value: i32) {
        if let Some(previous) = self.contacts.remove(&self.slot) {
            if !previous.fresh {
                self.lifted.insert(self.slot, previous);
            }
        }
        if value >= 0 {
            let (x, y) = self.positions.get(&self.slot).copied().unwrap_or_default();
            self.contacts.insert(
                self.slot,
                Contact {
                    id: value,
                    x,
                    y,
                    fresh: true,
                    moved: false,
                },
            );
        }
    }

    fn update_position(&mut self, x: Option<f32>, y: Option<f32>) {
        let last = self.positions.entry(self.slot).or_default();
        if let Some(x) = x {
            last.0 = x;
        }
        if let Some(y) = y {
            last.1 = y;
        }

        let Some(contact) = self.contacts.get_mut(&self.slot) else {
            tracing::trace!("Position for inactive slot {}", self.slot);
            return;
        };
        if let Some(x) = x {
            contact.x = x;
        }
        if let Some(y) = y {
            contact.y = y;
        }
        if !contact.fresh {
            contact.moved = true;
        }
    }

    /// Settled contacts plus those lifted in this report, in slot order
    fn snapshot(&self) -> Vec<PointerSample> {
        let mut merged: BTreeMap<i32, PointerSample> = self
            .contacts
            .iter()
            .filter(|(_, c)| !c.fresh)
            .map(|(slot, c)| (*slot, c.sample()))
            .collect();
        merged.extend(self.lifted.iter().map(|(slot, c)| (*slot, c.sample())));
        merged.into_values().collect()
    }

    fn frame(&self, phase: Phase, time: EventTime) -> EventFrame {
        EventFrame::new(phase, time, self.down_time.unwrap_or(time), self.snapshot())
    }

    fn report(&mut self, time: EventTime) -> Vec<EventFrame> {
        let mut frames = Vec::new();

        if self.contacts.values().any(|c| c.moved) {
            frames.push(self.frame(Phase::Move, time));
            for contact in self.contacts.values_mut() {
                contact.moved = false;
            }
        }

        while let Some(slot) = self.lifted.keys().next().copied() {
            let phase = if self.snapshot().len() == 1 {
                Phase::Up
            } else {
                Phase::PointerUp
            };
            frames.push(self.frame(phase, time));
            self.lifted.remove(&slot);
            if phase == Phase::Up {
                self.down_time = None;
            }
        }

        let fresh: Vec<i32> = self
            .contacts
            .iter()
            .filter(|(_, c)| c.fresh)
            .map(|(slot, _)| *slot)
            .collect();
        for slot in fresh {
            if let Some(contact) = self.contacts.get_mut(&slot) {
                contact.fresh = false;
            }
            let phase = if self.snapshot().len() == 1 {
                self.down_time = Some(time);
                Phase::Down
            } else {
                Phase::PointerDown
            };
            frames.push(self.frame(phase, time));
        }

        frames
    }

    fn cancel(&mut self, time: EventTime) -> Vec<EventFrame> {
        tracing::warn!("Input events dropped, cancelling touch sequence");
        let frames = if self.down_time.is_some() {
            vec![self.frame(Phase::Cancel, time)]
        } else {
            Vec::new()
        };
        let positions = std::mem::take(&mut self.positions);
        *self = Self {
            positions,
            ..Self::default()
        };
        frames
    }
}
