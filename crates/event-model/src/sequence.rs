//! Zoom sequences: coherent runs of click events.
//!
//! A sequence is one continuous zoom gesture. It owns an ordered,
//! non-empty list of events assigned at grouping time and never changes
//! afterwards; the zoom window around it is derived, not stored.

use serde::{Deserialize, Serialize};

use crate::event::ClickEvent;

/// Padding added around a sequence's event span to form its zoom window.
pub const WINDOW_PAD_SECS: f64 = 1.0;

/// Extra margin on each side of the window in which the zoom is
/// considered active (covers the ramp lead-in and tail).
pub const WINDOW_MARGIN_SECS: f64 = 0.5;

/// An ordered, non-empty run of click events treated as one zoom gesture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sequence {
    events: Vec<ClickEvent>,
}

impl Sequence {
    /// Build a sequence from events. Returns `None` for an empty slice;
    /// sequences are non-empty by construction.
    pub fn new(events: Vec<ClickEvent>) -> Option<Self> {
        if events.is_empty() {
            return None;
        }
        Some(Self { events })
    }

    pub fn events(&self) -> &[ClickEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn first(&self) -> &ClickEvent {
        &self.events[0]
    }

    pub fn last(&self) -> &ClickEvent {
        // Non-empty by construction.
        &self.events[self.events.len() - 1]
    }

    /// Window start: one second before the first click.
    pub fn window_start(&self) -> f64 {
        self.first().timestamp - WINDOW_PAD_SECS
    }

    /// Window end: one second after the last click.
    pub fn window_end(&self) -> f64 {
        self.last().timestamp + WINDOW_PAD_SECS
    }

    /// Whether the zoom is active at `t`, ramp margins included.
    pub fn is_active_at(&self, t: f64) -> bool {
        t >= self.window_start() - WINDOW_MARGIN_SECS && t <= self.window_end() + WINDOW_MARGIN_SECS
    }
}
