//! Zoom state resolution: timestamp -> pan/scale decision.
//!
//! The resolver is the single authority both renderers consult. The live
//! loop queries it at the source's current playback time and the export
//! pipeline queries it at each sampled frame time; any divergence between
//! the two would make exported output visibly disagree with the preview,
//! so everything here is a pure function of `(t, sequences)`.

use serde::{Deserialize, Serialize};
use zoomcast_event_model::event::ClickEvent;
use zoomcast_event_model::sequence::{Sequence, WINDOW_MARGIN_SECS};

/// Configuration for zoom transitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoomConfig {
    /// Scale factor while fully zoomed in.
    pub max_scale: f64,

    /// Duration of the zoom-in ramp (seconds).
    pub zoom_in_secs: f64,

    /// Duration of the zoom-out ramp (seconds).
    pub zoom_out_secs: f64,
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self {
            max_scale: 2.0,
            zoom_in_secs: 1.0,
            zoom_out_secs: 0.5,
        }
    }
}

/// The zoom decision for one queried timestamp.
///
/// Transient: recomputed per query, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ZoomDecision {
    /// The click event driving the zoom, if any.
    pub active_event: Option<ClickEvent>,

    /// Current scale factor, >= 1.0. Exactly 1.0 when no zoom is active.
    pub scale: f64,

    /// Focus X in recorded-viewport pixels.
    pub focus_x: f64,

    /// Focus Y in recorded-viewport pixels.
    pub focus_y: f64,
}

impl ZoomDecision {
    /// The neutral decision: no event, no magnification.
    pub fn neutral() -> Self {
        Self {
            active_event: None,
            scale: 1.0,
            focus_x: 0.0,
            focus_y: 0.0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active_event.is_some()
    }
}

/// Resolves zoom decisions against a set of sequences.
pub struct ZoomStateResolver {
    config: ZoomConfig,
}

impl ZoomStateResolver {
    /// Create a new resolver with the given configuration.
    pub fn new(config: ZoomConfig) -> Self {
        Self { config }
    }

    /// Create a resolver with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(ZoomConfig::default())
    }

    /// Resolve the zoom decision at time `t`.
    ///
    /// First matching sequence wins; sequences come from one chronological
    /// log so their active windows are assumed non-overlapping.
    pub fn resolve(&self, t: f64, sequences: &[Sequence]) -> ZoomDecision {
        for seq in sequences {
            if seq.is_active_at(t) {
                return self.resolve_in_sequence(t, seq);
            }
        }
        ZoomDecision::neutral()
    }

    fn resolve_in_sequence(&self, t: f64, seq: &Sequence) -> ZoomDecision {
        let (active, next) = bracketing_pair(t, seq);
        let (focus_x, focus_y) = interpolate_focus(t, active, next);
        let scale = self.scale_at(t, seq.window_start(), seq.window_end());

        ZoomDecision {
            active_event: Some(*active),
            scale,
            focus_x,
            focus_y,
        }
    }

    /// Three-phase easing: ramp in over `zoom_in_secs`, hold at
    /// `max_scale`, ramp out over `zoom_out_secs`. Continuous at both
    /// phase boundaries.
    fn scale_at(&self, t: f64, window_start: f64, window_end: f64) -> f64 {
        let amplitude = self.config.max_scale - 1.0;

        if t < window_start + WINDOW_MARGIN_SECS {
            let progress =
                ((t - window_start + WINDOW_MARGIN_SECS) / self.config.zoom_in_secs).clamp(0.0, 1.0);
            1.0 + amplitude * progress
        } else if t <= window_end - WINDOW_MARGIN_SECS {
            self.config.max_scale
        } else {
            let progress =
                ((window_end + WINDOW_MARGIN_SECS - t) / self.config.zoom_out_secs).clamp(0.0, 1.0);
            1.0 + amplitude * progress
        }
    }
}

/// Find `(active, next)` inside the sequence: `active` is the last event
/// at or before `t` (the first event when `t` precedes all of them), and
/// `next` the one after it, or `active` itself at the tail.
fn bracketing_pair(t: f64, seq: &Sequence) -> (&ClickEvent, &ClickEvent) {
    let events = seq.events();

    let mut active_idx = 0;
    for (i, event) in events.iter().enumerate() {
        if event.timestamp <= t {
            active_idx = i;
        } else {
            break;
        }
    }

    let next_idx = (active_idx + 1).min(events.len() - 1);
    (&events[active_idx], &events[next_idx])
}

/// Focus position between two events, linearly interpolated by the
/// fraction of the gap elapsed at `t` (clamped to the segment).
fn interpolate_focus(t: f64, active: &ClickEvent, next: &ClickEvent) -> (f64, f64) {
    let span = next.timestamp - active.timestamp;
    if span <= 0.0 {
        return (active.x, active.y);
    }

    let progress = ((t - active.timestamp) / span).clamp(0.0, 1.0);
    (
        active.x + (next.x - active.x) * progress,
        active.y + (next.y - active.y) * progress,
    )
}
