//! Event sequencing: grouping a click log into zoom gestures.
//!
//! A zoom should not jump between unrelated clicks that happen to be
//! close in time but far apart on screen, and it should not persist
//! across long idle gaps. The sequencer walks the log once, in timestamp
//! order, and closes the running sequence whenever the next click breaks
//! either the temporal or the spatial coherence limit.

use serde::{Deserialize, Serialize};
use zoomcast_event_model::event::ClickEvent;
use zoomcast_event_model::sequence::Sequence;

/// Configuration for the event sequencer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequencerConfig {
    /// Maximum gap between consecutive clicks in one gesture (seconds).
    pub max_time_gap_secs: f64,

    /// Maximum distance between consecutive clicks in one gesture (pixels,
    /// in recorded-viewport coordinates).
    pub max_distance_px: f64,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            max_time_gap_secs: 2.5,
            max_distance_px: 300.0,
        }
    }
}

/// Groups a time-ordered click log into coherent sequences.
pub struct EventSequencer {
    config: SequencerConfig,
}

impl EventSequencer {
    /// Create a new sequencer with the given configuration.
    pub fn new(config: SequencerConfig) -> Self {
        Self { config }
    }

    /// Create a sequencer with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(SequencerConfig::default())
    }

    /// Group events into sequences.
    ///
    /// The output partitions the input: every event lands in exactly one
    /// sequence and relative order is preserved. Pure function of its
    /// input; safe to re-run whenever the log changes.
    pub fn group(&self, events: &[ClickEvent]) -> Vec<Sequence> {
        let mut sequences = Vec::new();
        let mut buffer: Vec<ClickEvent> = Vec::new();

        for event in events {
            if let Some(last) = buffer.last() {
                let time_gap = event.timestamp - last.timestamp;
                let distance = event.distance_to(last);

                if time_gap > self.config.max_time_gap_secs
                    || distance > self.config.max_distance_px
                {
                    if let Some(seq) = Sequence::new(std::mem::take(&mut buffer)) {
                        sequences.push(seq);
                    }
                }
            }
            buffer.push(*event);
        }

        if let Some(seq) = Sequence::new(buffer) {
            sequences.push(seq);
        }

        tracing::debug!(
            events = events.len(),
            sequences = sequences.len(),
            "Grouped click log"
        );

        sequences
    }
}
