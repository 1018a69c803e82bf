//! Zoomcast Zoom Engine
//!
//! Pure computation over click-event logs:
//! - **Sequencer:** Group the raw log into temporally/spatially coherent
//!   zoom gestures
//! - **Resolver:** Turn a playback timestamp plus the sequences into a
//!   pan/scale decision with eased transitions
//!
//! No I/O and no platform dependencies; all inputs and outputs are plain
//! data, which is what keeps live preview and export in agreement.

pub mod resolver;
pub mod sequencer;

pub use resolver::{ZoomConfig, ZoomDecision, ZoomStateResolver};
pub use sequencer::{EventSequencer, SequencerConfig};
