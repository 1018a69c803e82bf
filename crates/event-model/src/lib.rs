//! Zoomcast Event Model
//!
//! Defines the data contracts shared by the zoom engine and renderers:
//! - **Events:** Timestamped click records loaded from a recorder log
//! - **Sequences:** Temporally and spatially coherent runs of clicks that
//!   the renderer treats as one continuous zoom gesture
//!
//! Click coordinates stay in recorded-viewport pixels; every event carries
//! the viewport dimensions that were live at capture time so renderers can
//! rescale to any target surface.

pub mod event;
pub mod sequence;

pub use event::*;
pub use sequence::*;
