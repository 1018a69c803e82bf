//! Zoomcast Render Engine
//!
//! Composes decoded video frames onto a styled canvas under zoom decisions
//! and drives the two renderers: a refresh-paced live preview and a
//! deterministic MP4 export.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │   FrameSource (decoded video / synthetic pattern)         │
//! └──────────────┬───────────────────────────┬───────────────┘
//!                │ media-clock time          │ frame-grid time
//!                ▼                           ▼
//!        ┌──────────────┐            ┌───────────────┐
//!        │ LiveRender   │            │ ExportPipeline │
//!        │ Loop         │            │                │
//!        └──────┬───────┘            └───────┬───────┘
//!               │   ZoomStateResolver + FrameCompositor
//!               ▼                            ▼
//!          on-screen canvas          Mp4Encoder -> .mp4
//! ```
//!
//! Both renderers share the resolver and compositor, so any media time
//! that falls on both sampling grids composes to the same pixels.

pub mod compositor;
pub mod encoder;
pub mod export;
pub mod live;
pub mod source;
pub mod style;

pub use compositor::FrameCompositor;
pub use encoder::{EncoderSettings, Mp4Encoder, VideoEncoder};
pub use export::{
    export_video, negotiate_dimensions, CancelToken, ExportProgress, ExportSettings,
    ProgressCallback,
};
pub use live::LiveRenderLoop;
pub use source::{FrameSource, GstFrameSource, SyntheticSource};
pub use style::StageStyle;
