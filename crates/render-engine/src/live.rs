//! Live preview loop.
//!
//! Drives the compositor off the source's media clock at a capped refresh
//! rate. Every tick samples the current playback position, asks the
//! resolver for a decision at that time, and hands the composed canvas to
//! the caller's sink. The loop never touches frame indexes; the export
//! pipeline owns deterministic frame math.
//!
//! Real media should come from a clock-synced source
//! ([`GstFrameSource::open_synced`](crate::source::GstFrameSource::open_synced)):
//! the loop only caps how often it polls, and relies on the source to
//! release frames at presentation time so playback speed matches the clip.

use std::time::{Duration, Instant};

use image::RgbaImage;
use zoomcast_common::clock::RateController;
use zoomcast_common::error::ZoomcastResult;
use zoomcast_event_model::sequence::Sequence;
use zoomcast_zoom_engine::resolver::{ZoomDecision, ZoomStateResolver};

use crate::compositor::FrameCompositor;
use crate::source::FrameSource;
use crate::style::StageStyle;

/// Refresh-paced preview renderer.
pub struct LiveRenderLoop {
    resolver: ZoomStateResolver,
    style: StageStyle,
    refresh_hz: u32,
}

impl LiveRenderLoop {
    pub fn new(resolver: ZoomStateResolver, style: StageStyle, refresh_hz: u32) -> Self {
        Self {
            resolver,
            style,
            refresh_hz: refresh_hz.max(1),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(ZoomStateResolver::with_defaults(), StageStyle::default(), 60)
    }

    /// Plays `source` to its end, invoking `sink` with each composed canvas
    /// and the decision it was composed under.
    ///
    /// The canvas is allocated at the source's native dimensions, which
    /// means nothing is drawn before metadata is available. A failed frame
    /// read degrades to the previous good frame rather than aborting the
    /// preview. After playback stops the loop emits one last canvas under
    /// the neutral decision so the preview always ends un-zoomed.
    pub fn run<S, F>(&self, source: &mut S, sequences: &[Sequence], mut sink: F) -> ZoomcastResult<()>
    where
        S: FrameSource,
        F: FnMut(&RgbaImage, &ZoomDecision),
    {
        source.wait_ready()?;
        let (width, height) = source
            .dimensions()
            .ok_or_else(|| zoomcast_common::error::ZoomcastError::source(
                "Source reported no dimensions after wait_ready",
            ))?;

        let compositor = FrameCompositor::new(self.style.clone());
        let mut canvas = RgbaImage::new(width, height);
        let mut pacer = RateController::new(self.refresh_hz);
        let mut last_good: Option<RgbaImage> = None;
        let epoch = Instant::now();

        source.play()?;
        tracing::debug!(width, height, refresh_hz = self.refresh_hz, "Live preview started");

        while source.is_playing() && !source.is_ended() {
            if !pacer.should_tick(epoch.elapsed().as_nanos() as u64) {
                std::thread::sleep(Duration::from_millis(1));
                continue;
            }

            let t = source.position_secs();
            let decision = self.resolver.resolve(t, sequences);

            match source.read_frame() {
                Ok(frame) => {
                    compositor.composite(&frame, &mut canvas, &decision);
                    sink(&canvas, &decision);
                    last_good = Some(frame);
                }
                Err(err) if source.is_ended() => {
                    tracing::debug!(error = %err, "Source ended during read");
                    break;
                }
                Err(err) => {
                    tracing::warn!(position_secs = t, error = %err, "Frame read failed; reusing previous frame");
                    if let Some(frame) = &last_good {
                        compositor.composite(frame, &mut canvas, &decision);
                        sink(&canvas, &decision);
                    }
                }
            }
        }

        // Final frame: whatever the source shows now, composed un-zoomed.
        let neutral = ZoomDecision::neutral();
        let final_frame = match source.read_frame() {
            Ok(frame) => Some(frame),
            Err(_) => last_good,
        };
        if let Some(frame) = final_frame {
            compositor.composite(&frame, &mut canvas, &neutral);
            sink(&canvas, &neutral);
        }

        tracing::debug!("Live preview finished");
        Ok(())
    }
}
