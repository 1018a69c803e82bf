//! Deterministic export pipeline.
//!
//! Where the live loop samples whatever the media clock says, export walks
//! a fixed frame grid: frame `i` of an `fps` export is composed at media
//! time `i / fps` and stamped `i * 1_000_000 / fps` microseconds. Both
//! renderers consult the same resolver, so a time that falls on both grids
//! produces the same composition.
//!
//! The source is borrowed for the duration of the job: its position and
//! playback rate are saved up front and restored on every exit path,
//! success, cancellation, or failure.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use zoomcast_common::clock::{frame_duration_us, frame_pts_us, frame_time_secs};
use zoomcast_common::config::ExportDefaults;
use zoomcast_common::error::{ZoomcastError, ZoomcastResult};
use zoomcast_event_model::event::ClickEvent;
use zoomcast_event_model::sequence::Sequence;
use zoomcast_zoom_engine::resolver::ZoomStateResolver;
use zoomcast_zoom_engine::sequencer::EventSequencer;

use crate::compositor::FrameCompositor;
use crate::encoder::{EncoderSettings, Mp4Encoder, VideoEncoder};
use crate::source::FrameSource;
use crate::style::StageStyle;

/// Positions closer than this to the frame's target time skip the seek.
const SEEK_EPSILON_SECS: f64 = 0.005;

/// Progress is reported every this many frames, plus once at completion.
const PROGRESS_INTERVAL_FRAMES: u64 = 40;

/// Settings for one export run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportSettings {
    pub fps: u32,
    pub video_bitrate_kbps: u32,
    /// Upper bound on `width * height` of the coded output.
    pub max_coded_area: u32,
    pub output_path: PathBuf,
}

impl ExportSettings {
    pub fn from_defaults(defaults: &ExportDefaults, output_path: PathBuf) -> Self {
        Self {
            fps: defaults.fps,
            video_bitrate_kbps: defaults.video_bitrate_kbps,
            max_coded_area: defaults.max_coded_area,
            output_path,
        }
    }
}

/// A progress snapshot handed to the caller's callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExportProgress {
    pub frames_processed: u64,
    pub total_frames: u64,
}

/// Callback invoked with progress snapshots during export.
pub type ProgressCallback = Box<dyn Fn(ExportProgress) + Send>;

/// Cooperative cancellation flag shared between the export loop and its
/// controller.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Shrinks `(src_w, src_h)` so the coded area fits `max_coded_area`,
/// preserving aspect ratio and keeping both dimensions even.
pub fn negotiate_dimensions(src_w: u32, src_h: u32, max_coded_area: u32) -> (u32, u32) {
    let src_w = src_w.max(2) as f64;
    let src_h = src_h.max(2) as f64;
    let budget = max_coded_area.max(4) as f64;

    let mut scale = 1.0_f64;
    if src_w * src_h > budget {
        scale = (budget / (src_w * src_h)).sqrt();
    }

    let mut w = to_even(src_w * scale);
    let mut h = to_even(src_h * scale);
    // Even-rounding can nudge the area back over budget; walk down until
    // the constraint holds. 2x2 always fits because the budget is clamped
    // to at least 4.
    while (w as u64) * (h as u64) > budget as u64 {
        if w >= h && w > 2 {
            w -= 2;
        } else if h > 2 {
            h -= 2;
        } else {
            break;
        }
    }
    (w, h)
}

fn to_even(value: f64) -> u32 {
    (((value / 2.0).round() as u32) * 2).max(2)
}

/// Exports `source` with zoom decisions derived from `events`, producing
/// an MP4 at `settings.output_path`. Returns the output path on success.
pub fn export_video<S: FrameSource>(
    source: &mut S,
    events: &[ClickEvent],
    settings: &ExportSettings,
    progress: Option<ProgressCallback>,
    cancel: &CancelToken,
) -> ZoomcastResult<PathBuf> {
    source.wait_ready()?;
    let (src_w, src_h) = source
        .dimensions()
        .ok_or_else(|| ZoomcastError::export("Source reported no dimensions"))?;
    let (export_w, export_h) = negotiate_dimensions(src_w, src_h, settings.max_coded_area);

    let encoder = Mp4Encoder::new(&EncoderSettings {
        width: export_w,
        height: export_h,
        fps: settings.fps,
        bitrate_kbps: settings.video_bitrate_kbps,
        output_path: settings.output_path.clone(),
    })?;

    export_with(source, encoder, events, settings, (export_w, export_h), progress, cancel)
        .map(|_| settings.output_path.clone())
}

/// Full export run against an already-constructed encoder. Split from
/// [`export_video`] so the loop and its cleanup can be exercised with a
/// test encoder.
pub(crate) fn export_with<S: FrameSource, E: VideoEncoder>(
    source: &mut S,
    mut encoder: E,
    events: &[ClickEvent],
    settings: &ExportSettings,
    (export_w, export_h): (u32, u32),
    progress: Option<ProgressCallback>,
    cancel: &CancelToken,
) -> ZoomcastResult<u64> {
    let duration = source
        .duration_secs()
        .ok_or_else(|| ZoomcastError::export("Source reported no duration"))?;
    let (src_w, _) = source
        .dimensions()
        .ok_or_else(|| ZoomcastError::export("Source reported no dimensions"))?;

    let sequences = EventSequencer::with_defaults().group(events);
    let saved_position = source.position_secs();
    let saved_rate = source.playback_rate();
    source.pause()?;

    let result = drive_frames(
        source,
        &mut encoder,
        &sequences,
        settings.fps,
        duration,
        (export_w, export_h),
        export_w as f64 / src_w.max(1) as f64,
        progress,
        cancel,
    );

    // Finalize on success or cancellation, discard on failure, then put the
    // source back where the caller left it in every case.
    let finalize = match &result {
        Ok(_) => encoder.finish(),
        Err(_) => {
            encoder.abort();
            Ok(())
        }
    };

    if let Err(err) = source.set_playback_rate(saved_rate) {
        tracing::warn!(error = %err, "Failed to restore playback rate after export");
    }
    if let Err(err) = source.seek(saved_position) {
        tracing::warn!(error = %err, "Failed to restore playback position after export");
    }

    let frames = result?;
    finalize?;
    Ok(frames)
}

#[allow(clippy::too_many_arguments)]
fn drive_frames<S: FrameSource, E: VideoEncoder>(
    source: &mut S,
    encoder: &mut E,
    sequences: &[Sequence],
    fps: u32,
    duration_secs: f64,
    (export_w, export_h): (u32, u32),
    style_scale: f64,
    progress: Option<ProgressCallback>,
    cancel: &CancelToken,
) -> ZoomcastResult<u64> {
    let total_frames = (duration_secs * fps as f64).floor() as u64;
    let resolver = ZoomStateResolver::with_defaults();
    let compositor = FrameCompositor::new(StageStyle::default().scaled(style_scale));
    let mut canvas = RgbaImage::new(export_w, export_h);
    let mut last_reported = None;
    let report = |frames: u64, last: &mut Option<u64>| {
        if let Some(cb) = &progress {
            cb(ExportProgress {
                frames_processed: frames,
                total_frames,
            });
            *last = Some(frames);
        }
    };

    tracing::info!(total_frames, fps, export_w, export_h, "Export started");

    let mut frames_processed = 0u64;
    for frame_index in 0..total_frames {
        if cancel.is_cancelled() {
            tracing::info!(frames_processed, total_frames, "Export cancelled");
            return Ok(frames_processed);
        }

        let frame_time = frame_time_secs(frame_index, fps);
        let step = (|| -> ZoomcastResult<()> {
            if (source.position_secs() - frame_time).abs() > SEEK_EPSILON_SECS {
                source.seek(frame_time)?;
            }
            let frame = source.read_frame()?;
            let decision = resolver.resolve(frame_time, sequences);
            compositor.composite(&frame, &mut canvas, &decision);
            encoder.submit(&canvas, frame_pts_us(frame_index, fps), frame_duration_us(fps))
        })();

        match step {
            Ok(()) => frames_processed += 1,
            Err(err) if err.is_terminal_for_export() => {
                tracing::error!(frame = frame_index, error = %err, "Export aborted");
                return Err(err);
            }
            Err(err) => {
                // A single bad frame is not worth losing the export over.
                frames_processed += 1;
                tracing::warn!(frame = frame_index, error = %err, "Skipping frame after transient failure");
            }
        }

        if frames_processed % PROGRESS_INTERVAL_FRAMES == 0 {
            report(frames_processed, &mut last_reported);
        }
    }

    if last_reported != Some(frames_processed) {
        report(frames_processed, &mut last_reported);
    }
    tracing::info!(frames_processed, "Export finished");
    Ok(frames_processed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SyntheticSource;
    use std::sync::Mutex;

    struct RecordingEncoder {
        submitted: Vec<(u64, u64)>,
        finished: bool,
        aborted: bool,
        fail_at: Option<usize>,
    }

    impl RecordingEncoder {
        fn new() -> Self {
            Self {
                submitted: Vec::new(),
                finished: false,
                aborted: false,
                fail_at: None,
            }
        }

        fn failing_at(index: usize) -> Self {
            Self {
                fail_at: Some(index),
                ..Self::new()
            }
        }
    }

    impl VideoEncoder for RecordingEncoder {
        fn submit(&mut self, _canvas: &RgbaImage, pts_us: u64, duration_us: u64) -> ZoomcastResult<()> {
            if self.fail_at == Some(self.submitted.len()) {
                return Err(ZoomcastError::encoder("synthetic encoder failure"));
            }
            self.submitted.push((pts_us, duration_us));
            Ok(())
        }

        fn finish(&mut self) -> ZoomcastResult<()> {
            self.finished = true;
            Ok(())
        }

        fn abort(&mut self) {
            self.aborted = true;
        }
    }

    // export_with consumes the encoder, so tests share state through a
    // handle that records into an Arc.
    #[derive(Clone)]
    struct SharedEncoder(Arc<Mutex<RecordingEncoder>>);

    impl SharedEncoder {
        fn new(inner: RecordingEncoder) -> Self {
            Self(Arc::new(Mutex::new(inner)))
        }
    }

    impl VideoEncoder for SharedEncoder {
        fn submit(&mut self, canvas: &RgbaImage, pts_us: u64, duration_us: u64) -> ZoomcastResult<()> {
            self.0.lock().unwrap().submit(canvas, pts_us, duration_us)
        }

        fn finish(&mut self) -> ZoomcastResult<()> {
            self.0.lock().unwrap().finish()
        }

        fn abort(&mut self) {
            self.0.lock().unwrap().abort()
        }
    }

    fn settings() -> ExportSettings {
        ExportSettings {
            fps: 40,
            video_bitrate_kbps: 8000,
            max_coded_area: 1920 * 1080,
            output_path: PathBuf::from("/tmp/zoomcast-test.mp4"),
        }
    }

    #[test]
    fn negotiate_keeps_small_sources_unchanged() {
        assert_eq!(negotiate_dimensions(1280, 720, 1920 * 1080), (1280, 720));
        assert_eq!(negotiate_dimensions(640, 480, 1920 * 1080), (640, 480));
    }

    #[test]
    fn negotiate_shrinks_oversized_sources_within_budget() {
        let (w, h) = negotiate_dimensions(3840, 2160, 1920 * 1080);
        assert!(w as u64 * h as u64 <= 1920 * 1080);
        assert_eq!(w % 2, 0);
        assert_eq!(h % 2, 0);
        // Aspect ratio preserved within even-rounding tolerance.
        let src_aspect = 3840.0 / 2160.0;
        let out_aspect = w as f64 / h as f64;
        assert!((src_aspect - out_aspect).abs() < 0.02);
    }

    #[test]
    fn negotiate_rounds_odd_dimensions_even() {
        let (w, h) = negotiate_dimensions(1279, 721, 1920 * 1080);
        assert_eq!(w % 2, 0);
        assert_eq!(h % 2, 0);
    }

    #[test]
    fn negotiate_respects_budget_with_extreme_aspect() {
        // A near-degenerate source must still land at or under the budget
        // even when one dimension bottoms out at 2.
        let (w, h) = negotiate_dimensions(2, 4096, 4096);
        assert!(w as u64 * h as u64 <= 4096);
        assert_eq!(w % 2, 0);
        assert_eq!(h % 2, 0);
    }

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn negotiated_dimensions_hold_their_invariants(
            src_w in 2u32..8192,
            src_h in 2u32..8192,
            budget in 4u32..10_000_000,
        ) {
            let (w, h) = negotiate_dimensions(src_w, src_h, budget);

            prop_assert_eq!(w % 2, 0);
            prop_assert_eq!(h % 2, 0);
            prop_assert!(w >= 2 && h >= 2);
            prop_assert!(w as u64 * h as u64 <= budget.max(4) as u64);

            // Aspect survives when rounding noise is small relative to the
            // output size.
            if w.min(h) >= 32 {
                let src_aspect = src_w as f64 / src_h as f64;
                let out_aspect = w as f64 / h as f64;
                prop_assert!((out_aspect - src_aspect).abs() / src_aspect < 0.15);
            }
        }
    }

    #[test]
    fn export_samples_the_full_frame_grid() {
        let mut source = SyntheticSource::new(320, 180, 1.0);
        let encoder = SharedEncoder::new(RecordingEncoder::new());
        let handle = encoder.clone();
        let cancel = CancelToken::new();

        let frames =
            export_with(&mut source, encoder, &[], &settings(), (320, 180), None, &cancel).unwrap();

        let inner = handle.0.lock().unwrap();
        assert_eq!(frames, 40);
        assert_eq!(inner.submitted.len(), 40);
        assert_eq!(inner.submitted[0], (0, 25_000));
        assert_eq!(inner.submitted[1], (25_000, 25_000));
        assert_eq!(inner.submitted[39], (975_000, 25_000));
        assert!(inner.finished);
        assert!(!inner.aborted);
    }

    #[test]
    fn progress_is_monotone_and_ends_exactly_at_total() {
        let mut source = SyntheticSource::new(320, 180, 2.3);
        let encoder = SharedEncoder::new(RecordingEncoder::new());
        let cancel = CancelToken::new();
        let reports: Arc<Mutex<Vec<ExportProgress>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&reports);
        let progress: ProgressCallback = Box::new(move |p| sink.lock().unwrap().push(p));

        export_with(&mut source, encoder, &[], &settings(), (320, 180), Some(progress), &cancel)
            .unwrap();

        let reports = reports.lock().unwrap();
        let total = (2.3_f64 * 40.0).floor() as u64;
        assert!(reports.windows(2).all(|w| w[0].frames_processed < w[1].frames_processed));
        assert_eq!(reports.last().unwrap().frames_processed, total);
        let at_total = reports.iter().filter(|p| p.frames_processed == total).count();
        assert_eq!(at_total, 1);
        assert!(reports.iter().all(|p| p.total_frames == total));
    }

    #[test]
    fn terminal_encoder_failure_aborts_and_restores_the_source() {
        let mut source = SyntheticSource::new(320, 180, 1.0);
        source.seek(0.4).unwrap();
        source.set_playback_rate(1.5).unwrap();

        let encoder = SharedEncoder::new(RecordingEncoder::failing_at(5));
        let handle = encoder.clone();
        let cancel = CancelToken::new();

        let err = export_with(&mut source, encoder, &[], &settings(), (320, 180), None, &cancel)
            .unwrap_err();

        assert!(err.is_terminal_for_export());
        let inner = handle.0.lock().unwrap();
        assert!(inner.aborted);
        assert!(!inner.finished);
        assert_eq!(source.position_secs(), 0.4);
        assert_eq!(source.playback_rate(), 1.5);
    }

    #[test]
    fn cancellation_finalizes_and_restores_the_source() {
        let mut source = SyntheticSource::new(320, 180, 1.0);
        source.seek(0.2).unwrap();

        let encoder = SharedEncoder::new(RecordingEncoder::new());
        let handle = encoder.clone();
        let cancel = CancelToken::new();
        cancel.cancel();

        let frames =
            export_with(&mut source, encoder, &[], &settings(), (320, 180), None, &cancel).unwrap();

        assert_eq!(frames, 0);
        let inner = handle.0.lock().unwrap();
        assert!(inner.finished);
        assert!(!inner.aborted);
        assert_eq!(source.position_secs(), 0.2);
    }

    #[test]
    fn transient_source_failure_skips_the_frame_and_continues() {
        struct FlakySource {
            inner: SyntheticSource,
            fail_reads_at: usize,
            reads: usize,
        }

        impl FrameSource for FlakySource {
            fn wait_ready(&mut self) -> ZoomcastResult<()> {
                self.inner.wait_ready()
            }
            fn dimensions(&self) -> Option<(u32, u32)> {
                self.inner.dimensions()
            }
            fn duration_secs(&self) -> Option<f64> {
                self.inner.duration_secs()
            }
            fn position_secs(&self) -> f64 {
                self.inner.position_secs()
            }
            fn seek(&mut self, secs: f64) -> ZoomcastResult<()> {
                self.inner.seek(secs)
            }
            fn read_frame(&mut self) -> ZoomcastResult<RgbaImage> {
                self.reads += 1;
                if self.reads == self.fail_reads_at {
                    return Err(ZoomcastError::source("synthetic decode hiccup"));
                }
                self.inner.read_frame()
            }
            fn play(&mut self) -> ZoomcastResult<()> {
                self.inner.play()
            }
            fn pause(&mut self) -> ZoomcastResult<()> {
                self.inner.pause()
            }
            fn is_playing(&self) -> bool {
                self.inner.is_playing()
            }
            fn is_ended(&self) -> bool {
                self.inner.is_ended()
            }
            fn playback_rate(&self) -> f64 {
                self.inner.playback_rate()
            }
            fn set_playback_rate(&mut self, rate: f64) -> ZoomcastResult<()> {
                self.inner.set_playback_rate(rate)
            }
        }

        let mut source = FlakySource {
            inner: SyntheticSource::new(320, 180, 0.5),
            fail_reads_at: 3,
            reads: 0,
        };
        let encoder = SharedEncoder::new(RecordingEncoder::new());
        let handle = encoder.clone();
        let cancel = CancelToken::new();

        let frames =
            export_with(&mut source, encoder, &[], &settings(), (320, 180), None, &cancel).unwrap();

        assert_eq!(frames, 20);
        let inner = handle.0.lock().unwrap();
        // One frame was dropped on the floor, the rest were submitted.
        assert_eq!(inner.submitted.len(), 19);
        assert!(inner.finished);
    }
}
