//! Frame sources: decoded video and a synthetic test pattern.
//!
//! Both renderers pull frames through the [`FrameSource`] trait. The real
//! implementation wraps a GStreamer decode pipeline ending in an appsink;
//! [`SyntheticSource`] generates a deterministic pattern for tests and the
//! preview without needing media on disk.

use std::path::Path;
use std::sync::OnceLock;
use std::time::Instant;

use gst::prelude::*;
use gstreamer as gst;
use gstreamer_app as gst_app;
use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_filled_circle_mut;
use zoomcast_common::error::{ZoomcastError, ZoomcastResult};

/// Seekable supplier of decoded RGBA frames.
pub trait FrameSource {
    /// Blocks until the source has loaded enough metadata to answer
    /// [`dimensions`](Self::dimensions) and, for finite media,
    /// [`duration_secs`](Self::duration_secs).
    fn wait_ready(&mut self) -> ZoomcastResult<()>;

    /// Native pixel dimensions, once known.
    fn dimensions(&self) -> Option<(u32, u32)>;

    /// Media duration in seconds, once known.
    fn duration_secs(&self) -> Option<f64>;

    /// Current media position in seconds.
    fn position_secs(&self) -> f64;

    /// Accurate seek; blocks until the new position is readable.
    fn seek(&mut self, secs: f64) -> ZoomcastResult<()>;

    /// Decodes the frame at the current position.
    fn read_frame(&mut self) -> ZoomcastResult<RgbaImage>;

    fn play(&mut self) -> ZoomcastResult<()>;

    fn pause(&mut self) -> ZoomcastResult<()>;

    fn is_playing(&self) -> bool;

    fn is_ended(&self) -> bool;

    fn playback_rate(&self) -> f64;

    fn set_playback_rate(&mut self, rate: f64) -> ZoomcastResult<()>;
}

/// Decoded video file behind a GStreamer appsink.
#[derive(Debug)]
pub struct GstFrameSource {
    pipeline: gst::Pipeline,
    appsink: gst_app::AppSink,
    dimensions: Option<(u32, u32)>,
    duration_secs: Option<f64>,
    position_secs: f64,
    rate: f64,
    playing: bool,
    ended: bool,
}

impl GstFrameSource {
    /// Opens `path` for pull-paced decoding, as the export loop needs: the
    /// appsink hands over every frame as fast as we pull, ignoring the
    /// pipeline clock. The pipeline stays in Ready until
    /// [`wait_ready`](FrameSource::wait_ready).
    pub fn open(path: &Path) -> ZoomcastResult<Self> {
        Self::open_with(path, false)
    }

    /// Opens `path` with the appsink synced to the pipeline clock, for live
    /// preview: frames are released at their presentation time and late
    /// ones dropped, so playback runs at real-time speed regardless of how
    /// fast the consumer polls.
    pub fn open_synced(path: &Path) -> ZoomcastResult<Self> {
        Self::open_with(path, true)
    }

    fn open_with(path: &Path, clock_synced: bool) -> ZoomcastResult<Self> {
        if !path.exists() {
            return Err(ZoomcastError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        init_gstreamer()?;

        let launch = decode_launch(path, clock_synced);
        let element = gst::parse::launch(&launch)
            .map_err(|e| ZoomcastError::source(format!("Failed to build decode pipeline: {e}")))?;
        let pipeline = element
            .dynamic_cast::<gst::Pipeline>()
            .map_err(|_| ZoomcastError::source("Launch string did not produce a pipeline"))?;
        let appsink = pipeline
            .by_name("sink")
            .and_then(|e| e.dynamic_cast::<gst_app::AppSink>().ok())
            .ok_or_else(|| ZoomcastError::source("Decode pipeline has no appsink"))?;

        Ok(Self {
            pipeline,
            appsink,
            dimensions: None,
            duration_secs: None,
            position_secs: 0.0,
            rate: 1.0,
            playing: false,
            ended: false,
        })
    }

    fn set_state_blocking(&self, state: gst::State) -> ZoomcastResult<()> {
        self.pipeline
            .set_state(state)
            .map_err(|e| ZoomcastError::source(format!("Failed to reach {state:?}: {e:?}")))?;
        // State changes are async; block until this one settles so callers
        // can immediately query or pull.
        let (result, _, _) = self.pipeline.state(gst::ClockTime::from_seconds(10));
        result.map_err(|e| ZoomcastError::source(format!("State change to {state:?} failed: {e:?}")))?;
        Ok(())
    }

    fn frame_from_sample(&self, sample: &gst::Sample) -> ZoomcastResult<RgbaImage> {
        let (width, height) = self
            .dimensions
            .ok_or_else(|| ZoomcastError::source("Frame pulled before metadata"))?;
        let buffer = sample
            .buffer()
            .ok_or_else(|| ZoomcastError::source("Sample carries no buffer"))?;
        let map = buffer
            .map_readable()
            .map_err(|_| ZoomcastError::source("Failed to map frame buffer"))?;

        let row_bytes = width as usize * 4;
        let expected = row_bytes * height as usize;
        let data = map.as_slice();
        if data.len() < expected {
            return Err(ZoomcastError::source(format!(
                "Frame buffer too small: {} < {expected}",
                data.len()
            )));
        }

        let mut pixels = vec![0u8; expected];
        if data.len() == expected {
            pixels.copy_from_slice(data);
        } else {
            // Rows carry stride padding; copy each row's pixel prefix.
            let stride = data.len() / height as usize;
            for (y, row) in data.chunks_exact(stride).take(height as usize).enumerate() {
                pixels[y * row_bytes..(y + 1) * row_bytes].copy_from_slice(&row[..row_bytes]);
            }
        }
        RgbaImage::from_raw(width, height, pixels)
            .ok_or_else(|| ZoomcastError::source("Frame buffer did not match caps dimensions"))
    }

    fn read_caps(&mut self, sample: &gst::Sample) -> ZoomcastResult<()> {
        let caps = sample
            .caps()
            .ok_or_else(|| ZoomcastError::source("Preroll sample carries no caps"))?;
        let s = caps
            .structure(0)
            .ok_or_else(|| ZoomcastError::source("Caps carry no structure"))?;
        let width = s
            .get::<i32>("width")
            .map_err(|e| ZoomcastError::source(format!("Caps missing width: {e}")))?;
        let height = s
            .get::<i32>("height")
            .map_err(|e| ZoomcastError::source(format!("Caps missing height: {e}")))?;
        if width <= 0 || height <= 0 {
            return Err(ZoomcastError::source(format!(
                "Invalid frame dimensions {width}x{height}"
            )));
        }
        self.dimensions = Some((width as u32, height as u32));
        Ok(())
    }
}

impl FrameSource for GstFrameSource {
    fn wait_ready(&mut self) -> ZoomcastResult<()> {
        if self.dimensions.is_some() {
            return Ok(());
        }
        self.set_state_blocking(gst::State::Paused)?;

        let sample = self
            .appsink
            .try_pull_preroll(gst::ClockTime::from_seconds(10))
            .ok_or_else(|| ZoomcastError::source("Timed out waiting for first frame"))?;
        self.read_caps(&sample)?;

        self.duration_secs = self
            .pipeline
            .query_duration::<gst::ClockTime>()
            .map(|d| d.nseconds() as f64 / 1e9);

        tracing::debug!(
            dimensions = ?self.dimensions,
            duration_secs = ?self.duration_secs,
            "Frame source ready"
        );
        Ok(())
    }

    fn dimensions(&self) -> Option<(u32, u32)> {
        self.dimensions
    }

    fn duration_secs(&self) -> Option<f64> {
        self.duration_secs
    }

    fn position_secs(&self) -> f64 {
        self.pipeline
            .query_position::<gst::ClockTime>()
            .map(|p| p.nseconds() as f64 / 1e9)
            .unwrap_or(self.position_secs)
    }

    fn seek(&mut self, secs: f64) -> ZoomcastResult<()> {
        let target = gst::ClockTime::from_nseconds((secs.max(0.0) * 1e9) as u64);
        self.pipeline
            .seek(
                self.rate,
                gst::SeekFlags::FLUSH | gst::SeekFlags::ACCURATE,
                gst::SeekType::Set,
                target,
                gst::SeekType::None,
                gst::ClockTime::NONE,
            )
            .map_err(|e| ZoomcastError::source(format!("Seek to {secs:.3}s failed: {e}")))?;
        // Flushing seeks complete asynchronously.
        let (result, _, _) = self.pipeline.state(gst::ClockTime::from_seconds(10));
        result.map_err(|e| ZoomcastError::source(format!("Seek to {secs:.3}s did not settle: {e:?}")))?;
        self.position_secs = secs.max(0.0);
        self.ended = false;
        Ok(())
    }

    fn read_frame(&mut self) -> ZoomcastResult<RgbaImage> {
        let sample = if self.playing {
            self.appsink.try_pull_sample(gst::ClockTime::from_seconds(10))
        } else {
            self.appsink.try_pull_preroll(gst::ClockTime::from_seconds(10))
        };
        let sample = match sample {
            Some(sample) => sample,
            None if self.appsink.is_eos() => {
                self.ended = true;
                return Err(ZoomcastError::source("Source reached end of stream"));
            }
            None => return Err(ZoomcastError::source("Timed out pulling frame")),
        };

        if let Some(buffer) = sample.buffer() {
            if let Some(pts) = buffer.pts() {
                self.position_secs = pts.nseconds() as f64 / 1e9;
            }
        }
        self.frame_from_sample(&sample)
    }

    fn play(&mut self) -> ZoomcastResult<()> {
        self.set_state_blocking(gst::State::Playing)?;
        self.playing = true;
        Ok(())
    }

    fn pause(&mut self) -> ZoomcastResult<()> {
        self.set_state_blocking(gst::State::Paused)?;
        self.playing = false;
        Ok(())
    }

    fn is_playing(&self) -> bool {
        self.playing && !self.is_ended()
    }

    fn is_ended(&self) -> bool {
        self.ended || self.appsink.is_eos()
    }

    fn playback_rate(&self) -> f64 {
        self.rate
    }

    fn set_playback_rate(&mut self, rate: f64) -> ZoomcastResult<()> {
        if rate <= 0.0 {
            return Err(ZoomcastError::source(format!("Invalid playback rate {rate}")));
        }
        self.rate = rate;
        // A rate change is applied through a seek at the current position.
        let position = self.position_secs();
        self.seek(position)
    }
}

impl Drop for GstFrameSource {
    fn drop(&mut self) {
        if let Err(e) = self.pipeline.set_state(gst::State::Null) {
            tracing::warn!(error = ?e, "Failed to tear down decode pipeline");
        }
    }
}

/// Deterministic generated source: a gray grid with a circular marker that
/// sweeps across the frame over the clip duration.
pub struct SyntheticSource {
    width: u32,
    height: u32,
    duration_secs: f64,
    position_secs: f64,
    rate: f64,
    /// Wall-clock anchor while playing: `(started_at, position_at_start)`.
    playing_since: Option<(Instant, f64)>,
    ended: bool,
}

impl SyntheticSource {
    pub fn new(width: u32, height: u32, duration_secs: f64) -> Self {
        Self {
            width,
            height,
            duration_secs: duration_secs.max(0.0),
            position_secs: 0.0,
            rate: 1.0,
            playing_since: None,
            ended: false,
        }
    }

    fn clock_position(&self) -> f64 {
        match self.playing_since {
            Some((started, base)) => {
                (base + started.elapsed().as_secs_f64() * self.rate).min(self.duration_secs)
            }
            None => self.position_secs,
        }
    }

    fn render(&self, t: f64) -> RgbaImage {
        let mut frame = RgbaImage::from_pixel(self.width, self.height, Rgba([40, 40, 48, 255]));

        let cell = (self.width / 16).max(4);
        for y in 0..self.height {
            for x in 0..self.width {
                if x % cell == 0 || y % cell == 0 {
                    frame.put_pixel(x, y, Rgba([70, 70, 80, 255]));
                }
            }
        }

        // Marker travels left to right over the clip.
        let progress = if self.duration_secs > 0.0 {
            (t / self.duration_secs).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let cx = (self.width as f64 * progress) as i32;
        let cy = (self.height / 2) as i32;
        let radius = (self.height / 12).max(3) as i32;
        draw_filled_circle_mut(&mut frame, (cx, cy), radius, Rgba([255, 80, 80, 255]));

        frame
    }
}

impl FrameSource for SyntheticSource {
    fn wait_ready(&mut self) -> ZoomcastResult<()> {
        Ok(())
    }

    fn dimensions(&self) -> Option<(u32, u32)> {
        Some((self.width, self.height))
    }

    fn duration_secs(&self) -> Option<f64> {
        Some(self.duration_secs)
    }

    fn position_secs(&self) -> f64 {
        self.clock_position()
    }

    fn seek(&mut self, secs: f64) -> ZoomcastResult<()> {
        self.position_secs = secs.clamp(0.0, self.duration_secs);
        if self.playing_since.is_some() {
            self.playing_since = Some((Instant::now(), self.position_secs));
        }
        self.ended = false;
        Ok(())
    }

    fn read_frame(&mut self) -> ZoomcastResult<RgbaImage> {
        let t = self.clock_position();
        if self.playing_since.is_some() && t >= self.duration_secs {
            self.position_secs = self.duration_secs;
            self.playing_since = None;
            self.ended = true;
        }
        Ok(self.render(t))
    }

    fn play(&mut self) -> ZoomcastResult<()> {
        if self.playing_since.is_none() && !self.ended {
            self.playing_since = Some((Instant::now(), self.position_secs));
        }
        Ok(())
    }

    fn pause(&mut self) -> ZoomcastResult<()> {
        if self.playing_since.is_some() {
            self.position_secs = self.clock_position();
            self.playing_since = None;
        }
        Ok(())
    }

    fn is_playing(&self) -> bool {
        self.playing_since.is_some()
    }

    fn is_ended(&self) -> bool {
        self.ended || self.clock_position() >= self.duration_secs
    }

    fn playback_rate(&self) -> f64 {
        self.rate
    }

    fn set_playback_rate(&mut self, rate: f64) -> ZoomcastResult<()> {
        if rate <= 0.0 {
            return Err(ZoomcastError::source(format!("Invalid playback rate {rate}")));
        }
        if self.playing_since.is_some() {
            self.position_secs = self.clock_position();
            self.playing_since = Some((Instant::now(), self.position_secs));
        }
        self.rate = rate;
        Ok(())
    }
}

pub(crate) fn init_gstreamer() -> ZoomcastResult<()> {
    static GST_INIT: OnceLock<Result<(), String>> = OnceLock::new();
    let init_res = GST_INIT.get_or_init(|| gst::init().map_err(|e| e.to_string()));
    match init_res {
        Ok(()) => Ok(()),
        Err(e) => Err(ZoomcastError::source(format!(
            "Failed to initialize GStreamer: {e}"
        ))),
    }
}

pub(crate) fn escape_path(path: &Path) -> String {
    path.to_string_lossy().replace('"', "\\\"")
}

/// Decode launch string. `clock_synced` selects whether the appsink waits
/// for each frame's presentation time (live preview) or releases frames as
/// fast as they are pulled (export).
fn decode_launch(path: &Path, clock_synced: bool) -> String {
    let pacing = if clock_synced {
        "sync=true drop=true"
    } else {
        "sync=false"
    };
    format!(
        "filesrc location=\"{}\" ! decodebin ! videoconvert ! video/x-raw,format=RGBA ! appsink name=sink {pacing} max-buffers=2",
        escape_path(path)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn synthetic_source_reports_metadata_immediately() {
        let mut source = SyntheticSource::new(320, 180, 2.0);
        source.wait_ready().unwrap();
        assert_eq!(source.dimensions(), Some((320, 180)));
        assert_eq!(source.duration_secs(), Some(2.0));
        assert_eq!(source.position_secs(), 0.0);
        assert!(!source.is_playing());
        assert!(!source.is_ended());
    }

    #[test]
    fn synthetic_seek_clamps_to_duration() {
        let mut source = SyntheticSource::new(320, 180, 2.0);
        source.seek(5.0).unwrap();
        assert_eq!(source.position_secs(), 2.0);
        source.seek(-1.0).unwrap();
        assert_eq!(source.position_secs(), 0.0);
    }

    #[test]
    fn synthetic_frames_are_deterministic_per_position() {
        let mut source = SyntheticSource::new(320, 180, 2.0);
        source.seek(0.75).unwrap();
        let a = source.read_frame().unwrap();
        source.seek(0.75).unwrap();
        let b = source.read_frame().unwrap();
        assert_eq!(a.as_raw(), b.as_raw());

        source.seek(1.5).unwrap();
        let c = source.read_frame().unwrap();
        assert_ne!(a.as_raw(), c.as_raw());
    }

    #[test]
    fn synthetic_playback_advances_and_ends() {
        let mut source = SyntheticSource::new(64, 36, 0.05);
        source.play().unwrap();
        assert!(source.is_playing());
        std::thread::sleep(Duration::from_millis(80));
        let _ = source.read_frame().unwrap();
        assert!(source.is_ended());
        assert!(!source.is_playing());
        assert_eq!(source.position_secs(), 0.05);
    }

    #[test]
    fn synthetic_rejects_non_positive_rate() {
        let mut source = SyntheticSource::new(64, 36, 1.0);
        assert!(source.set_playback_rate(0.0).is_err());
        assert!(source.set_playback_rate(2.0).is_ok());
        assert_eq!(source.playback_rate(), 2.0);
    }

    #[test]
    fn missing_file_is_reported_without_touching_gstreamer() {
        let err = GstFrameSource::open(Path::new("/nonexistent/clip.mp4")).unwrap_err();
        assert!(matches!(err, ZoomcastError::FileNotFound { .. }));
    }

    #[test]
    fn paths_with_quotes_are_escaped() {
        let escaped = escape_path(Path::new("/tmp/a\"b.mp4"));
        assert_eq!(escaped, "/tmp/a\\\"b.mp4");
    }

    #[test]
    fn export_pipelines_deliver_frames_unsynced() {
        let launch = decode_launch(Path::new("/tmp/clip.mp4"), false);
        assert!(launch.contains("sync=false"));
        assert!(!launch.contains("drop=true"));
    }

    #[test]
    fn preview_pipelines_sync_to_the_clock() {
        // A clock-synced sink releases frames at presentation time and
        // drops late ones, so preview speed matches the media, not the
        // consumer's poll rate.
        let launch = decode_launch(Path::new("/tmp/clip.mp4"), true);
        assert!(launch.contains("sync=true"));
        assert!(launch.contains("drop=true"));
    }
}
