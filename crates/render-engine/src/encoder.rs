//! Video encoding behind a trait seam.
//!
//! The export loop talks to [`VideoEncoder`] so its frame math and cleanup
//! paths can be tested without GStreamer. [`Mp4Encoder`] is the production
//! implementation: an appsrc fed with composed RGBA canvases, encoded to
//! H.264 and muxed into an MP4 container.

use std::path::{Path, PathBuf};

use gst::prelude::*;
use gstreamer as gst;
use gstreamer_app as gst_app;
use image::RgbaImage;
use zoomcast_common::error::{ZoomcastError, ZoomcastResult};

use crate::source::{escape_path, init_gstreamer};

/// Sink for timestamped composed frames.
pub trait VideoEncoder {
    /// Submits one canvas with its presentation timestamp and duration,
    /// both in microseconds.
    fn submit(&mut self, canvas: &RgbaImage, pts_us: u64, duration_us: u64) -> ZoomcastResult<()>;

    /// Flushes pending frames and finalizes the container.
    fn finish(&mut self) -> ZoomcastResult<()>;

    /// Tears down without finalizing. The output file is not usable after
    /// an abort.
    fn abort(&mut self);
}

/// Encoder settings fixed for the lifetime of one export.
#[derive(Debug, Clone)]
pub struct EncoderSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub bitrate_kbps: u32,
    pub output_path: PathBuf,
}

/// H.264/MP4 encoder pipeline fed frame by frame.
pub struct Mp4Encoder {
    pipeline: gst::Pipeline,
    appsrc: gst_app::AppSrc,
    output_path: PathBuf,
    closed: bool,
}

impl Mp4Encoder {
    pub fn new(settings: &EncoderSettings) -> ZoomcastResult<Self> {
        init_gstreamer()?;

        let EncoderSettings {
            width,
            height,
            fps,
            bitrate_kbps,
            output_path,
        } = settings;
        if *width == 0 || *height == 0 || *fps == 0 {
            return Err(ZoomcastError::encoder(format!(
                "Invalid encoder geometry {width}x{height}@{fps}fps"
            )));
        }

        // keyframe every 2 seconds; the profile caps filter pins the H.264
        // profile so output is identical across encoder versions.
        let keyint = fps.saturating_mul(2).max(2);
        let path = escape_path(output_path.as_path());
        let launch = format!(
            "appsrc name=src is-live=false format=time caps=\"video/x-raw,format=RGBA,width={width},height={height},framerate={fps}/1\" ! videoconvert ! x264enc bitrate={bitrate_kbps} speed-preset=veryfast key-int-max={keyint} ! video/x-h264,profile=high ! h264parse ! mp4mux ! filesink location=\"{path}\""
        );
        let element = gst::parse::launch(&launch)
            .map_err(|e| ZoomcastError::encoder(format!("Failed to build encode pipeline: {e}")))?;
        let pipeline = element
            .dynamic_cast::<gst::Pipeline>()
            .map_err(|_| ZoomcastError::encoder("Launch string did not produce a pipeline"))?;
        let appsrc = pipeline
            .by_name("src")
            .and_then(|e| e.dynamic_cast::<gst_app::AppSrc>().ok())
            .ok_or_else(|| ZoomcastError::encoder("Encode pipeline has no appsrc"))?;

        pipeline
            .set_state(gst::State::Playing)
            .map_err(|e| ZoomcastError::encoder(format!("Failed to start encoder: {e:?}")))?;

        tracing::debug!(
            width,
            height,
            fps,
            bitrate_kbps,
            output = %output_path.display(),
            "Encoder pipeline started"
        );

        Ok(Self {
            pipeline,
            appsrc,
            output_path: output_path.clone(),
            closed: false,
        })
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Pops a pending error message off the bus, if any.
    fn bus_error(&self) -> Option<String> {
        let bus = self.pipeline.bus()?;
        let msg = bus.timed_pop_filtered(gst::ClockTime::ZERO, &[gst::MessageType::Error])?;
        match msg.view() {
            gst::MessageView::Error(e) => Some(e.error().to_string()),
            _ => None,
        }
    }

    fn teardown(&mut self) {
        if let Err(e) = self.pipeline.set_state(gst::State::Null) {
            tracing::warn!(error = ?e, "Failed to tear down encoder pipeline");
        }
        self.closed = true;
    }
}

impl VideoEncoder for Mp4Encoder {
    fn submit(&mut self, canvas: &RgbaImage, pts_us: u64, duration_us: u64) -> ZoomcastResult<()> {
        if self.closed {
            return Err(ZoomcastError::encoder("Encoder already closed"));
        }
        if let Some(err) = self.bus_error() {
            return Err(ZoomcastError::encoder(format!("Encoder pipeline error: {err}")));
        }

        let mut buffer = gst::Buffer::from_mut_slice(canvas.as_raw().clone());
        {
            let buffer_ref = buffer
                .get_mut()
                .ok_or_else(|| ZoomcastError::encoder("Frame buffer unexpectedly shared"))?;
            buffer_ref.set_pts(gst::ClockTime::from_useconds(pts_us));
            buffer_ref.set_duration(gst::ClockTime::from_useconds(duration_us));
        }

        self.appsrc
            .push_buffer(buffer)
            .map_err(|e| ZoomcastError::encoder(format!("Failed to push frame at {pts_us}us: {e:?}")))?;
        Ok(())
    }

    fn finish(&mut self) -> ZoomcastResult<()> {
        if self.closed {
            return Ok(());
        }

        self.appsrc
            .end_of_stream()
            .map_err(|e| ZoomcastError::encoder(format!("Failed to signal end of stream: {e:?}")))?;

        // Drain until the muxer has written the container tail. Without
        // this the moov atom may be missing and the file unplayable.
        let mut drain_result = Ok(());
        if let Some(bus) = self.pipeline.bus() {
            match bus.timed_pop_filtered(
                gst::ClockTime::from_seconds(10),
                &[gst::MessageType::Eos, gst::MessageType::Error],
            ) {
                Some(msg) => match msg.view() {
                    gst::MessageView::Eos(_) => {
                        tracing::debug!(output = %self.output_path.display(), "Encoder drained");
                    }
                    gst::MessageView::Error(e) => {
                        drain_result = Err(ZoomcastError::encoder(format!(
                            "Encoder failed while finalizing: {}",
                            e.error()
                        )));
                    }
                    _ => {}
                },
                None => {
                    drain_result = Err(ZoomcastError::encoder("Encoder drain timed out after 10s"));
                }
            }
        }

        self.teardown();
        drain_result
    }

    fn abort(&mut self) {
        if self.closed {
            return;
        }
        tracing::debug!(output = %self.output_path.display(), "Aborting encoder");
        self.teardown();
    }
}

impl Drop for Mp4Encoder {
    fn drop(&mut self) {
        if !self.closed {
            self.teardown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_degenerate_geometry() {
        let settings = EncoderSettings {
            width: 0,
            height: 720,
            fps: 40,
            bitrate_kbps: 8000,
            output_path: PathBuf::from("/tmp/out.mp4"),
        };
        assert!(Mp4Encoder::new(&settings).is_err());
    }
}
