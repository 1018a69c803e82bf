//! Compose a single frame and write it as a PNG.

use std::path::PathBuf;

use zoomcast_render_engine::{FrameCompositor, FrameSource, GstFrameSource, SyntheticSource};
use zoomcast_zoom_engine::resolver::ZoomStateResolver;
use zoomcast_zoom_engine::sequencer::EventSequencer;

pub fn run(
    video: PathBuf,
    events_path: PathBuf,
    at: f64,
    output: PathBuf,
    synthetic: bool,
) -> anyhow::Result<()> {
    let events = super::load_events(&events_path)?;
    let sequences = EventSequencer::with_defaults().group(&events);

    if synthetic {
        let mut source = SyntheticSource::new(1280, 720, at.max(1.0) + 1.0);
        return compose(&mut source, &sequences, at, &output);
    }

    let mut source = GstFrameSource::open(&video)
        .map_err(|e| anyhow::anyhow!("Failed to open video: {e}"))?;
    compose(&mut source, &sequences, at, &output)
}

fn compose<S: FrameSource>(
    source: &mut S,
    sequences: &[zoomcast_event_model::sequence::Sequence],
    at: f64,
    output: &PathBuf,
) -> anyhow::Result<()> {
    source
        .wait_ready()
        .map_err(|e| anyhow::anyhow!("Failed to load source metadata: {e}"))?;
    let (width, height) = source
        .dimensions()
        .ok_or_else(|| anyhow::anyhow!("Source reported no dimensions"))?;

    source
        .seek(at)
        .map_err(|e| anyhow::anyhow!("Seek to {at:.3}s failed: {e}"))?;
    let frame = source
        .read_frame()
        .map_err(|e| anyhow::anyhow!("Failed to decode frame: {e}"))?;

    let decision = ZoomStateResolver::with_defaults().resolve(at, sequences);
    let mut canvas = image::RgbaImage::new(width, height);
    FrameCompositor::with_defaults().composite(&frame, &mut canvas, &decision);

    canvas
        .save(output)
        .map_err(|e| anyhow::anyhow!("Failed to write {}: {e}", output.display()))?;
    println!(
        "Wrote {} ({}x{}, t={at:.3}s, scale {:.2})",
        output.display(),
        width,
        height,
        decision.scale
    );

    Ok(())
}
