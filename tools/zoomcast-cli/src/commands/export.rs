//! Export the video with zoom composition applied.

use std::path::PathBuf;

use zoomcast_common::config::AppConfig;
use zoomcast_render_engine::{
    export_video, CancelToken, ExportProgress, ExportSettings, FrameSource, GstFrameSource,
};

pub fn run(
    video: PathBuf,
    events_path: PathBuf,
    output: Option<PathBuf>,
    fps: Option<u32>,
    bitrate_kbps: Option<u32>,
) -> anyhow::Result<()> {
    let events = super::load_events(&events_path)?;
    let config = AppConfig::load();

    let output_path =
        output.unwrap_or_else(|| PathBuf::from(config.export.timestamped_output_name()));
    let settings = ExportSettings {
        fps: fps.unwrap_or(config.export.fps),
        video_bitrate_kbps: bitrate_kbps.unwrap_or(config.export.video_bitrate_kbps),
        max_coded_area: config.export.max_coded_area,
        output_path: output_path.clone(),
    };

    println!("Exporting {} -> {}", video.display(), output_path.display());
    println!("  Events: {} ({})", events.len(), events_path.display());
    println!("  FPS: {}  Bitrate: {} kbit/s", settings.fps, settings.video_bitrate_kbps);

    let mut source = GstFrameSource::open(&video)
        .map_err(|e| anyhow::anyhow!("Failed to open video: {e}"))?;
    source
        .wait_ready()
        .map_err(|e| anyhow::anyhow!("Failed to load video metadata: {e}"))?;

    let progress: Box<dyn Fn(ExportProgress) + Send> = Box::new(|p: ExportProgress| {
        let percent = if p.total_frames > 0 {
            p.frames_processed as f64 / p.total_frames as f64 * 100.0
        } else {
            100.0
        };
        print!(
            "\r  Progress: {percent:.1}% ({}/{} frames)  ",
            p.frames_processed, p.total_frames
        );
    });

    let cancel = CancelToken::new();
    match export_video(&mut source, &events, &settings, Some(progress), &cancel) {
        Ok(path) => println!("\nExport complete: {}", path.display()),
        Err(e) => {
            println!("\nExport failed: {e}");
            return Err(e.into());
        }
    }

    Ok(())
}
