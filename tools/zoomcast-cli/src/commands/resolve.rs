//! Show the resolved zoom decision at a media time.

use std::path::PathBuf;

use zoomcast_zoom_engine::resolver::ZoomStateResolver;
use zoomcast_zoom_engine::sequencer::EventSequencer;

pub fn run(events_path: PathBuf, at: f64, json: bool) -> anyhow::Result<()> {
    let events = super::load_events(&events_path)?;
    let sequences = EventSequencer::with_defaults().group(&events);

    let decision = ZoomStateResolver::with_defaults().resolve(at, &sequences);
    if json {
        println!("{}", serde_json::to_string_pretty(&decision)?);
        return Ok(());
    }

    println!("Decision at t={at:.3}s:");
    if decision.is_active() {
        println!("  scale: {:.3}", decision.scale);
        println!("  focus: ({:.1}, {:.1})", decision.focus_x, decision.focus_y);
        if let Some(event) = &decision.active_event {
            println!(
                "  driven by click at t={:.3}s ({:.0}, {:.0})",
                event.timestamp, event.x, event.y
            );
        }
    } else {
        println!("  neutral (no zoom active)");
    }

    Ok(())
}
