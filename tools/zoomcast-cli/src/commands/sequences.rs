//! Show how a click log groups into zoom sequences.

use std::path::PathBuf;

use zoomcast_zoom_engine::sequencer::EventSequencer;

pub fn run(events_path: PathBuf) -> anyhow::Result<()> {
    let events = super::load_events(&events_path)?;
    println!("Loaded {} click events from {}", events.len(), events_path.display());

    let sequences = EventSequencer::with_defaults().group(&events);
    if sequences.is_empty() {
        println!("No zoom sequences.");
        return Ok(());
    }

    println!("{} sequence(s):", sequences.len());
    for (i, seq) in sequences.iter().enumerate() {
        println!(
            "  #{:<3} {} event(s)  window {:.2}s .. {:.2}s",
            i + 1,
            seq.len(),
            seq.window_start(),
            seq.window_end()
        );
        for event in seq.events() {
            println!(
                "        t={:.3}s  ({:.0}, {:.0}) in {:.0}x{:.0}",
                event.timestamp, event.x, event.y, event.viewport_width, event.viewport_height
            );
        }
    }

    Ok(())
}
