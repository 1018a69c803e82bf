pub mod check;
pub mod export;
pub mod frame;
pub mod resolve;
pub mod sequences;

use std::path::Path;

use zoomcast_event_model::event::{parse_event_log, validate_order, ClickEvent};

/// Loads a click log, degrading a malformed file to an empty event list so
/// callers still produce un-zoomed output instead of failing outright.
pub fn load_events(path: &Path) -> anyhow::Result<Vec<ClickEvent>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read event log {}: {e}", path.display()))?;
    match parse_event_log(&content) {
        Ok(events) => {
            if let Some(index) = validate_order(&events) {
                tracing::warn!(index, "Event log timestamps are not non-decreasing");
            }
            Ok(events)
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Malformed event log; continuing without zoom");
            Ok(Vec::new())
        }
    }
}
