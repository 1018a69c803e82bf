//! Click event types for the Zoomcast event log.
//!
//! A log is a JSON array of click records captured by the recorder
//! extension, ordered by non-decreasing timestamp. Coordinates are raw
//! pixels in the browser viewport that was on-screen when recorded; the
//! viewport dimensions travel with every event so a renderer can rescale
//! them to any target surface.

use serde::{Deserialize, Serialize};

/// A single recorded mouse click.
///
/// Immutable once loaded. Recorder logs carry extra metadata per click
/// (DOM element, tab id/url, event type); those fields are ignored on
/// deserialize and not round-tripped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClickEvent {
    /// Seconds since recording start.
    pub timestamp: f64,

    /// Click X position in recorded viewport pixels.
    pub x: f64,

    /// Click Y position in recorded viewport pixels.
    pub y: f64,

    /// Width of the viewport the click was recorded against.
    #[serde(rename = "viewportWidth", alias = "recordedViewportWidth")]
    pub viewport_width: f64,

    /// Height of the viewport the click was recorded against.
    #[serde(rename = "viewportHeight", alias = "recordedViewportHeight")]
    pub viewport_height: f64,
}

impl ClickEvent {
    pub fn new(timestamp: f64, x: f64, y: f64, viewport_width: f64, viewport_height: f64) -> Self {
        Self {
            timestamp,
            x,
            y,
            viewport_width,
            viewport_height,
        }
    }

    /// Euclidean distance in pixels to another event's click position.
    pub fn distance_to(&self, other: &ClickEvent) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    /// Click position rescaled to a target surface of the given size.
    pub fn position_scaled_to(&self, target_width: f64, target_height: f64) -> (f64, f64) {
        let sx = if self.viewport_width > 0.0 {
            target_width / self.viewport_width
        } else {
            1.0
        };
        let sy = if self.viewport_height > 0.0 {
            target_height / self.viewport_height
        } else {
            1.0
        };
        (self.x * sx, self.y * sy)
    }
}

/// Parse a click-event log from a JSON array.
///
/// The log is trusted to be ordered; parsing does not sort it. Use
/// [`validate_order`] to check before handing events to the sequencer.
pub fn parse_event_log(json: &str) -> Result<Vec<ClickEvent>, serde_json::Error> {
    serde_json::from_str(json)
}

/// Serialize events back to a JSON array.
pub fn serialize_event_log(events: &[ClickEvent]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(events)
}

/// Check that timestamps are non-decreasing.
///
/// Returns the index of the first event that precedes its predecessor,
/// or `None` when the log is well ordered.
pub fn validate_order(events: &[ClickEvent]) -> Option<usize> {
    events
        .windows(2)
        .position(|pair| pair[1].timestamp < pair[0].timestamp)
        .map(|i| i + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_roundtrip() {
        let event = ClickEvent::new(5.25, 100.0, 200.0, 1000.0, 800.0);
        let json = serde_json::to_string(&event).unwrap();
        let parsed: ClickEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, parsed);
    }

    #[test]
    fn test_roundtrip_preserves_full_float_precision() {
        // Coordinates with no short decimal form must come back bit-exact,
        // not merely within an ulp.
        let event = ClickEvent::new(5.000000000000001, 431.27393618602094, 967.0091552201579, 1920.0, 1080.0);
        let json = serialize_event_log(&[event]).unwrap();
        let parsed = parse_event_log(&json).unwrap();
        assert_eq!(parsed[0].y.to_bits(), event.y.to_bits());
        assert_eq!(parsed, vec![event]);
    }

    #[test]
    fn test_parse_log_ignores_recorder_metadata() {
        let json = r#"[{
            "element": {"tagName": "BUTTON", "text": "Submit", "id": "go"},
            "tabId": 12,
            "tabUrl": "https://example.com",
            "type": "click",
            "timestamp": 5.0,
            "x": 100,
            "y": 100,
            "viewportWidth": 1000,
            "viewportHeight": 800
        }]"#;
        let events = parse_event_log(json).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].timestamp, 5.0);
        assert_eq!(events[0].viewport_width, 1000.0);
    }

    #[test]
    fn test_parse_log_rejects_malformed_json() {
        assert!(parse_event_log("not json").is_err());
        assert!(parse_event_log("{\"timestamp\":1}").is_err()); // object, not array
    }

    #[test]
    fn test_validate_order() {
        let ordered = vec![
            ClickEvent::new(1.0, 0.0, 0.0, 100.0, 100.0),
            ClickEvent::new(1.0, 5.0, 5.0, 100.0, 100.0),
            ClickEvent::new(2.0, 9.0, 9.0, 100.0, 100.0),
        ];
        assert_eq!(validate_order(&ordered), None);

        let disordered = vec![
            ClickEvent::new(2.0, 0.0, 0.0, 100.0, 100.0),
            ClickEvent::new(1.0, 5.0, 5.0, 100.0, 100.0),
        ];
        assert_eq!(validate_order(&disordered), Some(1));
    }

    #[test]
    fn test_distance() {
        let a = ClickEvent::new(1.0, 0.0, 0.0, 100.0, 100.0);
        let b = ClickEvent::new(2.0, 3.0, 4.0, 100.0, 100.0);
        assert!((a.distance_to(&b) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_position_scaled_to() {
        let event = ClickEvent::new(0.0, 500.0, 400.0, 1000.0, 800.0);
        let (x, y) = event.position_scaled_to(1920.0, 1080.0);
        assert!((x - 960.0).abs() < 1e-9);
        assert!((y - 540.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_viewport_dimensions_do_not_divide() {
        let event = ClickEvent::new(0.0, 10.0, 20.0, 0.0, 0.0);
        let (x, y) = event.position_scaled_to(1920.0, 1080.0);
        assert_eq!((x, y), (10.0, 20.0));
    }

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn serialized_logs_parse_back_unchanged(
            raw in prop::collection::vec(
                (0.0f64..600.0, 0.0f64..1920.0, 0.0f64..1080.0),
                0..32
            )
        ) {
            let events: Vec<ClickEvent> = raw
                .into_iter()
                .map(|(t, x, y)| ClickEvent::new(t, x, y, 1920.0, 1080.0))
                .collect();

            let json = serialize_event_log(&events).unwrap();
            let parsed = parse_event_log(&json).unwrap();
            prop_assert_eq!(parsed, events);
        }

        #[test]
        fn sorted_logs_always_validate(
            mut times in prop::collection::vec(0.0f64..600.0, 0..32)
        ) {
            times.sort_by(f64::total_cmp);
            let events: Vec<ClickEvent> = times
                .into_iter()
                .map(|t| ClickEvent::new(t, 0.0, 0.0, 1920.0, 1080.0))
                .collect();
            prop_assert_eq!(validate_order(&events), None);
        }
    }
}
