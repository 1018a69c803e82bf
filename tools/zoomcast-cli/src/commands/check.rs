//! Check decoder/encoder availability.

use gstreamer as gst;

const REQUIRED_ELEMENTS: &[&str] = &[
    "filesrc",
    "decodebin",
    "videoconvert",
    "appsink",
    "appsrc",
    "x264enc",
    "h264parse",
    "mp4mux",
    "filesink",
];

pub fn run() -> anyhow::Result<()> {
    println!("Zoomcast System Check");
    println!("{}", "=".repeat(50));

    match gst::init() {
        Ok(()) => println!("[OK] GStreamer initialized ({})", gst::version_string()),
        Err(e) => {
            println!("[FAIL] GStreamer failed to initialize: {e}");
            return Err(anyhow::anyhow!("GStreamer unavailable"));
        }
    }

    let mut all_ok = true;
    for name in REQUIRED_ELEMENTS {
        if gst::ElementFactory::find(name).is_some() {
            println!("[OK] Element available: {name}");
        } else {
            println!("[MISSING] Element not found: {name}");
            all_ok = false;
        }
    }

    println!();
    if all_ok {
        println!("All required elements are available. Zoomcast is ready.");
    } else {
        println!("Some elements are missing. Install the GStreamer base, good, and ugly plugin sets.");
    }

    Ok(())
}
