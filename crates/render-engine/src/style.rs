//! Visual parameters of the composed canvas.
//!
//! The composition draws the video on a rounded white card floating over a
//! flat background. All lengths here are in canvas pixels at the canonical
//! preview size; [`StageStyle::scaled`] derives the matching values for an
//! export canvas of a different resolution.

use image::Rgba;

/// Styling for the stage card and its backdrop.
#[derive(Debug, Clone, PartialEq)]
pub struct StageStyle {
    /// Gap between the canvas border and the stage card on every side.
    pub padding: f64,
    /// Corner radius of the stage card.
    pub corner_radius: f64,
    /// Flat backdrop color behind the card.
    pub background: Rgba<u8>,
    /// Fill of the card where the video does not cover it.
    pub stage_fill: Rgba<u8>,
    /// Opacity of the drop shadow under the card, in `0.0..=1.0`.
    pub shadow_alpha: f64,
    /// Softness of the shadow edge.
    pub shadow_blur: f64,
    /// Shadow displacement relative to the card, `(dx, dy)`.
    pub shadow_offset: (f64, f64),
    /// Whether the rounded-corner clip also applies while zoomed in.
    pub clip_zoomed: bool,
}

impl Default for StageStyle {
    fn default() -> Self {
        Self {
            padding: 120.0,
            corner_radius: 16.0,
            background: Rgba([0xFF, 0xC1, 0x07, 0xFF]),
            stage_fill: Rgba([0xFF, 0xFF, 0xFF, 0xFF]),
            shadow_alpha: 0.3,
            shadow_blur: 20.0,
            shadow_offset: (0.0, 4.0),
            clip_zoomed: true,
        }
    }
}

impl StageStyle {
    /// Scales every length by `factor`, keeping colors and flags unchanged.
    ///
    /// Used when the export canvas differs from the preview canvas so the
    /// card proportions stay identical between the two.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            padding: self.padding * factor,
            corner_radius: self.corner_radius * factor,
            background: self.background,
            stage_fill: self.stage_fill,
            shadow_alpha: self.shadow_alpha,
            shadow_blur: self.shadow_blur * factor,
            shadow_offset: (self.shadow_offset.0 * factor, self.shadow_offset.1 * factor),
            clip_zoomed: self.clip_zoomed,
        }
    }

    /// Stage card rectangle for a canvas of the given size, as
    /// `(x, y, width, height)`.
    pub fn stage_rect(&self, canvas_width: u32, canvas_height: u32) -> (f64, f64, f64, f64) {
        let w = (canvas_width as f64 - 2.0 * self.padding).max(0.0);
        let h = (canvas_height as f64 - 2.0 * self.padding).max(0.0);
        (self.padding, self.padding, w, h)
    }
}
