//! CPU compositor: source frame -> styled canvas.
//!
//! One call composes one canvas: flat backdrop, soft drop shadow, rounded
//! white stage card, then the video mapped into the card under the current
//! zoom transform. The compositor holds no per-frame state; every call
//! starts from a full backdrop fill, so nothing (shadow included) can leak
//! from one frame into the next.
//!
//! The zoom transform is `translate(f) . scale(s) . translate(-f)` around
//! the focus point `f`. Rather than forward-transforming the source we
//! inverse-map each canvas pixel `p` to `q = f + (p - f) / s` and sample
//! the frame bilinearly at `q`, which keeps live and export output
//! pixel-identical for the same `(frame, decision)` inputs.

use image::{Rgba, RgbaImage};
use zoomcast_zoom_engine::resolver::ZoomDecision;

use crate::style::StageStyle;

/// Composes source frames onto a styled canvas.
pub struct FrameCompositor {
    style: StageStyle,
}

impl FrameCompositor {
    pub fn new(style: StageStyle) -> Self {
        Self { style }
    }

    pub fn with_defaults() -> Self {
        Self::new(StageStyle::default())
    }

    pub fn style(&self) -> &StageStyle {
        &self.style
    }

    /// Composes `frame` onto `canvas` under `decision`.
    ///
    /// The canvas keeps whatever dimensions the caller allocated; the frame
    /// is fitted to the stage card regardless of its own size, so a
    /// source-resolution frame composes correctly onto a downscaled export
    /// canvas.
    pub fn composite(&self, frame: &RgbaImage, canvas: &mut RgbaImage, decision: &ZoomDecision) {
        let (canvas_w, canvas_h) = canvas.dimensions();
        let (stage_x, stage_y, stage_w, stage_h) = self.style.stage_rect(canvas_w, canvas_h);

        if stage_w <= 0.0 || stage_h <= 0.0 {
            fill(canvas, self.style.background);
            return;
        }

        let scale = decision.scale.max(1.0);
        let zoomed = decision.is_active() && scale > 1.0;
        let focus = self.focus_on_canvas(decision, stage_x, stage_y, stage_w, stage_h);
        let clip = self.style.clip_zoomed || !zoomed;
        let (shadow_dx, shadow_dy) = self.style.shadow_offset;

        for py in 0..canvas_h {
            for px in 0..canvas_w {
                // Pixel-center coordinates.
                let cx = px as f64 + 0.5;
                let cy = py as f64 + 0.5;

                let mut color = self.style.background;

                let shadow_d = rounded_rect_distance(
                    cx - shadow_dx,
                    cy - shadow_dy,
                    stage_x,
                    stage_y,
                    stage_w,
                    stage_h,
                    self.style.corner_radius,
                );
                let shadow_cov = soft_coverage(shadow_d, self.style.shadow_blur.max(1.0));
                if shadow_cov > 0.0 {
                    color = blend(color, Rgba([0, 0, 0, 255]), shadow_cov * self.style.shadow_alpha);
                }

                // Inverse-map into the un-zoomed canvas, then into frame uv.
                let qx = focus.0 + (cx - focus.0) / scale;
                let qy = focus.1 + (cy - focus.1) / scale;
                let u = (qx - stage_x) / stage_w;
                let v = (qy - stage_y) / stage_h;
                let on_frame = (0.0..=1.0).contains(&u) && (0.0..=1.0).contains(&v);

                if clip {
                    let card_d =
                        rounded_rect_distance(cx, cy, stage_x, stage_y, stage_w, stage_h, self.style.corner_radius);
                    let card_cov = soft_coverage(card_d, 1.0);
                    if card_cov > 0.0 {
                        let inner = if on_frame {
                            sample_bilinear(frame, u, v)
                        } else {
                            self.style.stage_fill
                        };
                        color = blend(color, inner, card_cov);
                    }
                } else {
                    // Zoomed without the clip: the card is still drawn, but
                    // the magnified video may spill past its corners.
                    let card_d =
                        rounded_rect_distance(cx, cy, stage_x, stage_y, stage_w, stage_h, self.style.corner_radius);
                    let card_cov = soft_coverage(card_d, 1.0);
                    if card_cov > 0.0 {
                        color = blend(color, self.style.stage_fill, card_cov);
                    }
                    if on_frame {
                        color = sample_bilinear(frame, u, v);
                    }
                }

                canvas.put_pixel(px, py, color);
            }
        }
    }

    /// Maps the focus from recorded-viewport pixels onto the canvas. A
    /// neutral decision centers the (identity) transform on the stage.
    fn focus_on_canvas(
        &self,
        decision: &ZoomDecision,
        stage_x: f64,
        stage_y: f64,
        stage_w: f64,
        stage_h: f64,
    ) -> (f64, f64) {
        match &decision.active_event {
            Some(event) if event.viewport_width > 0.0 && event.viewport_height > 0.0 => (
                stage_x + decision.focus_x * stage_w / event.viewport_width,
                stage_y + decision.focus_y * stage_h / event.viewport_height,
            ),
            _ => (stage_x + stage_w / 2.0, stage_y + stage_h / 2.0),
        }
    }
}

fn fill(canvas: &mut RgbaImage, color: Rgba<u8>) {
    for pixel in canvas.pixels_mut() {
        *pixel = color;
    }
}

/// Signed distance from `(px, py)` to a rounded rectangle. Negative inside.
fn rounded_rect_distance(px: f64, py: f64, x: f64, y: f64, w: f64, h: f64, radius: f64) -> f64 {
    let radius = radius.min(w / 2.0).min(h / 2.0).max(0.0);
    let half_w = w / 2.0 - radius;
    let half_h = h / 2.0 - radius;
    let dx = (px - (x + w / 2.0)).abs() - half_w;
    let dy = (py - (y + h / 2.0)).abs() - half_h;

    let outside = (dx.max(0.0).powi(2) + dy.max(0.0).powi(2)).sqrt();
    outside + dx.max(dy).min(0.0) - radius
}

/// Linear falloff across `[-extent / 2, extent / 2]` of signed distance.
fn soft_coverage(distance: f64, extent: f64) -> f64 {
    (0.5 - distance / extent).clamp(0.0, 1.0)
}

/// Bilinear sample of `frame` at normalized coordinates, clamped at edges.
fn sample_bilinear(frame: &RgbaImage, u: f64, v: f64) -> Rgba<u8> {
    let (w, h) = frame.dimensions();
    if w == 0 || h == 0 {
        return Rgba([0, 0, 0, 255]);
    }

    let fx = (u * w as f64 - 0.5).clamp(0.0, (w - 1) as f64);
    let fy = (v * h as f64 - 0.5).clamp(0.0, (h - 1) as f64);
    let x0 = fx.floor() as u32;
    let y0 = fy.floor() as u32;
    let x1 = (x0 + 1).min(w - 1);
    let y1 = (y0 + 1).min(h - 1);
    let tx = fx - x0 as f64;
    let ty = fy - y0 as f64;

    let p00 = frame.get_pixel(x0, y0);
    let p10 = frame.get_pixel(x1, y0);
    let p01 = frame.get_pixel(x0, y1);
    let p11 = frame.get_pixel(x1, y1);

    let mut out = [0u8; 4];
    for c in 0..4 {
        let top = p00.0[c] as f64 * (1.0 - tx) + p10.0[c] as f64 * tx;
        let bottom = p01.0[c] as f64 * (1.0 - tx) + p11.0[c] as f64 * tx;
        out[c] = (top * (1.0 - ty) + bottom * ty).round().clamp(0.0, 255.0) as u8;
    }
    Rgba(out)
}

/// Blends `over` onto `under` at the given opacity.
fn blend(under: Rgba<u8>, over: Rgba<u8>, alpha: f64) -> Rgba<u8> {
    let alpha = alpha.clamp(0.0, 1.0);
    let mut out = [0u8; 4];
    for c in 0..3 {
        let mixed = under.0[c] as f64 * (1.0 - alpha) + over.0[c] as f64 * alpha;
        out[c] = mixed.round().clamp(0.0, 255.0) as u8;
    }
    out[3] = 255;
    Rgba(out)
}
