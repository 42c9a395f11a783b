//! Mapping surface-relative element positions to OS screen coordinates.

use crate::config::Bias;
use fanout_input::Point;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    fn is_finite(&self) -> bool {
        self.left.is_finite()
            && self.top.is_finite()
            && self.width.is_finite()
            && self.height.is_finite()
    }
}

/// Absolute screen position derived for one dispatch. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
    /// Display scale factor the point was computed with.
    pub scale: f64,
}

impl ScreenPoint {
    /// Round to the pixel grid used by the input backend.
    pub fn to_point(&self) -> Point {
        Point::new(self.x.round() as i32, self.y.round() as i32)
    }
}

/// Convert an element rectangle to a screen point.
///
/// `element` is `None` when the content round trip failed or matched
/// nothing; the result is then `None` and the caller must not click.
///
/// ```text
/// x = (surface.left + element.left) * bias.x * scale
/// y = (surface.top + element.top + chrome) * bias.y * scale
/// ```
pub fn to_screen_point(
    surface: Rect,
    element: Option<Rect>,
    scale: f64,
    chrome_offset: f64,
    bias: Bias,
) -> Option<ScreenPoint> {
    let element = element?;
    if !surface.is_finite() || !element.is_finite() || !scale.is_finite() || scale <= 0.0 {
        return None;
    }
    Some(ScreenPoint {
        x: (surface.left + element.left) * bias.x * scale,
        y: (surface.top + element.top + chrome_offset) * bias.y * scale,
        scale,
    })
}
