//! Aspect-fit placement of a clip frame on the output canvas.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Rectangle a source frame is drawn into, in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FitRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl FitRect {
    /// Fit `src` into `canvas` without distortion and center it.
    ///
    /// Wider sources fill the canvas width (bars above and below), others
    /// fill the height (bars left and right).
    pub fn fit(src_width: u32, src_height: u32, canvas_width: u32, canvas_height: u32) -> Self {
        if src_width == 0 || src_height == 0 {
            return Self {
                x: 0,
                y: 0,
                width: canvas_width,
                height: canvas_height,
            };
        }

        let src_aspect = src_width as f64 / src_height as f64;
        let dst_aspect = canvas_width as f64 / canvas_height as f64;

        let (width, height) = if src_aspect > dst_aspect {
            let height = (canvas_width as f64 / src_aspect).round() as u32;
            (canvas_width, height.min(canvas_height))
        } else {
            let width = (canvas_height as f64 * src_aspect).round() as u32;
            (width.min(canvas_width), canvas_height)
        };

        Self {
            x: (canvas_width - width) / 2,
            y: (canvas_height - height) / 2,
            width,
            height,
        }
    }

    /// Same placement snapped to even coordinates and sizes, as 4:2:0 chroma
    /// planes require. The rectangle never grows past the canvas.
    pub fn to_even(self) -> Self {
        let even = |v: u32| (v & !1).max(2);
        Self {
            x: self.x & !1,
            y: self.y & !1,
            width: even(self.width),
            height: even(self.height),
        }
    }
}

/// Letterbox background colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };

    /// Studio-swing BT.601 Y'CbCr.
    pub fn to_yuv(self) -> [u8; 3] {
        let (r, g, b) = (self.r as f64, self.g as f64, self.b as f64);
        let y = 16.0 + (65.481 * r + 128.553 * g + 24.966 * b) / 255.0;
        let u = 128.0 + (-37.797 * r - 74.203 * g + 112.0 * b) / 255.0;
        let v = 128.0 + (112.0 * r - 93.786 * g - 18.214 * b) / 255.0;
        [
            y.round().clamp(0.0, 255.0) as u8,
            u.round().clamp(0.0, 255.0) as u8,
            v.round().clamp(0.0, 255.0) as u8,
        ]
    }
}

impl Default for Rgb {
    fn default() -> Self {
        Rgb::BLACK
    }
}

/// `#rrggbb` or `rrggbb`.
impl FromStr for Rgb {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(format!("invalid colour: {}", s));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| format!("invalid colour: {}", s))
        };
        Ok(Rgb {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
        })
    }
}
