//! Pure color arithmetic shared by every buffer backend.
//!
//! All intermediate math is `f64`. Results are rounded half away from zero
//! (`f64::round`) and clamped to `[0, 255]`, and [`scale_channel`] is the one
//! place brightness rounding happens so that backends cannot diverge.

use crate::{Color, ColorBuffer, PixelError, Result};

/// Converts a color into `(hue, saturation, value)`.
///
/// Hue is in degrees `[0, 360)`, saturation and value are in `[0, 255]`.
/// Hue is reported as `0.0` for greys.
pub fn rgb_to_hsv(color: Color) -> (f64, f64, f64) {
    let r = f64::from(color.r);
    let g = f64::from(color.g);
    let b = f64::from(color.b);

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let value = max;
    let saturation = if max <= 0.0 { 0.0 } else { delta / max * 255.0 };
    if delta <= 0.0 {
        return (0.0, saturation, value);
    }

    let sector = if max == r {
        ((g - b) / delta).rem_euclid(6.0)
    } else if max == g {
        (b - r) / delta + 2.0
    } else {
        (r - g) / delta + 4.0
    };

    ((sector * 60.0).rem_euclid(360.0), saturation, value)
}

/// Converts `(hue, saturation, value)` back to RGB.
///
/// Hue is reduced modulo 360 first. Saturation and value are expected in
/// `[0, 255]`; out-of-range inputs are tolerated and the resulting channels
/// are clamped after scaling.
pub fn hsv_to_rgb(hue: f64, saturation: f64, value: f64) -> Color {
    let hue = if hue.is_finite() {
        hue.rem_euclid(360.0)
    } else {
        0.0
    };
    let s = saturation / 255.0;
    let v = value / 255.0;

    let chroma = v * s;
    let sector = hue / 60.0;
    let x = chroma * (1.0 - (sector.rem_euclid(2.0) - 1.0).abs());
    let m = v - chroma;

    let (r, g, b) = match sector as u32 {
        0 => (chroma, x, 0.0),
        1 => (x, chroma, 0.0),
        2 => (0.0, chroma, x),
        3 => (0.0, x, chroma),
        4 => (x, 0.0, chroma),
        _ => (chroma, 0.0, x),
    };

    Color::new(
        unit_to_channel(r + m),
        unit_to_channel(g + m),
        unit_to_channel(b + m),
    )
}

/// Fills the whole buffer with the RGB equivalent of `(hue, saturation, value)`.
pub fn fill_hsv(buffer: &mut ColorBuffer, hue: f64, saturation: f64, value: f64) {
    buffer.fill(hsv_to_rgb(hue, saturation, value));
}

/// Multiplies each channel by `factor`, clamped to `[0, 1]`.
pub fn scale_brightness(color: Color, factor: f64) -> Color {
    color.map(|channel| scale_channel(channel, factor))
}

/// Scales a single channel value.
pub fn scale_channel(channel: u8, factor: f64) -> u8 {
    let factor = clamp_factor(factor);
    round_channel(f64::from(channel) * factor)
}

/// Precomputes [`scale_channel`] for every possible input value.
pub fn brightness_table(factor: f64) -> [u8; 256] {
    let mut table = [0u8; 256];
    for (input, slot) in table.iter_mut().enumerate() {
        *slot = scale_channel(input as u8, factor);
    }
    table
}

fn clamp_factor(factor: f64) -> f64 {
    if factor.is_nan() {
        0.0
    } else {
        factor.clamp(0.0, 1.0)
    }
}

fn unit_to_channel(unit: f64) -> u8 {
    round_channel(unit * 255.0)
}

fn round_channel(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.round().clamp(0.0, 255.0) as u8
}

/// Gamma correction lookup table applied by drivers just before encoding.
#[derive(Clone, PartialEq, Eq)]
pub struct Gamma {
    table: [u8; 256],
}

impl Gamma {
    /// Builds `out = round(255 * (in / 255) ^ exponent)` for every input.
    pub fn new(exponent: f64) -> Result<Self> {
        if !exponent.is_finite() || exponent <= 0.0 {
            return Err(PixelError::config(format!(
                "gamma exponent must be a positive number, got {exponent}"
            )));
        }

        let mut table = [0u8; 256];
        for (input, slot) in table.iter_mut().enumerate() {
            *slot = unit_to_channel((input as f64 / 255.0).powf(exponent));
        }
        Ok(Self { table })
    }

    pub fn apply(&self, channel: u8) -> u8 {
        self.table[usize::from(channel)]
    }

    pub fn correct(&self, color: Color) -> Color {
        color.map(|channel| self.apply(channel))
    }
}

impl std::fmt::Debug for Gamma {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gamma")
            .field("midpoint", &self.table[128])
            .finish()
    }
}
