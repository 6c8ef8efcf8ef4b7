use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// One pixel's color: three 8-bit channels in red, green, blue order.
///
/// The layout is `#[repr(C)]` with no padding so that a packed byte buffer of
/// length `3 * n` can be viewed as `[Color; n]` without copying.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Pod, Zeroable,
)]
#[repr(C)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::new(0, 0, 0);
    pub const WHITE: Color = Color::new(255, 255, 255);
    pub const RED: Color = Color::new(255, 0, 0);
    pub const GREEN: Color = Color::new(0, 255, 0);
    pub const BLUE: Color = Color::new(0, 0, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Builds a color from wider integers, clamping every channel to
    /// `[0, 255]`. Channels never wrap.
    pub fn clamped(r: i64, g: i64, b: i64) -> Self {
        Self {
            r: clamp_channel(r),
            g: clamp_channel(g),
            b: clamp_channel(b),
        }
    }

    pub fn channels(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    /// Applies `f` to each channel.
    pub fn map(self, mut f: impl FnMut(u8) -> u8) -> Self {
        Self {
            r: f(self.r),
            g: f(self.g),
            b: f(self.b),
        }
    }
}

impl From<(u8, u8, u8)> for Color {
    fn from((r, g, b): (u8, u8, u8)) -> Self {
        Self::new(r, g, b)
    }
}

impl From<[u8; 3]> for Color {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self::new(r, g, b)
    }
}

impl From<Color> for (u8, u8, u8) {
    fn from(color: Color) -> Self {
        (color.r, color.g, color.b)
    }
}

fn clamp_channel(value: i64) -> u8 {
    value.clamp(0, 255) as u8
}

/// Wire order of the three channels expected by a particular LED chipset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelOrder {
    #[default]
    Rgb,
    Rbg,
    Grb,
    Gbr,
    Brg,
    Bgr,
}

impl ChannelOrder {
    /// Returns the channels of `color` in wire order.
    pub fn apply(self, color: Color) -> [u8; 3] {
        let Color { r, g, b } = color;
        match self {
            ChannelOrder::Rgb => [r, g, b],
            ChannelOrder::Rbg => [r, b, g],
            ChannelOrder::Grb => [g, r, b],
            ChannelOrder::Gbr => [g, b, r],
            ChannelOrder::Brg => [b, r, g],
            ChannelOrder::Bgr => [b, g, r],
        }
    }
}
