use std::{fmt, ops::Range};

use serde::{Deserialize, Serialize};

use crate::{ops, Color, PixelError, Result};

/// Numeric representation used to store a buffer's colors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Numbers {
    /// One [`Color`] value per pixel. Simple and used as the reference.
    #[default]
    Tuple,
    /// A flat `u8` array of `3 * n` channels.
    Packed,
}

/// Storage strategy behind a [`ColorBuffer`].
///
/// Implementations may assume every index and range they receive has already
/// been validated by the owning buffer.
pub trait PixelStore: fmt::Debug + Send {
    fn len(&self) -> usize;
    fn get(&self, index: usize) -> Color;
    fn set(&mut self, index: usize, color: Color);
    fn fill_range(&mut self, color: Color, range: Range<usize>);
    fn as_slice(&self) -> &[Color];
    /// Writes every pixel scaled by `factor` into `out`, replacing its
    /// previous contents.
    fn scaled_into(&self, factor: f64, out: &mut Vec<Color>);
}

#[derive(Debug)]
pub struct TupleStore {
    pixels: Vec<Color>,
}

impl TupleStore {
    pub fn new(count: usize) -> Self {
        Self {
            pixels: vec![Color::BLACK; count],
        }
    }
}

impl PixelStore for TupleStore {
    fn len(&self) -> usize {
        self.pixels.len()
    }

    fn get(&self, index: usize) -> Color {
        self.pixels[index]
    }

    fn set(&mut self, index: usize, color: Color) {
        self.pixels[index] = color;
    }

    fn fill_range(&mut self, color: Color, range: Range<usize>) {
        self.pixels[range].fill(color);
    }

    fn as_slice(&self) -> &[Color] {
        &self.pixels
    }

    fn scaled_into(&self, factor: f64, out: &mut Vec<Color>) {
        out.clear();
        out.extend(
            self.pixels
                .iter()
                .map(|color| ops::scale_brightness(*color, factor)),
        );
    }
}

#[derive(Debug)]
pub struct PackedStore {
    channels: Vec<u8>,
}

impl PackedStore {
    pub fn new(count: usize) -> Self {
        Self {
            channels: vec![0; count * 3],
        }
    }
}

impl PixelStore for PackedStore {
    fn len(&self) -> usize {
        self.channels.len() / 3
    }

    fn get(&self, index: usize) -> Color {
        let start = index * 3;
        Color::new(
            self.channels[start],
            self.channels[start + 1],
            self.channels[start + 2],
        )
    }

    fn set(&mut self, index: usize, color: Color) {
        let start = index * 3;
        self.channels[start..start + 3].copy_from_slice(&color.channels());
    }

    fn fill_range(&mut self, color: Color, range: Range<usize>) {
        let channels = color.channels();
        for pixel in self.channels[range.start * 3..range.end * 3].chunks_exact_mut(3) {
            pixel.copy_from_slice(&channels);
        }
    }

    fn as_slice(&self) -> &[Color] {
        bytemuck::cast_slice(&self.channels)
    }

    fn scaled_into(&self, factor: f64, out: &mut Vec<Color>) {
        let table = ops::brightness_table(factor);
        out.clear();
        out.resize(self.len(), Color::BLACK);
        let out_channels: &mut [u8] = bytemuck::cast_slice_mut(out.as_mut_slice());
        for (dst, src) in out_channels.iter_mut().zip(&self.channels) {
            *dst = table[usize::from(*src)];
        }
    }
}

/// Fixed-length, ordered sequence of pixel colors.
///
/// Index `0..len()` addresses physical pixel order. The length is set at
/// construction and never changes.
#[derive(Debug)]
pub struct ColorBuffer {
    numbers: Numbers,
    store: Box<dyn PixelStore>,
}

impl ColorBuffer {
    /// Creates a black buffer of `count` pixels using the tuple backend.
    pub fn new(count: usize) -> Result<Self> {
        Self::with_backend(count, Numbers::default())
    }

    pub fn with_backend(count: usize, numbers: Numbers) -> Result<Self> {
        if count == 0 {
            return Err(PixelError::config("pixel count must be at least 1"));
        }

        let store: Box<dyn PixelStore> = match numbers {
            Numbers::Tuple => Box::new(TupleStore::new(count)),
            Numbers::Packed => Box::new(PackedStore::new(count)),
        };
        Ok(Self { numbers, store })
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Always false: buffers hold at least one pixel.
    pub fn is_empty(&self) -> bool {
        self.store.len() == 0
    }

    pub fn numbers(&self) -> Numbers {
        self.numbers
    }

    pub fn get(&self, index: usize) -> Result<Color> {
        self.check_index(index)?;
        Ok(self.store.get(index))
    }

    pub fn set(&mut self, index: usize, color: Color) -> Result<()> {
        self.check_index(index)?;
        self.store.set(index, color);
        Ok(())
    }

    pub fn fill(&mut self, color: Color) {
        let len = self.len();
        self.store.fill_range(color, 0..len);
    }

    /// Fills `start..end`. `end` is clamped to the buffer length; a `start`
    /// past the end is rejected.
    pub fn fill_range(&mut self, color: Color, start: usize, end: usize) -> Result<()> {
        let len = self.len();
        if start > len {
            return Err(PixelError::OutOfRange { index: start, len });
        }
        let end = end.min(len);
        if start < end {
            self.store.fill_range(color, start..end);
        }
        Ok(())
    }

    pub fn as_slice(&self) -> &[Color] {
        self.store.as_slice()
    }

    /// Writes a brightness-scaled copy of the buffer into `out`.
    pub fn scaled_into(&self, factor: f64, out: &mut Vec<Color>) {
        self.store.scaled_into(factor, out);
    }

    fn check_index(&self, index: usize) -> Result<()> {
        let len = self.len();
        if index >= len {
            return Err(PixelError::OutOfRange { index, len });
        }
        Ok(())
    }
}
