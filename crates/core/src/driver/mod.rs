//! Output boundary of the crate.
//!
//! A [`Driver`] receives finished frames from a [`crate::Layout`] and owns any
//! device specific encoding. Concrete serial or network transports live
//! outside this crate; the drivers here are transport agnostic.

use std::{
    fmt,
    fs::File,
    io::{BufWriter, Write},
    sync::{Arc, Mutex, MutexGuard},
};

use crate::{
    config::{DriverKind, DriverSpec},
    ops::Gamma,
    ChannelOrder, Color, DriverError, PixelError, Result,
};

/// One addressable output target with a fixed pixel count.
pub trait Driver: Send {
    /// Human readable label used in logs and failure reports.
    fn name(&self) -> &str {
        "driver"
    }

    /// Number of pixels this driver accepts per frame. Queried once when the
    /// driver is attached.
    fn pixel_count(&self) -> usize;

    /// Accepts one frame of exactly [`Driver::pixel_count`] colors. Returns
    /// once the frame has been transmitted or queued.
    fn transmit(&mut self, frame: &[Color]) -> std::result::Result<(), DriverError>;
}

fn check_frame(expected: usize, frame: &[Color]) -> std::result::Result<(), DriverError> {
    if frame.len() != expected {
        return Err(DriverError::FrameLength {
            expected,
            actual: frame.len(),
        });
    }
    Ok(())
}

/// Accepts frames and discards them.
#[derive(Debug, Clone)]
pub struct NullDriver {
    pixel_count: usize,
    frames: u64,
}

impl NullDriver {
    pub fn new(pixel_count: usize) -> Self {
        Self {
            pixel_count,
            frames: 0,
        }
    }

    /// Number of frames accepted so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Driver for NullDriver {
    fn name(&self) -> &str {
        "null"
    }

    fn pixel_count(&self) -> usize {
        self.pixel_count
    }

    fn transmit(&mut self, frame: &[Color]) -> std::result::Result<(), DriverError> {
        check_frame(self.pixel_count, frame)?;
        self.frames += 1;
        Ok(())
    }
}

/// Records every received frame in memory.
///
/// The recorded frames live behind a [`FrameLog`] handle that can be cloned
/// before the driver is moved into a layout.
#[derive(Debug)]
pub struct MemoryDriver {
    name: String,
    pixel_count: usize,
    log: FrameLog,
}

impl MemoryDriver {
    pub fn new(pixel_count: usize) -> Self {
        Self::named("memory", pixel_count)
    }

    pub fn named(name: impl Into<String>, pixel_count: usize) -> Self {
        Self {
            name: name.into(),
            pixel_count,
            log: FrameLog::default(),
        }
    }

    pub fn log(&self) -> FrameLog {
        self.log.clone()
    }
}

impl Driver for MemoryDriver {
    fn name(&self) -> &str {
        &self.name
    }

    fn pixel_count(&self) -> usize {
        self.pixel_count
    }

    fn transmit(&mut self, frame: &[Color]) -> std::result::Result<(), DriverError> {
        check_frame(self.pixel_count, frame)?;
        self.log.record(frame)
    }
}

/// Shared, thread-safe view over the frames captured by a [`MemoryDriver`].
#[derive(Clone, Default)]
pub struct FrameLog {
    frames: Arc<Mutex<Vec<Vec<Color>>>>,
}

impl FrameLog {
    fn record(&self, frame: &[Color]) -> std::result::Result<(), DriverError> {
        self.lock()?.push(frame.to_vec());
        Ok(())
    }

    /// All frames received so far, oldest first.
    pub fn frames(&self) -> std::result::Result<Vec<Vec<Color>>, DriverError> {
        Ok(self.lock()?.clone())
    }

    /// The most recently latched frame, if any.
    pub fn last(&self) -> std::result::Result<Option<Vec<Color>>, DriverError> {
        Ok(self.lock()?.last().cloned())
    }

    pub fn len(&self) -> std::result::Result<usize, DriverError> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> std::result::Result<bool, DriverError> {
        Ok(self.lock()?.is_empty())
    }

    fn lock(&self) -> std::result::Result<MutexGuard<'_, Vec<Vec<Color>>>, DriverError> {
        self.frames
            .lock()
            .map_err(|_| DriverError::msg("frame log has been poisoned"))
    }
}

impl fmt::Debug for FrameLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameLog")
            .field("frames", &self.len().ok())
            .finish()
    }
}

/// Encodes frames as raw channel bytes and writes them to any [`Write`]
/// sink, one frame of `3 * pixel_count` bytes per push.
pub struct WriterDriver<W> {
    name: String,
    pixel_count: usize,
    order: ChannelOrder,
    gamma: Option<Gamma>,
    writer: W,
    encoded: Vec<u8>,
}

impl<W: Write + Send> WriterDriver<W> {
    pub fn new(writer: W, pixel_count: usize) -> Self {
        Self {
            name: "writer".to_string(),
            pixel_count,
            order: ChannelOrder::default(),
            gamma: None,
            writer,
            encoded: Vec::with_capacity(pixel_count * 3),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_channel_order(mut self, order: ChannelOrder) -> Self {
        self.order = order;
        self
    }

    pub fn with_gamma(mut self, gamma: Gamma) -> Self {
        self.gamma = Some(gamma);
        self
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn encode(&mut self, frame: &[Color]) {
        self.encoded.clear();
        for color in frame {
            let color = match &self.gamma {
                Some(gamma) => gamma.correct(*color),
                None => *color,
            };
            self.encoded.extend_from_slice(&self.order.apply(color));
        }
    }
}

impl<W: Write + Send> Driver for WriterDriver<W> {
    fn name(&self) -> &str {
        &self.name
    }

    fn pixel_count(&self) -> usize {
        self.pixel_count
    }

    fn transmit(&mut self, frame: &[Color]) -> std::result::Result<(), DriverError> {
        check_frame(self.pixel_count, frame)?;
        self.encode(frame);
        self.writer.write_all(&self.encoded)?;
        self.writer.flush()?;
        Ok(())
    }
}

impl<W> fmt::Debug for WriterDriver<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriterDriver")
            .field("name", &self.name)
            .field("pixel_count", &self.pixel_count)
            .field("order", &self.order)
            .field("gamma", &self.gamma)
            .finish()
    }
}

/// Instantiates the driver described by `spec`. Drivers without an explicit
/// pixel count take the layout's.
pub fn build(spec: &DriverSpec, layout_pixels: usize) -> Result<Box<dyn Driver>> {
    let pixel_count = spec.pixel_count.unwrap_or(layout_pixels);
    let gamma = spec.gamma.map(Gamma::new).transpose()?;

    let driver: Box<dyn Driver> = match &spec.kind {
        DriverKind::Null => Box::new(NullDriver::new(pixel_count)),
        DriverKind::Memory => Box::new(MemoryDriver::new(pixel_count)),
        DriverKind::File { path } => {
            let file = File::create(path).map_err(|err| {
                PixelError::config(format!(
                    "cannot open driver output `{}`: {err}",
                    path.display()
                ))
            })?;
            let mut driver = WriterDriver::new(BufWriter::new(file), pixel_count)
                .with_name(format!("file:{}", path.display()))
                .with_channel_order(spec.channel_order);
            if let Some(gamma) = gamma {
                driver = driver.with_gamma(gamma);
            }
            Box::new(driver)
        }
    };
    Ok(driver)
}
