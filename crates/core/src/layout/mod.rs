use std::fmt;

use crate::{
    config::{validate_brightness, LayoutConfig},
    ops, Color, ColorBuffer, Driver, DriverFailure, Numbers, PixelError, PushFailures, Result,
};

/// Owner of one pixel buffer and the drivers it is pushed to.
///
/// Mutations only touch the stored colors; brightness is applied to a
/// scratch snapshot at push time, so reads always return unscaled values.
pub struct Layout {
    buffer: ColorBuffer,
    brightness: f64,
    fail_fast: bool,
    drivers: Vec<Box<dyn Driver>>,
    frame: Vec<Color>,
}

impl Layout {
    /// Creates a layout on the tuple backend in best-effort mode.
    pub fn new(pixel_count: usize, brightness: f64) -> Result<Self> {
        Self::from_config(&LayoutConfig {
            pixel_count,
            brightness,
            ..LayoutConfig::default()
        })
    }

    pub fn from_config(config: &LayoutConfig) -> Result<Self> {
        config.validate()?;
        let buffer = ColorBuffer::with_backend(config.pixel_count, config.numbers)?;
        Ok(Self {
            frame: Vec::with_capacity(buffer.len()),
            buffer,
            brightness: config.brightness,
            fail_fast: config.fail_fast,
            drivers: Vec::new(),
        })
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Always false: layouts hold at least one pixel.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn numbers(&self) -> Numbers {
        self.buffer.numbers()
    }

    pub fn brightness(&self) -> f64 {
        self.brightness
    }

    pub fn set_brightness(&mut self, brightness: f64) -> Result<()> {
        validate_brightness(brightness)?;
        self.brightness = brightness;
        Ok(())
    }

    pub fn fail_fast(&self) -> bool {
        self.fail_fast
    }

    pub fn set_fail_fast(&mut self, fail_fast: bool) {
        self.fail_fast = fail_fast;
    }

    pub fn fill(&mut self, color: Color) {
        self.buffer.fill(color);
    }

    pub fn fill_hsv(&mut self, hue: f64, saturation: f64, value: f64) {
        ops::fill_hsv(&mut self.buffer, hue, saturation, value);
    }

    pub fn fill_range(&mut self, color: Color, start: usize, end: usize) -> Result<()> {
        self.buffer.fill_range(color, start, end)
    }

    pub fn clear(&mut self) {
        self.buffer.fill(Color::BLACK);
    }

    pub fn set_pixel(&mut self, index: usize, color: Color) -> Result<()> {
        self.buffer.set(index, color)
    }

    pub fn get_pixel(&self, index: usize) -> Result<Color> {
        self.buffer.get(index)
    }

    /// Unscaled view of every pixel.
    pub fn colors(&self) -> &[Color] {
        self.buffer.as_slice()
    }

    pub fn driver_count(&self) -> usize {
        self.drivers.len()
    }

    /// Appends a driver. Its pixel count must match the layout's.
    pub fn attach_driver(&mut self, driver: Box<dyn Driver>) -> Result<()> {
        let declared = driver.pixel_count();
        if declared != self.len() {
            return Err(PixelError::config(format!(
                "driver `{}` declares {declared} pixels but the layout has {}",
                driver.name(),
                self.len()
            )));
        }

        tracing::debug!(
            driver = driver.name(),
            index = self.drivers.len(),
            pixels = declared,
            "attached driver"
        );
        self.drivers.push(driver);
        Ok(())
    }

    /// Sends the brightness-scaled buffer to every driver in attachment order.
    ///
    /// In best-effort mode every driver is attempted and failures come back
    /// together as [`PixelError::Push`]. In fail-fast mode the first failure
    /// is returned as [`PixelError::Driver`] and later drivers are skipped.
    pub fn push_to_driver(&mut self) -> Result<()> {
        if self.drivers.is_empty() {
            return Ok(());
        }

        self.buffer.scaled_into(self.brightness, &mut self.frame);

        let mut failures = PushFailures::new();
        for (index, driver) in self.drivers.iter_mut().enumerate() {
            if let Err(error) = driver.transmit(&self.frame) {
                let name = driver.name().to_string();
                if self.fail_fast {
                    return Err(PixelError::Driver {
                        index,
                        name,
                        source: error,
                    });
                }

                tracing::warn!(driver = %name, index, %error, "driver rejected frame");
                failures.push(DriverFailure { index, name, error });
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(PixelError::Push(failures))
        }
    }
}

impl fmt::Debug for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Layout")
            .field("pixels", &self.buffer.len())
            .field("numbers", &self.buffer.numbers())
            .field("brightness", &self.brightness)
            .field("fail_fast", &self.fail_fast)
            .field("drivers", &self.drivers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DriverError, MemoryDriver};

    /// Driver that rejects every frame.
    struct BrokenDriver {
        pixels: usize,
    }

    impl Driver for BrokenDriver {
        fn name(&self) -> &str {
            "broken"
        }

        fn pixel_count(&self) -> usize {
            self.pixels
        }

        fn transmit(&mut self, _frame: &[Color]) -> std::result::Result<(), DriverError> {
            Err(DriverError::msg("cable unplugged"))
        }
    }

    fn layout(numbers: Numbers, brightness: f64) -> Layout {
        Layout::from_config(&LayoutConfig {
            pixel_count: 3,
            brightness,
            numbers,
            fail_fast: false,
        })
        .unwrap()
    }

    #[test]
    fn pushes_scaled_frame_without_touching_buffer() {
        for numbers in [Numbers::Tuple, Numbers::Packed] {
            let mut layout = layout(numbers, 0.5);
            let driver = MemoryDriver::new(3);
            let log = driver.log();
            layout.attach_driver(Box::new(driver)).unwrap();

            layout.fill(Color::new(200, 100, 50));
            layout.push_to_driver().unwrap();

            assert_eq!(log.frames().unwrap(), vec![vec![Color::new(100, 50, 25); 3]]);
            assert_eq!(layout.get_pixel(0).unwrap(), Color::new(200, 100, 50));
        }
    }

    #[test]
    fn fill_hsv_red_on_every_backend() {
        for numbers in [Numbers::Tuple, Numbers::Packed] {
            let mut layout = layout(numbers, 1.0);
            layout.fill_hsv(0.0, 255.0, 255.0);
            assert_eq!(layout.get_pixel(0).unwrap(), Color::RED);
        }
    }

    #[test]
    fn rejects_mismatched_drivers() {
        let mut layout = layout(Numbers::Tuple, 1.0);
        let err = layout
            .attach_driver(Box::new(MemoryDriver::new(4)))
            .unwrap_err();
        assert!(matches!(err, PixelError::InvalidConfiguration(_)));
        assert_eq!(layout.driver_count(), 0);
    }

    #[test]
    fn rejects_invalid_construction() {
        assert!(Layout::new(0, 1.0).is_err());
        assert!(Layout::new(3, -0.1).is_err());
        assert!(Layout::new(3, 1.01).is_err());

        let mut layout = Layout::new(3, 1.0).unwrap();
        assert!(layout.set_brightness(2.0).is_err());
        assert_eq!(layout.brightness(), 1.0);
        layout.set_brightness(0.25).unwrap();
        assert_eq!(layout.brightness(), 0.25);
    }

    #[test]
    fn best_effort_reaches_healthy_drivers() {
        let mut layout = layout(Numbers::Tuple, 1.0);
        let first = MemoryDriver::named("first", 3);
        let last = MemoryDriver::named("last", 3);
        let (first_log, last_log) = (first.log(), last.log());

        layout.attach_driver(Box::new(first)).unwrap();
        layout.attach_driver(Box::new(BrokenDriver { pixels: 3 })).unwrap();
        layout.attach_driver(Box::new(last)).unwrap();

        layout.fill(Color::GREEN);
        let err = layout.push_to_driver().unwrap_err();

        match err {
            PixelError::Push(failures) => {
                assert_eq!(failures.failed_indices(), vec![1]);
                assert_eq!(failures.failures()[0].name, "broken");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(first_log.last().unwrap(), Some(vec![Color::GREEN; 3]));
        assert_eq!(last_log.last().unwrap(), Some(vec![Color::GREEN; 3]));
    }

    #[test]
    fn fail_fast_stops_at_first_failure() {
        let mut layout = layout(Numbers::Packed, 1.0);
        layout.set_fail_fast(true);
        let last = MemoryDriver::new(3);
        let last_log = last.log();

        layout.attach_driver(Box::new(BrokenDriver { pixels: 3 })).unwrap();
        layout.attach_driver(Box::new(last)).unwrap();

        let err = layout.push_to_driver().unwrap_err();
        assert!(matches!(err, PixelError::Driver { index: 0, .. }));
        assert!(last_log.is_empty().unwrap());
    }

    #[test]
    fn push_without_drivers_is_a_no_op() {
        let mut layout = layout(Numbers::Tuple, 1.0);
        layout.fill(Color::WHITE);
        layout.push_to_driver().unwrap();
    }

    #[test]
    fn forwards_pixel_operations() {
        let mut layout = layout(Numbers::Packed, 1.0);
        layout.set_pixel(2, Color::BLUE).unwrap();
        layout.fill_range(Color::RED, 0, 1).unwrap();
        assert_eq!(layout.colors(), &[Color::RED, Color::BLACK, Color::BLUE]);
        assert!(matches!(
            layout.get_pixel(3),
            Err(PixelError::OutOfRange { index: 3, len: 3 })
        ));

        layout.clear();
        assert!(layout.colors().iter().all(|c| *c == Color::BLACK));
    }
}
