use std::time::Duration;

use crate::{
    config::RunConfig, timeline::duration_from_secs, FrameScheduler, Layout, PlaybackClock,
    Result,
};

/// Outcome of a finished [`Runner::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Frames rendered, including those a driver rejected.
    pub frames: u64,
    /// Frames where at least one driver failed in best-effort mode.
    pub failed_frames: u64,
    pub elapsed: Duration,
}

/// Frame loop that composes a [`Layout`] with a [`FrameScheduler`].
///
/// Each frame ticks the scheduler, lets the caller update the layout, then
/// pushes. Best-effort push failures skip the frame and the loop carries on;
/// any other error ends the run.
#[derive(Debug)]
pub struct Runner {
    config: RunConfig,
    limit: Option<Duration>,
    scheduler: FrameScheduler,
}

impl Runner {
    pub fn new(config: RunConfig) -> Result<Self> {
        config.validate()?;
        let limit = config
            .seconds
            .map(|seconds| duration_from_secs(seconds, "run duration"))
            .transpose()?;
        let scheduler = FrameScheduler::from_fps(config.fps)?;
        Ok(Self {
            config,
            limit,
            scheduler,
        })
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn run<F>(&mut self, layout: &mut Layout, mut step: F) -> Result<RunSummary>
    where
        F: FnMut(&mut Layout, u64) -> Result<()>,
    {
        let limit = self.limit;
        let clock = PlaybackClock::start();
        self.scheduler.reset();

        let mut frames = 0;
        let mut failed_frames = 0;

        loop {
            if self.config.frames.is_some_and(|max| frames >= max) {
                break;
            }
            if limit.is_some_and(|limit| clock.elapsed() >= limit) {
                break;
            }

            self.scheduler.tick();
            step(layout, frames)?;
            match layout.push_to_driver() {
                Ok(()) => {}
                Err(err) if err.is_transient() => {
                    failed_frames += 1;
                    tracing::debug!(frame = frames, %err, "skipping frame");
                }
                Err(err) => return Err(err),
            }
            frames += 1;
        }

        let summary = RunSummary {
            frames,
            failed_frames,
            elapsed: clock.elapsed(),
        };
        tracing::info!(
            frames = summary.frames,
            failed_frames = summary.failed_frames,
            elapsed = ?summary.elapsed,
            "run finished"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Color, Driver, DriverError, MemoryDriver, PixelError};

    /// Fails every other frame.
    struct FlakyDriver {
        calls: u64,
    }

    impl Driver for FlakyDriver {
        fn pixel_count(&self) -> usize {
            2
        }

        fn transmit(&mut self, _frame: &[Color]) -> std::result::Result<(), DriverError> {
            self.calls += 1;
            if self.calls % 2 == 0 {
                Err(DriverError::msg("dropped"))
            } else {
                Ok(())
            }
        }
    }

    fn frames_only(frames: u64) -> RunConfig {
        RunConfig {
            fps: 0.0,
            seconds: None,
            frames: Some(frames),
        }
    }

    #[test]
    fn stops_at_frame_limit() {
        let mut layout = Layout::new(2, 1.0).unwrap();
        let driver = MemoryDriver::new(2);
        let log = driver.log();
        layout.attach_driver(Box::new(driver)).unwrap();

        let mut runner = Runner::new(frames_only(4)).unwrap();
        let summary = runner
            .run(&mut layout, |layout, frame| {
                let level = (frame * 10) as u8;
                layout.fill(Color::new(level, level, level));
                Ok(())
            })
            .unwrap();

        assert_eq!(summary.frames, 4);
        assert_eq!(summary.failed_frames, 0);
        let frames = log.frames().unwrap();
        assert_eq!(frames.len(), 4);
        assert_eq!(frames[3], vec![Color::new(30, 30, 30); 2]);
    }

    #[test]
    fn driver_failures_skip_frames() {
        let mut layout = Layout::new(2, 1.0).unwrap();
        layout
            .attach_driver(Box::new(FlakyDriver { calls: 0 }))
            .unwrap();

        let mut runner = Runner::new(frames_only(6)).unwrap();
        let summary = runner.run(&mut layout, |_, _| Ok(())).unwrap();

        assert_eq!(summary.frames, 6);
        assert_eq!(summary.failed_frames, 3);
    }

    #[test]
    fn fail_fast_ends_the_run() {
        let mut layout = Layout::new(2, 1.0).unwrap();
        layout.set_fail_fast(true);
        layout
            .attach_driver(Box::new(FlakyDriver { calls: 0 }))
            .unwrap();

        let mut runner = Runner::new(frames_only(6)).unwrap();
        let err = runner.run(&mut layout, |_, _| Ok(())).unwrap_err();
        assert!(matches!(err, PixelError::Driver { index: 0, .. }));
    }

    #[test]
    fn step_errors_are_fatal() {
        let mut layout = Layout::new(2, 1.0).unwrap();
        let mut runner = Runner::new(frames_only(3)).unwrap();
        let err = runner
            .run(&mut layout, |layout, _| layout.set_pixel(9, Color::RED))
            .unwrap_err();
        assert!(matches!(err, PixelError::OutOfRange { index: 9, .. }));
    }

    #[test]
    fn honours_duration_and_frame_rate() {
        let mut layout = Layout::new(1, 1.0).unwrap();
        let mut runner = Runner::new(RunConfig {
            fps: 20.0,
            seconds: Some(0.2),
            frames: None,
        })
        .unwrap();

        let summary = runner.run(&mut layout, |_, _| Ok(())).unwrap();
        assert!(summary.elapsed >= Duration::from_millis(200));
        assert!((1..=5).contains(&summary.frames), "{summary:?}");
    }

    #[test]
    fn rejects_unrepresentable_settings() {
        let err = Runner::new(RunConfig {
            fps: 0.0,
            seconds: Some(1e20),
            frames: Some(1),
        })
        .unwrap_err();
        assert!(matches!(err, PixelError::InvalidConfiguration(_)));

        let err = Runner::new(RunConfig {
            fps: 1e-30,
            seconds: None,
            frames: Some(1),
        })
        .unwrap_err();
        assert!(matches!(err, PixelError::InvalidConfiguration(_)));
    }

    #[test]
    fn requires_a_limit() {
        let err = Runner::new(RunConfig {
            fps: 30.0,
            seconds: None,
            frames: None,
        })
        .unwrap_err();
        assert!(matches!(err, PixelError::InvalidConfiguration(_)));
    }
}
