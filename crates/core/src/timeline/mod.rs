use std::{
    thread,
    time::{Duration, Instant},
};

use crate::{PixelError, Result};

/// Longest interval a [`FrameScheduler`] will wait between frames.
pub const MAX_FRAME_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Converts a non-negative number of seconds into a [`Duration`], rejecting
/// values that are negative, non-finite or too large to represent.
pub(crate) fn duration_from_secs(seconds: f64, what: &str) -> Result<Duration> {
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(PixelError::config(format!(
            "{what} must be a non-negative number of seconds, got {seconds}"
        )));
    }
    Duration::try_from_secs_f64(seconds)
        .map_err(|err| PixelError::config(format!("{what} of {seconds} seconds: {err}")))
}

/// Wall-clock stopwatch for a running animation.
#[derive(Debug, Clone)]
pub struct PlaybackClock {
    started: Instant,
}

impl PlaybackClock {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    pub fn reset(&mut self) {
        self.started = Instant::now();
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

impl Default for PlaybackClock {
    fn default() -> Self {
        Self::start()
    }
}

/// Keeps consecutive frames at least `interval` apart.
///
/// Frames that take longer than the interval are never dropped and the
/// scheduler does not try to catch up afterwards.
#[derive(Debug, Clone, Default)]
pub struct FrameScheduler {
    interval: Duration,
    last_frame: Option<Instant>,
}

impl FrameScheduler {
    /// Creates a scheduler with an interval given in seconds. Intervals
    /// above [`MAX_FRAME_INTERVAL`] are rejected.
    pub fn new(interval_secs: f64) -> Result<Self> {
        let interval = duration_from_secs(interval_secs, "frame interval")?;
        if interval > MAX_FRAME_INTERVAL {
            return Err(PixelError::config(format!(
                "frame interval of {interval_secs} seconds exceeds {MAX_FRAME_INTERVAL:?}"
            )));
        }
        Ok(Self::with_interval(interval))
    }

    /// Creates a scheduler targeting `fps` frames per second. Zero disables
    /// throttling.
    pub fn from_fps(fps: f64) -> Result<Self> {
        if !fps.is_finite() || fps < 0.0 {
            return Err(PixelError::config(format!(
                "fps must be a non-negative number, got {fps}"
            )));
        }
        if fps == 0.0 {
            return Ok(Self::with_interval(Duration::ZERO));
        }
        Self::new(1.0 / fps)
    }

    /// Intervals above [`MAX_FRAME_INTERVAL`] are clamped to it.
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval: interval.min(MAX_FRAME_INTERVAL),
            last_frame: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Intervals above [`MAX_FRAME_INTERVAL`] are clamped to it.
    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval.min(MAX_FRAME_INTERVAL);
    }

    /// Forgets the previous frame so the next tick returns immediately.
    pub fn reset(&mut self) {
        tracing::debug!(interval = ?self.interval, "frame scheduler reset");
        self.last_frame = None;
    }

    /// Blocks until `interval` has elapsed since the previous tick, then
    /// marks the start of a new frame. Returns how long it slept.
    pub fn tick(&mut self) -> Duration {
        let mut slept = Duration::ZERO;
        if let Some(deadline) = self
            .last_frame
            .and_then(|last| last.checked_add(self.interval))
        {
            let now = Instant::now();
            if deadline > now {
                slept = deadline - now;
                thread::sleep(slept);
                // sleep may wake early on some platforms
                while Instant::now() < deadline {
                    thread::yield_now();
                }
            }
        }
        self.last_frame = Some(Instant::now());
        slept
    }

    /// Time since the last tick, without blocking. Zero before the first.
    pub fn elapsed_since_last(&self) -> Duration {
        self.last_frame
            .map(|last| last.elapsed())
            .unwrap_or(Duration::ZERO)
    }
}
