use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{
    ops::Gamma, timeline::duration_from_secs, ChannelOrder, FrameScheduler, Numbers, PixelError,
    Result,
};

/// Top-level configuration structure handed to the core by the command line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub layout: LayoutConfig,
    #[serde(default)]
    pub drivers: Vec<DriverSpec>,
    #[serde(default)]
    pub run: RunConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            layout: LayoutConfig::default(),
            drivers: vec![DriverSpec::default()],
            run: RunConfig::default(),
        }
    }
}

impl AppConfig {
    /// Checks every section up front so that construction cannot fail half
    /// way through.
    pub fn validate(&self) -> Result<()> {
        self.layout.validate()?;
        self.run.validate()?;
        for (index, driver) in self.drivers.iter().enumerate() {
            if let Some(count) = driver.pixel_count {
                if count != self.layout.pixel_count {
                    return Err(PixelError::config(format!(
                        "driver #{index} declares {count} pixels but the layout has {}",
                        self.layout.pixel_count
                    )));
                }
            }
            if let Some(gamma) = driver.gamma {
                Gamma::new(gamma)
                    .map_err(|err| PixelError::config(format!("driver #{index}: {err}")))?;
            }
        }
        Ok(())
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Construction parameters for a [`crate::Layout`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub pixel_count: usize,
    /// Global brightness in `[0, 1]`, applied at push time.
    pub brightness: f64,
    #[serde(default)]
    pub numbers: Numbers,
    /// Abort a push at the first failing driver instead of broadcasting.
    #[serde(default)]
    pub fail_fast: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            pixel_count: 64,
            brightness: 1.0,
            numbers: Numbers::default(),
            fail_fast: false,
        }
    }
}

impl LayoutConfig {
    pub fn validate(&self) -> Result<()> {
        if self.pixel_count == 0 {
            return Err(PixelError::config("pixel count must be at least 1"));
        }
        validate_brightness(self.brightness)
    }
}

pub(crate) fn validate_brightness(brightness: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&brightness) {
        return Err(PixelError::config(format!(
            "brightness must be within [0, 1], got {brightness}"
        )));
    }
    Ok(())
}

/// Output target families the core knows how to build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "type")]
pub enum DriverKind {
    #[default]
    Null,
    Memory,
    /// Raw channel bytes appended to a file, one frame per push.
    File { path: PathBuf },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DriverSpec {
    #[serde(flatten)]
    pub kind: DriverKind,
    /// Defaults to the layout's pixel count.
    #[serde(default)]
    pub pixel_count: Option<usize>,
    #[serde(default)]
    pub channel_order: ChannelOrder,
    #[serde(default)]
    pub gamma: Option<f64>,
}

/// Frame loop settings consumed by [`crate::Runner`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Target frame rate; `0` runs unthrottled.
    pub fps: f64,
    /// Stop after this many seconds.
    #[serde(default)]
    pub seconds: Option<f64>,
    /// Stop after this many frames.
    #[serde(default)]
    pub frames: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            fps: 60.0,
            seconds: Some(10.0),
            frames: None,
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> Result<()> {
        FrameScheduler::from_fps(self.fps)?;
        if let Some(seconds) = self.seconds {
            duration_from_secs(seconds, "run duration")?;
        }
        if self.seconds.is_none() && self.frames.is_none() {
            return Err(PixelError::config(
                "a run needs a duration or a frame limit",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        AppConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_bad_layouts() {
        let mut config = AppConfig::default();
        config.layout.pixel_count = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.layout.brightness = 1.5;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.layout.brightness = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_mismatched_driver_counts() {
        let mut config = AppConfig::default();
        config.drivers.push(DriverSpec {
            pixel_count: Some(config.layout.pixel_count + 1),
            ..DriverSpec::default()
        });
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("driver #1"));
    }

    #[test]
    fn rejects_bad_run_settings() {
        let mut run = RunConfig::default();
        run.fps = -1.0;
        assert!(run.validate().is_err());

        let run = RunConfig {
            fps: 30.0,
            seconds: None,
            frames: None,
        };
        assert!(run.validate().is_err());

        let run = RunConfig {
            fps: 30.0,
            seconds: Some(1e20),
            frames: None,
        };
        assert!(run.validate().is_err());

        let run = RunConfig {
            fps: 1e-30,
            seconds: None,
            frames: Some(10),
        };
        assert!(run.validate().is_err());
    }

    #[test]
    fn rejects_bad_driver_gamma() {
        for gamma in [0.0, -2.2, f64::NAN, f64::INFINITY] {
            let mut config = AppConfig::default();
            config.drivers[0].gamma = Some(gamma);
            let err = config.validate().unwrap_err();
            assert!(matches!(err, PixelError::InvalidConfiguration(_)));
            assert!(err.to_string().contains("driver #0"), "{err}");
        }

        let mut config = AppConfig::default();
        config.drivers[0].gamma = Some(2.2);
        config.validate().unwrap();
    }

    #[test]
    fn dump_round_trips_through_json() {
        let mut config = AppConfig::default();
        config.layout.numbers = Numbers::Packed;
        config.drivers = vec![DriverSpec {
            kind: DriverKind::File {
                path: PathBuf::from("frames.bin"),
            },
            channel_order: ChannelOrder::Grb,
            gamma: Some(2.2),
            pixel_count: None,
        }];

        let json = config.to_json_pretty().unwrap();
        assert!(json.contains("\"numbers\": \"packed\""));
        assert!(json.contains("\"type\": \"file\""));

        let parsed: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.drivers[0].kind, config.drivers[0].kind);
        assert_eq!(parsed.drivers[0].channel_order, ChannelOrder::Grb);
    }
}
