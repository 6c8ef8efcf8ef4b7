use std::{path::PathBuf, time::Instant};

use clap::{Args, Parser, Subcommand, ValueEnum};
use pixelstrip_core::{
    driver, ops, AppConfig, ChannelOrder, Color, DriverKind, DriverSpec, Layout, LayoutConfig,
    NullDriver, Numbers, PixelError, RunConfig, Runner,
};
use tracing_subscriber::EnvFilter;

fn main() -> pixelstrip_core::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    match cli.command {
        Commands::Run(args) => run(&args),
        Commands::Bench {
            pixels,
            numbers,
            rounds,
        } => bench(pixels, numbers.into(), rounds),
    }
}

fn run(args: &RunArgs) -> pixelstrip_core::Result<()> {
    let config = args.to_config()?;
    config.validate()?;

    if args.dump {
        println!("{}", config.to_json_pretty()?);
    }

    let mut layout = build_layout(&config)?;
    tracing::info!(?layout, animation = ?args.animation, "layout ready");

    if args.dry_run {
        tracing::info!("dry run requested, not starting the animation");
        return Ok(());
    }

    let mut runner = Runner::new(config.run.clone())?;
    let animation = args.animation;
    let summary = runner.run(&mut layout, |layout, frame| {
        animation.render(layout, frame)
    })?;

    if summary.failed_frames > 0 {
        tracing::warn!(
            failed = summary.failed_frames,
            total = summary.frames,
            "some frames were not delivered to every driver"
        );
    }
    Ok(())
}

fn build_layout(config: &AppConfig) -> pixelstrip_core::Result<Layout> {
    let mut layout = Layout::from_config(&config.layout)?;
    for spec in &config.drivers {
        layout.attach_driver(driver::build(spec, config.layout.pixel_count)?)?;
    }
    Ok(layout)
}

/// Mirrors the fill / fill-HSV push benchmark: each round renders 256 frames
/// on a null driver with no frame pacing.
fn bench(pixels: usize, numbers: Numbers, rounds: u32) -> pixelstrip_core::Result<()> {
    let mut layout = Layout::from_config(&LayoutConfig {
        pixel_count: pixels,
        numbers,
        ..LayoutConfig::default()
    })?;
    layout.attach_driver(Box::new(NullDriver::new(pixels)))?;

    let fill = time_rounds(rounds, || {
        for i in 0..=255u8 {
            layout.fill(Color::new(i, i, i));
            layout.push_to_driver()?;
        }
        Ok(())
    })?;
    tracing::info!(?numbers, pixels, rounds, per_round = ?fill, "fill benchmark");

    let fill_hsv = time_rounds(rounds, || {
        for i in 0..=255u8 {
            layout.fill_hsv(f64::from(i), 255.0, 255.0);
            layout.push_to_driver()?;
        }
        Ok(())
    })?;
    tracing::info!(?numbers, pixels, rounds, per_round = ?fill_hsv, "fill_hsv benchmark");
    Ok(())
}

fn time_rounds<F>(rounds: u32, mut body: F) -> pixelstrip_core::Result<std::time::Duration>
where
    F: FnMut() -> pixelstrip_core::Result<()>,
{
    let rounds = rounds.max(1);
    let started = Instant::now();
    for _ in 0..rounds {
        body()?;
    }
    Ok(started.elapsed() / rounds)
}

fn init_tracing(cli: &Cli) {
    let default_level = if cli.verbose {
        "debug"
    } else {
        cli.loglevel.as_filter()
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Drive addressable LED layouts", long_about = None)]
struct Cli {
    /// What level of events to log. Higher levels print less.
    #[arg(long, value_enum, default_value_t = LogLevel::Info, global = true)]
    loglevel: LogLevel,
    /// Log at debug level regardless of `--loglevel`.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a built-in animation against the configured drivers.
    Run(RunArgs),
    /// Time fill and fill-HSV pushes on a null driver.
    Bench {
        #[arg(long, default_value_t = 1000)]
        pixels: usize,
        /// Numeric backend used for the color buffer.
        #[arg(short, long, value_enum, default_value_t = NumbersArg::Tuple)]
        numbers: NumbersArg,
        #[arg(long, default_value_t = 5)]
        rounds: u32,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    #[arg(short, long, value_enum, default_value_t = Animation::Rainbow)]
    animation: Animation,
    /// Global brightness in [0, 1].
    #[arg(short, long, default_value_t = 1.0)]
    brightness: f64,
    #[arg(long, default_value_t = 64)]
    pixels: usize,
    /// Numeric backend used for the color buffer.
    #[arg(short, long, value_enum, default_value_t = NumbersArg::Tuple)]
    numbers: NumbersArg,
    /// Target frame rate; 0 runs as fast as the drivers allow.
    #[arg(long, default_value_t = 60.0)]
    fps: f64,
    /// How long to run the animation, in seconds.
    #[arg(short, long)]
    run_for: Option<f64>,
    /// Stop after this many frames.
    #[arg(long)]
    frames: Option<u64>,
    #[arg(long, value_enum, default_value_t = DriverArg::Null)]
    driver: DriverArg,
    /// Output file for the `file` driver.
    #[arg(short, long, required_if_eq("driver", "file"))]
    output: Option<PathBuf>,
    /// Channel order expected by the LEDs.
    #[arg(short = 't', long, value_enum, default_value_t = LedType::Rgb)]
    ledtype: LedType,
    /// Gamma exponent applied by the driver before encoding.
    #[arg(long)]
    gamma: Option<f64>,
    /// Abort a push at the first failing driver.
    #[arg(short, long)]
    fail_fast: bool,
    /// Print the resolved configuration as JSON before running.
    #[arg(long)]
    dump: bool,
    /// Build the layout and drivers, then exit.
    #[arg(long)]
    dry_run: bool,
}

impl RunArgs {
    fn to_config(&self) -> pixelstrip_core::Result<AppConfig> {
        let kind = match self.driver {
            DriverArg::Null => DriverKind::Null,
            DriverArg::Memory => DriverKind::Memory,
            DriverArg::File => DriverKind::File {
                path: self
                    .output
                    .clone()
                    .ok_or_else(|| PixelError::config("the file driver needs --output"))?,
            },
        };

        let seconds = match (self.run_for, self.frames) {
            (None, None) => RunConfig::default().seconds,
            (seconds, _) => seconds,
        };

        Ok(AppConfig {
            layout: LayoutConfig {
                pixel_count: self.pixels,
                brightness: self.brightness,
                numbers: self.numbers.into(),
                fail_fast: self.fail_fast,
            },
            drivers: vec![DriverSpec {
                kind,
                pixel_count: None,
                channel_order: self.ledtype.into(),
                gamma: self.gamma,
            }],
            run: RunConfig {
                fps: self.fps,
                seconds,
                frames: self.frames,
            },
        })
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Animation {
    /// A hue gradient across the strip that drifts every frame.
    Rainbow,
    /// The whole strip cycles through the hue wheel.
    Cycle,
    /// A grey ramp from black to white.
    Ramp,
}

impl Animation {
    fn render(self, layout: &mut Layout, frame: u64) -> pixelstrip_core::Result<()> {
        match self {
            Animation::Rainbow => {
                let len = layout.len();
                let offset = (frame % 360) as f64;
                for index in 0..len {
                    let hue = offset + index as f64 * 360.0 / len as f64;
                    layout.set_pixel(index, ops::hsv_to_rgb(hue, 255.0, 255.0))?;
                }
            }
            Animation::Cycle => layout.fill_hsv((frame % 360) as f64, 255.0, 255.0),
            Animation::Ramp => {
                let level = (frame % 256) as u8;
                layout.fill(Color::new(level, level, level));
            }
        }
        Ok(())
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum NumbersArg {
    Tuple,
    Packed,
}

impl From<NumbersArg> for Numbers {
    fn from(value: NumbersArg) -> Self {
        match value {
            NumbersArg::Tuple => Numbers::Tuple,
            NumbersArg::Packed => Numbers::Packed,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum DriverArg {
    Null,
    Memory,
    File,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum LedType {
    Rgb,
    Rbg,
    Grb,
    Gbr,
    Brg,
    Bgr,
}

impl From<LedType> for ChannelOrder {
    fn from(value: LedType) -> Self {
        match value {
            LedType::Rgb => ChannelOrder::Rgb,
            LedType::Rbg => ChannelOrder::Rbg,
            LedType::Grb => ChannelOrder::Grb,
            LedType::Gbr => ChannelOrder::Gbr,
            LedType::Brg => ChannelOrder::Brg,
            LedType::Bgr => ChannelOrder::Bgr,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            // tracing has no level above error
            LogLevel::Error | LogLevel::Critical => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> RunArgs {
        let cli = Cli::try_parse_from(args).expect("arguments should parse");
        match cli.command {
            Commands::Run(args) => args,
            other => panic!("expected run, got {other:?}"),
        }
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn run_flags_build_config() {
        let args = parse(&[
            "pixelstrip", "run", "-b", "0.5", "--pixels", "3", "-n", "packed", "-t", "grb",
            "--frames", "2",
        ]);
        let config = args.to_config().unwrap();
        config.validate().unwrap();

        assert_eq!(config.layout.pixel_count, 3);
        assert_eq!(config.layout.numbers, Numbers::Packed);
        assert_eq!(config.drivers[0].channel_order, ChannelOrder::Grb);
        assert_eq!(config.run.frames, Some(2));
        assert_eq!(config.run.seconds, None);
    }

    #[test]
    fn default_run_has_a_duration() {
        let config = parse(&["pixelstrip", "run"]).to_config().unwrap();
        assert!(config.run.seconds.is_some());
        config.validate().unwrap();
    }

    #[test]
    fn file_driver_requires_output() {
        assert!(Cli::try_parse_from(["pixelstrip", "run", "--driver", "file"]).is_err());
    }

    #[test]
    fn animations_render_every_pixel() {
        let mut layout = Layout::new(6, 1.0).unwrap();
        Animation::Rainbow.render(&mut layout, 0).unwrap();
        assert_eq!(layout.get_pixel(0).unwrap(), Color::RED);
        assert_ne!(layout.get_pixel(3).unwrap(), Color::RED);

        Animation::Cycle.render(&mut layout, 120).unwrap();
        assert!(layout.colors().iter().all(|c| *c == Color::GREEN));

        Animation::Ramp.render(&mut layout, 300).unwrap();
        assert_eq!(layout.get_pixel(5).unwrap(), Color::new(44, 44, 44));
    }
}
