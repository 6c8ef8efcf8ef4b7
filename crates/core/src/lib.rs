//! Core library for driving addressable LED strips.
//!
//! A [`Layout`] owns one [`ColorBuffer`] and pushes brightness-scaled frames
//! to any number of attached [`Driver`]s. Buffers come in two numeric
//! backends that behave identically, color math lives in [`ops`], and the
//! [`FrameScheduler`] and [`Runner`] add optional frame pacing on top of the
//! plain fill-then-push contract.

pub mod buffer;
pub mod color;
pub mod config;
pub mod driver;
pub mod error;
pub mod layout;
pub mod ops;
pub mod runner;
pub mod timeline;

pub use buffer::{ColorBuffer, Numbers, PackedStore, PixelStore, TupleStore};
pub use color::{ChannelOrder, Color};
pub use config::{AppConfig, DriverKind, DriverSpec, LayoutConfig, RunConfig};
pub use driver::{Driver, FrameLog, MemoryDriver, NullDriver, WriterDriver};
pub use error::{DriverError, DriverFailure, PixelError, PushFailures, Result};
pub use layout::Layout;
pub use ops::Gamma;
pub use runner::{RunSummary, Runner};
pub use timeline::{FrameScheduler, PlaybackClock, MAX_FRAME_INTERVAL};
