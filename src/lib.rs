//! sketchify turns images into grayscale sketches by driving an external `ffmpeg` engine.
//!
//! The crate owns the orchestration only:
//!
//! - [`assets::ingest`] normalizes any decodable upload into a lossless PNG
//! - [`EngineClient`] loads the engine and runs a fixed filter preset against it, streaming
//!   structured events
//! - [`App`] sequences uploads and runs through a validated state machine and keeps the log
//!   that [`session::view`] draws
#![forbid(unsafe_code)]

mod foundation;

pub mod assets;
pub mod engine;
pub mod session;

#[cfg(test)]
#[path = "../tests/unit/support.rs"]
pub(crate) mod test_support;

pub use crate::foundation::config::SketchConfig;
pub use crate::foundation::error::{SketchError, SketchResult};

pub use crate::assets::ingest::{ImageAsset, ingest_bytes, ingest_path};
pub use crate::engine::client::{EngineClient, RunHandle, RunOpts, RunUpdate};
pub use crate::engine::events::{EngineEvent, RunStage};
pub use crate::engine::ffmpeg::{FfmpegEngine, FfmpegLoader, is_ffmpeg_available};
pub use crate::engine::preset::FilterPreset;
pub use crate::engine::{Engine, EngineLoader};
pub use crate::session::app::App;
pub use crate::session::log::{LogEntry, LogSink, TimestampMode};
pub use crate::session::state::ProcessingState;
pub use crate::session::view::ViewOpts;
