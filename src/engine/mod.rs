//! The external processing engine and the client that drives it.
//!
//! The engine is reached only through a narrow surface: a private file namespace
//! ([`Engine::write_file`] / [`Engine::read_file`]) and a command-line style entry point
//! ([`Engine::exec`]). Everything about how pixels are transformed stays inside the engine.

pub mod client;
pub mod events;
pub mod ffmpeg;
pub mod preset;
pub(crate) mod progress;
pub mod vfs;

use crate::foundation::error::SketchResult;
use events::EngineEvents;

/// Invocation surface of a loaded engine instance.
///
/// Implementations are driven from a worker thread, one operation at a time.
pub trait Engine: Send + 'static {
    /// Human-readable identity (name and version) reported after loading.
    fn describe(&self) -> String;
    /// Store `bytes` under `name` in the engine's file namespace, replacing any previous file.
    fn write_file(&mut self, name: &str, bytes: &[u8]) -> SketchResult<()>;
    /// Read a file back out of the engine's namespace.
    fn read_file(&mut self, name: &str) -> SketchResult<Vec<u8>>;
    /// Remove `name` if present. Removing a missing file is not an error.
    fn delete_file(&mut self, name: &str) -> SketchResult<()>;
    /// Run the engine with a command-line style argument vector.
    ///
    /// Log lines and progress fractions are reported through `events` while the call runs.
    fn exec(&mut self, argv: &[String], events: &EngineEvents) -> SketchResult<()>;
}

/// Produces a ready-to-use [`Engine`]. Called at most once per client.
pub trait EngineLoader {
    type Engine: Engine;

    fn load(&self) -> SketchResult<Self::Engine>;
}
