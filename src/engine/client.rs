use crate::engine::events::{EngineEvent, EngineEvents, RunMsg, RunStage};
use crate::engine::preset::FilterPreset;
use crate::engine::{Engine, EngineLoader};
use crate::foundation::error::{SketchError, SketchResult};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Name the input image is written under in the engine's namespace.
pub const INPUT_FILE: &str = "input.png";
/// Name the engine is asked to write its result to.
pub const OUTPUT_FILE: &str = "output.png";

/// Per-run behavior of an [`EngineClient`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunOpts {
    pub preset: FilterPreset,
    /// Upper bound on a whole run. `None` waits for the engine indefinitely.
    pub timeout: Option<Duration>,
}

impl RunOpts {
    pub fn for_preset(preset: FilterPreset) -> Self {
        Self {
            preset,
            timeout: preset.default_timeout(),
        }
    }
}

impl Default for RunOpts {
    fn default() -> Self {
        Self::for_preset(FilterPreset::default())
    }
}

enum LoadStatus<E> {
    NotLoaded,
    Ready(Arc<Mutex<E>>),
    Failed(String),
}

/// Owns one engine instance and runs the fixed write → exec → read sequence against it.
///
/// The client has an explicit lifecycle: [`EngineClient::load`] must succeed once before any
/// [`EngineClient::run`]. A failed load is final.
pub struct EngineClient<L: EngineLoader> {
    loader: L,
    status: LoadStatus<L::Engine>,
    opts: RunOpts,
}

impl<L: EngineLoader> EngineClient<L> {
    pub fn new(loader: L, opts: RunOpts) -> Self {
        Self {
            loader,
            status: LoadStatus::NotLoaded,
            opts,
        }
    }

    pub fn opts(&self) -> RunOpts {
        self.opts
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.status, LoadStatus::Ready(_))
    }

    /// The error message of a failed load, if loading failed.
    pub fn load_error(&self) -> Option<&str> {
        match &self.status {
            LoadStatus::Failed(msg) => Some(msg),
            _ => None,
        }
    }

    /// Load the engine. Returns the engine's self-description.
    #[tracing::instrument(skip(self))]
    pub fn load(&mut self) -> SketchResult<String> {
        match &self.status {
            LoadStatus::NotLoaded => {}
            LoadStatus::Ready(_) => return Err(SketchError::rejected("engine is already loaded")),
            LoadStatus::Failed(msg) => {
                return Err(SketchError::rejected(format!(
                    "engine load already failed ({msg}); reloading is not supported"
                )));
            }
        }

        match self.loader.load() {
            Ok(engine) => {
                let description = engine.describe();
                tracing::info!(engine = %description, "engine loaded");
                self.status = LoadStatus::Ready(Arc::new(Mutex::new(engine)));
                Ok(description)
            }
            Err(e) => {
                tracing::warn!(error = %e, "engine load failed");
                self.status = LoadStatus::Failed(e.to_string());
                Err(e)
            }
        }
    }

    /// Start a run on a worker thread and return a handle streaming its events.
    ///
    /// The engine serializes operations: a run started while an abandoned (timed-out) run still
    /// holds the engine waits for it, within its own timeout.
    #[tracing::instrument(
        skip(self, input),
        fields(preset = %self.opts.preset, input_bytes = input.len())
    )]
    pub fn run(&self, input: Vec<u8>) -> SketchResult<RunHandle> {
        let LoadStatus::Ready(engine) = &self.status else {
            return Err(SketchError::rejected("engine is not loaded"));
        };

        let engine = Arc::clone(engine);
        let argv = self.opts.preset.argv(INPUT_FILE, OUTPUT_FILE);
        let (events, rx) = EngineEvents::channel();
        let started = Instant::now();

        std::thread::Builder::new()
            .name("sketchify-run".to_owned())
            .spawn(move || {
                let result = run_steps(&engine, &input, &argv, &events);
                events.finish(result);
            })
            .map_err(|e| SketchError::execution(format!("failed to spawn engine worker: {e}")))?;

        Ok(RunHandle {
            rx,
            timeout: self.opts.timeout,
            deadline: self.opts.timeout.map(|t| started + t),
            finished: false,
        })
    }
}

fn run_steps<E: Engine>(
    engine: &Mutex<E>,
    input: &[u8],
    argv: &[String],
    events: &EngineEvents,
) -> SketchResult<Vec<u8>> {
    let mut engine = engine
        .lock()
        .map_err(|_| SketchError::execution("engine is unusable after a previous run panicked"))?;

    events.stage(RunStage::WritingInput);
    engine.delete_file(OUTPUT_FILE)?;
    engine.write_file(INPUT_FILE, input)?;

    events.stage(RunStage::Converting);
    engine.exec(argv, events)?;

    events.stage(RunStage::ReadingOutput);
    engine.read_file(OUTPUT_FILE)
}

/// One step of an in-flight run.
#[derive(Debug)]
pub enum RunUpdate {
    Event(EngineEvent),
    /// Always the last item: the output bytes or the reason there are none.
    Finished(SketchResult<Vec<u8>>),
}

/// Receiving side of a run: iterate it to observe events in emission order, ending with
/// exactly one [`RunUpdate::Finished`].
///
/// When a timeout is configured the run races against it; if the deadline passes first the
/// handle finishes with [`SketchError::Timeout`] and stops listening. The worker is abandoned,
/// not stopped.
pub struct RunHandle {
    rx: mpsc::Receiver<RunMsg>,
    timeout: Option<Duration>,
    deadline: Option<Instant>,
    finished: bool,
}

impl RunHandle {
    /// Block until the run finishes, discarding events.
    pub fn wait(self) -> SketchResult<Vec<u8>> {
        for update in self {
            if let RunUpdate::Finished(result) = update {
                return result;
            }
        }
        Err(SketchError::execution("run ended without a result"))
    }

    fn recv(&self) -> Result<RunMsg, RecvTimeoutError> {
        match self.deadline {
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    return Err(RecvTimeoutError::Timeout);
                }
                self.rx.recv_timeout(deadline - now)
            }
            None => self.rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        }
    }
}

impl Iterator for RunHandle {
    type Item = RunUpdate;

    fn next(&mut self) -> Option<RunUpdate> {
        if self.finished {
            return None;
        }

        let update = match self.recv() {
            Ok(RunMsg::Event(event)) => return Some(RunUpdate::Event(event)),
            Ok(RunMsg::Done(result)) => RunUpdate::Finished(result),
            Err(RecvTimeoutError::Timeout) => {
                let timeout = self.timeout.unwrap_or_default();
                tracing::warn!(?timeout, "engine run timed out; abandoning worker");
                RunUpdate::Finished(Err(SketchError::Timeout(timeout)))
            }
            Err(RecvTimeoutError::Disconnected) => RunUpdate::Finished(Err(
                SketchError::execution("engine worker exited without reporting a result"),
            )),
        };
        self.finished = true;
        Some(update)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/engine/client.rs"]
mod tests;
