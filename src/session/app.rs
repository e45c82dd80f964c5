use crate::assets::ingest::{ImageAsset, ingest_bytes};
use crate::engine::EngineLoader;
use crate::engine::client::{EngineClient, RunHandle, RunUpdate};
use crate::engine::events::EngineEvent;
use crate::foundation::error::{SketchError, SketchResult};
use crate::session::log::{LogEntry, LogSink};
use crate::session::state::{ProcessingState, Transition};

/// Application session: owns the engine client and everything the view shows.
///
/// All methods take `&mut self`; runs execute on a worker thread and are observed here through
/// their event stream, so at most one run can be in flight.
pub struct App<L: EngineLoader> {
    client: EngineClient<L>,
    state: ProcessingState,
    log: LogSink,
    input: Option<ImageAsset>,
    output: Option<ImageAsset>,
    active: Option<RunHandle>,
    last_error: Option<String>,
}

impl<L: EngineLoader> App<L> {
    pub fn new(client: EngineClient<L>, log: LogSink) -> Self {
        Self {
            client,
            state: ProcessingState::default(),
            log,
            input: None,
            output: None,
            active: None,
            last_error: None,
        }
    }

    pub fn state(&self) -> ProcessingState {
        self.state
    }

    pub fn log(&self) -> &LogSink {
        &self.log
    }

    pub fn input(&self) -> Option<&ImageAsset> {
        self.input.as_ref()
    }

    pub fn output(&self) -> Option<&ImageAsset> {
        self.output.as_ref()
    }

    /// Message of the most recent load or run failure.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn client(&self) -> &EngineClient<L> {
        &self.client
    }

    /// Load the engine.
    ///
    /// A load failure is logged and leaves the app in `LoadingEngine` permanently; it is not
    /// returned as an error. Calling `start` again after any attempt is rejected.
    pub fn start(&mut self) -> SketchResult<()> {
        if self.state != ProcessingState::LoadingEngine || self.client.load_error().is_some() {
            return Err(SketchError::rejected("engine load was already attempted"));
        }

        match self.client.load() {
            Ok(description) => {
                self.state = self.state.apply(Transition::EngineLoaded)?;
                self.log
                    .append(format!("Engine loaded successfully! ({description})"));
            }
            Err(e) => {
                self.log.append(format!("Engine loading error: {e}"));
                self.last_error = Some(e.to_string());
            }
        }
        Ok(())
    }

    /// Accept an uploaded file and start converting it.
    ///
    /// Rejected while the engine is loading or a run is in flight. A file that cannot be
    /// decoded leaves everything untouched and logs nothing; the decode error is returned.
    pub fn begin_upload(&mut self, file_bytes: &[u8]) -> SketchResult<()> {
        match self.state {
            ProcessingState::Idle => {}
            ProcessingState::LoadingEngine => {
                return Err(SketchError::rejected("the engine is not loaded yet"));
            }
            ProcessingState::Processing => {
                return Err(SketchError::rejected("a conversion is already in progress"));
            }
        }

        let asset = ingest_bytes(file_bytes).inspect_err(|e| {
            tracing::warn!(error = %e, "ignoring upload that could not be decoded");
        })?;
        let png = asset.bytes.clone();
        self.input = Some(asset);

        self.state = self.state.apply(Transition::RunStarted)?;
        self.log.clear();
        self.output = None;
        self.last_error = None;

        match self.client.run(png) {
            Ok(handle) => self.active = Some(handle),
            Err(e) => self.finish_run(Err(e), &mut |_: &LogEntry| {}),
        }
        Ok(())
    }

    /// Drive the in-flight run, if any, to completion.
    pub fn wait(&mut self) {
        self.wait_with(|_| {});
    }

    /// Like [`App::wait`], calling `observer` for each log line as it is appended.
    pub fn wait_with(&mut self, mut observer: impl FnMut(&LogEntry)) {
        let Some(handle) = self.active.take() else {
            return;
        };

        for update in handle {
            match update {
                RunUpdate::Event(event) => observer(self.log.append(event_line(&event))),
                RunUpdate::Finished(result) => self.finish_run(result, &mut observer),
            }
        }
    }

    /// Upload and convert in one call.
    pub fn upload(&mut self, file_bytes: &[u8]) -> SketchResult<()> {
        self.begin_upload(file_bytes)?;
        self.wait();
        Ok(())
    }

    fn finish_run(&mut self, result: SketchResult<Vec<u8>>, observer: &mut dyn FnMut(&LogEntry)) {
        match result.and_then(ImageAsset::from_png) {
            Ok(asset) => {
                tracing::info!(
                    width = asset.width,
                    height = asset.height,
                    bytes = asset.bytes.len(),
                    "conversion completed"
                );
                self.output = Some(asset);
                observer(self.log.append("Conversion completed!"));
            }
            Err(e) => {
                tracing::warn!(error = %e, "conversion failed");
                self.last_error = Some(e.to_string());
                observer(self.log.append(format!("Error: {e}")));
            }
        }

        self.state = match self.state.apply(Transition::RunFinished) {
            Ok(next) => next,
            Err(e) => {
                tracing::error!(error = %e, "run finished outside of processing");
                ProcessingState::Idle
            }
        };
    }
}

fn event_line(event: &EngineEvent) -> String {
    match event {
        EngineEvent::Stage(stage) => stage.to_string(),
        EngineEvent::Log(line) => line.clone(),
        EngineEvent::Progress(fraction) => format!("Progress: {}%", (fraction * 100.0).round()),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/app.rs"]
mod tests;
