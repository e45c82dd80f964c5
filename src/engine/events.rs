use crate::foundation::error::SketchResult;
use std::fmt;
use std::sync::mpsc;

/// Orchestration step reached within one run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunStage {
    WritingInput,
    Converting,
    ReadingOutput,
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::WritingInput => "Writing input file...",
            Self::Converting => "Starting conversion...",
            Self::ReadingOutput => "Reading output file...",
        })
    }
}

/// Structured notification emitted while a run is in flight.
#[derive(Clone, Debug, PartialEq)]
pub enum EngineEvent {
    Stage(RunStage),
    /// Free-text line reported by the engine.
    Log(String),
    /// Completion fraction in `[0, 1]`.
    Progress(f64),
}

pub(crate) enum RunMsg {
    Event(EngineEvent),
    Done(SketchResult<Vec<u8>>),
}

/// Sending half of a run's event stream.
///
/// Sends are fire-and-forget: once the receiving side has stopped listening (for example
/// after a timeout) notifications are dropped silently.
#[derive(Clone)]
pub struct EngineEvents {
    tx: mpsc::Sender<RunMsg>,
}

impl EngineEvents {
    pub(crate) fn channel() -> (Self, mpsc::Receiver<RunMsg>) {
        let (tx, rx) = mpsc::channel();
        (Self { tx }, rx)
    }

    /// An event sink nobody listens to.
    pub fn detached() -> Self {
        Self::channel().0
    }

    pub fn log(&self, line: impl Into<String>) {
        let _ = self.tx.send(RunMsg::Event(EngineEvent::Log(line.into())));
    }

    pub fn progress(&self, fraction: f64) {
        if !fraction.is_finite() {
            return;
        }
        let fraction = fraction.clamp(0.0, 1.0);
        let _ = self.tx.send(RunMsg::Event(EngineEvent::Progress(fraction)));
    }

    pub(crate) fn stage(&self, stage: RunStage) {
        let _ = self.tx.send(RunMsg::Event(EngineEvent::Stage(stage)));
    }

    pub(crate) fn finish(self, result: SketchResult<Vec<u8>>) {
        let _ = self.tx.send(RunMsg::Done(result));
    }
}
