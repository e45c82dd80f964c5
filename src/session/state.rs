use crate::foundation::error::{SketchError, SketchResult};
use std::fmt;

/// The single authoritative state of an [`crate::App`].
///
/// A failed run is not a state of its own: the app returns to `Idle` with the failure logged.
/// A failed engine load leaves the app in `LoadingEngine` for good.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ProcessingState {
    #[default]
    LoadingEngine,
    Idle,
    Processing,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    EngineLoaded,
    RunStarted,
    /// The run completed, failed or timed out.
    RunFinished,
}

impl ProcessingState {
    pub fn apply(self, transition: Transition) -> SketchResult<Self> {
        use ProcessingState::*;
        use Transition::*;

        match (self, transition) {
            (LoadingEngine, EngineLoaded) => Ok(Idle),
            (Idle, RunStarted) => Ok(Processing),
            (Processing, RunFinished) => Ok(Idle),
            (state, transition) => Err(SketchError::validation(format!(
                "invalid transition {transition:?} from state {state}"
            ))),
        }
    }

    /// Whether the file input is enabled.
    pub fn accepts_uploads(self) -> bool {
        self == Self::Idle
    }
}

impl fmt::Display for ProcessingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::LoadingEngine => "loading-engine",
            Self::Idle => "idle",
            Self::Processing => "processing",
        })
    }
}
