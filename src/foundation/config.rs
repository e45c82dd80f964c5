use crate::engine::client::RunOpts;
use crate::engine::preset::FilterPreset;
use crate::foundation::error::{SketchError, SketchResult};
use crate::session::log::TimestampMode;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// JSON-facing application configuration.
///
/// Every field is optional in the file; missing fields take the defaults below.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SketchConfig {
    /// Engine executable, resolved through `PATH` when not absolute.
    pub ffmpeg: PathBuf,
    /// Filter chain applied to every upload.
    pub preset: FilterPreset,
    /// Overrides the preset's timeout. `None` keeps the preset default.
    pub timeout_ms: Option<u64>,
    /// Run without any timeout, regardless of preset.
    pub disable_timeout: bool,
    /// Bound on retained log lines. `None` keeps every line of a run.
    pub log_capacity: Option<usize>,
    pub timestamps: TimestampMode,
}

impl Default for SketchConfig {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            preset: FilterPreset::default(),
            timeout_ms: None,
            disable_timeout: false,
            log_capacity: None,
            timestamps: TimestampMode::default(),
        }
    }
}

impl SketchConfig {
    pub fn from_reader<R: std::io::Read>(r: R) -> SketchResult<Self> {
        let cfg: Self = serde_json::from_reader(r)
            .map_err(|e| SketchError::serde(format!("parse config JSON: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_path(path: impl AsRef<Path>) -> SketchResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            SketchError::validation(format!("open config JSON '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    pub fn validate(&self) -> SketchResult<()> {
        if self.ffmpeg.as_os_str().is_empty() {
            return Err(SketchError::validation("ffmpeg path must not be empty"));
        }
        if self.timeout_ms == Some(0) {
            return Err(SketchError::validation(
                "timeout_ms must be non-zero (use disable_timeout to run unbounded)",
            ));
        }
        if self.log_capacity == Some(0) {
            return Err(SketchError::validation("log_capacity must be non-zero"));
        }
        Ok(())
    }

    /// Effective run timeout after applying overrides to the preset default.
    pub fn timeout(&self) -> Option<Duration> {
        if self.disable_timeout {
            return None;
        }
        self.timeout_ms
            .map(Duration::from_millis)
            .or_else(|| self.preset.default_timeout())
    }

    pub fn run_opts(&self) -> RunOpts {
        RunOpts {
            preset: self.preset,
            timeout: self.timeout(),
        }
    }
}
