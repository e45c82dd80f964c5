use crate::foundation::error::SketchError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Fixed filter chains the engine can be asked to apply.
///
/// The argument vectors are hardcoded; no filter parameters are user-configurable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterPreset {
    /// Grayscale, edge detection, then tone inversion: dark lines on white.
    #[default]
    Sketch,
    /// Plain grayscale conversion, overwriting any stale output, bounded by a 30s timeout.
    Gray,
}

impl FilterPreset {
    pub const ALL: [FilterPreset; 2] = [FilterPreset::Sketch, FilterPreset::Gray];

    pub fn name(self) -> &'static str {
        match self {
            Self::Sketch => "sketch",
            Self::Gray => "gray",
        }
    }

    /// Heading for the converted image pane.
    pub fn output_label(self) -> &'static str {
        match self {
            Self::Sketch => "Sketch Output",
            Self::Gray => "Grayscale Output",
        }
    }

    pub fn filter_chain(self) -> &'static str {
        match self {
            Self::Sketch => "format=gray,edgedetect,negate",
            Self::Gray => "format=gray",
        }
    }

    /// Engine filters this preset depends on.
    pub fn required_filters(self) -> &'static [&'static str] {
        match self {
            Self::Sketch => &["format", "edgedetect", "negate"],
            Self::Gray => &["format"],
        }
    }

    pub fn default_timeout(self) -> Option<Duration> {
        match self {
            Self::Sketch => None,
            Self::Gray => Some(Duration::from_secs(30)),
        }
    }

    pub fn argv(self, input: &str, output: &str) -> Vec<String> {
        let mut argv = vec![
            "-i".to_owned(),
            input.to_owned(),
            "-vf".to_owned(),
            self.filter_chain().to_owned(),
        ];
        if self == Self::Gray {
            argv.push("-y".to_owned());
        }
        argv.push(output.to_owned());
        argv
    }
}

impl fmt::Display for FilterPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FilterPreset {
    type Err = SketchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                SketchError::validation(format!(
                    "unknown preset '{s}' (expected one of: sketch, gray)"
                ))
            })
    }
}
