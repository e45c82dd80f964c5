//! Parser for ffmpeg's machine-readable `-progress` output.
//!
//! ffmpeg writes blocks of `key=value` lines, each block terminated by `progress=continue` or
//! `progress=end`.

/// Turns `-progress` lines into completion fractions, suppressing repeats.
#[derive(Debug)]
pub(crate) struct ProgressTracker {
    expected_frames: u64,
    last: Option<f64>,
}

impl ProgressTracker {
    pub(crate) fn new(expected_frames: u64) -> Self {
        Self {
            expected_frames: expected_frames.max(1),
            last: None,
        }
    }

    /// Feed one line; returns a fraction when it differs from the last one reported.
    pub(crate) fn feed(&mut self, line: &str) -> Option<f64> {
        let (key, value) = line.trim().split_once('=')?;
        let fraction = match key.trim() {
            "frame" => {
                let frames: u64 = value.trim().parse().ok()?;
                (frames as f64 / self.expected_frames as f64).min(1.0)
            }
            "progress" if value.trim() == "end" => 1.0,
            _ => return None,
        };

        if self.last == Some(fraction) {
            return None;
        }
        self.last = Some(fraction);
        Some(fraction)
    }
}
