use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Which clock the log panel shows next to each line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampMode {
    /// The time the panel is drawn, for every line.
    #[default]
    Rendered,
    /// The time each line was appended.
    Recorded,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogEntry {
    pub recorded_at: DateTime<Local>,
    pub message: String,
}

/// Append-only, display-ordered log of one run.
///
/// Unbounded unless built with [`LogSink::bounded`], in which case the oldest lines are evicted.
#[derive(Clone, Debug, Default)]
pub struct LogSink {
    entries: VecDeque<LogEntry>,
    capacity: Option<usize>,
    evicted: u64,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bounded(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity.max(1)),
            ..Self::default()
        }
    }

    pub fn with_capacity(capacity: Option<usize>) -> Self {
        capacity.map_or_else(Self::new, Self::bounded)
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.evicted = 0;
    }

    pub fn append(&mut self, message: impl Into<String>) -> &LogEntry {
        if let Some(cap) = self.capacity
            && self.entries.len() == cap
        {
            self.entries.pop_front();
            self.evicted += 1;
        }
        self.entries.push_back(LogEntry {
            recorded_at: Local::now(),
            message: message.into(),
        });
        &self.entries[self.entries.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Lines dropped by the ring buffer since the last clear.
    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    pub fn entries(&self) -> impl ExactSizeIterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn messages(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.message.as_str()).collect()
    }

    /// Format every line as `[HH:MM:SS] message`.
    pub fn render_lines(&self, mode: TimestampMode, now: DateTime<Local>) -> Vec<String> {
        self.entries
            .iter()
            .map(|e| {
                let ts = match mode {
                    TimestampMode::Rendered => now,
                    TimestampMode::Recorded => e.recorded_at,
                };
                format_line(ts, &e.message)
            })
            .collect()
    }
}

pub fn format_line(ts: DateTime<Local>, message: &str) -> String {
    format!("[{}] {message}", ts.format("%H:%M:%S"))
}

#[cfg(test)]
#[path = "../../tests/unit/session/log.rs"]
mod tests;
