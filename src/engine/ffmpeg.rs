use crate::engine::events::EngineEvents;
use crate::engine::preset::FilterPreset;
use crate::engine::progress::ProgressTracker;
use crate::engine::vfs::ScratchFs;
use crate::engine::{Engine, EngineLoader};
use crate::foundation::error::{SketchError, SketchResult};
use std::collections::{BTreeSet, VecDeque};
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

const STDERR_TAIL_LINES: usize = 12;

/// Loads the system `ffmpeg` as the processing engine.
///
/// Loading resolves the engine binary, records its version and checks that every filter used
/// by the built-in presets is compiled in.
#[derive(Clone, Debug)]
pub struct FfmpegLoader {
    binary: PathBuf,
    scratch_parent: Option<PathBuf>,
}

impl FfmpegLoader {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            scratch_parent: None,
        }
    }

    /// Place the engine's scratch directory under `dir` instead of the system temp dir.
    pub fn with_scratch_parent(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_parent = Some(dir.into());
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }
}

impl Default for FfmpegLoader {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl EngineLoader for FfmpegLoader {
    type Engine = FfmpegEngine;

    #[tracing::instrument(skip(self), fields(binary = %self.binary.display()))]
    fn load(&self) -> SketchResult<FfmpegEngine> {
        let version = probe_version(&self.binary)?;
        let available = probe_filters(&self.binary)?;

        let required: BTreeSet<&str> = FilterPreset::ALL
            .iter()
            .flat_map(|p| p.required_filters().iter().copied())
            .collect();
        if let Some(missing) = required.iter().find(|f| !available.contains(**f)) {
            return Err(SketchError::engine_load(format!(
                "'{}' does not provide the '{missing}' filter",
                self.binary.display()
            )));
        }

        let fs = match &self.scratch_parent {
            Some(dir) => ScratchFs::create_in(dir),
            None => ScratchFs::create(),
        }
        .map_err(|e| SketchError::engine_load(format!("prepare engine file namespace: {e}")))?;

        tracing::info!(%version, filters = available.len(), "ffmpeg engine ready");
        Ok(FfmpegEngine {
            binary: self.binary.clone(),
            version,
            fs,
        })
    }
}

/// A loaded `ffmpeg` engine whose file namespace is a private scratch directory.
#[derive(Debug)]
pub struct FfmpegEngine {
    binary: PathBuf,
    version: String,
    fs: ScratchFs,
}

impl FfmpegEngine {
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn scratch_root(&self) -> &Path {
        self.fs.root()
    }
}

impl Engine for FfmpegEngine {
    fn describe(&self) -> String {
        self.version.clone()
    }

    fn write_file(&mut self, name: &str, bytes: &[u8]) -> SketchResult<()> {
        self.fs.write_file(name, bytes)
    }

    fn read_file(&mut self, name: &str) -> SketchResult<Vec<u8>> {
        self.fs.read_file(name)
    }

    fn delete_file(&mut self, name: &str) -> SketchResult<()> {
        self.fs.delete_file(name)
    }

    fn exec(&mut self, argv: &[String], events: &EngineEvents) -> SketchResult<()> {
        let mut cmd = Command::new(&self.binary);
        cmd.current_dir(self.fs.root())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .args(["-nostdin", "-nostats", "-progress", "pipe:1"])
            .args(argv);
        tracing::debug!(?argv, "exec ffmpeg");

        let mut child = cmd.spawn().map_err(|e| {
            SketchError::execution(format!(
                "failed to spawn '{}': {e}",
                self.binary.display()
            ))
        })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SketchError::execution("failed to open ffmpeg stdout (unexpected)"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| SketchError::execution("failed to open ffmpeg stderr (unexpected)"))?;

        let log_events = events.clone();
        let stderr_drain = std::thread::spawn(move || -> Vec<String> {
            let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
            let read = for_each_line(stderr, |line| {
                if line.trim().is_empty() {
                    return;
                }
                log_events.log(line.clone());
                if tail.len() == STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line);
            });
            if let Err(e) = read {
                tracing::warn!(error = %e, "stopped reading ffmpeg log output");
            }
            tail.into()
        });

        let mut tracker = ProgressTracker::new(1);
        let read = for_each_line(stdout, |line| {
            if let Some(fraction) = tracker.feed(&line) {
                events.progress(fraction);
            }
        });
        if let Err(e) = read {
            tracing::warn!(error = %e, "stopped reading ffmpeg progress output");
        }

        // Exit status alone decides the outcome; log and progress output are best-effort.
        let status = child.wait().map_err(|e| {
            SketchError::execution(format!("failed to wait for ffmpeg to finish: {e}"))
        })?;
        let tail = stderr_drain
            .join()
            .map_err(|_| SketchError::execution("ffmpeg stderr drain thread panicked"))?;

        if !status.success() {
            return Err(SketchError::execution(format!(
                "ffmpeg exited with status {status}: {}",
                tail.join("\n").trim()
            )));
        }
        Ok(())
    }
}

/// Call `f` with every line of `reader`, decoding lossily and dropping the line terminator.
fn for_each_line(reader: impl Read, mut f: impl FnMut(String)) -> std::io::Result<()> {
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(());
        }
        let line = String::from_utf8_lossy(&buf);
        f(line.trim_end_matches(['\n', '\r']).to_owned());
    }
}

/// Return `true` when `binary -version` runs successfully.
pub fn is_ffmpeg_available(binary: impl AsRef<Path>) -> bool {
    Command::new(binary.as_ref())
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

fn probe_version(binary: &Path) -> SketchResult<String> {
    let stdout = run_probe(binary, "-version")?;
    stdout
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(str::to_owned)
        .ok_or_else(|| {
            SketchError::engine_load(format!(
                "'{}' printed no version information",
                binary.display()
            ))
        })
}

fn probe_filters(binary: &Path) -> SketchResult<BTreeSet<String>> {
    let stdout = run_probe(binary, "-filters")?;
    let filters = parse_filter_list(&stdout);
    if filters.is_empty() {
        return Err(SketchError::engine_load(format!(
            "'{}' reported no filters",
            binary.display()
        )));
    }
    Ok(filters)
}

fn run_probe(binary: &Path, flag: &str) -> SketchResult<String> {
    let out = Command::new(binary)
        .args(["-hide_banner", flag])
        .stdin(Stdio::null())
        .output()
        .map_err(|e| {
            SketchError::engine_load(format!(
                "failed to run '{}' (is it installed and on PATH?): {e}",
                binary.display()
            ))
        })?;
    if !out.status.success() {
        return Err(SketchError::engine_load(format!(
            "'{} {flag}' exited with status {}: {}",
            binary.display(),
            out.status,
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }
    Ok(String::from_utf8_lossy(&out.stdout).into_owned())
}

/// Extract filter names from `ffmpeg -filters` output.
///
/// Filter rows look like ` TSC edgedetect  V->V  Detect and draw edge.`; the legend rows above
/// them never carry an `->` signature in third position.
fn parse_filter_list(listing: &str) -> BTreeSet<String> {
    listing
        .lines()
        .filter_map(|line| {
            let mut cols = line.split_whitespace();
            let flags = cols.next()?;
            let name = cols.next()?;
            let signature = cols.next()?;
            let is_flags = (2..=3).contains(&flags.len())
                && flags.chars().all(|c| matches!(c, 'T' | 'S' | 'C' | 'A' | '|' | '.'));
            (is_flags && signature.contains("->")).then(|| name.to_owned())
        })
        .collect()
}

#[cfg(test)]
#[path = "../../tests/unit/engine/ffmpeg.rs"]
mod tests;
