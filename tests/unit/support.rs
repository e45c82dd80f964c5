//! Scripted engine doubles for exercising the client and app without `ffmpeg`.

use crate::engine::events::EngineEvents;
use crate::engine::{Engine, EngineLoader};
use crate::foundation::error::{SketchError, SketchResult};
use std::collections::{HashMap, VecDeque};
use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Clone, Debug)]
pub(crate) enum Script {
    /// Decode the input and write its luma channel back out as PNG.
    Grayscale,
    /// Sleep, then behave like `Grayscale`.
    Slow(Duration),
    /// Fail every exec with this message.
    Fail(String),
    /// Exit successfully without writing the output file.
    NoOutput,
}

pub(crate) struct ScriptedEngine {
    files: HashMap<String, Vec<u8>>,
    /// One entry per exec; the last one repeats.
    scripts: VecDeque<Script>,
    execs: Arc<AtomicUsize>,
}

impl Engine for ScriptedEngine {
    fn describe(&self) -> String {
        "scripted engine 1.0".to_owned()
    }

    fn write_file(&mut self, name: &str, bytes: &[u8]) -> SketchResult<()> {
        crate::engine::vfs::validate_file_name(name)?;
        self.files.insert(name.to_owned(), bytes.to_vec());
        Ok(())
    }

    fn read_file(&mut self, name: &str) -> SketchResult<Vec<u8>> {
        self.files
            .get(name)
            .cloned()
            .ok_or_else(|| SketchError::execution(format!("engine did not produce '{name}'")))
    }

    fn delete_file(&mut self, name: &str) -> SketchResult<()> {
        self.files.remove(name);
        Ok(())
    }

    fn exec(&mut self, argv: &[String], events: &EngineEvents) -> SketchResult<()> {
        self.execs.fetch_add(1, Ordering::SeqCst);

        let input = argv
            .iter()
            .position(|a| a == "-i")
            .and_then(|i| argv.get(i + 1))
            .ok_or_else(|| SketchError::execution("no input given"))?;
        let output = argv
            .last()
            .ok_or_else(|| SketchError::execution("no output given"))?;
        let overwrite = argv.iter().any(|a| a == "-y");
        if self.files.contains_key(output) && !overwrite {
            return Err(SketchError::execution(format!(
                "file '{output}' already exists, not overwriting"
            )));
        }

        events.log(format!("scripted: {}", argv.join(" ")));
        let script = match self.scripts.len() {
            0 | 1 => self.scripts.front().cloned().unwrap_or(Script::Grayscale),
            _ => self.scripts.pop_front().unwrap_or(Script::Grayscale),
        };
        match &script {
            Script::Fail(msg) => return Err(SketchError::execution(msg.clone())),
            Script::NoOutput => return Ok(()),
            Script::Slow(d) => std::thread::sleep(*d),
            Script::Grayscale => {}
        }

        let src = self
            .files
            .get(input)
            .ok_or_else(|| SketchError::execution(format!("{input}: No such file")))?;
        let luma = image::load_from_memory(src)
            .map_err(|e| SketchError::execution(e.to_string()))?
            .to_luma8();
        events.progress(0.5);

        let mut png = Vec::new();
        image::DynamicImage::ImageLuma8(luma)
            .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .map_err(|e| SketchError::execution(e.to_string()))?;
        self.files.insert(output.clone(), png);
        events.progress(1.0);
        Ok(())
    }
}

pub(crate) struct ScriptedLoader {
    scripts: Vec<Script>,
    load_error: Option<String>,
    pub(crate) execs: Arc<AtomicUsize>,
}

impl ScriptedLoader {
    pub(crate) fn new(script: Script) -> Self {
        Self::sequence(vec![script])
    }

    /// Play `scripts` in order, one per exec, repeating the last.
    pub(crate) fn sequence(scripts: Vec<Script>) -> Self {
        Self {
            scripts,
            load_error: None,
            execs: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn failing(msg: &str) -> Self {
        Self {
            load_error: Some(msg.to_owned()),
            ..Self::new(Script::Grayscale)
        }
    }
}

impl EngineLoader for ScriptedLoader {
    type Engine = ScriptedEngine;

    fn load(&self) -> SketchResult<ScriptedEngine> {
        if let Some(msg) = &self.load_error {
            return Err(SketchError::engine_load(msg.clone()));
        }
        Ok(ScriptedEngine {
            files: HashMap::new(),
            scripts: self.scripts.iter().cloned().collect(),
            execs: Arc::clone(&self.execs),
        })
    }
}

pub(crate) fn solid_png(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba(rgba));
    let mut png = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .unwrap();
    png
}
