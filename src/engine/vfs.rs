use crate::foundation::error::{SketchError, SketchResult};
use anyhow::Context as _;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SCRATCH_ID: AtomicU64 = AtomicU64::new(0);

/// Private, flat file namespace backing an engine instance.
///
/// Lives in its own directory which is removed when the value is dropped.
#[derive(Debug)]
pub struct ScratchFs {
    root: PathBuf,
}

impl ScratchFs {
    pub fn create() -> SketchResult<Self> {
        Self::create_in(std::env::temp_dir())
    }

    pub fn create_in(parent: impl AsRef<Path>) -> SketchResult<Self> {
        let id = NEXT_SCRATCH_ID.fetch_add(1, Ordering::Relaxed);
        let root = parent
            .as_ref()
            .join(format!("sketchify-{}-{id}", std::process::id()));
        std::fs::create_dir_all(&root)
            .with_context(|| format!("create scratch directory '{}'", root.display()))?;
        tracing::debug!(root = %root.display(), "created engine scratch directory");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn write_file(&self, name: &str, bytes: &[u8]) -> SketchResult<()> {
        let path = self.resolve(name)?;
        std::fs::write(&path, bytes).with_context(|| format!("write engine file '{name}'"))?;
        Ok(())
    }

    pub fn read_file(&self, name: &str) -> SketchResult<Vec<u8>> {
        let path = self.resolve(name)?;
        match std::fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(SketchError::execution(
                format!("engine did not produce '{name}'"),
            )),
            Err(e) => Err(anyhow::Error::new(e)
                .context(format!("read engine file '{name}'"))
                .into()),
        }
    }

    pub fn delete_file(&self, name: &str) -> SketchResult<()> {
        let path = self.resolve(name)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(anyhow::Error::new(e)
                .context(format!("delete engine file '{name}'"))
                .into()),
        }
    }

    pub fn exists(&self, name: &str) -> bool {
        self.resolve(name).map(|p| p.is_file()).unwrap_or(false)
    }

    fn resolve(&self, name: &str) -> SketchResult<PathBuf> {
        validate_file_name(name)?;
        Ok(self.root.join(name))
    }
}

impl Drop for ScratchFs {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.root);
    }
}

/// Names must be plain file names: the namespace has no directories.
pub fn validate_file_name(name: &str) -> SketchResult<()> {
    if name.is_empty() || name == "." || name == ".." {
        return Err(SketchError::validation(format!(
            "invalid engine file name '{name}'"
        )));
    }
    if name.contains(['/', '\\', '\0']) {
        return Err(SketchError::validation(format!(
            "engine file name '{name}' must not contain path separators"
        )));
    }
    Ok(())
}
