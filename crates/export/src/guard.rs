use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Component, Path, PathBuf};

use tempfile::{Builder, NamedTempFile};
use tracing::info;

use crate::ExportError;

/// Confines artifact writes to one directory.
#[derive(Debug, Clone)]
pub struct OutputGuard {
    root: PathBuf,
}

impl OutputGuard {
    /// Create (if needed) and canonicalise the allowed directory.
    pub fn new<P: AsRef<Path>>(allowed_dir: P) -> Result<Self, ExportError> {
        let dir = allowed_dir.as_ref();
        fs::create_dir_all(dir)?;
        Ok(Self {
            root: dir.canonicalize()?,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Validate `path` and return the absolute location it would be written to.
    ///
    /// Relative paths are taken relative to the allowed directory. The parent
    /// directory must already exist.
    pub fn resolve<P: AsRef<Path>>(
        &self,
        path: P,
        extension: &str,
    ) -> Result<PathBuf, ExportError> {
        let path = path.as_ref();
        if path
            .components()
            .any(|component| matches!(component, Component::ParentDir))
        {
            return Err(ExportError::ParentTraversal(path.to_path_buf()));
        }
        if path.extension().and_then(|ext| ext.to_str()) != Some(extension) {
            return Err(ExportError::InvalidExtension {
                path: path.to_path_buf(),
                expected: extension.to_string(),
            });
        }

        let candidate = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };
        if fs::symlink_metadata(&candidate).is_ok_and(|meta| meta.file_type().is_symlink()) {
            return Err(ExportError::SymlinkTarget(candidate));
        }

        let outside = || ExportError::OutsideOutputDir {
            path: candidate.clone(),
            allowed: self.root.clone(),
        };
        let file_name = candidate.file_name().ok_or_else(outside)?;
        let parent = candidate.parent().ok_or_else(outside)?.canonicalize()?;
        if !parent.starts_with(&self.root) {
            return Err(outside());
        }
        Ok(parent.join(file_name))
    }

    /// Stream an artifact into a fresh temp file beside the target, then
    /// rename it over the target.
    pub fn write_atomic<P, F>(
        &self,
        path: P,
        extension: &str,
        write: F,
    ) -> Result<PathBuf, ExportError>
    where
        P: AsRef<Path>,
        F: FnOnce(&mut dyn Write) -> Result<(), ExportError>,
    {
        let target = self.resolve(path, extension)?;
        let mut temp = NamedTempFile::new_in(parent_of(&target))?;
        {
            let mut writer = BufWriter::new(temp.as_file_mut());
            write(&mut writer)?;
            writer.flush()?;
        }
        temp.persist(&target)?;
        info!(path = %target.display(), "artifact written");
        Ok(target)
    }

    /// Like [`write_atomic`](Self::write_atomic), for renderers that need a
    /// file path. The temp path keeps the target extension.
    pub fn render_atomic<P, F, E>(&self, path: P, extension: &str, render: F) -> Result<PathBuf, E>
    where
        P: AsRef<Path>,
        F: FnOnce(&Path) -> Result<(), E>,
        E: From<ExportError>,
    {
        let target = self.resolve(path, extension)?;
        let suffix = format!(".{extension}");
        let temp = Builder::new()
            .prefix(".astrochop-")
            .suffix(&suffix)
            .tempfile_in(parent_of(&target))
            .map_err(ExportError::from)?;
        render(temp.path())?;
        temp.persist(&target).map_err(ExportError::from)?;
        info!(path = %target.display(), "artifact written");
        Ok(target)
    }
}

fn parent_of(target: &Path) -> &Path {
    target.parent().unwrap_or_else(|| Path::new("."))
}
