//! Allocates the temporary HTML file a run renders into.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tempfile::{Builder as TempFileBuilder, TempPath};

use crate::error::MdpError;

/// File name prefix of every generated page.
pub const TEMP_PREFIX: &str = "mdp";
/// File name suffix of every generated page.
pub const TEMP_SUFFIX: &str = ".html";

/// Creates uniquely named `mdp*.html` files in a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputWriter {
    dir: PathBuf,
}

impl OutputWriter {
    /// Targets the system temporary directory.
    pub fn new() -> Self {
        Self::in_dir(env::temp_dir())
    }

    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Creates an empty file and closes it. The file is removed when the
    /// returned artifact is dropped, unless it is kept.
    pub fn create(&self) -> Result<HtmlArtifact, MdpError> {
        let mut builder = TempFileBuilder::new();
        builder.prefix(TEMP_PREFIX).suffix(TEMP_SUFFIX);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            builder.permissions(fs::Permissions::from_mode(0o644));
        }

        let file = builder
            .tempfile_in(&self.dir)
            .map_err(|source| MdpError::TempFileCreate {
                dir: self.dir.clone(),
                source,
            })?;

        log::debug!("Created {}", file.path().display());

        Ok(HtmlArtifact {
            path: file.into_temp_path(),
        })
    }
}

impl Default for OutputWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// A generated page on disk.
#[derive(Debug)]
pub struct HtmlArtifact {
    path: TempPath,
}

impl HtmlArtifact {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replaces the file contents with `html`.
    pub fn write(&self, html: &[u8]) -> Result<(), MdpError> {
        fs::write(&self.path, html).map_err(|source| MdpError::TempFileWrite {
            path: self.path.to_path_buf(),
            source,
        })
    }

    /// Leaves the file on disk after the artifact goes away.
    pub fn keep(self) -> Result<PathBuf, MdpError> {
        self.path.keep().map_err(|err| MdpError::TempFileKeep {
            path: err.path.to_path_buf(),
            source: err.error,
        })
    }
}
