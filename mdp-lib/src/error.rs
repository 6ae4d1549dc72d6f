//! Defines custom error types for the library.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
/// Error type returned when any stage of a preview run fails.
pub enum MdpError {
    #[error("Failed to read Markdown source '{}': {source}", path.display())]
    SourceRead { path: PathBuf, source: io::Error },

    #[error("Failed to read template file '{}': {source}", path.display())]
    TemplateRead { path: PathBuf, source: io::Error },

    #[error("Template error in '{name}'")]
    Template { name: String, source: tera::Error },

    #[error("Failed to create temporary file in '{}': {source}", dir.display())]
    TempFileCreate { dir: PathBuf, source: io::Error },

    #[error("Failed to write HTML to '{}': {source}", path.display())]
    TempFileWrite { path: PathBuf, source: io::Error },

    #[error("Failed to keep generated file '{}': {source}", path.display())]
    TempFileKeep { path: PathBuf, source: io::Error },

    #[error("Failed to report generated file path: {0}")]
    Report(io::Error),

    #[error("OS not supported: {0}")]
    UnsupportedPlatform(String),

    #[error("Viewer command '{0}' was not found on PATH")]
    ViewerNotFound(String),

    #[error("Failed to launch viewer '{}': {source}", program.display())]
    ViewerLaunch { program: PathBuf, source: io::Error },

    #[error("Viewer '{program}' exited unsuccessfully ({status})")]
    ViewerFailed { program: String, status: String },
}
