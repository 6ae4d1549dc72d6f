//! `mdp-lib` renders a Markdown file into a sanitized HTML page, writes it to
//! a temporary file and opens it in the platform's default viewer. It powers
//! the `mdp` CLI.
//!
//! A run is a straight line: read the source, compile the page template,
//! render and sanitize the Markdown, write the page, then optionally preview
//! it. The generated file is deleted after a preview and kept otherwise.
//!
//! # Example
//!
//! ```no_run
//! use std::io;
//! use std::path::PathBuf;
//!
//! use mdp_lib::{DefaultTemplate, RunConfig, Session};
//!
//! # fn demo() -> Result<(), mdp_lib::error::MdpError> {
//! let config = RunConfig {
//!     source: PathBuf::from("README.md"),
//!     template: None,
//!     skip_preview: true,
//! };
//!
//! let outcome = Session::new(DefaultTemplate::default()).run(&config, &mut io::stdout())?;
//! assert!(outcome.kept);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod output;
pub mod preview;
pub mod render;

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use crate::error::MdpError;
use crate::output::OutputWriter;
use crate::preview::{DocumentOpener, Previewer, SystemOpener};
use crate::render::{render_fragment, PageTemplate, RenderContext, TemplateSource};

pub use crate::render::{DefaultTemplate, DEFAULT_TEMPLATE, PAGE_TITLE};

/// What a single run should do. Built once from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub source: PathBuf,
    pub template: Option<PathBuf>,
    pub skip_preview: bool,
}

/// Where the page ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub path: PathBuf,
    /// `true` when the file was left on disk (preview skipped).
    pub kept: bool,
}

/// Everything a run needs besides its [`RunConfig`].
#[derive(Debug)]
pub struct Session<O = SystemOpener> {
    default_template: DefaultTemplate,
    output: OutputWriter,
    previewer: Previewer<O>,
}

impl Session<SystemOpener> {
    /// A session writing to the system temp directory and previewing with the
    /// host's default application.
    pub fn new(default_template: DefaultTemplate) -> Self {
        Self::with_parts(default_template, OutputWriter::new(), Previewer::default())
    }
}

impl<O: DocumentOpener> Session<O> {
    pub fn with_parts(
        default_template: DefaultTemplate,
        output: OutputWriter,
        previewer: Previewer<O>,
    ) -> Self {
        Self {
            default_template,
            output,
            previewer,
        }
    }

    pub fn previewer(&self) -> &Previewer<O> {
        &self.previewer
    }

    /// Executes one run. The generated path is written to `out` as soon as
    /// the file exists.
    pub fn run<W: Write>(&self, config: &RunConfig, out: &mut W) -> Result<RunOutcome, MdpError> {
        log::debug!("Reading Markdown source {}", config.source.display());
        let input = fs::read(&config.source).map_err(|source| MdpError::SourceRead {
            path: config.source.clone(),
            source,
        })?;

        // The template must be valid before anything touches the filesystem.
        let source = TemplateSource::select(config.template.as_deref(), &self.default_template);
        let template = PageTemplate::load(&source)?;
        log::debug!("Using template '{}'", template.name());

        let body = render_fragment(&input);

        let artifact = self.output.create()?;
        writeln!(out, "{}", artifact.path().display()).map_err(MdpError::Report)?;

        let page = template.render(&RenderContext::new(body, artifact.path()))?;
        artifact.write(page.as_bytes())?;
        log::debug!("Wrote {} bytes", page.len());

        if config.skip_preview {
            let path = artifact.keep()?;
            log::debug!("Preview skipped; keeping {}", path.display());
            return Ok(RunOutcome { path, kept: true });
        }

        let path = artifact.path().to_path_buf();
        let previewed = self.previewer.preview(&path);
        drop(artifact);
        previewed?;

        Ok(RunOutcome { path, kept: false })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use assert_fs::TempDir;
    use std::cell::RefCell;
    use std::path::Path;
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingOpener {
        seen: RefCell<Vec<(PathBuf, String)>>,
    }

    impl DocumentOpener for RecordingOpener {
        fn open(&self, path: &Path) -> Result<(), MdpError> {
            let contents = fs::read_to_string(path).unwrap_or_default();
            self.seen.borrow_mut().push((path.to_path_buf(), contents));
            Ok(())
        }
    }

    fn session(dir: &Path) -> Session<RecordingOpener> {
        Session::with_parts(
            DefaultTemplate::default(),
            OutputWriter::in_dir(dir),
            Previewer::new(RecordingOpener::default()).with_grace_period(Duration::ZERO),
        )
    }

    #[test]
    fn preview_sees_the_page_before_it_is_removed() {
        let workdir = TempDir::new().unwrap();
        let source = workdir.child("doc.md");
        source.write_str("# Hello\n").unwrap();
        let out_dir = TempDir::new().unwrap();

        let session = session(out_dir.path());
        let config = RunConfig {
            source: source.path().to_path_buf(),
            template: None,
            skip_preview: false,
        };

        let mut stdout = Vec::new();
        let outcome = session.run(&config, &mut stdout).unwrap();

        let seen = session.previewer().opener().seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, outcome.path);
        assert!(seen[0].1.contains("<h1>Hello</h1>"));
        assert!(!outcome.kept);
        assert!(!outcome.path.exists());
        assert_eq!(
            String::from_utf8(stdout).unwrap(),
            format!("{}\n", outcome.path.display())
        );
    }

    #[test]
    fn unreadable_source_fails_before_output() {
        let out_dir = TempDir::new().unwrap();
        let config = RunConfig {
            source: out_dir.path().join("missing.md"),
            template: None,
            skip_preview: true,
        };

        let mut stdout = Vec::new();
        let err = session(out_dir.path()).run(&config, &mut stdout).unwrap_err();

        assert!(matches!(err, MdpError::SourceRead { .. }));
        assert!(stdout.is_empty());
        assert_eq!(fs::read_dir(out_dir.path()).unwrap().count(), 0);
    }
}
