//! Opens generated pages with the host's default application.
//!
//! Each supported platform maps to exactly one opener command. The command is
//! resolved on `PATH` before it is run so a missing viewer is reported as such
//! rather than as a generic spawn failure.

use std::env;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

use crate::error::MdpError;

/// How long to wait after the viewer command returns before the caller may
/// delete the file it was given.
pub const VIEWER_GRACE_PERIOD: Duration = Duration::from_secs(2);

/// Operating system families with a known "open with default application" command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    MacOs,
    Windows,
}

/// A program plus the arguments that precede the file path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenerCommand {
    pub program: &'static str,
    pub leading_args: &'static [&'static str],
}

impl Platform {
    /// The platform this binary runs on.
    pub fn detect() -> Result<Self, MdpError> {
        Self::from_os(env::consts::OS)
    }

    /// Maps a `std::env::consts::OS` value to a platform.
    pub fn from_os(os: &str) -> Result<Self, MdpError> {
        match os {
            "linux" | "freebsd" | "openbsd" | "netbsd" | "dragonfly" => Ok(Self::Linux),
            "macos" => Ok(Self::MacOs),
            "windows" => Ok(Self::Windows),
            other => Err(MdpError::UnsupportedPlatform(other.to_string())),
        }
    }

    pub const fn opener(self) -> OpenerCommand {
        match self {
            Self::Linux => OpenerCommand {
                program: "xdg-open",
                leading_args: &[],
            },
            Self::MacOs => OpenerCommand {
                program: "open",
                leading_args: &[],
            },
            // `start` treats its first quoted argument as a window title.
            Self::Windows => OpenerCommand {
                program: "cmd.exe",
                leading_args: &["/C", "start", ""],
            },
        }
    }
}

/// Opens a file with whatever application the user has associated with it.
pub trait DocumentOpener {
    fn open(&self, path: &Path) -> Result<(), MdpError>;
}

/// Uses the host platform's opener command.
#[derive(Debug, Default, Clone)]
pub struct SystemOpener {
    search_path: Option<OsString>,
}

impl SystemOpener {
    /// Resolves the opener in `search_path` instead of the process `PATH`.
    pub fn with_search_path(search_path: impl Into<OsString>) -> Self {
        Self {
            search_path: Some(search_path.into()),
        }
    }

    fn resolve(&self, program: &str) -> Option<PathBuf> {
        match &self.search_path {
            Some(search_path) => find_in_path(program, search_path),
            None => find_executable(program),
        }
    }
}

impl DocumentOpener for SystemOpener {
    fn open(&self, path: &Path) -> Result<(), MdpError> {
        let command = Platform::detect()?.opener();
        let program = self
            .resolve(command.program)
            .ok_or_else(|| MdpError::ViewerNotFound(command.program.to_string()))?;

        log::debug!("Opening {} with {}", path.display(), program.display());

        // The viewer usually hands off to a long-lived application that
        // inherits these handles; piping them would block until it exits.
        let status = Command::new(&program)
            .args(command.leading_args)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|source| MdpError::ViewerLaunch {
                program: program.clone(),
                source,
            })?;

        if !status.success() {
            log::warn!("{} exited with {}", command.program, status);
            return Err(MdpError::ViewerFailed {
                program: command.program.to_string(),
                status: status.to_string(),
            });
        }

        Ok(())
    }
}

/// Runs an opener and then waits out the grace period.
#[derive(Debug, Clone)]
pub struct Previewer<O> {
    opener: O,
    grace_period: Duration,
}

impl<O: DocumentOpener> Previewer<O> {
    pub fn new(opener: O) -> Self {
        Self {
            opener,
            grace_period: VIEWER_GRACE_PERIOD,
        }
    }

    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    pub fn opener(&self) -> &O {
        &self.opener
    }

    pub fn grace_period(&self) -> Duration {
        self.grace_period
    }

    /// Opens `path` and blocks for the grace period once a viewer was run,
    /// whether or not it succeeded. Errors are returned, never retried.
    pub fn preview(&self, path: &Path) -> Result<(), MdpError> {
        let result = self.opener.open(path);

        // Nothing was launched, so there is nothing to wait for.
        if let Err(MdpError::UnsupportedPlatform(_) | MdpError::ViewerNotFound(_)) = result {
            return result;
        }

        thread::sleep(self.grace_period);
        result
    }
}

impl Default for Previewer<SystemOpener> {
    fn default() -> Self {
        Self::new(SystemOpener::default())
    }
}

/// Looks `program` up on the current `PATH`.
pub fn find_executable(program: &str) -> Option<PathBuf> {
    let search_path = env::var_os("PATH")?;
    find_in_path(program, &search_path)
}

/// Looks `program` up in a `PATH`-style list of directories. Programs given
/// with a directory component are checked as-is.
pub fn find_in_path(program: &str, search_path: &OsStr) -> Option<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
        return is_executable(candidate).then(|| candidate.to_path_buf());
    }

    env::split_paths(search_path)
        .map(|dir| dir.join(program))
        .find(|path| is_executable(path))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .is_ok_and(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use assert_fs::TempDir;
    use rstest::rstest;
    use std::cell::RefCell;

    #[rstest]
    #[case("linux", Platform::Linux)]
    #[case("freebsd", Platform::Linux)]
    #[case("macos", Platform::MacOs)]
    #[case("windows", Platform::Windows)]
    fn known_systems_map_to_a_platform(#[case] os: &str, #[case] expected: Platform) {
        assert_eq!(Platform::from_os(os).unwrap(), expected);
    }

    #[test]
    fn unknown_system_is_not_supported() {
        let err = Platform::from_os("plan9").unwrap_err();
        assert!(matches!(err, MdpError::UnsupportedPlatform(ref os) if os == "plan9"));
        assert_eq!(err.to_string(), "OS not supported: plan9");
    }

    #[test]
    fn opener_table() {
        assert_eq!(Platform::Linux.opener().program, "xdg-open");
        assert!(Platform::Linux.opener().leading_args.is_empty());
        assert_eq!(Platform::MacOs.opener().program, "open");
        assert_eq!(
            Platform::Windows.opener(),
            OpenerCommand {
                program: "cmd.exe",
                leading_args: &["/C", "start", ""],
            }
        );
    }

    #[cfg(unix)]
    #[test]
    fn finds_executables_on_the_search_path() {
        use std::os::unix::fs::PermissionsExt;

        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();

        let plain = first.child("viewer");
        plain.write_str("not executable").unwrap();

        let runnable = second.child("viewer");
        runnable.write_str("#!/bin/sh\n").unwrap();
        std::fs::set_permissions(runnable.path(), std::fs::Permissions::from_mode(0o755))
            .unwrap();

        let search_path = env::join_paths([first.path(), second.path()]).unwrap();
        assert_eq!(
            find_in_path("viewer", &search_path),
            Some(runnable.path().to_path_buf())
        );
        assert_eq!(find_in_path("absent-viewer", &search_path), None);
    }

    /// Installs an executable shell script named after this platform's opener.
    #[cfg(unix)]
    fn install_viewer(bin: &TempDir, script: &str) {
        use std::os::unix::fs::PermissionsExt;

        let program = Platform::detect().unwrap().opener().program;
        let viewer = bin.child(program);
        viewer.write_str(&format!("#!/bin/sh\n{script}")).unwrap();
        std::fs::set_permissions(viewer.path(), std::fs::Permissions::from_mode(0o755))
            .unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn system_opener_returns_when_the_viewer_command_exits() {
        let bin = TempDir::new().unwrap();
        let argv = bin.child("argv");
        install_viewer(
            &bin,
            &format!(
                "printf '%s\\n' \"$@\" > '{}'\nsleep 10 &\nexit 0\n",
                argv.path().display()
            ),
        );

        let opener = SystemOpener::with_search_path(bin.path().as_os_str());
        let started = std::time::Instant::now();
        opener.open(Path::new("/tmp/mdp-page.html")).unwrap();

        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(
            std::fs::read_to_string(argv.path()).unwrap(),
            "/tmp/mdp-page.html\n"
        );
    }

    #[cfg(unix)]
    #[test]
    fn system_opener_reports_a_failing_viewer() {
        let bin = TempDir::new().unwrap();
        install_viewer(&bin, "exit 3\n");

        let err = SystemOpener::with_search_path(bin.path().as_os_str())
            .open(Path::new("/tmp/mdp-page.html"))
            .unwrap_err();

        assert!(
            matches!(err, MdpError::ViewerFailed { ref status, .. } if status.contains('3')),
            "{err}"
        );
    }

    #[test]
    fn system_opener_without_a_viewer_on_the_search_path() {
        let empty = TempDir::new().unwrap();
        let err = SystemOpener::with_search_path(empty.path().as_os_str())
            .open(Path::new("page.html"))
            .unwrap_err();
        assert!(matches!(
            err,
            MdpError::ViewerNotFound(_) | MdpError::UnsupportedPlatform(_)
        ));
    }

    struct StubOpener {
        calls: RefCell<Vec<PathBuf>>,
        outcome: fn() -> Result<(), MdpError>,
    }

    impl DocumentOpener for StubOpener {
        fn open(&self, path: &Path) -> Result<(), MdpError> {
            self.calls.borrow_mut().push(path.to_path_buf());
            (self.outcome)()
        }
    }

    fn stub(outcome: fn() -> Result<(), MdpError>) -> StubOpener {
        StubOpener {
            calls: RefCell::new(Vec::new()),
            outcome,
        }
    }

    #[test]
    fn preview_passes_the_path_once() {
        let previewer = Previewer::new(stub(|| Ok(()))).with_grace_period(Duration::ZERO);
        previewer.preview(Path::new("/tmp/mdp1.html")).unwrap();
        assert_eq!(
            *previewer.opener().calls.borrow(),
            vec![PathBuf::from("/tmp/mdp1.html")]
        );
    }

    #[test]
    fn preview_waits_after_the_viewer_returns() {
        let grace = Duration::from_millis(50);
        let previewer = Previewer::new(stub(|| Ok(()))).with_grace_period(grace);
        let started = std::time::Instant::now();
        previewer.preview(Path::new("page.html")).unwrap();
        assert!(started.elapsed() >= grace);
    }

    #[test]
    fn preview_surfaces_viewer_failures_after_waiting() {
        let grace = Duration::from_millis(50);
        let previewer = Previewer::new(stub(|| {
            Err(MdpError::ViewerFailed {
                program: "xdg-open".to_string(),
                status: "exit status: 4".to_string(),
            })
        }))
        .with_grace_period(grace);

        let started = std::time::Instant::now();
        let err = previewer.preview(Path::new("page.html")).unwrap_err();
        assert!(started.elapsed() >= grace);
        assert!(matches!(err, MdpError::ViewerFailed { .. }));
    }

    #[test]
    fn missing_viewer_skips_the_wait() {
        let previewer = Previewer::new(stub(|| Err(MdpError::ViewerNotFound("open".into()))))
            .with_grace_period(Duration::from_secs(60));
        let started = std::time::Instant::now();
        let err = previewer.preview(Path::new("page.html")).unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(60));
        assert!(matches!(err, MdpError::ViewerNotFound(_)));
    }

    #[test]
    fn default_previewer_uses_the_standard_grace_period() {
        assert_eq!(Previewer::default().grace_period(), VIEWER_GRACE_PERIOD);
    }
}
