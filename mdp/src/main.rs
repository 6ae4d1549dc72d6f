//! The mdp command-line executable.

mod app;
mod cli;

use std::process::ExitCode;

fn main() -> anyhow::Result<ExitCode> {
    app::run()
}
