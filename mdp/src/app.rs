use crate::cli::{normalize_args, Cli};
use clap::{CommandFactory, Parser};
use mdp_lib::{DefaultTemplate, Session};
use std::env;
use std::io;
use std::process::ExitCode;

/// Overrides the built-in page template when no `-t` file is given.
const DEFAULT_TEMPLATE_VAR: &str = "DEFAULT_TEMPLATE";

pub fn run() -> anyhow::Result<ExitCode> {
    env_logger::init();

    let cli = Cli::parse_from(normalize_args(env::args_os()));

    let Some(config) = cli.into_run_config() else {
        eprint!("{}", Cli::command().render_help());
        return Ok(ExitCode::FAILURE);
    };

    let default_template = DefaultTemplate::from_override(env::var(DEFAULT_TEMPLATE_VAR).ok());
    let session = Session::new(default_template);

    let outcome = session.run(&config, &mut io::stdout().lock())?;
    log::debug!(
        "Finished with {} ({})",
        outcome.path.display(),
        if outcome.kept { "kept" } else { "removed" }
    );

    Ok(ExitCode::SUCCESS)
}
