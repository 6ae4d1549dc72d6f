//! Defines the command-line interface for the application.

use clap::builder::{OsStringValueParser, TypedValueParser};
use clap::Parser;
use mdp_lib::RunConfig;
use std::ffi::OsString;
use std::path::PathBuf;

/// Flags that may be spelled with a single dash (`-file`), as well as `--file`.
const SINGLE_DASH_LONGS: [&str; 5] = ["file", "skip-preview", "template", "help", "version"];

#[derive(Parser, Debug)]
#[command(
    name = "mdp",
    version,
    about = "Preview a Markdown file as sanitized HTML in the default viewer."
)]
pub struct Cli {
    /// Markdown file to preview.
    #[arg(
        long = "file",
        value_name = "FILE_PATH",
        value_parser = OsStringValueParser::new().map(PathBuf::from)
    )]
    pub file: Option<PathBuf>,

    /// Skip auto preview and keep the generated HTML file.
    #[arg(short = 's', long = "skip-preview")]
    pub skip_preview: bool,

    /// Alternate template file.
    #[arg(short = 't', long = "template", value_name = "TEMPLATE_PATH")]
    pub template: Option<PathBuf>,
}

impl Cli {
    /// `None` when no source file, or an empty one, was given.
    pub fn into_run_config(self) -> Option<RunConfig> {
        Some(RunConfig {
            source: self.file.filter(|file| !file.as_os_str().is_empty())?,
            template: self.template,
            skip_preview: self.skip_preview,
        })
    }
}

/// What happens to one argument before clap sees it.
#[derive(Debug, PartialEq, Eq)]
enum Rewrite {
    Keep,
    Replace(String),
    Drop,
}

/// Rewrites the flag spellings clap does not accept on its own:
///
/// * `-file`, `-template` and the other long flags with a single dash;
/// * `--s` and `--t`, the short flags with two dashes;
/// * `-s=true` / `-s=false` and the other boolean spellings of `-s`.
///
/// Everything after a bare `--` is left alone.
pub fn normalize_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    let mut passthrough = false;

    args.into_iter()
        .enumerate()
        .filter_map(|(index, arg)| {
            if index == 0 || passthrough {
                return Some(arg);
            }
            if arg.as_os_str() == "--" {
                passthrough = true;
                return Some(arg);
            }

            match arg.to_str().map_or(Rewrite::Keep, rewrite) {
                Rewrite::Keep => Some(arg),
                Rewrite::Replace(text) => Some(OsString::from(text)),
                Rewrite::Drop => None,
            }
        })
        .collect()
}

fn rewrite(arg: &str) -> Rewrite {
    let Some(flag) = arg.strip_prefix("--").or_else(|| arg.strip_prefix('-')) else {
        return Rewrite::Keep;
    };
    if flag.is_empty() || flag.starts_with('-') {
        return Rewrite::Keep;
    }

    let (name, value) = match flag.split_once('=') {
        Some((name, value)) => (name, Some(value)),
        None => (flag, None),
    };

    match (name, value) {
        ("s" | "skip-preview", None) => Rewrite::Replace("-s".to_string()),
        // An unparsable value is left for clap to reject.
        ("s" | "skip-preview", Some(value)) => match parse_bool(value) {
            Some(true) => Rewrite::Replace("-s".to_string()),
            Some(false) => Rewrite::Drop,
            None => Rewrite::Keep,
        },
        ("t", None) => Rewrite::Replace("-t".to_string()),
        ("t", Some(value)) => Rewrite::Replace(format!("-t={value}")),
        _ if SINGLE_DASH_LONGS.contains(&name) => Rewrite::Replace(format!("--{flag}")),
        _ => Rewrite::Keep,
    }
}

/// Boolean literals accepted in `-s=<value>`.
fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}
