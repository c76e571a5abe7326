use std::{env, io, path::PathBuf};

use buildmeta::{
    Config, GitCli, OutputSink, collect_facts,
    error::{MissingOutputFileSnafu, MissingTemplateSnafu, WriteOutputSnafu},
    resolve,
    sink::{JsonSink, KeyValueSink, SetOutputSink, TemplateSink},
};
use chrono::Utc;
use clap::{Parser, ValueEnum};
use snafu::prelude::*;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

//
// ──────────────────────────────────────────────────────────────────────────────
//  CLI ARGUMENTS
// ──────────────────────────────────────────────────────────────────────────────
//
// Policy inputs (STABLE_STRATEGY, STABLE_BRANCHES_REGEX, GITHUB_REF) come from
// the environment or the optional config file. The flags only choose where git
// runs and how the labels are handed to the pipeline.
//

const LONG_VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_HASH"), ")");

#[derive(Parser, Debug)]
#[command(
    version,
    long_version = LONG_VERSION,
    about = "Compute timestamp, short SHA, branch and version suffixes for a CI build"
)]
pub struct Cli {
    /// YAML file with stable_strategy, stable_branches_regex and github_ref.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Repository to query instead of the current directory.
    #[arg(short = 'C', long)]
    repo: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputFormat::SetOutput)]
    output_format: OutputFormat,

    /// Target of the github-output format; defaults to $GITHUB_OUTPUT.
    #[arg(long)]
    output_file: Option<PathBuf>,

    /// Line template for the template format, e.g. '{{ name }}={{ value }}'.
    #[arg(long)]
    template: Option<String>,

    /// Skip the human-readable summary.
    #[arg(short, long)]
    quiet: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// `::set-output name=<label>::<value>` on stdout.
    SetOutput,
    /// `<label>=<value>` appended to a GITHUB_OUTPUT file.
    GithubOutput,
    /// One JSON object on stdout.
    Json,
    /// A user template rendered once per label.
    Template,
}

impl OutputFormat {
    /// Formats whose stdout is meant to be captured whole by the pipeline.
    pub fn owns_stdout(self) -> bool {
        matches!(self, Self::Json | Self::Template)
    }
}

//
// ──────────────────────────────────────────────────────────────────────────────
//  SINK SELECTION
// ──────────────────────────────────────────────────────────────────────────────
//
// Resolved before git runs so a missing output file or a broken template is
// reported as a configuration error.
//

fn open_sink<F>(cli: &Cli, lookup: &F) -> buildmeta::Result<Box<dyn OutputSink>>
where
    F: Fn(&str) -> Option<String>,
{
    let sink: Box<dyn OutputSink> = match cli.output_format {
        OutputFormat::SetOutput => Box::new(SetOutputSink::new(io::stdout())),
        OutputFormat::GithubOutput => {
            let path = cli
                .output_file
                .clone()
                .or_else(|| lookup("GITHUB_OUTPUT").filter(|p| !p.is_empty()).map(PathBuf::from))
                .context(MissingOutputFileSnafu)?;
            Box::new(KeyValueSink::append(&path)?)
        }
        OutputFormat::Json => Box::new(JsonSink::new(io::stdout())),
        OutputFormat::Template => {
            let source = cli.template.as_deref().context(MissingTemplateSnafu)?;
            Box::new(TemplateSink::new(io::stdout(), source)?)
        }
    };
    Ok(sink)
}

//
// ──────────────────────────────────────────────────────────────────────────────
//  MAIN EXECUTION PIPELINE
// ──────────────────────────────────────────────────────────────────────────────
//
//   1. Validate configuration (file + environment).
//   2. Open the output sink.
//   3. Read the clock, then query git for commit and branch.
//   4. Resolve the labels.
//   5. Print the summary (stderr for json/template) and emit the labels.
//
// Every error is fatal; main renders it through miette and exits with 1.
//

pub fn run<F>(cli: &Cli, lookup: F) -> buildmeta::Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let config = Config::load(cli.config.as_deref(), &lookup)?;
    let mut sink = open_sink(cli, &lookup)?;

    let now = Utc::now();

    let mut git = GitCli::new();
    if let Some(repo) = &cli.repo {
        git = git.current_dir(repo);
    }
    let facts = collect_facts(&git)?;
    debug!(commit = %facts.commit_id, branch = %facts.branch_name, "facts collected");

    let metadata = resolve(&config, &facts, now);

    // json and template output must stay machine-readable, so the summary
    // moves to stderr for them
    if !cli.quiet {
        let written = if cli.output_format.owns_stdout() {
            buildmeta::write_summary(&mut io::stderr().lock(), &metadata)
                .context(WriteOutputSnafu { target: "stderr" })
        } else {
            buildmeta::write_summary(&mut io::stdout().lock(), &metadata)
                .context(WriteOutputSnafu { target: "stdout" })
        };
        written?;
    }

    buildmeta::emit_all(sink.as_mut(), &metadata)
}

/// Parses arguments, keeping every usage error on exit status 1.
fn parse_cli() -> Cli {
    match Cli::try_parse() {
        Ok(cli) => cli,
        // --help and --version
        Err(err) if !err.use_stderr() => err.exit(),
        Err(err) => {
            let _ = err.print();
            std::process::exit(1);
        }
    }
}

fn init_tracing(quiet: bool) {
    let default = if quiet { "warn" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .compact()
        .init();
}

fn main() -> miette::Result<()> {
    let cli = parse_cli();

    init_tracing(cli.quiet);

    if let Err(err) = color_eyre::install() {
        warn!(%err, "panic reports will use the default hook");
    }

    run(&cli, |key| env::var(key).ok())?;

    Ok(())
}

#[cfg(test)]
mod common;
