/*
 * Structured Error Definitions.
 *
 * Every failure in a run is fatal: configuration problems are caught before
 * git is touched, collaborator failures carry whatever git printed, and output
 * failures report the target that could not be written.
 */

#![allow(unused_assignments)]

use std::{io, path::PathBuf, process::ExitStatus};

use miette::Diagnostic;
use snafu::prelude::*;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu, Diagnostic)]
#[snafu(visibility(pub))]
pub enum Error {
    // ── configuration ────────────────────────────────────────────────────────
    #[snafu(display(
        "STABLE_STRATEGY was not provided, need to be one of [branch, tag, always, never]"
    ))]
    #[diagnostic(
        code(buildmeta::config::missing_strategy),
        help("Export STABLE_STRATEGY or set `stable_strategy` in the config file.")
    )]
    MissingStrategy,

    #[snafu(display(
        "Invalid STABLE_STRATEGY provided ({value}), need to be one of [branch, tag, always, never]"
    ))]
    #[diagnostic(code(buildmeta::config::unknown_strategy))]
    UnknownStrategy { value: String },

    #[snafu(display("STABLE_BRANCHES_REGEX was not provided"))]
    #[diagnostic(
        code(buildmeta::config::missing_branches_regex),
        help("The `branch` strategy needs a pattern such as `^(main|release/.*)$`.")
    )]
    MissingBranchesPattern,

    #[snafu(display("STABLE_BRANCHES_REGEX is not a valid pattern: {pattern}"))]
    #[diagnostic(code(buildmeta::config::invalid_branches_regex))]
    InvalidBranchesPattern { pattern: String, source: regex::Error },

    #[snafu(display("GITHUB_REF was not provided"))]
    #[diagnostic(code(buildmeta::config::missing_ref))]
    MissingRef,

    #[snafu(display("Failed to read config at {}", path.display()))]
    #[diagnostic(code(buildmeta::config::read))]
    ReadConfig { path: PathBuf, source: io::Error },

    #[snafu(display("Failed to parse config at {}", path.display()))]
    #[diagnostic(
        code(buildmeta::config::parse),
        help("Ensure the configuration file is a YAML mapping of strings.")
    )]
    ParseConfig {
        path: PathBuf,
        source: serde_yml::Error,
    },

    #[snafu(display("No output file for the github-output format"))]
    #[diagnostic(
        code(buildmeta::config::missing_output_file),
        help("Pass --output-file or run inside a workflow that sets GITHUB_OUTPUT.")
    )]
    MissingOutputFile,

    #[snafu(display("No template given for the template output format"))]
    #[diagnostic(
        code(buildmeta::config::missing_template),
        help("Pass --template, e.g. --template '{{{{ name }}}}={{{{ value }}}}'.")
    )]
    MissingTemplate,

    #[snafu(display("Output template does not compile"))]
    #[diagnostic(code(buildmeta::config::invalid_template))]
    InvalidTemplate { source: minijinja::Error },

    // ── version control ──────────────────────────────────────────────────────
    #[snafu(display("Failed to run `{command}`"))]
    #[diagnostic(
        code(buildmeta::git::spawn),
        help("Is git installed and on PATH?")
    )]
    GitSpawn { command: String, source: io::Error },

    #[snafu(display(
        "non-zero exit code from `{command}` ({status})\nstdout: {stdout}\nstderr: {stderr}"
    ))]
    #[diagnostic(code(buildmeta::git::failed))]
    GitFailed {
        command: String,
        status: ExitStatus,
        stdout: String,
        stderr: String,
    },

    // ── output ───────────────────────────────────────────────────────────────
    #[snafu(display("Failed to write outputs to {target}"))]
    #[diagnostic(code(buildmeta::output::write))]
    WriteOutput { target: String, source: io::Error },

    #[snafu(display("Failed to render output `{name}`"))]
    #[diagnostic(code(buildmeta::output::render))]
    RenderTemplate {
        name: String,
        source: minijinja::Error,
    },

    #[snafu(display("Failed to serialize outputs as JSON"))]
    #[diagnostic(code(buildmeta::output::json))]
    SerializeOutputs { source: serde_json::Error },
}
