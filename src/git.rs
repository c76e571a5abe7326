//
// ──────────────────────────────────────────────────────────────────────────────
//  VERSION CONTROL
// ──────────────────────────────────────────────────────────────────────────────
//
// The resolver never talks to git directly. It receives Facts, gathered
// through the narrow VersionControl trait so tests can substitute fixed values.
//
// GitCli is the real collaborator. Like any external command here it runs
// without a shell, with optional working directory and environment overrides,
// and returns trimmed stdout. A non-zero status is fatal and carries the
// captured streams.
//

use std::{collections::HashMap, path::PathBuf, process::Command};

use snafu::prelude::*;
use tracing::{debug, info};

use crate::error::*;

/// Source-control queries needed for one run.
pub trait VersionControl {
    /// Full identifier of the checked-out commit.
    fn commit_id(&self) -> Result<String>;

    /// Current branch label, `HEAD` when detached.
    fn branch_name(&self) -> Result<String>;
}

/// Facts obtained from version control, not computed by the resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Facts {
    pub commit_id: String,
    pub branch_name: String,
}

/// Runs both queries in order; the first failure ends the run.
pub fn collect_facts(vcs: &dyn VersionControl) -> Result<Facts> {
    info!("Getting Git SHA...");
    let commit_id = vcs.commit_id()?;

    info!("Getting Git branch...");
    let branch_name = vcs.branch_name()?;

    Ok(Facts {
        commit_id,
        branch_name,
    })
}

#[derive(Debug, Clone)]
pub struct GitCli {
    program: PathBuf,
    cwd: Option<PathBuf>,
    env: HashMap<String, String>,
}

impl Default for GitCli {
    fn default() -> Self {
        Self {
            program: PathBuf::from("git"),
            cwd: None,
            env: HashMap::new(),
        }
    }
}

impl GitCli {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses another executable instead of `git` from PATH.
    pub fn program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    fn run(&self, args: &[&str]) -> Result<String> {
        let command_line = format!("{} {}", self.program.display(), args.join(" "));

        let mut command = Command::new(&self.program);
        command.args(args);

        if let Some(dir) = &self.cwd {
            command.current_dir(dir);
        }

        for (k, v) in &self.env {
            command.env(k, v);
        }

        debug!(command = %command_line, cwd = ?self.cwd, "running");

        let output = command.output().context(GitSpawnSnafu {
            command: command_line.as_str(),
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();

        if !output.status.success() {
            return GitFailedSnafu {
                command: command_line,
                status: output.status,
                stdout,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
            .fail();
        }

        Ok(stdout)
    }
}

impl VersionControl for GitCli {
    fn commit_id(&self) -> Result<String> {
        self.run(&["rev-parse", "HEAD"])
    }

    fn branch_name(&self) -> Result<String> {
        self.run(&["rev-parse", "--abbrev-ref", "HEAD"])
    }
}
