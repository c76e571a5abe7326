//
// ──────────────────────────────────────────────────────────────────────────────
//  CONFIGURATION
// ──────────────────────────────────────────────────────────────────────────────
//
// Policy inputs come from two layers:
//   1. an optional YAML file (`--config`)
//   2. the process environment, which wins over the file
//
// Both layers are collected into RawSettings, then validated exactly once into
// an immutable Config. Validation runs before any git query, so a bad strategy
// or pattern never costs a subprocess.
//

use std::{fmt, fs, path::Path, str::FromStr};

use regex::Regex;
use serde::Deserialize;
use snafu::prelude::*;
use tracing::debug;

use crate::error::*;

pub const STABLE_STRATEGY: &str = "STABLE_STRATEGY";
pub const STABLE_BRANCHES_REGEX: &str = "STABLE_BRANCHES_REGEX";
pub const GITHUB_REF: &str = "GITHUB_REF";

/// Ref prefix that marks a build as stable under the `tag` strategy.
pub const STABLE_TAG_PREFIX: &str = "refs/tags/v";

/// Name of a stability policy, as written in STABLE_STRATEGY.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    Branch,
    Tag,
    Always,
    Never,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 4] = [Self::Branch, Self::Tag, Self::Always, Self::Never];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Branch => "branch",
            Self::Tag => "tag",
            Self::Always => "always",
            Self::Never => "never",
        }
    }
}

impl FromStr for StrategyKind {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .context(UnknownStrategySnafu { value })
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated stability policy. The `branch` pattern is compiled up front.
#[derive(Debug, Clone)]
pub enum StabilityStrategy {
    Branch(Regex),
    Tag,
    Always,
    Never,
}

impl StabilityStrategy {
    pub fn kind(&self) -> StrategyKind {
        match self {
            Self::Branch(_) => StrategyKind::Branch,
            Self::Tag => StrategyKind::Tag,
            Self::Always => StrategyKind::Always,
            Self::Never => StrategyKind::Never,
        }
    }

    /// Compiles `pattern` into a `branch` strategy.
    pub fn branch(pattern: &str) -> Result<Self> {
        ensure!(!pattern.is_empty(), MissingBranchesPatternSnafu);
        let regex = Regex::new(pattern).context(InvalidBranchesPatternSnafu { pattern })?;
        Ok(Self::Branch(regex))
    }
}

//
// ──────────────────────────────────────────────────────────────────────────────
//  RAW SETTINGS
// ──────────────────────────────────────────────────────────────────────────────
//
// Mirrors the YAML schema so serde_yml can deserialize straight into it. The
// same struct is filled from the environment. Empty strings count as absent.
//

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawSettings {
    pub stable_strategy: Option<String>,
    pub stable_branches_regex: Option<String>,
    pub github_ref: Option<String>,
}

impl RawSettings {
    pub fn from_file(path: &Path) -> Result<Self> {
        let yaml = fs::read_to_string(path).context(ReadConfigSnafu { path })?;
        serde_yml::from_str(&yaml).context(ParseConfigSnafu { path })
    }

    /// Reads the three inputs through `lookup`, normally `std::env::var`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            stable_strategy: lookup(STABLE_STRATEGY),
            stable_branches_regex: lookup(STABLE_BRANCHES_REGEX),
            github_ref: lookup(GITHUB_REF),
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Layers `over` on top of `self`; non-empty values in `over` win.
    pub fn overlay(self, over: RawSettings) -> Self {
        Self {
            stable_strategy: non_empty(over.stable_strategy).or(self.stable_strategy),
            stable_branches_regex: non_empty(over.stable_branches_regex)
                .or(self.stable_branches_regex),
            github_ref: non_empty(over.github_ref).or(self.github_ref),
        }
    }

    pub fn validate(self) -> Result<Config> {
        let kind: StrategyKind = non_empty(self.stable_strategy)
            .context(MissingStrategySnafu)?
            .parse()?;

        let strategy = match kind {
            StrategyKind::Branch => {
                let pattern = non_empty(self.stable_branches_regex)
                    .context(MissingBranchesPatternSnafu)?;
                StabilityStrategy::branch(&pattern)?
            }
            StrategyKind::Tag => StabilityStrategy::Tag,
            StrategyKind::Always => StabilityStrategy::Always,
            StrategyKind::Never => StabilityStrategy::Never,
        };

        let git_ref = non_empty(self.github_ref).context(MissingRefSnafu)?;

        Ok(Config { strategy, git_ref })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Validated, immutable configuration for one run.
#[derive(Debug, Clone)]
pub struct Config {
    pub strategy: StabilityStrategy,
    /// Opaque ref supplied by the pipeline, e.g. `refs/tags/v1.2.3`.
    pub git_ref: String,
}

impl Config {
    /// Loads the optional file, overlays `lookup`, and validates the result.
    pub fn load<F>(file: Option<&Path>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base = match file {
            Some(path) => {
                debug!(path = %path.display(), "loading config file");
                RawSettings::from_file(path)?
            }
            None => RawSettings::default(),
        };

        let config = base.overlay(RawSettings::from_lookup(lookup)).validate()?;
        debug!(strategy = %config.strategy.kind(), git_ref = %config.git_ref, "configuration validated");
        Ok(config)
    }
}
