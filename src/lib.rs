//! Build-metadata labels for CI pipelines.
//!
//! A run validates its policy inputs ([`config`]), asks version control for the
//! current commit and branch ([`git`]), derives six labels ([`resolver`]) and
//! hands them to the pipeline ([`sink`]).

pub mod config;
pub mod error;
pub mod git;
pub mod resolver;
pub mod sink;

pub use config::{Config, RawSettings, StabilityStrategy, StrategyKind};
pub use error::{Error, Result};
pub use git::{Facts, GitCli, VersionControl, collect_facts};
pub use resolver::{BuildMetadata, resolve};
pub use sink::{OutputSink, emit_all, write_summary};
