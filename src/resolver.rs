//
// ──────────────────────────────────────────────────────────────────────────────
//  BUILD-METADATA RESOLVER
// ──────────────────────────────────────────────────────────────────────────────
//
// A pure evaluation: configuration + facts + a clock reading in, six labels
// out. Identical inputs always give identical output.
//
// Stability:
//   branch  pattern matches the branch name starting at position 0
//   tag     ref starts with `refs/tags/v`
//   always  stable
//   never   not stable
//
// The branch match is anchored at the start only. `release` therefore also
// matches `release-candidate-123`; patterns that need a full match must end
// with `$`.
//

use chrono::{DateTime, Utc};

use crate::{
    config::{Config, STABLE_TAG_PREFIX, StabilityStrategy},
    git::Facts,
};

pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";
pub const SHORT_SHA_LEN: usize = 7;

/// Derived labels for one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildMetadata {
    pub timestamp: String,
    pub git_sha: String,
    pub git_branch: String,
    pub is_stable: bool,
    pub docker: String,
    pub helm: String,
}

impl BuildMetadata {
    /// Label/value pairs in emission order.
    pub fn labels(&self) -> [(&'static str, &str); 6] {
        [
            ("timestamp", self.timestamp.as_str()),
            ("git-sha", self.git_sha.as_str()),
            ("git-branch", self.git_branch.as_str()),
            ("docker", self.docker.as_str()),
            ("is-stable", self.is_stable_str()),
            ("helm", self.helm.as_str()),
        ]
    }

    pub fn is_stable_str(&self) -> &'static str {
        if self.is_stable { "true" } else { "false" }
    }
}

pub fn is_stable(strategy: &StabilityStrategy, git_ref: &str, branch_name: &str) -> bool {
    match strategy {
        StabilityStrategy::Branch(pattern) => pattern
            .find(branch_name)
            .is_some_and(|m| m.start() == 0),
        StabilityStrategy::Tag => git_ref.starts_with(STABLE_TAG_PREFIX),
        StabilityStrategy::Always => true,
        StabilityStrategy::Never => false,
    }
}

pub fn short_sha(commit_id: &str) -> String {
    commit_id.chars().take(SHORT_SHA_LEN).collect()
}

pub fn format_timestamp(now: DateTime<Utc>) -> String {
    now.format(TIMESTAMP_FORMAT).to_string()
}

pub fn resolve(config: &Config, facts: &Facts, now: DateTime<Utc>) -> BuildMetadata {
    let timestamp = format_timestamp(now);
    let git_sha = short_sha(&facts.commit_id);
    let stable = is_stable(&config.strategy, &config.git_ref, &facts.branch_name);

    let docker = format!("-{timestamp}.{git_sha}");
    let helm = if stable {
        String::new()
    } else {
        format!("-{timestamp}+{git_sha}")
    };

    BuildMetadata {
        timestamp,
        git_sha,
        git_branch: facts.branch_name.clone(),
        is_stable: stable,
        docker,
        helm,
    }
}
