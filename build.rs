/*
 * Build script to stamp the binary with the commit it was built from.
 * * GIT_HASH feeds the long `--version` output.
 */

use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let output = Command::new("git")
        .args(["rev-parse", "--short=7", "HEAD"])
        .output();

    let git_hash = match output {
        Ok(out) if out.status.success() => String::from_utf8_lossy(&out.stdout).trim().to_string(),
        _ => "unknown".to_string(),
    };

    println!("cargo:rustc-env=GIT_HASH={git_hash}");

    // Only re-run if the git HEAD changes (new commits)
    println!("cargo:rerun-if-changed=.git/HEAD");
}
