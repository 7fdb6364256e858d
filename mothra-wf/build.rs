//! Stamps the revision and build time reported by `/health`.
//!
//! `MOTHRA_BUILD_REV` overrides the git lookup for builds outside a checkout.

use std::process::Command;

fn revision() -> String {
    if let Ok(rev) = std::env::var("MOTHRA_BUILD_REV") {
        return rev;
    }
    Command::new("git")
        .args(["rev-parse", "--short=8", "HEAD"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

fn main() {
    println!("cargo:rerun-if-env-changed=MOTHRA_BUILD_REV");
    println!("cargo:rerun-if-changed=../.git/HEAD");

    let built = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
    println!("cargo:rustc-env=GIT_HASH={}", revision());
    println!("cargo:rustc-env=BUILD_TIMESTAMP={}", built);
}
