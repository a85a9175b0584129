//! Build identification for the `kwu-engine` startup log line
//!
//! Emits `GIT_HASH`, `BUILD_TIMESTAMP` (UTC, RFC 3339) and `BUILD_PROFILE`.
//! Builds outside a git checkout report `unknown` for the hash.

use std::process::Command;

const UNKNOWN: &str = "unknown";

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn emit(name: &str, value: &str) {
    println!("cargo:rustc-env={}={}", name, value);
}

fn main() {
    let hash = git(&["rev-parse", "--short=8", "HEAD"]).unwrap_or_else(|| UNKNOWN.to_string());
    let dirty = git(&["status", "--porcelain", "--untracked-files=no"]).is_some();
    let hash = if dirty && hash != UNKNOWN {
        format!("{}-dirty", hash)
    } else {
        hash
    };

    emit("GIT_HASH", &hash);
    emit(
        "BUILD_TIMESTAMP",
        &chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
    );
    emit(
        "BUILD_PROFILE",
        &std::env::var("PROFILE").unwrap_or_else(|_| UNKNOWN.to_string()),
    );
}
