use std::env;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/heads");
    println!("cargo:rerun-if-changed=.git/index");
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=GITHUB_SHA");
    println!("cargo:rerun-if-env-changed=SOURCE_DATE_EPOCH");
    println!("cargo:rerun-if-env-changed=NATBIND_BUILD_UNIX_OVERRIDE");

    let full = git(&["rev-parse", "HEAD"]).or_else(env_git_hash_full);
    if let Some(hash) = full.as_deref() {
        println!("cargo:rustc-env=NATBIND_GIT_HASH_FULL={hash}");
    }
    if let Some(hash) =
        git(&["rev-parse", "--short", "HEAD"]).or_else(|| full.as_deref().and_then(shorten_hash))
    {
        println!("cargo:rustc-env=NATBIND_GIT_HASH={hash}");
    }
    if let Some(dirty) = git_is_dirty() {
        println!(
            "cargo:rustc-env=NATBIND_GIT_DIRTY={}",
            if dirty { "true" } else { "false" }
        );
    }

    let profile = env::var("PROFILE").unwrap_or_else(|_| "unknown".into());
    println!("cargo:rustc-env=NATBIND_BUILD_PROFILE={profile}");
    if let Ok(target) = env::var("TARGET") {
        println!("cargo:rustc-env=NATBIND_BUILD_TARGET={target}");
    }
    println!(
        "cargo:rustc-env=NATBIND_BUILD_UNIX={}",
        stable_build_unix_timestamp()
    );
}

fn stable_build_unix_timestamp() -> String {
    for key in ["NATBIND_BUILD_UNIX_OVERRIDE", "SOURCE_DATE_EPOCH"] {
        if let Ok(value) = env::var(key) {
            if value.parse::<u64>().is_ok() {
                return value;
            }
        }
    }
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or_else(|_| "0".into(), |duration| duration.as_secs().to_string())
}

/// Trimmed stdout of a successful, non-empty git invocation.
fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn env_git_hash_full() -> Option<String> {
    let hash = env::var("GITHUB_SHA").ok()?;
    let trimmed = hash.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn shorten_hash(hash: &str) -> Option<String> {
    let trimmed = hash.trim();
    if trimmed.len() < 7 {
        return None;
    }
    Some(trimmed.chars().take(8).collect())
}

fn git_is_dirty() -> Option<bool> {
    let output = Command::new("git")
        .args(["status", "--porcelain"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    Some(!output.stdout.is_empty())
}
