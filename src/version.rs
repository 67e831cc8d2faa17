//! Build-time metadata reported by `natbind version`.

/// Short git hash determined at compile time when available.
#[must_use]
pub fn commit_hash() -> &'static str {
    option_env!("NATBIND_GIT_HASH").unwrap_or("unknown")
}

#[must_use]
pub fn commit_hash_full() -> &'static str {
    option_env!("NATBIND_GIT_HASH_FULL").unwrap_or("unknown")
}

/// Whether the repository had uncommitted changes at build time.
#[must_use]
pub fn git_dirty() -> &'static str {
    option_env!("NATBIND_GIT_DIRTY").unwrap_or("unknown")
}

/// Unix timestamp recorded at build time.
#[must_use]
pub fn build_timestamp() -> &'static str {
    option_env!("NATBIND_BUILD_UNIX").unwrap_or("unknown")
}

#[must_use]
pub fn build_profile() -> &'static str {
    option_env!("NATBIND_BUILD_PROFILE").unwrap_or("unknown")
}

#[must_use]
pub fn build_target() -> &'static str {
    option_env!("NATBIND_BUILD_TARGET").unwrap_or("unknown")
}

/// Render a scripting-friendly version string.
#[must_use]
pub fn formatted() -> String {
    let version = env!("CARGO_PKG_VERSION");
    let commit = commit_hash();
    let commit_full = commit_hash_full();
    let commit_line = if commit_full != "unknown" && commit_full != commit {
        format!("{commit} ({commit_full})")
    } else {
        commit.to_string()
    };
    format!(
        "natbind {version}\ncommit: {commit_line}\ndirty: {}\nbuilt: {}\nprofile: {}\ntarget: {}",
        git_dirty(),
        build_timestamp(),
        build_profile(),
        build_target()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formatted_includes_required_fields() {
        let version = formatted();
        assert!(version.starts_with(&format!("natbind {}", env!("CARGO_PKG_VERSION"))));
        for field in ["commit:", "dirty:", "built:", "profile:", "target:"] {
            assert!(version.contains(field), "missing {field}");
        }
    }
}
