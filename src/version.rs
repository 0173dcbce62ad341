//! Build metadata reported by `--version`.

/// "pcpurge {version} ({commit} {date}) rustc {rustc_version}"
pub fn version() -> String {
    format!(
        "pcpurge {} ({} {}) rustc {}",
        env!("CARGO_PKG_VERSION"),
        option_env!("PCPURGE_COMMIT_SHA").unwrap_or("unknown"),
        option_env!("PCPURGE_BUILD_DATE").unwrap_or("unknown"),
        option_env!("PCPURGE_RUSTC_VERSION").unwrap_or("unknown"),
    )
}
