//! Build metadata, populated by `build.rs`.
//!
//! Version strings are reported per runtime environment:
//! - Local/Test: `main:{commit}`
//! - Staging: `staging:{commit}@{branch}`
//! - Prod: `stable:{version}`

/// Environment the service is running in, as resolved from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeEnv {
    Local,
    Test,
    Staging,
    Prod,
}

/// Build date in RFC3339 format.
pub fn build_date() -> &'static str {
    env!("BUILD_DATE")
}

/// Short git commit hash, or `unknown` outside a checkout.
pub fn build_commit() -> &'static str {
    env!("BUILD_COMMIT")
}

pub fn build_branch() -> &'static str {
    env!("BUILD_BRANCH")
}

pub fn build_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Format the version string reported for `env`.
pub fn format_version_for_runtime_env(env: RuntimeEnv) -> String {
    match env {
        RuntimeEnv::Local | RuntimeEnv::Test => format!("main:{}", build_commit()),
        RuntimeEnv::Staging => format!("staging:{}@{}", build_commit(), build_branch()),
        RuntimeEnv::Prod => format!("stable:{}", build_version()),
    }
}
