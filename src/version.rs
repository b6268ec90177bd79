//! Build metadata injected by build.rs.

pub const PROJECT_NAME: &str = env!("XGB_BRIDGE_PROJECT_NAME");
pub const VERSION: &str = env!("XGB_BRIDGE_VERSION");
pub const BUILD_TIME: &str = env!("XGB_BRIDGE_BUILD_TIME");
pub const BUILD_MODE: &str = env!("XGB_BRIDGE_BUILD_MODE");
pub const TARGET_TRIPLE: &str = env!("XGB_BRIDGE_TARGET_TRIPLE");
pub const GIT_COMMIT: &str = env!("XGB_BRIDGE_GIT_COMMIT");

/// One-line version string, e.g. `xgb-bridge 0.1.0 (abc1234, release)`.
pub fn version_string() -> String {
    format!(
        "{} {} ({}, {})",
        PROJECT_NAME, VERSION, GIT_COMMIT, BUILD_MODE
    )
}

/// Version string plus build time and target, logged at startup.
pub fn build_info() -> String {
    format!(
        "{}, built {} for {}",
        version_string(),
        BUILD_TIME,
        TARGET_TRIPLE
    )
}
