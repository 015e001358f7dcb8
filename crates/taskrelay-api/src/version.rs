//! `GET /version`. No build.rs in this workspace, so
//! build metadata comes from whatever is set at compile time and falls
//! back to a fixed placeholder, using the env!()-based
//! const structs rather than pulling in a build.rs dependency.

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct VersionInfo {
    pub version: String,
    pub build_date: String,
    pub build_number: String,
    pub runtime_version: String,
}

impl VersionInfo {
    pub fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            build_date: option_env!("TASKRELAY_BUILD_DATE").unwrap_or("unknown").to_string(),
            build_number: option_env!("TASKRELAY_BUILD_NUMBER").unwrap_or("0").to_string(),
            runtime_version: option_env!("TASKRELAY_RUSTC_VERSION").unwrap_or("unknown").to_string(),
        }
    }
}
