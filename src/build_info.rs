//! Build information captured at compile time by build.rs

pub struct BuildInfo;

impl BuildInfo {
    /// Package version from Cargo.toml
    pub fn version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    /// Build timestamp in YYYYMMDD.HHMMSS format
    pub fn build_timestamp() -> &'static str {
        env!("BUILD_TIMESTAMP")
    }

    /// Short git commit hash (first 7 characters)
    pub fn git_hash_short() -> &'static str {
        env!("GIT_HASH_SHORT")
    }

    /// Target platform (arch-os)
    pub fn target_platform() -> &'static str {
        env!("TARGET_PLATFORM")
    }

    /// Build profile (debug/release)
    pub fn build_profile() -> &'static str {
        env!("BUILD_PROFILE")
    }

    /// version.timestamp, used as the `--version` string
    pub fn build_string() -> &'static str {
        env!("BUILD_STRING")
    }

    pub fn display_version() -> String {
        format!("{} ({})", Self::version(), Self::build_timestamp())
    }

    pub fn detailed_info() -> String {
        format!(
            "Version: {}\nBuild: {}\nCommit: {}\nPlatform: {}\nProfile: {}",
            Self::version(),
            Self::build_timestamp(),
            Self::git_hash_short(),
            Self::target_platform(),
            Self::build_profile()
        )
    }
}
