// Version and build information

/// Build information structure
#[derive(Debug, Clone)]
pub struct BuildInfo {
    pub version: String,
    pub build_date: String,
    pub build_hash: String,
    pub build_clean: String,
    pub target_triple: String,
    pub optimized: bool,
}

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Get current build information
pub fn build_info() -> BuildInfo {
    BuildInfo {
        version: version().to_string(),
        build_date: option_env!("BUILD_DATE").unwrap_or("unknown").to_string(),
        build_hash: option_env!("GIT_HASH").unwrap_or("unknown").to_string(),
        build_clean: option_env!("GIT_CLEAN").unwrap_or("unknown").to_string(),
        target_triple: option_env!("BUILD_TARGET").unwrap_or("unknown").to_string(),
        optimized: cfg!(not(debug_assertions)),
    }
}

impl BuildInfo {
    pub fn format_display(&self) -> String {
        format!("hostwarden v{}", self.version)
    }

    /// Version plus commit, flagged when built from a dirty tree
    pub fn format_detailed(&self) -> String {
        let mut result = self.format_display();

        if !self.build_hash.is_empty() && self.build_hash != "unknown" {
            result.push_str(&format!(" (commit {})", self.build_hash));
        }
        if self.build_clean == "false" {
            result.push_str(" [dirty]");
        }

        result
    }

    pub fn format_build_info(&self) -> String {
        format!(
            "Build: {}\nTarget: {}\nProfile: {}\nGit: {}\nClean: {}",
            self.build_date,
            self.target_triple,
            if self.optimized { "release" } else { "debug" },
            self.build_hash,
            self.build_clean
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detailed_version_marks_dirty_tree() {
        let info = BuildInfo {
            version: "1.2.3".to_string(),
            build_date: "2024-03-01T00:00:00Z".to_string(),
            build_hash: "abc1234".to_string(),
            build_clean: "false".to_string(),
            target_triple: "x86_64-unknown-linux-gnu".to_string(),
            optimized: true,
        };
        assert_eq!(info.format_detailed(), "hostwarden v1.2.3 (commit abc1234) [dirty]");
        assert!(info.format_build_info().contains("Profile: release"));
    }

    #[test]
    fn test_display_uses_package_version() {
        assert_eq!(build_info().format_display(), format!("hostwarden v{}", env!("CARGO_PKG_VERSION")));
    }
}
