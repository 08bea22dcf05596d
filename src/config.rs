use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "VitalBrief";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Number of days in the metric window shown on the summary screen.
pub const WINDOW_DAYS: usize = 5;

/// Environment variable holding the narrative service endpoint.
pub const ENV_ENDPOINT: &str = "VITALBRIEF_ENDPOINT";
/// Environment variable holding the narrative service API key.
pub const ENV_API_KEY: &str = "VITALBRIEF_API_KEY";
/// Environment variable overriding the request timeout (seconds).
pub const ENV_TIMEOUT_SECS: &str = "VITALBRIEF_TIMEOUT_SECS";
/// Environment variable overriding where share images are written.
pub const ENV_SHARE_DIR: &str = "VITALBRIEF_SHARE_DIR";

/// Default tracing filter when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "info,vitalbrief=debug,vitalbrief_lib=debug"
}

/// Get the application data directory
/// ~/VitalBrief/ on all platforms. `None` when no home directory can be resolved.
pub fn app_data_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(APP_NAME))
}

/// Directory where share images are written.
///
/// `VITALBRIEF_SHARE_DIR` wins; otherwise ~/VitalBrief/share.
pub fn share_dir() -> Option<PathBuf> {
    share_dir_with(std::env::var(ENV_SHARE_DIR).ok())
}

/// `share_dir` with the override passed in; a blank override is ignored.
pub fn share_dir_with(override_dir: Option<String>) -> Option<PathBuf> {
    match override_dir {
        Some(dir) if !dir.trim().is_empty() => Some(PathBuf::from(dir)),
        _ => app_data_dir().map(|dir| dir.join("share")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_data_dir_under_home() {
        let Some(home) = dirs::home_dir() else {
            return;
        };
        let dir = app_data_dir().unwrap();
        assert!(dir.starts_with(home));
        assert!(dir.ends_with("VitalBrief"));
    }

    #[test]
    fn app_name_is_vitalbrief() {
        assert_eq!(APP_NAME, "VitalBrief");
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.1.0");
    }

    #[test]
    fn default_filter_enables_crate_debug() {
        assert!(default_log_filter().contains("vitalbrief_lib=debug"));
    }

    #[test]
    fn share_dir_override_wins() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().to_string_lossy().into_owned();
        assert_eq!(share_dir_with(Some(raw)), Some(dir.path().to_path_buf()));
    }

    #[test]
    fn blank_share_dir_override_falls_back() {
        let fallback = app_data_dir().map(|dir| dir.join("share"));
        assert_eq!(share_dir_with(Some("   ".into())), fallback);
        assert_eq!(share_dir_with(None), fallback);
    }
}
