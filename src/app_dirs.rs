use directories::ProjectDirs;
use std::path::PathBuf;

const APP_NAME: &str = "gazemap";

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    pub fn config_path() -> PathBuf {
        if let Some(pd) = ProjectDirs::from("", "", APP_NAME) {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("gazemap_config.json")
        }
    }

    /// $HOME/.local/state/gazemap, falling back to the platform data dir
    pub fn state_dir() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            Some(
                PathBuf::from(home)
                    .join(".local")
                    .join("state")
                    .join(APP_NAME),
            )
        } else {
            ProjectDirs::from("", "", APP_NAME).map(|pd| pd.data_local_dir().to_path_buf())
        }
    }

    pub fn log_path() -> PathBuf {
        Self::state_dir()
            .map(|d| d.join("gazemap.log"))
            .unwrap_or_else(|| PathBuf::from("gazemap.log"))
    }

    /// Default destination for exported reports
    pub fn reports_dir() -> PathBuf {
        Self::state_dir()
            .map(|d| d.join("reports"))
            .unwrap_or_else(|| PathBuf::from("gazemap-reports"))
    }
}
