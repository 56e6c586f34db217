use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::app_dirs::AppDirs;
use crate::calibration::DEFAULT_REQUIRED_CLICKS;
use crate::heatmap::{HeatmapConfig, Kernel, DEFAULT_RADIUS, DEFAULT_SATURATION};
use crate::sample::Extent;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub required_clicks: u32,
    pub radius: f64,
    pub kernel: Kernel,
    pub saturation: f64,
    pub screen_width: u32,
    pub screen_height: u32,
    pub sample_rate_hz: f64,
    pub buffer_capacity: Option<usize>,
    pub privacy_acknowledged: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            required_clicks: DEFAULT_REQUIRED_CLICKS,
            radius: DEFAULT_RADIUS,
            kernel: Kernel::Linear,
            saturation: DEFAULT_SATURATION,
            screen_width: 1920,
            screen_height: 1080,
            sample_rate_hz: 30.0,
            buffer_capacity: None,
            privacy_acknowledged: false,
        }
    }
}

impl Config {
    pub fn screen(&self) -> Extent {
        Extent::new(self.screen_width.max(1), self.screen_height.max(1))
    }

    pub fn heatmap(&self) -> HeatmapConfig {
        HeatmapConfig {
            radius: self.radius,
            kernel: self.kernel,
            saturation: self.saturation,
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            path: AppDirs::config_path(),
        }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        if let Ok(bytes) = fs::read(&self.path) {
            match serde_json::from_slice::<Config>(&bytes) {
                Ok(cfg) => return cfg,
                Err(e) => log::warn!("ignoring unreadable config {}: {e}", self.path.display()),
            }
        }
        Config::default()
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg).unwrap_or_default();
        fs::write(&self.path, data)
    }
}

/// In-memory store for tests and throwaway sessions
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    cfg: std::cell::RefCell<Option<Config>>,
}

impl ConfigStore for MemoryConfigStore {
    fn load(&self) -> Config {
        self.cfg.borrow().clone().unwrap_or_default()
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        *self.cfg.borrow_mut() = Some(cfg.clone());
        Ok(())
    }
}
