use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::ascii;
use crate::error::{Error, Result};
use crate::render::{Geometry, RenderMode};
use crate::system::{DEFAULT_FACT_TIMEOUT, FactKey};

const CONFIG_FILE: &str = "config.json";

/// What goes in the left column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayType {
    Image,
    #[default]
    Ascii,
}

impl FromStr for DisplayType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "image" => Ok(DisplayType::Image),
            "ascii" => Ok(DisplayType::Ascii),
            other => Err(Error::Config(format!("unknown display_type '{}'", other))),
        }
    }
}

/// Raw `config.json`. Every field is optional and unrecognised keys are
/// ignored; [`Config::layout`] turns it into validated values.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub display_type: Option<String>,
    pub render_mode: Option<String>,
    pub image: Option<String>,
    pub ascii_art: Option<String>,
    pub theme: Option<String>,
    pub info_display: Option<Vec<String>>,
    pub image_height: Option<u32>,
    pub image_width: Option<u32>,
    pub cache_ttl: Option<u64>,
    pub fact_timeout_ms: Option<u64>,
    pub color_blocks: Option<bool>,
    pub info_box: Option<bool>,
}

/// Fact keys shown when the config does not list any.
pub fn default_info_display() -> Vec<String> {
    [
        FactKey::Os,
        FactKey::Hostname,
        FactKey::Kernel,
        FactKey::Uptime,
        FactKey::Packages,
        FactKey::Shell,
        FactKey::Resolution,
        FactKey::Wm,
        FactKey::Theme,
        FactKey::Terminal,
        FactKey::Font,
        FactKey::Cpu,
        FactKey::Gpu,
        FactKey::Memory,
        FactKey::Disk,
    ]
    .iter()
    .map(|key| key.as_str().to_string())
    .collect()
}

/// Resolved, read-only layout handed to the renderer and composer.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayLayout {
    pub display_type: DisplayType,
    pub render_mode: RenderMode,
    pub image: Option<String>,
    pub ascii_art: String,
    pub theme: String,
    pub info_display: Vec<String>,
    pub geometry: Geometry,
    pub color_blocks: bool,
    pub info_box: bool,
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|_| Error::NotFound {
            path: path.to_path_buf(),
        })?;
        Self::from_json(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_json(content: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// `config.json` next to the executable, then in the user config dir.
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(exe_dir) = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
        {
            paths.push(exe_dir.join(CONFIG_FILE));
        }
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("winfetch").join(CONFIG_FILE));
        }
        paths
    }

    /// Loads `explicit` if given (it must exist), else the first config found
    /// on the search path, else the built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        for path in Self::search_paths() {
            if path.is_file() {
                debug!(path = %path.display(), "loading config");
                return Self::from_file(&path);
            }
        }
        debug!("no config file found, using defaults");
        Ok(Self::default())
    }

    pub fn cache_max_age(&self) -> Duration {
        Duration::from_secs(self.cache_ttl.unwrap_or(300))
    }

    pub fn fact_timeout(&self) -> Duration {
        self.fact_timeout_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_FACT_TIMEOUT)
    }

    /// Validated layout. Individual bad values are logged and replaced by
    /// their defaults.
    pub fn layout(&self) -> DisplayLayout {
        let display_type = match self.display_type.as_deref().map(DisplayType::from_str) {
            Some(Ok(kind)) => kind,
            Some(Err(e)) => {
                warn!("{}", e);
                DisplayType::default()
            }
            None if self.image.is_some() => DisplayType::Image,
            None => DisplayType::default(),
        };

        let render_mode = match self.render_mode.as_deref().map(RenderMode::from_str) {
            Some(Ok(mode)) => mode,
            Some(Err(e)) => {
                warn!("{}", Error::Config(e));
                RenderMode::default()
            }
            None => RenderMode::default(),
        };

        let positive = |name: &str, value: Option<u32>| match value {
            Some(0) => {
                warn!("{}", Error::Config(format!("{} must be positive", name)));
                None
            }
            other => other,
        };

        DisplayLayout {
            display_type,
            render_mode,
            image: self.image.clone().filter(|name| !name.trim().is_empty()),
            ascii_art: self
                .ascii_art
                .clone()
                .unwrap_or_else(|| ascii::AUTO_TEMPLATE.to_string()),
            theme: self.theme.clone().unwrap_or_else(|| "default".to_string()),
            info_display: self.info_display.clone().unwrap_or_else(default_info_display),
            geometry: Geometry::new(
                positive("image_height", self.image_height),
                positive("image_width", self.image_width),
            ),
            color_blocks: self.color_blocks.unwrap_or(true),
            info_box: self.info_box.unwrap_or(false),
        }
    }
}
