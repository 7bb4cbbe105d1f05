//! Configuration system for framewm
//!
//! Loads configuration from TOML file at `~/.config/framewm/config.toml`
//! Auto-generates default config file on first run if missing.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::wm::frame::FrameStyle;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub frames: FramesConfig,
    pub behavior: BehaviorConfig,
    pub ipc: IpcConfig,
}

impl Config {
    /// Load configuration from `path`, or the default location
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::config_path()?,
        };

        if !config_path.exists() {
            info!("Config file not found at {:?}, using defaults", config_path);
            // Auto-generate default config file
            if let Err(e) = Self::save_default(&config_path) {
                warn!("Failed to create default config file: {}", e);
            }
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path).context("Failed to read config file")?;
        let config = Self::parse(&content)?;

        info!("Configuration loaded from {:?}", config_path);
        debug!("Config: {:?}", config);

        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config file")
    }

    /// Get the path to the config file
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("framewm");

        Ok(config_dir.join("config.toml"))
    }

    /// Save default configuration to file
    fn save_default(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let toml_string = toml::to_string_pretty(&Self::default())
            .context("Failed to serialize default config")?;

        fs::write(path, toml_string).context("Failed to write default config file")?;

        info!("Created default config file at {:?}", path);
        Ok(())
    }
}

/// Frame decoration configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FramesConfig {
    /// Style given to newly managed clients: "full" or "slim"
    pub default_style: FrameStyle,
    pub slim: SlimTheme,
    pub full: FullTheme,
}

/// Borderless-looking frame: a solid border drawn with the parent background
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SlimTheme {
    /// Border width in pixels
    pub border_size: u32,
    /// Border color when focused (hex: 0xRRGGBB)
    pub active_color: u32,
    /// Border color when unfocused (hex: 0xRRGGBB)
    pub inactive_color: u32,
}

impl Default for SlimTheme {
    fn default() -> Self {
        Self {
            border_size: 2,
            active_color: 0x5e81ac,   // Frost Blue
            inactive_color: 0x3b4252, // Polar Night Lighter
        }
    }
}

/// Titlebar frame with borders and buttons
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FullTheme {
    /// Border width in pixels
    pub border_size: u32,
    /// Titlebar height in pixels
    pub titlebar_height: u32,
    /// Button size in pixels
    pub button_size: u32,
    /// Button padding in pixels
    pub button_padding: u32,
    pub active_border: u32,
    pub inactive_border: u32,
    pub active_titlebar: u32,
    pub inactive_titlebar: u32,
    pub close_button: u32,
    pub maximize_button: u32,
    /// Color of every button while unfocused
    pub inactive_button: u32,
}

impl Default for FullTheme {
    fn default() -> Self {
        // Nord Theme Colors
        Self {
            border_size: 2,
            titlebar_height: 24,
            button_size: 14,
            button_padding: 5,
            active_border: 0x5e81ac,     // Frost Blue
            inactive_border: 0x4c566a,   // Polar Night Lightest
            active_titlebar: 0x3b4252,   // Polar Night Lighter
            inactive_titlebar: 0x2e3440, // Polar Night Darkest
            close_button: 0xbf616a,      // Aurora Red
            maximize_button: 0xa3be8c,   // Aurora Green
            inactive_button: 0x4c566a,
        }
    }
}

/// Window behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Modifier held to move/resize from anywhere: "Mod1", "Mod4", "Control", "Shift"
    pub mouse_modifier: String,
    /// Raise window when focused
    pub raise_on_focus: bool,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            mouse_modifier: "Mod1".to_string(),
            raise_on_focus: true,
        }
    }
}

/// Command socket configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IpcConfig {
    /// Unix socket path; defaults to `$XDG_RUNTIME_DIR/framewm.sock`
    pub socket_path: Option<PathBuf>,
}

impl IpcConfig {
    pub fn socket_path(&self) -> PathBuf {
        self.socket_path.clone().unwrap_or_else(|| {
            dirs::runtime_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("framewm.sock")
        })
    }
}
