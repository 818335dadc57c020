use std::path::Path;

use lifetree_procgen::{LifeStats, ParamError, ThemeColors, TreeParams, TreeSeed};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Param(#[from] ParamError),
}

/// Day counts as the host reports them
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StatsConfig {
    pub days_lived: f64,
    pub days_remaining: f64,
}

/// `#rrggbb` strings; missing entries keep the default palette
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeConfig {
    pub primary: Option<String>,
    pub secondary: Option<String>,
    pub accent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Life Tree".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

/// Everything the viewer reads from its JSON file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewerConfig {
    pub params: TreeParams,
    pub stats: StatsConfig,
    pub theme: ThemeConfig,
    pub seed: Option<u64>,
    pub window: WindowConfig,
}

impl ViewerConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json(&text)?;
        log::info!("Loaded config from {}", path.as_ref().display());
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn life_stats(&self) -> LifeStats {
        LifeStats::from_days(self.stats.days_lived, self.stats.days_remaining)
    }

    pub fn theme_colors(&self) -> Result<ThemeColors, ConfigError> {
        let defaults = ThemeColors::default();
        let pick = |hex: &Option<String>, fallback| match hex {
            Some(hex) => lifetree_procgen::parse_hex_color(hex),
            None => Ok(fallback),
        };

        Ok(ThemeColors {
            primary: pick(&self.theme.primary, defaults.primary)?,
            secondary: pick(&self.theme.secondary, defaults.secondary)?,
            accent: pick(&self.theme.accent, defaults.accent)?,
        })
    }

    /// Configured seed, or a random one
    pub fn tree_seed(&self) -> TreeSeed {
        TreeSeed::new(self.seed.unwrap_or_else(rand::random))
    }
}
