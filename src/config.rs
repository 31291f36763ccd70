//! Runtime configuration: where state lives, where template assets are
//! resolved from, and the export pixel ratio. The CLI fills it from flags
//! with `CARDSTUDIO_*` environment fallbacks.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::render::{RenderOptions, DEFAULT_PIXEL_RATIO, MAX_PIXEL_RATIO};
use crate::storage::FileStorage;

const DEFAULT_DATA_DIR: &str = ".cardstudio";
const DEFAULT_ASSETS_DIR: &str = "public";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("pixel ratio must be between 1 and 4, got {0}")]
    PixelRatio(u32),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudioConfig {
    pub data_dir: PathBuf,
    pub assets_dir: PathBuf,
    pub pixel_ratio: u32,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            assets_dir: PathBuf::from(DEFAULT_ASSETS_DIR),
            pixel_ratio: DEFAULT_PIXEL_RATIO,
        }
    }
}

impl StudioConfig {
    pub fn validated(self) -> Result<Self, ConfigError> {
        if !(1..=MAX_PIXEL_RATIO).contains(&self.pixel_ratio) {
            return Err(ConfigError::PixelRatio(self.pixel_ratio));
        }
        Ok(self)
    }

    pub fn storage(&self) -> FileStorage {
        FileStorage::in_dir(&self.data_dir)
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            pixel_ratio: self.pixel_ratio,
            assets_dir: self.assets_dir.clone(),
            ..RenderOptions::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = StudioConfig::default().validated().unwrap();
        assert_eq!(config.pixel_ratio, 2);
        assert!(config.storage().path().starts_with(".cardstudio"));
    }

    #[test]
    fn pixel_ratio_is_bounded() {
        for ratio in [0, 5] {
            let config = StudioConfig { pixel_ratio: ratio, ..StudioConfig::default() };
            assert_eq!(config.validated(), Err(ConfigError::PixelRatio(ratio)));
        }
    }

    #[test]
    fn render_options_follow_config() {
        let config = StudioConfig { pixel_ratio: 3, assets_dir: "assets".into(), ..StudioConfig::default() };
        let options = config.render_options();
        assert_eq!(options.pixel_ratio, 3);
        assert_eq!(options.assets_dir, PathBuf::from("assets"));
        assert!(!options.show_placeholders);
    }
}
