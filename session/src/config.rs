//! Session configuration loaded from TOML.

use std::{
    fs,
    path::{Path, PathBuf},
};

use depths_core::Controller;
use depths_system_missions::{ItemTable, DEFAULT_MINIMUM_PATH_LENGTH, DEFAULT_OFFER_COUNT};
use depths_system_visibility::ViewRange;
use depths_world::generation::MIN_DIMENSION;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_DIMENSION: u32 = 50;

/// Errors raised while loading or validating a [`SessionConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// File that was requested.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The configuration text is not valid TOML for this schema.
    #[error("failed to parse config: {source}")]
    Parse {
        /// Underlying parser failure.
        #[source]
        source: toml::de::Error,
    },
    /// Floors would be too small to lay out.
    #[error("floor size {width}x{height} is below the {minimum}x{minimum} minimum")]
    FloorTooSmall {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
        /// Smallest supported side.
        minimum: u32,
    },
    /// The close view range exceeds the far view range.
    #[error("close view range {close} exceeds far view range {far}")]
    ViewRange {
        /// Requested close range.
        close: u32,
        /// Requested far range.
        far: u32,
    },
    /// An item's quantity bounds are reversed.
    #[error("item `{name}` has min_amount {min} above max_amount {max}")]
    ItemAmounts {
        /// Offending item.
        name: String,
        /// Requested minimum.
        min: u32,
        /// Requested maximum.
        max: u32,
    },
    /// An item's weight is negative or not a number.
    #[error("item `{name}` has an invalid weight")]
    ItemWeight {
        /// Offending item.
        name: String,
    },
}

/// Mission tuning knobs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MissionSettings {
    /// Routes with at most this many tiles never become missions.
    pub minimum_path_length: usize,
    /// Number of missions offered at once.
    pub offer_count: usize,
    /// Item table used for mission names.
    pub items: ItemTable,
}

impl Default for MissionSettings {
    fn default() -> Self {
        Self {
            minimum_path_length: DEFAULT_MINIMUM_PATH_LENGTH,
            offer_count: DEFAULT_OFFER_COUNT,
            items: ItemTable::default(),
        }
    }
}

/// Everything needed to start a reproducible session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Dungeon seed.
    pub seed: u64,
    /// Columns on every floor.
    pub width: u32,
    /// Rows on every floor.
    pub height: u32,
    /// Strategy driving the viewer.
    pub viewer: Controller,
    /// Viewer sight radii.
    pub view: ViewRange,
    /// Mission tuning.
    pub missions: MissionSettings,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            width: DEFAULT_DIMENSION,
            height: DEFAULT_DIMENSION,
            viewer: Controller::HumanControlled,
            view: ViewRange::default(),
            missions: MissionSettings::default(),
        }
    }
}

impl SessionConfig {
    /// Parses and validates a configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(contents).map_err(|source| ConfigError::Parse { source })?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates the configuration file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Checks that the configuration describes a playable dungeon.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width < MIN_DIMENSION || self.height < MIN_DIMENSION {
            return Err(ConfigError::FloorTooSmall {
                width: self.width,
                height: self.height,
                minimum: MIN_DIMENSION,
            });
        }
        if self.view.close > self.view.far {
            return Err(ConfigError::ViewRange {
                close: self.view.close,
                far: self.view.far,
            });
        }
        for item in self.missions.items.items() {
            if item.min_amount > item.max_amount {
                return Err(ConfigError::ItemAmounts {
                    name: item.name.clone(),
                    min: item.min_amount,
                    max: item.max_amount,
                });
            }
            let weights = [item.initial_weight, item.final_weight];
            if weights.iter().any(|weight| !weight.is_finite() || *weight < 0.0) {
                return Err(ConfigError::ItemWeight {
                    name: item.name.clone(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = SessionConfig::from_toml_str("").expect("defaults are valid");
        assert_eq!(config, SessionConfig::default());
        assert_eq!(config.view, ViewRange { close: 5, far: 10 });
        assert_eq!(config.missions.minimum_path_length, 8);
        assert_eq!(config.missions.offer_count, 3);
    }

    #[test]
    fn sections_override_defaults() {
        let config = SessionConfig::from_toml_str(
            r#"
            seed = 42
            width = 30
            viewer = "path-following"

            [view]
            close_range = 3
            far_range = 7

            [missions]
            offer_count = 2

            [[missions.items]]
            name = "Mail"
            initial_weight = 1.0
            final_weight = 2.0
            min_amount = 1
            max_amount = 1
            "#,
        )
        .expect("valid config");

        assert_eq!(config.seed, 42);
        assert_eq!(config.width, 30);
        assert_eq!(config.height, 50);
        assert_eq!(config.viewer, Controller::PathFollowing);
        assert_eq!(config.view, ViewRange { close: 3, far: 7 });
        assert_eq!(config.missions.offer_count, 2);
        assert_eq!(config.missions.minimum_path_length, 8);
        assert_eq!(config.missions.items.items().len(), 1);
    }

    #[test]
    fn validation_rejects_unplayable_settings() {
        assert!(matches!(
            SessionConfig::from_toml_str("width = 9"),
            Err(ConfigError::FloorTooSmall { width: 9, .. })
        ));
        assert!(matches!(
            SessionConfig::from_toml_str("[view]\nclose_range = 6\nfar_range = 4"),
            Err(ConfigError::ViewRange { close: 6, far: 4 })
        ));
        assert!(matches!(
            SessionConfig::from_toml_str("colour = \"red\""),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn missing_file_reports_its_path() {
        let error = SessionConfig::load("/definitely/not/here.toml").expect_err("missing file");
        assert!(error.to_string().contains("/definitely/not/here.toml"));
    }
}
