//! # Audio Service Configuration
//!
//! Top-level settings for an [`AudioService`](crate::audio::AudioService):
//! logging, backend parameters, asset search paths, the mixer to route
//! through and the defaults every new sound builder starts from.
//!
//! ```toml
//! log_level = "info"
//! mixer_address = "mixers/game.ron"
//!
//! [backend]
//! sample_rate = 48000
//! channels = 2
//! buffer_size = 4096
//!
//! [assets]
//! search_paths = ["resources/audio"]
//!
//! [defaults]
//! min_distance = 1.0
//! max_distance = 500.0
//! rolloff_mode = "Logarithmic"
//! ```

use super::{Config, ConfigError};
use crate::audio::backend::AudioBackendConfig;
use crate::audio::source::RolloffMode;
use serde::{Deserialize, Serialize};

/// Starting values for every sound builder created by a service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundDefaults {
    /// Volume (0.0 to 1.0)
    pub volume: f32,
    /// Pitch multiplier
    pub pitch: f32,
    /// Distance below which a 3D sound is not attenuated
    pub min_distance: f32,
    /// Distance beyond which a 3D sound stops attenuating
    pub max_distance: f32,
    /// Attenuation curve between min and max distance
    pub rolloff_mode: RolloffMode,
}

impl Default for SoundDefaults {
    fn default() -> Self {
        Self {
            volume: 1.0,
            pitch: 1.0,
            min_distance: 1.0,
            max_distance: 500.0,
            rolloff_mode: RolloffMode::Logarithmic,
        }
    }
}

impl SoundDefaults {
    /// Check the defaults are self-consistent
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_distance > self.max_distance {
            return Err(ConfigError::Invalid(format!(
                "min_distance ({}) exceeds max_distance ({})",
                self.min_distance, self.max_distance
            )));
        }
        if self.pitch <= 0.0 {
            return Err(ConfigError::Invalid("pitch must be positive".to_string()));
        }
        Ok(())
    }
}

/// # Asset Configuration
///
/// Where file-backed resolvers look for clips and mixer definitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Directories searched in order
    pub search_paths: Vec<String>,
}

impl AssetConfig {
    /// Create a new asset configuration
    pub fn new() -> Self {
        Self {
            search_paths: vec!["resources/audio".to_string(), "resources".to_string()],
        }
    }

    /// Replace the search paths
    pub fn with_search_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.search_paths = paths.into_iter().map(Into::into).collect();
        self
    }
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// # Complete Audio Service Configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioServiceConfig {
    /// Log filter used by [`logging::init`](crate::foundation::logging::init)
    pub log_level: String,
    /// Backend output parameters
    pub backend: AudioBackendConfig,
    /// Asset search configuration
    pub assets: AssetConfig,
    /// Address of the mixer to route through, if any
    pub mixer_address: Option<String>,
    /// Builder defaults
    pub defaults: SoundDefaults,
}

impl AudioServiceConfig {
    /// Create a configuration with defaults
    pub fn new() -> Self {
        Self {
            log_level: "info".to_string(),
            backend: AudioBackendConfig::default(),
            assets: AssetConfig::default(),
            mixer_address: None,
            defaults: SoundDefaults::default(),
        }
    }

    /// Set log level
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Set the mixer address
    pub fn with_mixer_address(mut self, address: impl Into<String>) -> Self {
        self.mixer_address = Some(address.into());
        self
    }

    /// Set asset search configuration
    pub fn with_assets(mut self, assets: AssetConfig) -> Self {
        self.assets = assets;
        self
    }

    /// Set builder defaults
    pub fn with_defaults(mut self, defaults: SoundDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.backend.validate()?;
        self.defaults.validate()?;
        if self.mixer_address.as_deref() == Some("") {
            return Err(ConfigError::Invalid("mixer_address is empty".to_string()));
        }
        Ok(())
    }
}

impl Default for AudioServiceConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl Config for AudioServiceConfig {}
