//! Sound lifecycle
//!
//! # Architecture
//!
//! - **AudioService**: owns mixer resolution, the registry of live sounds and
//!   the builder factory; ticks every registered sound once per frame
//! - **SoundBuilder**: accumulates a [`SoundConfiguration`] and turns it into
//!   a configured sound in one asynchronous `build()` step
//! - **Sound**: one playback handle, a FIFO queue of tweens, completion
//!   detection and `play_async` waiters
//! - **SoundTween**: time-driven modifier of a sound's parameters
//! - **AudioBackend**: opaque playback sink (headless or rodio)
//!
//! # Example
//!
//! ```no_run
//! use audio_services::prelude::*;
//! use futures::executor::block_on;
//!
//! # fn run(service: AudioService) -> Result<(), AudioError> {
//! let sound = block_on(
//!     service
//!         .create_builder("beep")
//!         .with_asset_address("sfx/beep")
//!         .with_volume(0.5)
//!         .with_queued_tween(FadeVolumeTween::fade_in(0.25))
//!         .build(),
//! )?;
//! sound.play()?;
//!
//! // once per frame
//! service.update(1.0 / 60.0);
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod builder;
pub mod clip;
pub mod mixer;
pub mod registry;
pub mod service;
pub mod sound;
pub mod source;
pub mod tween;

#[cfg(test)]
mod tests;

pub use backend::{AudioBackend, AudioBackendConfig, HeadlessBackend, SharedBackend, VoiceHandle};
pub use builder::{ClipLease, SoundBuilder, SoundConfiguration};
pub use clip::{AudioClip, AudioFormat};
pub use mixer::{AudioMixer, MixerDefinition, MixerGroup};
pub use registry::SoundRegistry;
pub use service::{AudioHost, AudioService};
pub use sound::{PlayCompletion, Sound, SoundState};
pub use source::{AudioSource, RolloffMode, SpatialSettings};
pub use tween::{FadeVolumeTween, SoundTween};

use crate::assets::{AssetError, AssetReference};
use crate::config::ConfigError;
use thiserror::Error;

/// Audio system errors
#[derive(Error, Debug)]
pub enum AudioError {
    /// No audio data could be resolved for a sound being built
    #[error("No audio clip for sound '{id}' (address: {address:?}, reference: {reference:?})")]
    ClipNotFound {
        /// Id of the sound being built
        id: String,
        /// Configured address, if any
        address: Option<String>,
        /// Configured reference, if any
        reference: Option<AssetReference>,
    },

    /// The sound was unloaded while its build was still resolving assets
    #[error("Sound '{id}' was unloaded before its build finished")]
    BuildCancelled {
        /// Id of the sound being built
        id: String,
    },

    /// The sound was unloaded before playback completed
    #[error("Sound was unloaded before playback completed")]
    PlaybackAbandoned,

    /// Playback requested on a source without a clip
    #[error("Audio source has no clip")]
    NoClip,

    /// Asset resolution failed
    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),

    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Backend not initialized
    #[error("Audio backend not initialized")]
    BackendNotInitialized,

    /// Backend initialization failed
    #[error("Backend initialization failed: {0}")]
    BackendInitFailed(String),

    /// Playback failed
    #[error("Playback failed: {0}")]
    PlaybackFailed(String),

    /// Invalid voice handle
    #[error("Invalid voice handle")]
    InvalidHandle,
}
