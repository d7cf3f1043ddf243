//! Audio backend implementations
//!
//! Platform-independent abstraction over audio playback libraries. The
//! sound lifecycle treats the backend as an opaque sink: it hands over a
//! clip plus fully resolved [`PlaybackParams`] and gets back a
//! [`VoiceHandle`] it can stop or re-volume later. Completion is computed by
//! the sound itself from a clock, never reported by the backend.

pub mod headless;
#[cfg(feature = "rodio-backend")]
pub mod rodio_backend;

pub use headless::{HeadlessBackend, VoiceRecord};
#[cfg(feature = "rodio-backend")]
pub use rodio_backend::RodioBackend;

use crate::audio::clip::AudioClip;
use crate::audio::source::SpatialSettings;
use crate::audio::AudioError;
use crate::config::ConfigError;
use crate::foundation::math::Vec3;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;

/// Backend shared between the service and every sound's playback handle
pub type SharedBackend = Rc<RefCell<dyn AudioBackend>>;

/// Handle for tracking an active voice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VoiceHandle {
    /// Unique identifier for the voice
    pub id: u32,
    /// Generation counter for handle validation
    pub generation: u32,
}

impl VoiceHandle {
    /// Create a new voice handle
    pub fn new(id: u32, generation: u32) -> Self {
        Self { id, generation }
    }
}

/// Everything a backend needs to start one voice
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackParams {
    /// Final linear gain: source volume times routed group volume
    pub volume: f32,
    /// Playback speed multiplier
    pub pitch: f32,
    /// Restart from the beginning when the clip ends
    pub looping: bool,
    /// 3D settings, passed through untouched
    pub spatial: SpatialSettings,
    /// World position of the emitter
    pub position: Vec3,
    /// Path of the mixer group the voice is routed into
    pub group_path: Option<String>,
}

/// Audio backend trait for platform abstraction
///
/// Not `Send`: the sound layer runs on the host's frame thread and shares the
/// backend through `Rc<RefCell<_>>`.
pub trait AudioBackend {
    /// Initialize the audio backend
    fn initialize(&mut self, config: &AudioBackendConfig) -> Result<(), AudioError>;

    /// Shutdown the audio backend
    fn shutdown(&mut self);

    /// Check if backend is initialized
    fn is_initialized(&self) -> bool;

    /// Update the backend (cleanup finished voices, etc.)
    fn update(&mut self);

    /// Stop all playing voices
    fn stop_all(&mut self);

    /// Start a voice for `clip` from position zero
    fn play(&mut self, clip: &AudioClip, params: &PlaybackParams) -> Result<VoiceHandle, AudioError>;

    /// Stop a voice; stopping an unknown voice is not an error
    fn stop(&mut self, handle: VoiceHandle) -> Result<(), AudioError>;

    /// Set final gain of a voice
    fn set_volume(&mut self, handle: VoiceHandle, volume: f32) -> Result<(), AudioError>;

    /// Get final gain of a voice
    fn volume(&self, handle: VoiceHandle) -> Result<f32, AudioError>;

    /// Check if a voice is still producing sound
    fn is_playing(&self, handle: VoiceHandle) -> bool;
}

/// Configuration for audio backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioBackendConfig {
    /// Sample rate (e.g., 44100, 48000)
    pub sample_rate: u32,
    /// Number of output channels (1=mono, 2=stereo)
    pub channels: u16,
    /// Buffer size for audio processing
    pub buffer_size: usize,
}

impl AudioBackendConfig {
    /// Reject values no output device accepts
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(8_000..=192_000).contains(&self.sample_rate) {
            return Err(ConfigError::Invalid(format!("unsupported sample rate {}", self.sample_rate)));
        }
        if self.channels == 0 {
            return Err(ConfigError::Invalid("channel count must be at least 1".to_string()));
        }
        if self.buffer_size == 0 {
            return Err(ConfigError::Invalid("buffer size must be at least 1".to_string()));
        }
        Ok(())
    }
}

impl Default for AudioBackendConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            channels: 2,
            buffer_size: 4096,
        }
    }
}

/// Create the default audio backend for the platform
///
/// With the `rodio-backend` feature this opens the default output device;
/// otherwise it returns a [`HeadlessBackend`].
pub fn create_backend(config: &AudioBackendConfig) -> Result<SharedBackend, AudioError> {
    #[cfg(feature = "rodio-backend")]
    let mut backend = RodioBackend::new();
    #[cfg(not(feature = "rodio-backend"))]
    let mut backend = HeadlessBackend::new();

    backend.initialize(config)?;
    Ok(Rc::new(RefCell::new(backend)))
}
