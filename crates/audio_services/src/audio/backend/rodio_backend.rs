//! Rodio audio backend implementation
//!
//! Uses the Rodio library for cross-platform audio playback.
//! Rodio is pure Rust and supports WAV, OGG Vorbis, MP3, and FLAC formats.
//! Spatial settings are accepted but not rendered; voices play as 2D.
//!
//! # Example
//!
//! ```no_run
//! use audio_services::audio::backend::{AudioBackend, AudioBackendConfig};
//! use audio_services::audio::backend::rodio_backend::RodioBackend;
//!
//! let mut backend = RodioBackend::new();
//! backend.initialize(&AudioBackendConfig::default()).unwrap();
//! ```

use super::{AudioBackend, AudioBackendConfig, PlaybackParams, VoiceHandle};
use crate::audio::clip::AudioClip;
use crate::audio::AudioError;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use std::collections::HashMap;
use std::io::Cursor;

/// Rodio-based audio backend
pub struct RodioBackend {
    /// Audio output stream (must be kept alive)
    _output_stream: Option<OutputStream>,
    /// Output stream handle for creating sinks
    stream_handle: Option<OutputStreamHandle>,
    /// Active voice sinks
    active_voices: HashMap<VoiceHandle, Sink>,
    /// Next voice ID for handle generation
    next_id: u32,
    /// Initialization state
    initialized: bool,
}

impl RodioBackend {
    /// Create a new Rodio backend
    pub fn new() -> Self {
        Self {
            _output_stream: None,
            stream_handle: None,
            active_voices: HashMap::new(),
            next_id: 0,
            initialized: false,
        }
    }

    /// Generate a new voice handle
    fn next_handle(&mut self) -> VoiceHandle {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        VoiceHandle::new(id, 0)
    }

    fn sink(&self, handle: VoiceHandle) -> Result<&Sink, AudioError> {
        self.active_voices.get(&handle).ok_or(AudioError::InvalidHandle)
    }
}

impl AudioBackend for RodioBackend {
    fn initialize(&mut self, _config: &AudioBackendConfig) -> Result<(), AudioError> {
        if self.initialized {
            return Ok(());
        }

        let (stream, stream_handle) = OutputStream::try_default()
            .map_err(|e| AudioError::BackendInitFailed(format!("Failed to create audio output: {e}")))?;

        self._output_stream = Some(stream);
        self.stream_handle = Some(stream_handle);
        self.initialized = true;

        log::info!("Rodio audio backend initialized");
        Ok(())
    }

    fn shutdown(&mut self) {
        if !self.initialized {
            return;
        }

        self.stop_all();
        self.stream_handle = None;
        self._output_stream = None;
        self.initialized = false;

        log::info!("Rodio audio backend shutdown");
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn update(&mut self) {
        // Remove finished voices
        self.active_voices.retain(|_handle, sink| !sink.empty());
    }

    fn stop_all(&mut self) {
        for (_handle, sink) in self.active_voices.drain() {
            sink.stop();
        }
    }

    fn play(&mut self, clip: &AudioClip, params: &PlaybackParams) -> Result<VoiceHandle, AudioError> {
        let stream_handle = self.stream_handle.as_ref()
            .ok_or(AudioError::BackendNotInitialized)?;

        let sink = Sink::try_new(stream_handle)
            .map_err(|e| AudioError::PlaybackFailed(format!("Failed to create sink: {e}")))?;

        let source = Decoder::new(Cursor::new(clip.data().to_vec()))
            .map_err(|e| AudioError::PlaybackFailed(format!("Failed to decode '{}': {e}", clip.name())))?;

        sink.set_volume(params.volume);
        sink.set_speed(params.pitch);
        if params.looping {
            sink.append(source.repeat_infinite());
        } else {
            sink.append(source);
        }

        let handle = self.next_handle();
        self.active_voices.insert(handle, sink);
        Ok(handle)
    }

    fn stop(&mut self, handle: VoiceHandle) -> Result<(), AudioError> {
        if let Some(sink) = self.active_voices.remove(&handle) {
            sink.stop();
        }
        Ok(())
    }

    fn set_volume(&mut self, handle: VoiceHandle, volume: f32) -> Result<(), AudioError> {
        self.sink(handle)?.set_volume(volume);
        Ok(())
    }

    fn volume(&self, handle: VoiceHandle) -> Result<f32, AudioError> {
        Ok(self.sink(handle)?.volume())
    }

    fn is_playing(&self, handle: VoiceHandle) -> bool {
        self.active_voices.get(&handle)
            .is_some_and(|sink| !sink.is_paused() && !sink.empty())
    }
}

impl Default for RodioBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RodioBackend {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_initialization() {
        let mut backend = RodioBackend::new();
        assert!(!backend.is_initialized());

        // May fail in CI/test environments without audio device
        if backend.initialize(&AudioBackendConfig::default()).is_ok() {
            assert!(backend.is_initialized());
            backend.shutdown();
            assert!(!backend.is_initialized());
        }
    }

    #[test]
    fn test_handle_generation() {
        let mut backend = RodioBackend::new();
        let handle1 = backend.next_handle();
        let handle2 = backend.next_handle();

        assert_ne!(handle1.id, handle2.id);
    }

    #[test]
    fn test_invalid_handle_operations() {
        let mut backend = RodioBackend::new();
        let invalid_handle = VoiceHandle::new(999, 0);

        assert!(matches!(backend.set_volume(invalid_handle, 0.5), Err(AudioError::InvalidHandle)));
        assert!(matches!(backend.volume(invalid_handle), Err(AudioError::InvalidHandle)));
        assert!(!backend.is_playing(invalid_handle));
        assert!(backend.stop(invalid_handle).is_ok());
    }
}
