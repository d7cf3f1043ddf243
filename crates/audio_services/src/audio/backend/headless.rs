//! Headless audio backend
//!
//! Accepts every voice without producing sound and remembers what it was
//! asked to do. Used on machines without an output device (CI, servers)
//! and by tests to observe what the sound layer sent to the sink.

use super::{AudioBackend, AudioBackendConfig, PlaybackParams, VoiceHandle};
use crate::audio::clip::AudioClip;
use crate::audio::AudioError;
use std::collections::HashMap;

/// Record of one voice started on a [`HeadlessBackend`]
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceRecord {
    /// Handle returned to the caller
    pub handle: VoiceHandle,
    /// Name of the clip that was played
    pub clip_name: String,
    /// Parameters at start
    pub params: PlaybackParams,
    /// Current gain
    pub volume: f32,
    /// False once stopped
    pub active: bool,
}

/// Backend that plays nothing and records everything
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    voices: HashMap<VoiceHandle, VoiceRecord>,
    history: Vec<VoiceHandle>,
    started: usize,
    next_id: u32,
    initialized: bool,
}

impl HeadlessBackend {
    /// Create an uninitialized backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend that is already initialized
    pub fn initialized() -> Self {
        Self {
            initialized: true,
            ..Self::default()
        }
    }

    fn next_handle(&mut self) -> VoiceHandle {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        VoiceHandle::new(id, 0)
    }

    /// Voices not yet reaped by [`update`](AudioBackend::update), in start order
    pub fn history(&self) -> Vec<&VoiceRecord> {
        self.history.iter().filter_map(|handle| self.voices.get(handle)).collect()
    }

    /// Record for a single voice
    pub fn voice(&self, handle: VoiceHandle) -> Option<&VoiceRecord> {
        self.voices.get(&handle)
    }

    /// Number of voices that have not been stopped
    pub fn active_count(&self) -> usize {
        self.voices.values().filter(|voice| voice.active).count()
    }

    /// Number of voices started in total, reaped ones included
    pub fn started_count(&self) -> usize {
        self.started
    }
}

impl AudioBackend for HeadlessBackend {
    fn initialize(&mut self, _config: &AudioBackendConfig) -> Result<(), AudioError> {
        if !self.initialized {
            self.initialized = true;
            log::info!("Headless audio backend initialized");
        }
        Ok(())
    }

    fn shutdown(&mut self) {
        if !self.initialized {
            return;
        }
        self.stop_all();
        self.initialized = false;
        log::info!("Headless audio backend shutdown");
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn update(&mut self) {
        let before = self.voices.len();
        self.voices.retain(|_, voice| voice.active);
        if self.voices.len() != before {
            let voices = &self.voices;
            self.history.retain(|handle| voices.contains_key(handle));
            log::trace!("Reaped {} stopped voices", before - self.voices.len());
        }
    }

    fn stop_all(&mut self) {
        for voice in self.voices.values_mut() {
            voice.active = false;
        }
    }

    fn play(&mut self, clip: &AudioClip, params: &PlaybackParams) -> Result<VoiceHandle, AudioError> {
        if !self.initialized {
            return Err(AudioError::BackendNotInitialized);
        }

        let handle = self.next_handle();
        self.voices.insert(handle, VoiceRecord {
            handle,
            clip_name: clip.name().to_string(),
            params: params.clone(),
            volume: params.volume,
            active: true,
        });
        self.history.push(handle);
        self.started += 1;
        Ok(handle)
    }

    fn stop(&mut self, handle: VoiceHandle) -> Result<(), AudioError> {
        if let Some(voice) = self.voices.get_mut(&handle) {
            voice.active = false;
        }
        Ok(())
    }

    fn set_volume(&mut self, handle: VoiceHandle, volume: f32) -> Result<(), AudioError> {
        let voice = self.voices.get_mut(&handle)
            .filter(|voice| voice.active)
            .ok_or(AudioError::InvalidHandle)?;
        voice.volume = volume;
        Ok(())
    }

    fn volume(&self, handle: VoiceHandle) -> Result<f32, AudioError> {
        self.voices.get(&handle)
            .filter(|voice| voice.active)
            .map(|voice| voice.volume)
            .ok_or(AudioError::InvalidHandle)
    }

    fn is_playing(&self, handle: VoiceHandle) -> bool {
        self.voices.get(&handle).is_some_and(|voice| voice.active)
    }
}
