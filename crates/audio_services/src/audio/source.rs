//! Playback handle owned by a sound
//!
//! An [`AudioSource`] holds the runtime parameters of one sound (clip,
//! routing, gain, pitch, loop flag, 3D settings) and the backend voice that is
//! currently rendering it. Parameter changes made while a voice is active are
//! forwarded to the backend immediately; everything else takes effect on the
//! next [`play`](AudioSource::play).

use crate::audio::backend::{AudioBackend, PlaybackParams, SharedBackend, VoiceHandle};
use crate::audio::clip::AudioClip;
use crate::audio::mixer::MixerGroup;
use crate::audio::AudioError;
use crate::foundation::math::Vec3;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;

/// Distance attenuation curve for 3D sounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RolloffMode {
    /// Real-world inverse distance falloff
    #[default]
    Logarithmic,
    /// Straight line between min and max distance
    Linear,
    /// Host-defined curve
    Custom,
}

/// 3D settings, forwarded to the backend untouched
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialSettings {
    /// 0.0 is fully 2D, 1.0 fully 3D
    pub spatial_blend: f32,
    /// Doppler scale
    pub doppler_level: f32,
    /// Attenuation curve
    pub rolloff_mode: RolloffMode,
    /// Distance below which the sound is not attenuated
    pub min_distance: f32,
    /// Distance beyond which attenuation stops
    pub max_distance: f32,
}

impl Default for SpatialSettings {
    fn default() -> Self {
        Self {
            spatial_blend: 0.0,
            doppler_level: 0.0,
            rolloff_mode: RolloffMode::Logarithmic,
            min_distance: 1.0,
            max_distance: 500.0,
        }
    }
}

/// Runtime parameters plus the active voice of one sound
pub struct AudioSource {
    backend: SharedBackend,
    clip: Option<Rc<AudioClip>>,
    output_group: Option<Rc<MixerGroup>>,
    volume: f32,
    pitch: f32,
    looping: bool,
    play_on_awake: bool,
    spatial: SpatialSettings,
    position: Vec3,
    voice: Option<VoiceHandle>,
}

impl AudioSource {
    /// Create an idle source with neutral parameters
    pub fn new(backend: SharedBackend) -> Self {
        Self {
            backend,
            clip: None,
            output_group: None,
            volume: 1.0,
            pitch: 1.0,
            looping: false,
            play_on_awake: true,
            spatial: SpatialSettings::default(),
            position: Vec3::zeros(),
            voice: None,
        }
    }

    /// Clip that [`play`](Self::play) starts
    pub fn clip(&self) -> Option<&Rc<AudioClip>> {
        self.clip.as_ref()
    }

    /// Assign the clip; takes effect on the next play
    pub fn set_clip(&mut self, clip: Option<Rc<AudioClip>>) {
        self.clip = clip;
    }

    /// Mixer group the output is routed into
    pub fn output_group(&self) -> Option<&Rc<MixerGroup>> {
        self.output_group.as_ref()
    }

    /// Route output into `group`
    pub fn set_output_group(&mut self, group: Option<Rc<MixerGroup>>) {
        self.output_group = group;
        self.push_volume();
    }

    /// Source gain (0.0 to 1.0), before group attenuation
    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Set source gain, clamped to 0.0..=1.0
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        self.push_volume();
    }

    /// Gain after applying the routed group's effective volume
    pub fn effective_volume(&self) -> f32 {
        let group = self.output_group.as_ref().map_or(1.0, |group| group.effective_volume());
        self.volume * group
    }

    /// Pitch multiplier
    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Set pitch multiplier
    pub fn set_pitch(&mut self, pitch: f32) {
        self.pitch = pitch;
    }

    /// Whether playback restarts when the clip ends
    pub fn is_looping(&self) -> bool {
        self.looping
    }

    /// Set loop flag
    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    /// Whether the source would start by itself when spawned
    pub fn play_on_awake(&self) -> bool {
        self.play_on_awake
    }

    /// Set the play-on-awake flag
    pub fn set_play_on_awake(&mut self, play_on_awake: bool) {
        self.play_on_awake = play_on_awake;
    }

    /// 3D settings
    pub fn spatial(&self) -> &SpatialSettings {
        &self.spatial
    }

    /// Replace the 3D settings
    pub fn set_spatial(&mut self, spatial: SpatialSettings) {
        self.spatial = spatial;
    }

    /// World position of the emitter
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Move the emitter
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    /// Active voice, if any
    pub fn voice(&self) -> Option<VoiceHandle> {
        self.voice
    }

    /// Whether the backend still renders the active voice
    pub fn is_voice_active(&self) -> bool {
        self.voice.is_some_and(|voice| self.backend.borrow().is_playing(voice))
    }

    /// Parameters a voice started right now would use
    pub fn playback_params(&self) -> PlaybackParams {
        PlaybackParams {
            volume: self.effective_volume(),
            pitch: self.pitch,
            looping: self.looping,
            spatial: self.spatial.clone(),
            position: self.position,
            group_path: self.output_group.as_ref().map(|group| group.path().to_string()),
        }
    }

    /// Restart the clip from position zero
    ///
    /// Any voice still running for this source is stopped first.
    pub fn play(&mut self) -> Result<(), AudioError> {
        let clip = self.clip.clone().ok_or(AudioError::NoClip)?;
        self.stop();

        let voice = self.backend.borrow_mut().play(&clip, &self.playback_params())?;
        self.voice = Some(voice);
        Ok(())
    }

    /// Start an overlapping, untracked voice at `volume * volume_scale`
    pub fn play_one_shot(&self, volume_scale: f32) -> Result<VoiceHandle, AudioError> {
        let clip = self.clip.as_ref().ok_or(AudioError::NoClip)?;
        let mut params = self.playback_params();
        params.volume *= volume_scale.max(0.0);
        params.looping = false;

        self.backend.borrow_mut().play(clip, &params)
    }

    /// Halt the active voice; no-op when idle
    pub fn stop(&mut self) {
        if let Some(voice) = self.voice.take() {
            if let Err(e) = self.backend.borrow_mut().stop(voice) {
                log::warn!("Failed to stop voice {}: {e}", voice.id);
            }
        }
    }

    /// Re-send the effective gain to the active voice
    ///
    /// Picks up volume changes made on the routed mixer group.
    pub fn sync_volume(&mut self) {
        self.push_volume();
    }

    fn push_volume(&mut self) {
        let Some(voice) = self.voice else {
            return;
        };
        let volume = self.effective_volume();
        if self.backend.borrow_mut().set_volume(voice, volume).is_err() {
            // Voice already reaped by the backend
            self.voice = None;
        }
    }
}

impl fmt::Debug for AudioSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioSource")
            .field("clip", &self.clip.as_ref().map(|clip| clip.name().to_string()))
            .field("output_group", &self.output_group.as_ref().map(|group| group.path().to_string()))
            .field("volume", &self.volume)
            .field("pitch", &self.pitch)
            .field("looping", &self.looping)
            .field("spatial", &self.spatial)
            .field("position", &self.position)
            .field("voice", &self.voice)
            .finish_non_exhaustive()
    }
}
