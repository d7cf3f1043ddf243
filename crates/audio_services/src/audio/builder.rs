//! Sound builder
//!
//! [`SoundBuilder`] collects a [`SoundConfiguration`] through chained,
//! side-effect free setters. Nothing is loaded or instantiated until
//! [`build`](SoundBuilder::build), which consumes the builder.
//!
//! # Clip source priority
//!
//! A configuration may name an inline clip, an address and a reference at the
//! same time. Exactly one is used: inline clip, then address, then reference.
//! An address that resolves to nothing does not fall back to the reference.

use crate::assets::{AssetKey, AssetReference, AssetResolver, LoadId};
use crate::audio::clip::AudioClip;
use crate::audio::service::AudioService;
use crate::audio::sound::Sound;
use crate::audio::source::{AudioSource, RolloffMode, SpatialSettings};
use crate::audio::tween::SoundTween;
use crate::audio::AudioError;
use crate::config::SoundDefaults;
use crate::foundation::math::Vec3;
use std::fmt;
use std::rc::Rc;

/// Everything a builder knows about the sound it will produce
#[derive(Debug, Clone)]
pub struct SoundConfiguration {
    /// Sound id; not unique
    pub id: String,
    /// Optional category used by queries
    pub category: Option<String>,
    /// Inline clip, highest priority source
    pub audio_clip: Option<Rc<AudioClip>>,
    /// Asset address, second priority source
    pub asset_address: Option<String>,
    /// Asset reference, lowest priority source
    pub asset_reference: Option<AssetReference>,
    /// World position of the emitter
    pub position: Vec3,
    /// 3D settings
    pub spatial: SpatialSettings,
    /// Loop flag
    pub looping: bool,
    /// Source gain (0.0 to 1.0)
    pub volume: f32,
    /// Pitch multiplier
    pub pitch: f32,
    /// Mixer group sub-path to route into
    pub mixer_group: Option<String>,
}

impl SoundConfiguration {
    /// Configuration for `id` starting from `defaults`
    pub fn new(id: impl Into<String>, defaults: &SoundDefaults) -> Self {
        Self {
            id: id.into(),
            category: None,
            audio_clip: None,
            asset_address: None,
            asset_reference: None,
            position: Vec3::zeros(),
            spatial: SpatialSettings {
                rolloff_mode: defaults.rolloff_mode,
                min_distance: defaults.min_distance,
                max_distance: defaults.max_distance,
                ..SpatialSettings::default()
            },
            looping: false,
            volume: defaults.volume,
            pitch: defaults.pitch,
            mixer_group: None,
        }
    }

    /// Key the clip will be loaded with, when no inline clip is set
    pub fn clip_key(&self) -> Option<AssetKey> {
        match (&self.asset_address, &self.asset_reference) {
            (Some(address), _) if !address.is_empty() => Some(AssetKey::Address(address.clone())),
            (_, Some(reference)) => Some(AssetKey::Reference(reference.clone())),
            _ => None,
        }
    }

    fn apply_to(&self, source: &mut AudioSource) {
        source.set_spatial(self.spatial.clone());
        source.set_looping(self.looping);
        source.set_volume(self.volume);
        source.set_pitch(self.pitch);
        source.set_play_on_awake(false);
    }
}

/// Release obligation for the clip a build loaded
///
/// Inline clips need no lease. [`release`](Self::release) hands the load back
/// to the resolver exactly once; later calls do nothing.
#[derive(Default)]
pub struct ClipLease {
    held: Option<(Rc<dyn AssetResolver>, LoadId)>,
}

impl ClipLease {
    /// Lease for a load that must be returned to `resolver`
    pub fn acquired(resolver: Rc<dyn AssetResolver>, id: LoadId) -> Self {
        Self { held: Some((resolver, id)) }
    }

    /// Whether a load is still held
    pub fn is_held(&self) -> bool {
        self.held.is_some()
    }

    /// Return the load to its resolver; no-op when nothing is held
    pub fn release(&mut self) {
        if let Some((resolver, id)) = self.held.take() {
            log::trace!("Releasing clip load {}", id.raw());
            resolver.release(id);
        }
    }
}

impl fmt::Debug for ClipLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClipLease")
            .field("load", &self.held.as_ref().map(|(_, id)| id.raw()))
            .finish()
    }
}

/// Fluent builder for [`Sound`]s
pub struct SoundBuilder {
    service: AudioService,
    configuration: SoundConfiguration,
    tweens: Vec<Box<dyn SoundTween>>,
}

impl SoundBuilder {
    /// Builder for a sound with `id`, using the service's defaults
    pub fn new(service: AudioService, id: impl Into<String>) -> Self {
        let configuration = SoundConfiguration::new(id, service.defaults());
        Self {
            service,
            configuration,
            tweens: Vec::new(),
        }
    }

    /// Configuration accumulated so far
    pub fn configuration(&self) -> &SoundConfiguration {
        &self.configuration
    }

    /// Use an already loaded clip
    pub fn with_audio_clip(mut self, clip: Rc<AudioClip>) -> Self {
        self.configuration.audio_clip = Some(clip);
        self
    }

    /// Load the clip by address
    pub fn with_asset_address(mut self, address: impl Into<String>) -> Self {
        self.configuration.asset_address = Some(address.into());
        self
    }

    /// Load the clip by reference
    pub fn with_asset_reference(mut self, reference: AssetReference) -> Self {
        self.configuration.asset_reference = Some(reference);
        self
    }

    /// Place the sound in the world and make it fully 3D
    pub fn with_3d_position(mut self, position: Vec3) -> Self {
        self.configuration.position = position;
        self.configuration.spatial.spatial_blend = 1.0;
        self
    }

    /// Set the 2D/3D blend
    pub fn with_spatial_blend(mut self, spatial_blend: f32) -> Self {
        self.configuration.spatial.spatial_blend = spatial_blend;
        self
    }

    /// Set the doppler level
    pub fn with_doppler(mut self, doppler_level: f32) -> Self {
        self.configuration.spatial.doppler_level = doppler_level;
        self
    }

    /// Set the attenuation curve
    pub fn with_rolloff_mode(mut self, rolloff_mode: RolloffMode) -> Self {
        self.configuration.spatial.rolloff_mode = rolloff_mode;
        self
    }

    /// Set the distance below which the sound is not attenuated
    ///
    /// Keeping it below the max distance is up to the caller.
    pub fn with_min_distance(mut self, min_distance: f32) -> Self {
        self.configuration.spatial.min_distance = min_distance;
        self
    }

    /// Set the distance beyond which attenuation stops
    pub fn with_max_distance(mut self, max_distance: f32) -> Self {
        self.configuration.spatial.max_distance = max_distance;
        self
    }

    /// Set the loop flag
    pub fn with_looping(mut self, looping: bool) -> Self {
        self.configuration.looping = looping;
        self
    }

    /// Set the source gain
    pub fn with_volume(mut self, volume: f32) -> Self {
        self.configuration.volume = volume;
        self
    }

    /// Set the pitch multiplier
    pub fn with_pitch(mut self, pitch: f32) -> Self {
        self.configuration.pitch = pitch;
        self
    }

    /// Route into the first mixer group whose path contains `sub_path`
    pub fn with_mixer_group(mut self, sub_path: impl Into<String>) -> Self {
        self.configuration.mixer_group = Some(sub_path.into());
        self
    }

    /// Set the category
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.configuration.category = Some(category.into());
        self
    }

    /// Queue a tween on the sound; tweens run in the order added
    pub fn with_queued_tween(mut self, tween: impl SoundTween + 'static) -> Self {
        self.tweens.push(Box::new(tween));
        self
    }

    /// Create, register and configure the sound
    ///
    /// The sound is registered with the service before any asset is
    /// resolved, so it can be found by queries while the build is pending.
    /// On failure the half-built sound is unloaded again: its clip lease is
    /// released, it leaves the registry and its scene object is destroyed.
    ///
    /// # Errors
    ///
    /// - [`AudioError::ClipNotFound`] when no clip could be resolved
    /// - [`AudioError::Asset`] when the resolver fails to load the clip or
    ///   the mixer
    /// - [`AudioError::BuildCancelled`] when the sound was unloaded while the
    ///   build was resolving
    pub async fn build(self) -> Result<Sound, AudioError> {
        let Self { service, configuration, tweens } = self;
        let id = configuration.id.clone();

        let object = service.scene().borrow_mut().instantiate(&format!("Sound[{id}]"));
        let sound = Sound::new(
            id.clone(),
            configuration.category.clone(),
            AudioSource::new(service.backend()),
            service.clock(),
            service.scene(),
            object,
            tweens,
        );
        service.register(&sound);
        log::debug!("Building sound '{id}'");

        let result = Self::configure(&service, &sound, &configuration).await;
        let ready = sound.finish_configuring();

        match result {
            Ok(()) if ready => Ok(sound),
            Ok(()) => {
                log::debug!("Sound '{id}' was unloaded during its build");
                sound.teardown();
                Err(AudioError::BuildCancelled { id })
            }
            Err(e) => {
                log::error!("Failed to build sound '{id}': {e}");
                sound.teardown();
                Err(e)
            }
        }
    }

    async fn configure(service: &AudioService, sound: &Sound, configuration: &SoundConfiguration) -> Result<(), AudioError> {
        let clip = Self::resolve_clip(service, sound, configuration).await?;
        let group = match configuration.mixer_group.as_deref() {
            None | Some("") => None,
            Some(sub_path) => {
                let group = service.find_matching_groups(sub_path).await?.into_iter().next();
                if group.is_none() {
                    log::warn!("No mixer group matches '{sub_path}'; sound '{}' plays unrouted", configuration.id);
                }
                group
            }
        };

        let clip = clip.ok_or_else(|| AudioError::ClipNotFound {
            id: configuration.id.clone(),
            address: configuration.asset_address.clone(),
            reference: configuration.asset_reference.clone(),
        })?;

        let object = sound.scene_object();
        let world_position = {
            let scene = service.scene();
            let mut scene = scene.borrow_mut();
            scene.set_parent(object, Some(service.root()));
            scene.set_position(object, configuration.position);
            scene.world_position(object).unwrap_or(configuration.position)
        };

        sound.with_source_mut(|source| {
            source.set_clip(Some(clip));
            source.set_output_group(group);
            configuration.apply_to(source);
            source.set_position(world_position);
        });
        Ok(())
    }

    async fn resolve_clip(
        service: &AudioService,
        sound: &Sound,
        configuration: &SoundConfiguration,
    ) -> Result<Option<Rc<AudioClip>>, AudioError> {
        if let Some(clip) = &configuration.audio_clip {
            return Ok(Some(Rc::clone(clip)));
        }
        let Some(key) = configuration.clip_key() else {
            return Ok(None);
        };

        let resolver = service.resolver();
        match resolver.load_clip(&key).await? {
            Some(handle) => {
                sound.set_lease(ClipLease::acquired(Rc::clone(&resolver), handle.id()));
                Ok(Some(Rc::clone(handle.asset())))
            }
            None => {
                log::warn!("No clip found under {key}");
                Ok(None)
            }
        }
    }
}

impl fmt::Debug for SoundBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoundBuilder")
            .field("configuration", &self.configuration)
            .field("tweens", &self.tweens.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssetCatalog;
    use futures::executor::block_on;
    use std::time::Duration;

    #[test]
    fn test_defaults() {
        let configuration = SoundConfiguration::new("beep", &SoundDefaults::default());
        assert_eq!(configuration.volume, 1.0);
        assert_eq!(configuration.pitch, 1.0);
        assert_eq!(configuration.spatial.min_distance, 1.0);
        assert_eq!(configuration.spatial.max_distance, 500.0);
        assert_eq!(configuration.spatial.rolloff_mode, RolloffMode::Logarithmic);
        assert_eq!(configuration.spatial.spatial_blend, 0.0);
        assert!(!configuration.looping);
    }

    #[test]
    fn test_address_beats_reference() {
        let mut configuration = SoundConfiguration::new("beep", &SoundDefaults::default());
        configuration.asset_reference = Some(AssetReference::new("guid"));
        assert_eq!(configuration.clip_key(), Some(AssetKey::Reference(AssetReference::new("guid"))));

        configuration.asset_address = Some("sfx/beep".to_string());
        assert_eq!(configuration.clip_key(), Some(AssetKey::address("sfx/beep")));
    }

    #[test]
    fn test_lease_releases_once() {
        let catalog = Rc::new(AssetCatalog::new());
        let key = AssetKey::address("sfx/beep");
        catalog.insert_clip(key.clone(), AudioClip::silent("beep", Duration::from_millis(10)));
        let handle = block_on(catalog.load_clip(&key)).unwrap().unwrap();

        let resolver: Rc<dyn AssetResolver> = catalog.clone();
        let mut lease = ClipLease::acquired(resolver, handle.id());
        assert!(lease.is_held());

        lease.release();
        lease.release();
        assert!(!lease.is_held());
        assert_eq!(catalog.release_count(), 1);
    }

    #[test]
    fn test_empty_lease_release_is_noop() {
        let mut lease = ClipLease::default();
        lease.release();
        assert!(!lease.is_held());
    }
}
