//! Audio service
//!
//! The [`AudioService`] is the directory every sound is built through. It
//! owns:
//! - the host collaborators (resolver, backend, scene, clock)
//! - the mixer, resolved lazily and memoized
//! - the [`SoundRegistry`] of live sounds
//!
//! Sounds register themselves during `build` and leave the registry when
//! their `unloaded` signal fires. The service is an explicit object: create
//! one per session and call [`shutdown`](AudioService::shutdown) at its end.

use crate::assets::{AssetKey, AssetReference, AssetResolver, FileAssetResolver, LoadId};
use crate::audio::backend::{create_backend, HeadlessBackend, SharedBackend};
use crate::audio::builder::SoundBuilder;
use crate::audio::mixer::{AudioMixer, MixerGroup};
use crate::audio::registry::SoundRegistry;
use crate::audio::sound::Sound;
use crate::audio::AudioError;
use crate::config::{AudioServiceConfig, SoundDefaults};
use crate::foundation::time::{Clock, SystemClock};
use crate::scene::{SceneGraph, SceneObjectId, SharedScene};
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

/// Host collaborators an [`AudioService`] runs on
#[derive(Clone)]
pub struct AudioHost {
    /// Loads clips and mixers
    pub resolver: Rc<dyn AssetResolver>,
    /// Playback sink
    pub backend: SharedBackend,
    /// Object tree sounds are parented into
    pub scene: SharedScene,
    /// Monotonic time source for completion detection
    pub clock: Rc<dyn Clock>,
}

impl AudioHost {
    /// Bundle the given collaborators
    pub fn new(resolver: Rc<dyn AssetResolver>, backend: SharedBackend, scene: SharedScene, clock: Rc<dyn Clock>) -> Self {
        Self { resolver, backend, scene, clock }
    }

    /// Silent host: initialized headless backend, own scene graph, wall clock
    pub fn headless(resolver: Rc<dyn AssetResolver>) -> Self {
        Self {
            resolver,
            backend: Rc::new(RefCell::new(HeadlessBackend::initialized())),
            scene: Rc::new(RefCell::new(SceneGraph::new())),
            clock: Rc::new(SystemClock::new()),
        }
    }
}

#[derive(Default)]
struct MixerSlot {
    direct: Option<Rc<AudioMixer>>,
    address: Option<String>,
    reference: Option<AssetReference>,
    cached: Option<Rc<AudioMixer>>,
    lease: Option<LoadId>,
}

struct ServiceInner {
    host: AudioHost,
    defaults: SoundDefaults,
    root: SceneObjectId,
    registry: RefCell<SoundRegistry>,
    mixer: RefCell<MixerSlot>,
}

impl ServiceInner {
    fn release_mixer(&self) {
        let lease = {
            let mut slot = self.mixer.borrow_mut();
            slot.cached = None;
            slot.lease.take()
        };
        if let Some(id) = lease {
            self.host.resolver.release(id);
        }
    }
}

impl Drop for ServiceInner {
    fn drop(&mut self) {
        self.release_mixer();
    }
}

/// Directory of live sounds and factory for builders
///
/// Cheap to clone; clones share the same registry and mixer.
#[derive(Clone)]
pub struct AudioService {
    inner: Rc<ServiceInner>,
}

impl AudioService {
    /// Create a service with default builder settings
    pub fn new(host: AudioHost) -> Self {
        Self::with_defaults(host, SoundDefaults::default())
    }

    /// Create a service whose builders start from `defaults`
    pub fn with_defaults(host: AudioHost, defaults: SoundDefaults) -> Self {
        let root = host.scene.borrow_mut().instantiate("AudioService");
        log::info!("Audio service created");
        Self {
            inner: Rc::new(ServiceInner {
                host,
                defaults,
                root,
                registry: RefCell::new(SoundRegistry::new()),
                mixer: RefCell::new(MixerSlot::default()),
            }),
        }
    }

    /// Create a service from configuration
    ///
    /// Opens the platform backend, resolves assets from the configured search
    /// paths and uses the configured mixer address, if any.
    pub fn from_config(config: &AudioServiceConfig) -> Result<Self, AudioError> {
        config.validate()?;

        let host = AudioHost {
            resolver: Rc::new(FileAssetResolver::new(&config.assets)),
            backend: create_backend(&config.backend)?,
            scene: Rc::new(RefCell::new(SceneGraph::new())),
            clock: Rc::new(SystemClock::new()),
        };
        let service = Self::with_defaults(host, config.defaults.clone());
        if let Some(address) = &config.mixer_address {
            service.set_audio_mixer_address(address.clone());
        }
        Ok(service)
    }

    /// Use `mixer` directly; takes precedence over address and reference
    pub fn set_audio_mixer(&self, mixer: Rc<AudioMixer>) {
        self.inner.release_mixer();
        self.inner.mixer.borrow_mut().direct = Some(mixer);
    }

    /// Load the mixer from `address` on first use
    pub fn set_audio_mixer_address(&self, address: impl Into<String>) {
        self.inner.release_mixer();
        self.inner.mixer.borrow_mut().address = Some(address.into());
    }

    /// Load the mixer from `reference` on first use
    pub fn set_audio_mixer_reference(&self, reference: AssetReference) {
        self.inner.release_mixer();
        self.inner.mixer.borrow_mut().reference = Some(reference);
    }

    /// Resolve the mixer
    ///
    /// Sources are tried in order direct, address, reference. The first
    /// successful resolution is cached; later calls return it without
    /// loading. `Ok(None)` when no source is configured or nothing is found.
    pub async fn audio_mixer(&self) -> Result<Option<Rc<AudioMixer>>, AudioError> {
        let key = {
            let mut slot = self.inner.mixer.borrow_mut();
            if let Some(mixer) = &slot.cached {
                return Ok(Some(Rc::clone(mixer)));
            }
            if let Some(mixer) = slot.direct.clone() {
                slot.cached = Some(Rc::clone(&mixer));
                return Ok(Some(mixer));
            }
            match (&slot.address, &slot.reference) {
                (Some(address), _) if !address.is_empty() => AssetKey::Address(address.clone()),
                (_, Some(reference)) => AssetKey::Reference(reference.clone()),
                _ => return Ok(None),
            }
        };

        let Some(handle) = self.inner.host.resolver.load_mixer(&key).await? else {
            log::warn!("No mixer found under {key}");
            return Ok(None);
        };

        let mut slot = self.inner.mixer.borrow_mut();
        if let Some(mixer) = &slot.cached {
            // A concurrent resolution finished first
            self.inner.host.resolver.release(handle.id());
            return Ok(Some(Rc::clone(mixer)));
        }
        log::debug!("Resolved mixer '{}' from {key}", handle.asset().name());
        slot.cached = Some(Rc::clone(handle.asset()));
        slot.lease = Some(handle.id());
        Ok(Some(Rc::clone(handle.asset())))
    }

    /// Mixer groups whose path contains `sub_path`
    ///
    /// Empty when no mixer is configured or nothing matches.
    pub async fn find_matching_groups(&self, sub_path: &str) -> Result<Vec<Rc<MixerGroup>>, AudioError> {
        Ok(self
            .audio_mixer()
            .await?
            .map(|mixer| mixer.find_matching_groups(sub_path))
            .unwrap_or_default())
    }

    /// Start configuring a new sound
    pub fn create_builder(&self, id: impl Into<String>) -> SoundBuilder {
        SoundBuilder::new(self.clone(), id)
    }

    /// Track `sound` until it unloads; `false` if already tracked
    pub fn register(&self, sound: &Sound) -> bool {
        if self.inner.registry.borrow().contains(sound) {
            return false;
        }

        let service: Weak<ServiceInner> = Rc::downgrade(&self.inner);
        let subscription = sound.on_unloaded(move |sound| {
            if let Some(service) = service.upgrade() {
                service.registry.borrow_mut().remove(sound);
            }
        });
        self.inner.registry.borrow_mut().insert(sound.clone(), subscription)
    }

    /// Stop tracking `sound`; `false` if it was not tracked
    pub fn unregister(&self, sound: &Sound) -> bool {
        let removed = self.inner.registry.borrow_mut().remove(sound);
        match removed {
            Some(subscription) => {
                sound.unloaded().unsubscribe(subscription);
                true
            }
            None => false,
        }
    }

    /// First registered sound with `id`
    pub fn find_first_by_id(&self, id: &str) -> Option<Sound> {
        self.find_first(|sound| sound.id() == id)
    }

    /// First registered sound matching `predicate`
    pub fn find_first(&self, mut predicate: impl FnMut(&Sound) -> bool) -> Option<Sound> {
        self.sounds().into_iter().find(|sound| predicate(sound))
    }

    /// Every registered sound matching `predicate`, in registration order
    pub fn find_all(&self, mut predicate: impl FnMut(&Sound) -> bool) -> Vec<Sound> {
        self.sounds().into_iter().filter(|sound| predicate(sound)).collect()
    }

    /// Every registered sound, in registration order
    pub fn sounds(&self) -> Vec<Sound> {
        self.inner.registry.borrow().snapshot()
    }

    /// Number of registered sounds
    pub fn sound_count(&self) -> usize {
        self.inner.registry.borrow().len()
    }

    /// Tick every registered sound, then the backend
    pub fn update(&self, delta_time: f32) {
        for sound in self.sounds() {
            sound.update(delta_time);
        }
        self.inner.host.backend.borrow_mut().update();
    }

    /// Unload every sound, release the mixer and silence the backend
    ///
    /// Sounds still being built are unloaded when their build finishes.
    pub fn shutdown(&self) {
        for sound in self.sounds() {
            if !sound.is_unloaded() {
                sound.unload();
            }
        }
        let registry = self.inner.registry.borrow();
        if !registry.is_empty() {
            log::debug!("{} sounds still building at shutdown", registry.len());
        }
        drop(registry);
        self.inner.release_mixer();
        self.inner.host.backend.borrow_mut().stop_all();
        log::info!("Audio service shut down");
    }

    /// Scene object every sound is parented under
    pub fn root(&self) -> SceneObjectId {
        self.inner.root
    }

    /// Builder defaults
    pub fn defaults(&self) -> &SoundDefaults {
        &self.inner.defaults
    }

    /// Asset resolver
    pub fn resolver(&self) -> Rc<dyn AssetResolver> {
        Rc::clone(&self.inner.host.resolver)
    }

    /// Playback backend
    pub fn backend(&self) -> SharedBackend {
        Rc::clone(&self.inner.host.backend)
    }

    /// Scene host
    pub fn scene(&self) -> SharedScene {
        Rc::clone(&self.inner.host.scene)
    }

    /// Clock used for completion detection
    pub fn clock(&self) -> Rc<dyn Clock> {
        Rc::clone(&self.inner.host.clock)
    }
}

impl fmt::Debug for AudioService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioService")
            .field("sounds", &self.sound_count())
            .field("root", &self.inner.root)
            .finish_non_exhaustive()
    }
}
