//! Cross-module scenarios for the sound lifecycle
//!
//! Every scenario runs on a deterministic host: a [`ManualClock`] the test
//! advances by hand, a [`HeadlessBackend`] that records voices and an
//! [`AssetCatalog`] that counts loads and releases.


use crate::assets::AssetCatalog;
use crate::audio::backend::HeadlessBackend;
use crate::audio::builder::SoundBuilder;
use crate::audio::clip::AudioClip;
use crate::audio::mixer::{AudioMixer, GroupDefinition, MixerDefinition};
use crate::audio::service::{AudioHost, AudioService};
use crate::audio::sound::Sound;
use crate::audio::source::AudioSource;
use crate::audio::tween::SoundTween;
use crate::audio::AudioError;
use crate::events::Signal;
use crate::foundation::time::ManualClock;
use crate::scene::SceneGraph;
use futures::executor::block_on;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

struct Harness {
    catalog: Rc<AssetCatalog>,
    backend: Rc<RefCell<HeadlessBackend>>,
    scene: Rc<RefCell<SceneGraph>>,
    clock: Rc<ManualClock>,
    service: AudioService,
}

impl Harness {
    fn new() -> Self {
        Self::with_catalog(AssetCatalog::new())
    }

    fn with_catalog(catalog: AssetCatalog) -> Self {
        let catalog = Rc::new(catalog);
        let backend = Rc::new(RefCell::new(HeadlessBackend::initialized()));
        let scene = Rc::new(RefCell::new(SceneGraph::new()));
        let clock = Rc::new(ManualClock::new());

        let host = AudioHost::new(catalog.clone(), backend.clone(), scene.clone(), clock.clone());
        let service = AudioService::new(host);
        Self { catalog, backend, scene, clock, service }
    }

    /// Register a clip of `secs` seconds under `address`
    fn add_clip(&self, address: &str, secs: f32) -> Rc<AudioClip> {
        self.catalog.insert_clip(address, clip(address, secs))
    }

    fn build(&self, builder: SoundBuilder) -> Result<Sound, AudioError> {
        block_on(builder.build())
    }

    /// Advance the clock and run one service update
    fn tick(&self, seconds: f32) {
        self.clock.advance(f64::from(seconds));
        self.service.update(seconds);
    }
}

fn clip(name: &str, secs: f32) -> AudioClip {
    AudioClip::silent(name, Duration::from_secs_f32(secs))
}

/// `Master`, `Master/SFX`, `Master/SFX/UI`, `Master/Music`
fn game_mixer() -> AudioMixer {
    AudioMixer::from_definition(&MixerDefinition {
        name: "Game".to_string(),
        groups: vec![GroupDefinition::new("Master")
            .with_child(GroupDefinition::new("SFX").with_volume(0.5).with_child(GroupDefinition::new("UI")))
            .with_child(GroupDefinition::new("Music"))],
    })
}

fn counter(signal: &Signal<Sound>) -> Rc<Cell<u32>> {
    let hits = Rc::new(Cell::new(0));
    let inner = Rc::clone(&hits);
    signal.subscribe(move |_| inner.set(inner.get() + 1));
    hits
}

/// Tween that completes after a fixed number of updates and logs its hooks
struct RecordingTween {
    name: &'static str,
    updates_left: u32,
    log: Rc<RefCell<Vec<String>>>,
    completed: Signal<()>,
}

impl RecordingTween {
    fn new(name: &'static str, updates: u32, log: &Rc<RefCell<Vec<String>>>) -> Self {
        Self {
            name,
            updates_left: updates,
            log: Rc::clone(log),
            completed: Signal::new(),
        }
    }
}

impl SoundTween for RecordingTween {
    fn on_start(&mut self, _source: &mut AudioSource) {
        self.log.borrow_mut().push(format!("{} start", self.name));
    }

    fn on_update(&mut self, _source: &mut AudioSource, _delta_time: f32) {
        self.log.borrow_mut().push(format!("{} update", self.name));
        self.updates_left = self.updates_left.saturating_sub(1);
        if self.updates_left == 0 {
            self.log.borrow_mut().push(format!("{} done", self.name));
        }
    }

    fn is_finished(&self) -> bool {
        self.updates_left == 0
    }

    fn completed(&self) -> &Signal<()> {
        &self.completed
    }
}
