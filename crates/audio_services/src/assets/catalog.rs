//! In-memory, reference counted asset resolver
//!
//! Hosts register decoded clips and mixers up front under any number of
//! keys. Every load bumps the key's reference count and is remembered under
//! a fresh [`LoadId`] until released. Load and release totals are kept so
//! callers can verify that resources are paired 1:1.

use super::{AssetError, AssetHandle, AssetKey, AssetResolver, LoadId};
use crate::audio::clip::AudioClip;
use crate::audio::mixer::AudioMixer;
use async_trait::async_trait;
use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

#[derive(Clone)]
enum CatalogEntry {
    Clip(Rc<AudioClip>),
    Mixer(Rc<AudioMixer>),
}

#[derive(Default)]
struct CatalogState {
    entries: HashMap<AssetKey, CatalogEntry>,
    ref_counts: HashMap<AssetKey, usize>,
    outstanding: HashMap<LoadId, AssetKey>,
    next_load_id: u64,
    load_count: usize,
    release_count: usize,
}

/// In-memory asset resolver
#[derive(Default)]
pub struct AssetCatalog {
    state: RefCell<CatalogState>,
    latency_polls: usize,
}

impl AssetCatalog {
    /// Create an empty catalog whose loads complete on first poll
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every load yield to the executor `polls` times before completing
    ///
    /// Simulates a loader that finishes on a later frame, so concurrent
    /// builds interleave.
    pub fn with_latency(mut self, polls: usize) -> Self {
        self.latency_polls = polls;
        self
    }

    /// Register a clip under `key`
    pub fn insert_clip(&self, key: impl Into<AssetKey>, clip: AudioClip) -> Rc<AudioClip> {
        let clip = Rc::new(clip);
        self.insert_shared_clip(key, Rc::clone(&clip));
        clip
    }

    /// Register an already shared clip under `key`
    pub fn insert_shared_clip(&self, key: impl Into<AssetKey>, clip: Rc<AudioClip>) {
        self.state.borrow_mut().entries.insert(key.into(), CatalogEntry::Clip(clip));
    }

    /// Register a mixer under `key`
    pub fn insert_mixer(&self, key: impl Into<AssetKey>, mixer: AudioMixer) -> Rc<AudioMixer> {
        let mixer = Rc::new(mixer);
        self.state
            .borrow_mut()
            .entries
            .insert(key.into(), CatalogEntry::Mixer(Rc::clone(&mixer)));
        mixer
    }

    /// Total number of successful loads issued
    pub fn load_count(&self) -> usize {
        self.state.borrow().load_count
    }

    /// Total number of releases of outstanding loads
    pub fn release_count(&self) -> usize {
        self.state.borrow().release_count
    }

    /// Number of unreleased loads across all keys
    pub fn outstanding_loads(&self) -> usize {
        self.state.borrow().outstanding.len()
    }

    /// Current reference count of `key`
    pub fn ref_count(&self, key: &AssetKey) -> usize {
        self.state.borrow().ref_counts.get(key).copied().unwrap_or(0)
    }

    fn acquire(&self, key: &AssetKey) -> Option<(LoadId, CatalogEntry)> {
        let mut state = self.state.borrow_mut();
        let entry = state.entries.get(key)?.clone();

        let id = LoadId::new(state.next_load_id);
        state.next_load_id += 1;
        state.load_count += 1;
        *state.ref_counts.entry(key.clone()).or_insert(0) += 1;
        state.outstanding.insert(id, key.clone());

        Some((id, entry))
    }

    fn kind_of(&self, key: &AssetKey) -> Option<&'static str> {
        self.state.borrow().entries.get(key).map(|entry| match entry {
            CatalogEntry::Clip(_) => "clip",
            CatalogEntry::Mixer(_) => "mixer",
        })
    }
}

#[async_trait(?Send)]
impl AssetResolver for AssetCatalog {
    async fn load_clip(&self, key: &AssetKey) -> Result<Option<AssetHandle<AudioClip>>, AssetError> {
        YieldNow::new(self.latency_polls).await;

        match self.kind_of(key) {
            None => {
                log::debug!("Catalog has no asset under {key}");
                Ok(None)
            }
            Some("clip") => Ok(self.acquire(key).and_then(|(id, entry)| match entry {
                CatalogEntry::Clip(clip) => Some(AssetHandle::new(id, key.clone(), clip)),
                CatalogEntry::Mixer(_) => None,
            })),
            Some(_) => Err(AssetError::WrongKind { key: key.to_string(), expected: "clip" }),
        }
    }

    async fn load_mixer(&self, key: &AssetKey) -> Result<Option<AssetHandle<AudioMixer>>, AssetError> {
        YieldNow::new(self.latency_polls).await;

        match self.kind_of(key) {
            None => {
                log::debug!("Catalog has no asset under {key}");
                Ok(None)
            }
            Some("mixer") => Ok(self.acquire(key).and_then(|(id, entry)| match entry {
                CatalogEntry::Mixer(mixer) => Some(AssetHandle::new(id, key.clone(), mixer)),
                CatalogEntry::Clip(_) => None,
            })),
            Some(_) => Err(AssetError::WrongKind { key: key.to_string(), expected: "mixer" }),
        }
    }

    fn release(&self, id: LoadId) {
        let mut state = self.state.borrow_mut();
        let Some(key) = state.outstanding.remove(&id) else {
            log::warn!("Ignoring release of unknown load {}", id.raw());
            return;
        };

        state.release_count += 1;
        if let Some(count) = state.ref_counts.get_mut(&key) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                state.ref_counts.remove(&key);
            }
        }
    }
}

/// Future that returns `Pending` a fixed number of times before completing
struct YieldNow {
    remaining: usize,
}

impl YieldNow {
    fn new(polls: usize) -> Self {
        Self { remaining: polls }
    }
}

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.remaining == 0 {
            return Poll::Ready(());
        }
        self.remaining -= 1;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssetReference;
    use futures::executor::block_on;
    use std::time::Duration;

    fn beep() -> AudioClip {
        AudioClip::silent("beep", Duration::from_millis(250))
    }

    #[test]
    fn test_missing_key_resolves_to_none() {
        let catalog = AssetCatalog::new();
        let result = block_on(catalog.load_clip(&AssetKey::address("nope"))).unwrap();
        assert!(result.is_none());
        assert_eq!(catalog.load_count(), 0);
    }

    #[test]
    fn test_load_and_release_are_counted() {
        let catalog = AssetCatalog::new();
        let key = AssetKey::address("sfx/beep");
        catalog.insert_clip(key.clone(), beep());

        let first = block_on(catalog.load_clip(&key)).unwrap().unwrap();
        let second = block_on(catalog.load_clip(&key)).unwrap().unwrap();
        assert_eq!(catalog.ref_count(&key), 2);
        assert_ne!(first.id(), second.id());
        assert!(Rc::ptr_eq(first.asset(), second.asset()));

        catalog.release(first.id());
        catalog.release(first.id());
        assert_eq!(catalog.release_count(), 1);
        assert_eq!(catalog.ref_count(&key), 1);

        catalog.release(second.id());
        assert_eq!(catalog.ref_count(&key), 0);
        assert_eq!(catalog.outstanding_loads(), 0);
    }

    #[test]
    fn test_reference_keys() {
        let catalog = AssetCatalog::new();
        let reference = AssetReference::new("guid-1");
        catalog.insert_clip(reference.clone(), beep());

        let handle = block_on(catalog.load_clip(&reference.into())).unwrap();
        assert!(handle.is_some());
    }

    #[test]
    fn test_wrong_kind_is_an_error() {
        let catalog = AssetCatalog::new();
        catalog.insert_clip(AssetKey::address("sfx/beep"), beep());

        let result = block_on(catalog.load_mixer(&AssetKey::address("sfx/beep")));
        assert!(matches!(result, Err(AssetError::WrongKind { expected: "mixer", .. })));
    }

    #[test]
    fn test_latency_still_completes() {
        let catalog = AssetCatalog::new().with_latency(3);
        catalog.insert_clip(AssetKey::address("sfx/beep"), beep());

        let handle = block_on(catalog.load_clip(&AssetKey::address("sfx/beep"))).unwrap();
        assert!(handle.is_some());
    }
}
