//! Registry of live sounds
//!
//! Ordered by registration, unique by identity. Ids may repeat: two sounds
//! built with the same id are both kept.

use crate::audio::sound::Sound;
use crate::events::SubscriptionId;

#[derive(Debug)]
struct Entry {
    sound: Sound,
    subscription: SubscriptionId,
}

/// Ordered set of registered sounds
#[derive(Debug, Default)]
pub struct SoundRegistry {
    entries: Vec<Entry>,
}

impl SoundRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered sounds
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no sound is registered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether this exact sound is registered
    pub fn contains(&self, sound: &Sound) -> bool {
        self.entries.iter().any(|entry| entry.sound.ptr_eq(sound))
    }

    /// Add `sound`; returns `false` when it was already present
    ///
    /// `subscription` is the owner's pending `unloaded` subscription, handed
    /// back by [`remove`](Self::remove).
    pub fn insert(&mut self, sound: Sound, subscription: SubscriptionId) -> bool {
        if self.contains(&sound) {
            return false;
        }
        self.entries.push(Entry { sound, subscription });
        true
    }

    /// Remove `sound`, returning its subscription; `None` when absent
    pub fn remove(&mut self, sound: &Sound) -> Option<SubscriptionId> {
        let index = self.entries.iter().position(|entry| entry.sound.ptr_eq(sound))?;
        Some(self.entries.remove(index).subscription)
    }

    /// Registered sounds in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Sound> {
        self.entries.iter().map(|entry| &entry.sound)
    }

    /// Clone of every registered handle, for iterating while callbacks may
    /// mutate the registry
    pub fn snapshot(&self) -> Vec<Sound> {
        self.iter().cloned().collect()
    }
}
