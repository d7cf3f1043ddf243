//! File-backed asset resolver
//!
//! Addresses are relative paths looked up under each configured search path
//! in order. The extension may be left out: `sfx/beep` finds
//! `sfx/beep.wav`, `sfx/beep.ogg`, ... for clips and `mixers/game.ron` or
//! `mixers/game.toml` for mixers. References are mapped to addresses through
//! a table registered up front.

use super::{Asset, AssetError, AssetHandle, AssetKey, AssetResolver, LoadId};
use crate::audio::clip::AudioClip;
use crate::audio::mixer::{AudioMixer, MixerDefinition};
use crate::config::{AssetConfig, Config, ConfigFormat};
use async_trait::async_trait;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

const CLIP_EXTENSIONS: &[&str] = &["wav", "ogg", "flac", "mp3"];
const MIXER_EXTENSIONS: &[&str] = &["ron", "toml"];

/// Resolver reading clips and mixer definitions from disk
#[derive(Debug, Default)]
pub struct FileAssetResolver {
    search_paths: Vec<PathBuf>,
    references: HashMap<String, String>,
    outstanding: RefCell<HashMap<LoadId, AssetKey>>,
    next_load_id: Cell<u64>,
}

impl FileAssetResolver {
    /// Create a resolver over the configured search paths
    pub fn new(config: &AssetConfig) -> Self {
        Self {
            search_paths: config.search_paths.iter().map(PathBuf::from).collect(),
            ..Self::default()
        }
    }

    /// Append a search path
    pub fn with_search_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.search_paths.push(path.into());
        self
    }

    /// Map reference `guid` to `address`
    pub fn with_reference(mut self, guid: impl Into<String>, address: impl Into<String>) -> Self {
        self.references.insert(guid.into(), address.into());
        self
    }

    /// Number of loads not yet released
    pub fn outstanding_loads(&self) -> usize {
        self.outstanding.borrow().len()
    }

    fn address_of<'a>(&'a self, key: &'a AssetKey) -> Option<&'a str> {
        match key {
            AssetKey::Address(address) => Some(address.as_str()),
            AssetKey::Reference(reference) => {
                let address = self.references.get(reference.guid()).map(String::as_str);
                if address.is_none() {
                    log::debug!("No address registered for {reference}");
                }
                address
            }
        }
    }

    /// First existing file for `address` under the search paths
    fn locate(&self, address: &str, extensions: &[&str]) -> Option<PathBuf> {
        for root in &self.search_paths {
            let exact = root.join(address);
            if exact.is_file() {
                return Some(exact);
            }
            for extension in extensions {
                let candidate = root.join(format!("{address}.{extension}"));
                if candidate.is_file() {
                    return Some(candidate);
                }
            }
        }
        None
    }

    fn track(&self, key: &AssetKey) -> LoadId {
        let id = LoadId::new(self.next_load_id.get());
        self.next_load_id.set(self.next_load_id.get() + 1);
        self.outstanding.borrow_mut().insert(id, key.clone());
        id
    }

    fn read_mixer(path: &Path) -> Result<AudioMixer, AssetError> {
        match ConfigFormat::from_path(path) {
            Ok(ConfigFormat::Toml) => {
                let text = std::fs::read_to_string(path)?;
                let definition = MixerDefinition::from_str_with_format(&text, ConfigFormat::Toml)
                    .map_err(|e| AssetError::Parse(e.to_string()))?;
                Ok(AudioMixer::from_definition(&definition))
            }
            Ok(ConfigFormat::Ron) => AudioMixer::from_bytes(&std::fs::read(path)?),
            Err(_) => Err(AssetError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

#[async_trait(?Send)]
impl AssetResolver for FileAssetResolver {
    async fn load_clip(&self, key: &AssetKey) -> Result<Option<AssetHandle<AudioClip>>, AssetError> {
        let Some(address) = self.address_of(key) else {
            return Ok(None);
        };
        let Some(path) = self.locate(address, CLIP_EXTENSIONS) else {
            log::debug!("No clip file for {key}");
            return Ok(None);
        };

        let clip = AudioClip::from_bytes(&std::fs::read(&path)?)?.with_name(address);
        log::debug!("Loaded clip {} ({:.2}s)", path.display(), clip.duration().as_secs_f32());
        Ok(Some(AssetHandle::new(self.track(key), key.clone(), Rc::new(clip))))
    }

    async fn load_mixer(&self, key: &AssetKey) -> Result<Option<AssetHandle<AudioMixer>>, AssetError> {
        let Some(address) = self.address_of(key) else {
            return Ok(None);
        };
        let Some(path) = self.locate(address, MIXER_EXTENSIONS) else {
            log::debug!("No mixer file for {key}");
            return Ok(None);
        };

        let mixer = Self::read_mixer(&path)?;
        log::debug!("Loaded mixer '{}' from {}", mixer.name(), path.display());
        Ok(Some(AssetHandle::new(self.track(key), key.clone(), Rc::new(mixer))))
    }

    fn release(&self, id: LoadId) {
        if self.outstanding.borrow_mut().remove(&id).is_none() {
            log::warn!("Ignoring release of unknown load {}", id.raw());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssetReference;
    use crate::audio::mixer::GroupDefinition;
    use approx::assert_relative_eq;
    use futures::executor::block_on;
    use std::time::Duration;

    fn resolver_in(dir: &Path) -> FileAssetResolver {
        FileAssetResolver::new(&AssetConfig::new().with_search_paths([dir.to_string_lossy().to_string()]))
    }

    fn write_clip(dir: &Path, relative: &str, millis: u64) {
        let path = dir.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let clip = AudioClip::silent("tmp", Duration::from_millis(millis));
        std::fs::write(path, clip.data()).unwrap();
    }

    #[test]
    fn test_loads_clip_without_extension() {
        let dir = tempfile::tempdir().unwrap();
        write_clip(dir.path(), "sfx/beep.wav", 250);
        let resolver = resolver_in(dir.path());

        let handle = block_on(resolver.load_clip(&AssetKey::address("sfx/beep"))).unwrap().unwrap();
        assert_eq!(handle.asset().name(), "sfx/beep");
        assert_relative_eq!(handle.asset().duration().as_secs_f64(), 0.25, epsilon = 1e-3);
        assert_eq!(resolver.outstanding_loads(), 1);

        resolver.release(handle.id());
        assert_eq!(resolver.outstanding_loads(), 0);
    }

    #[test]
    fn test_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = resolver_in(dir.path());
        assert!(block_on(resolver.load_clip(&AssetKey::address("sfx/none"))).unwrap().is_none());
    }

    #[test]
    fn test_reference_table() {
        let dir = tempfile::tempdir().unwrap();
        write_clip(dir.path(), "music/theme.wav", 100);
        let resolver = resolver_in(dir.path()).with_reference("guid-theme", "music/theme");

        let key = AssetKey::from(AssetReference::new("guid-theme"));
        assert!(block_on(resolver.load_clip(&key)).unwrap().is_some());

        let unknown = AssetKey::from(AssetReference::new("guid-other"));
        assert!(block_on(resolver.load_clip(&unknown)).unwrap().is_none());
    }

    #[test]
    fn test_corrupt_clip_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.wav"), b"not audio").unwrap();
        let resolver = resolver_in(dir.path());

        let result = block_on(resolver.load_clip(&AssetKey::address("bad")));
        assert!(matches!(result, Err(AssetError::InvalidData(_))));
        assert_eq!(resolver.outstanding_loads(), 0);
    }

    #[test]
    fn test_loads_toml_mixer() {
        let dir = tempfile::tempdir().unwrap();
        let definition = MixerDefinition {
            name: "Game".to_string(),
            groups: vec![GroupDefinition::new("Master").with_child(GroupDefinition::new("SFX"))],
        };
        definition.save_to_file(dir.path().join("game.toml")).unwrap();
        let resolver = resolver_in(dir.path());

        let handle = block_on(resolver.load_mixer(&AssetKey::address("game"))).unwrap().unwrap();
        assert_eq!(handle.asset().name(), "Game");
        assert!(handle.asset().group("Master/SFX").is_some());
    }
}
