//! Audio mixer asset
//!
//! A mixer is a tree of named groups (`Master`, `Master/SFX`,
//! `Master/SFX/UI`, ...). Sounds route their output into one group; the
//! backend scales a voice by the group's effective volume, which is the
//! product of the volumes along the path to the root and zero while any
//! group on that path is muted.
//!
//! The group tree is fixed once the mixer is loaded. Only per-group volume
//! and mute state change at runtime.

use crate::assets::{Asset, AssetError};
use crate::config::Config;
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::rc::Rc;

/// Serializable description of a mixer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixerDefinition {
    /// Mixer name
    pub name: String,
    /// Root groups, usually a single `Master`
    pub groups: Vec<GroupDefinition>,
}

/// Serializable description of one mixer group and its children
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupDefinition {
    /// Group name (one path segment)
    pub name: String,
    /// Initial volume (0.0 to 1.0)
    #[serde(default = "default_group_volume")]
    pub volume: f32,
    /// Initial mute state
    #[serde(default)]
    pub muted: bool,
    /// Child groups
    #[serde(default)]
    pub children: Vec<GroupDefinition>,
}

fn default_group_volume() -> f32 {
    1.0
}

impl GroupDefinition {
    /// Group at full volume with no children
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            volume: 1.0,
            muted: false,
            children: Vec::new(),
        }
    }

    /// Set initial volume
    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }

    /// Append a child group
    pub fn with_child(mut self, child: GroupDefinition) -> Self {
        self.children.push(child);
        self
    }
}

impl Default for MixerDefinition {
    fn default() -> Self {
        Self {
            name: "Mixer".to_string(),
            groups: vec![GroupDefinition::new("Master")],
        }
    }
}

impl Config for MixerDefinition {}

/// One routing target inside a mixer
#[derive(Debug)]
pub struct MixerGroup {
    name: String,
    path: String,
    volume: Cell<f32>,
    muted: Cell<bool>,
    parent: Option<Rc<MixerGroup>>,
}

impl MixerGroup {
    /// Group name (last path segment)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Full path from the root, segments joined by `/`
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Parent group, `None` for roots
    pub fn parent(&self) -> Option<&Rc<MixerGroup>> {
        self.parent.as_ref()
    }

    /// Set volume for this group (0.0 to 1.0)
    pub fn set_volume(&self, volume: f32) {
        self.volume.set(volume.clamp(0.0, 1.0));
    }

    /// Volume of this group alone
    pub fn volume(&self) -> f32 {
        self.volume.get()
    }

    /// Mute this group and everything routed below it
    pub fn mute(&self) {
        self.muted.set(true);
    }

    /// Unmute this group
    pub fn unmute(&self) {
        self.muted.set(false);
    }

    /// Toggle mute state
    pub fn toggle_mute(&self) {
        self.muted.set(!self.muted.get());
    }

    /// Check if this group itself is muted
    pub fn is_muted(&self) -> bool {
        self.muted.get()
    }

    /// Volume after applying every ancestor's volume and mute state
    pub fn effective_volume(&self) -> f32 {
        if self.is_muted() {
            return 0.0;
        }
        let parent_volume = self.parent.as_ref().map_or(1.0, |parent| parent.effective_volume());
        self.volume() * parent_volume
    }
}

/// Audio mixer asset
#[derive(Debug)]
pub struct AudioMixer {
    name: String,
    groups: Vec<Rc<MixerGroup>>,
}

impl AudioMixer {
    /// Build a mixer from its definition; groups are stored depth-first
    pub fn from_definition(definition: &MixerDefinition) -> Self {
        let mut groups = Vec::new();
        for root in &definition.groups {
            Self::flatten(root, None, &mut groups);
        }
        Self {
            name: definition.name.clone(),
            groups,
        }
    }

    fn flatten(definition: &GroupDefinition, parent: Option<&Rc<MixerGroup>>, out: &mut Vec<Rc<MixerGroup>>) {
        let path = match parent {
            Some(parent) => format!("{}/{}", parent.path, definition.name),
            None => definition.name.clone(),
        };
        let group = Rc::new(MixerGroup {
            name: definition.name.clone(),
            path,
            volume: Cell::new(definition.volume.clamp(0.0, 1.0)),
            muted: Cell::new(definition.muted),
            parent: parent.cloned(),
        });
        out.push(Rc::clone(&group));

        for child in &definition.children {
            Self::flatten(child, Some(&group), out);
        }
    }

    /// Mixer name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All groups in depth-first declaration order
    pub fn groups(&self) -> &[Rc<MixerGroup>] {
        &self.groups
    }

    /// Group with exactly this path
    pub fn group(&self, path: &str) -> Option<Rc<MixerGroup>> {
        self.groups.iter().find(|group| group.path == path).cloned()
    }

    /// Groups whose path contains `sub_path` (case-insensitive)
    ///
    /// Results keep depth-first declaration order. No match is an empty
    /// vector, never an error.
    pub fn find_matching_groups(&self, sub_path: &str) -> Vec<Rc<MixerGroup>> {
        let needle = sub_path.to_lowercase();
        self.groups
            .iter()
            .filter(|group| group.path.to_lowercase().contains(&needle))
            .cloned()
            .collect()
    }
}

impl Asset for AudioMixer {
    fn from_bytes(bytes: &[u8]) -> Result<Self, AssetError> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| AssetError::InvalidData(format!("Mixer definition is not UTF-8: {e}")))?;
        let definition: MixerDefinition = ron::from_str(text)
            .map_err(|e| AssetError::Parse(e.to_string()))?;
        Ok(Self::from_definition(&definition))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn game_mixer() -> AudioMixer {
        let definition = MixerDefinition {
            name: "Game".to_string(),
            groups: vec![GroupDefinition::new("Master")
                .with_child(GroupDefinition::new("SFX").with_child(GroupDefinition::new("UI")))
                .with_child(GroupDefinition::new("Music").with_volume(0.5))],
        };
        AudioMixer::from_definition(&definition)
    }

    #[test]
    fn test_paths_are_depth_first() {
        let mixer = game_mixer();
        let paths: Vec<&str> = mixer.groups().iter().map(|g| g.path()).collect();
        assert_eq!(paths, vec!["Master", "Master/SFX", "Master/SFX/UI", "Master/Music"]);
    }

    #[test]
    fn test_find_matching_groups() {
        let mixer = game_mixer();

        let sfx = mixer.find_matching_groups("sfx");
        assert_eq!(sfx.len(), 2);
        assert_eq!(sfx[0].path(), "Master/SFX");

        assert!(mixer.find_matching_groups("Ambient").is_empty());
    }

    #[test]
    fn test_effective_volume_with_master() {
        let mixer = game_mixer();
        let master = mixer.group("Master").unwrap();
        let music = mixer.group("Master/Music").unwrap();

        master.set_volume(0.5);
        assert_relative_eq!(music.effective_volume(), 0.25);
    }

    #[test]
    fn test_volume_clamping() {
        let mixer = game_mixer();
        let sfx = mixer.group("Master/SFX").unwrap();

        sfx.set_volume(2.0);
        assert_eq!(sfx.volume(), 1.0);
        sfx.set_volume(-0.5);
        assert_eq!(sfx.volume(), 0.0);
    }

    #[test]
    fn test_muted_ancestor_silences_children() {
        let mixer = game_mixer();
        let sfx = mixer.group("Master/SFX").unwrap();
        let ui = mixer.group("Master/SFX/UI").unwrap();

        sfx.mute();
        assert_eq!(ui.effective_volume(), 0.0);
        sfx.toggle_mute();
        assert_eq!(ui.effective_volume(), 1.0);
    }

    #[test]
    fn test_parse_ron_definition() {
        let text = r#"(
            name: "Game",
            groups: [(name: "Master", children: [(name: "SFX", volume: 0.8)])],
        )"#;
        let mixer = AudioMixer::from_bytes(text.as_bytes()).unwrap();
        assert_eq!(mixer.name(), "Game");
        assert_relative_eq!(mixer.group("Master/SFX").unwrap().volume(), 0.8);
    }
}
