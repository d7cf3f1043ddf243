//! # Audio Services
//!
//! Sound lifecycle management for game engines: build, configure, play and
//! tear down discrete sounds backed by asynchronously loaded clips and
//! optional mixer routing.
//!
//! ## Features
//!
//! - **Fluent Builder**: chain configuration, then `build().await`
//! - **Async Asset Resolution**: inline clips, string addresses or opaque
//!   references, released exactly once on unload
//! - **Tween Queue**: FIFO, time-driven parameter modifiers such as fades
//! - **Completion Tracking**: `completed` signal and `play_async` futures
//! - **Registry**: query live sounds by id or predicate
//! - **Pluggable Backends**: headless recorder or rodio output
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use audio_services::prelude::*;
//! use futures::executor::block_on;
//! use std::rc::Rc;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AudioServiceConfig::load_from_file("audio.toml")?;
//!     logging::init(&config.log_level);
//!
//!     let service = AudioService::from_config(&config)?;
//!     let sound = block_on(
//!         service
//!             .create_builder("beep")
//!             .with_asset_address("sfx/beep")
//!             .with_volume(0.5)
//!             .build(),
//!     )?;
//!     let done = sound.play_async()?;
//!
//!     let mut timer = FrameTimer::new();
//!     while sound.is_playing() {
//!         service.update(timer.tick());
//!     }
//!     block_on(done)?;
//!
//!     sound.unload();
//!     service.shutdown();
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod foundation;
pub mod events;
pub mod assets;
pub mod audio;
pub mod scene;
pub mod config;

/// Common imports for crate users
pub mod prelude {
    pub use crate::{
        foundation::{
            logging,
            math::Vec3,
            time::{Clock, FrameTimer, ManualClock, SystemClock},
        },
        events::{Signal, SubscriptionId},
        assets::{AssetCatalog, AssetError, AssetKey, AssetReference, AssetResolver, FileAssetResolver},
        audio::{
            AudioBackend, AudioClip, AudioError, AudioHost, AudioMixer, AudioService, AudioSource,
            FadeVolumeTween, HeadlessBackend, MixerGroup, PlayCompletion, RolloffMode, Sound,
            SoundBuilder, SoundState, SoundTween,
        },
        scene::{SceneGraph, SceneHost, SceneObjectId},
        config::{AudioServiceConfig, Config, SoundDefaults},
    };
}
