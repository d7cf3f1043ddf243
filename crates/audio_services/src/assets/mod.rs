//! Asset resolution boundary
//!
//! The audio layer never touches storage directly. It asks an
//! [`AssetResolver`] to turn an [`AssetKey`] (a string address or an opaque
//! [`AssetReference`]) into a loaded asset, and hands the resulting
//! [`LoadId`] back exactly once when it is done with it.
//!
//! Two resolvers ship with the crate:
//! - [`AssetCatalog`]: in-memory, reference counted, records every load and
//!   release (useful for hosts that preload and for tests)
//! - [`FileAssetResolver`]: reads clips and mixer definitions from disk

pub mod catalog;
pub mod file_resolver;

pub use catalog::AssetCatalog;
pub use file_resolver::FileAssetResolver;

use crate::audio::clip::AudioClip;
use crate::audio::mixer::AudioMixer;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

/// Opaque reference to an asset, independent of where it is stored
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetReference {
    guid: String,
}

impl AssetReference {
    /// Create a reference from its stable identifier
    pub fn new(guid: impl Into<String>) -> Self {
        Self { guid: guid.into() }
    }

    /// Stable identifier of the referenced asset
    pub fn guid(&self) -> &str {
        &self.guid
    }
}

impl fmt::Display for AssetReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.guid)
    }
}

/// Key understood by an [`AssetResolver`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AssetKey {
    /// Human readable address, e.g. `"sfx/beep"`
    Address(String),
    /// Opaque asset reference
    Reference(AssetReference),
}

impl AssetKey {
    /// Key for a string address
    pub fn address(address: impl Into<String>) -> Self {
        Self::Address(address.into())
    }
}

impl From<&str> for AssetKey {
    fn from(address: &str) -> Self {
        Self::Address(address.to_string())
    }
}

impl From<String> for AssetKey {
    fn from(address: String) -> Self {
        Self::Address(address)
    }
}

impl From<AssetReference> for AssetKey {
    fn from(reference: AssetReference) -> Self {
        Self::Reference(reference)
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Address(address) => write!(f, "address '{address}'"),
            Self::Reference(reference) => write!(f, "reference {reference}"),
        }
    }
}

/// Identifier of one outstanding load operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoadId(u64);

impl LoadId {
    /// Wrap a raw load counter value
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw counter value
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// A completed load: the asset plus the obligation to release it
///
/// Handles are deliberately not `Clone`: each load is released exactly once
/// through [`AssetResolver::release`].
#[derive(Debug)]
pub struct AssetHandle<T> {
    id: LoadId,
    key: AssetKey,
    asset: Rc<T>,
}

impl<T> AssetHandle<T> {
    /// Create a handle for a finished load
    pub fn new(id: LoadId, key: AssetKey, asset: Rc<T>) -> Self {
        Self { id, key, asset }
    }

    /// Load operation identifier
    pub fn id(&self) -> LoadId {
        self.id
    }

    /// Key the asset was loaded with
    pub fn key(&self) -> &AssetKey {
        &self.key
    }

    /// Shared access to the loaded asset
    pub fn asset(&self) -> &Rc<T> {
        &self.asset
    }
}

/// Asynchronous key to asset resolver with explicit release
///
/// `Ok(None)` means "nothing under this key" and is not an error; errors are
/// reserved for assets that exist but cannot be read or decoded.
#[async_trait(?Send)]
pub trait AssetResolver {
    /// Load an audio clip
    async fn load_clip(&self, key: &AssetKey) -> Result<Option<AssetHandle<AudioClip>>, AssetError>;

    /// Load an audio mixer
    async fn load_mixer(&self, key: &AssetKey) -> Result<Option<AssetHandle<AudioMixer>>, AssetError>;

    /// Release a previously returned handle; unknown ids are ignored
    fn release(&self, id: LoadId);
}

/// Asset trait for resources decodable from raw bytes
pub trait Asset: 'static {
    /// Load asset from raw bytes
    fn from_bytes(bytes: &[u8]) -> Result<Self, AssetError> where Self: Sized;
}

/// Asset loading errors
#[derive(Error, Debug)]
pub enum AssetError {
    /// Asset not found
    #[error("Asset not found: {0}")]
    NotFound(String),

    /// Invalid asset data
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Unsupported asset format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Definition file could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// The key names an asset of another kind
    #[error("{key} is not a {expected}")]
    WrongKind {
        /// Requested key
        key: String,
        /// Kind the caller asked for
        expected: &'static str,
    },

    /// IO error during asset loading
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
