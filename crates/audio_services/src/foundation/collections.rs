//! Specialized collection types

pub use slotmap::{SlotMap, new_key_type};

new_key_type! {
    /// Stable key for objects living in a [`HandleMap`]
    pub struct Handle;
}

/// Handle-based map using slot map for stable references
pub type HandleMap<T> = SlotMap<Handle, T>;
