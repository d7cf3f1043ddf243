//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the crate:
//! - Math types for positioning sounds
//! - Handle collections for scene objects
//! - Monotonic clocks and frame timing
//! - Logging initialization

pub mod math;
pub mod collections;
pub mod time;
pub mod logging;
