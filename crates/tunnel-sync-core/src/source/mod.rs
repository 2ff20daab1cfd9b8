//! Desired-state source implementations
//!
//! This module provides built-in implementations of the RouteSource trait.

pub mod file;
pub mod memory;

pub use file::{FileRouteSource, parse_routes, validate_routes};
pub use memory::StaticRouteSource;
