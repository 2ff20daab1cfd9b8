//! Core traits for the tunnel sync system
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`RouteSource`]: Load the desired route set
//! - [`TunnelBackend`]: Read and replace routes at the remote system
//! - [`DnsBackend`]: Read and mutate DNS records at the remote system

pub mod backend;
pub mod route_source;

pub use backend::{DnsBackend, TunnelBackend};
pub use route_source::RouteSource;
