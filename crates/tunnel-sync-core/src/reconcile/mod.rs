//! Pure reconciliation functions
//!
//! - [`reconcile_routes`]: desired vs. actual tunnel routes
//! - [`reconcile_dns`]: required hostnames vs. managed DNS records
//!
//! Both are stateless and side-effect free; every run re-derives its
//! actions from the two snapshots it is given.

pub mod dns;
pub mod routes;

pub use dns::{DnsActionSet, reconcile_dns};
pub use routes::{RouteActionSet, reconcile_routes};
