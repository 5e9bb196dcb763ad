//! HTTP request handlers for all API endpoints.
//!
//! - [`endpoints`]: Endpoint registration, listing, and activation
//! - [`monitoring`]: Monitoring configuration, checks, results, statistics, and reports
//! - [`alerts`]: Alert listing and resolution
//! - [`events`]: Event log listing and clearing

pub mod alerts;
pub mod endpoints;
pub mod events;
pub mod monitoring;
