//! The monitoring and alerting engine.
//!
//! Pipeline for each check: [`prober`] issues the HTTP request, [`history`]
//! records the result and derives rolling statistics, [`evaluator`] compares
//! them against the endpoint's thresholds, and [`engine`] applies the resulting
//! alert actions to the [`alerts`] store while writing an audit trail to
//! [`events`].

pub mod alerts;
pub mod engine;
pub mod evaluator;
pub mod events;
pub mod history;
pub mod models;
pub mod prober;

pub use engine::MonitorEngine;
pub use prober::{HttpProber, Prober};
