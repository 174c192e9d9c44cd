//! Threshold-crossing alert engine for aquarium sensors.
//!
//! The crate is the single implementation of the alert rules shared by every
//! process that evaluates readings:
//! - [`policy`] decides, per sensor kind, when a reading fires an alert
//!   (classification, edge-triggering, cooldown)
//! - [`dispatch`] fans a fired [`AlertDecision`] out to push, email and the
//!   activity log
//! - [`monitor`] serializes evaluations per kind and wires the two together
//!
//! The remaining modules (`config`, `store`, `schema`, `routes`) make up the
//! HTTP trigger service built by `main.rs`.

pub mod channels;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod models;
pub mod monitor;
pub mod policy;
pub mod routes;
pub mod schema;
pub mod store;

pub use config::Config;
pub use dispatch::{DispatchResult, Dispatcher, RecipientSet};
pub use error::{AlertError, ChannelError};
pub use models::{AlertDecision, SensorKind, SensorReading, Severity, ThresholdConfig, ThresholdRange};
pub use monitor::{Alert, Monitor, RecipientSource};
pub use policy::PolicyEngine;
