//! Client for the remote patient-monitoring backend: typed REST access,
//! the login session, role guards, vital-sign rules, the messaging inbox
//! and the live vitals demo simulator.

pub mod api;
pub mod config;
pub mod credentials;
pub mod dashboard;
pub mod error;
pub mod graceful_shutdown;
pub mod guard;
pub mod http_utils;
pub mod messaging;
pub mod models;
pub mod session;
pub mod simulator;
pub mod vitals;

pub use api::ApiClient;
pub use config::Config;
pub use error::{ApiError, ApiResult};
