//! SensorPush Cloud API Client
//!
//! Client library for the SensorPush sensor-monitoring REST API:
//! authentication and session refresh, gateway/sensor discovery, and
//! temperature/humidity sample queries with per-sensor calibration
//! offsets applied to raw readings.

pub mod cache;
pub mod calibration;
pub mod client;
pub mod error;
pub mod session;

pub use client::{SensorPushClient, DEFAULT_RETRY};
pub use error::{Error, Result};
pub use session::Credentials;

/// Base URL for the SensorPush cloud API.
pub const API_URL: &str = "https://api.sensorpush.com/api/v1";

/// Endpoint path suffixes, appended to the base URL.
pub const OAUTH_AUTHORIZE_ENDPOINT: &str = "/oauth/authorize";
pub const OAUTH_TOKEN_ENDPOINT: &str = "/oauth/accesstoken";
pub const LIST_GATEWAYS_ENDPOINT: &str = "/devices/gateways";
pub const LIST_SENSORS_ENDPOINT: &str = "/devices/sensors";
pub const QUERY_SAMPLES_ENDPOINT: &str = "/samples";
