//! Error types for the SensorPush client library.
//!
//! Only client construction is fallible. Requests on an established
//! client degrade to `None` plus log output instead of raising; see
//! [`crate::client::SensorPushClient::request`].

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when constructing a client.
#[derive(Error, Debug)]
pub enum Error {
    /// The HTTP transport could not be built.
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),
}
