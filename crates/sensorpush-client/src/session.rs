//! Credentials and access-token session state.

use std::fmt;
use std::time::{Duration, Instant};

/// Access-token lifetime granted by the API.
pub const TOKEN_LIFETIME: Duration = Duration::from_secs(600);

/// SensorPush account credentials.
///
/// Held in process memory for the lifetime of the client so the session
/// can be re-established after token expiry; never persisted.
#[derive(Clone)]
pub struct Credentials {
    /// Account email.
    pub username: String,
    /// Account password.
    pub password: String,
}

impl Credentials {
    /// Create a credentials pair.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// An authenticated session: bearer tokens plus their acquisition time.
#[derive(Debug, Clone)]
pub struct AuthState {
    /// Short-lived bearer token sent on every request.
    pub access_token: String,
    /// Granted alongside the access token but never exchanged; expiry
    /// triggers a full re-login instead.
    pub refresh_token: String,
    /// When the token pair was acquired.
    pub acquired_at: Instant,
}

impl AuthState {
    /// Record a freshly acquired token pair.
    pub fn new(access_token: String, refresh_token: String) -> Self {
        Self {
            access_token,
            refresh_token,
            acquired_at: Instant::now(),
        }
    }

    /// Whether the access token is still younger than its lifetime.
    pub fn is_fresh(&self) -> bool {
        self.acquired_at.elapsed() < TOKEN_LIFETIME
    }
}
