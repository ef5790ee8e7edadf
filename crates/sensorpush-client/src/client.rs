//! SensorPush API client: session lifecycle, request funnel, device
//! caches, and sample queries.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, error, warn};

use crate::cache::CacheEntry;
use crate::calibration;
use crate::error::Result;
use crate::session::{AuthState, Credentials};
use crate::{
    API_URL, LIST_GATEWAYS_ENDPOINT, LIST_SENSORS_ENDPOINT, OAUTH_AUTHORIZE_ENDPOINT,
    OAUTH_TOKEN_ENDPOINT, QUERY_SAMPLES_ENDPOINT,
};

/// Default number of retries after the first attempt.
pub const DEFAULT_RETRY: u32 = 3;

/// Transport-level connect/read timeout.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT_VALUE: &str = concat!("sensorpush-client/", env!("CARGO_PKG_VERSION"));

/// First OAuth step: username/password for an authorization code.
#[derive(Debug, Deserialize)]
struct AuthorizeResponse {
    authorization: Option<String>,
}

/// Second OAuth step: authorization code for a token pair.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    accesstoken: Option<String>,
    refreshtoken: Option<String>,
}

/// Client for one SensorPush account.
///
/// Owns its HTTP transport and session state for its lifetime; intended
/// for single-threaded use. Construction performs the initial login; an
/// expired token is re-acquired transparently on the next data call.
pub struct SensorPushClient {
    http: HttpClient,
    base_url: String,
    credentials: Credentials,
    auth: Option<AuthState>,
    gateways: CacheEntry<Map<String, Value>>,
    sensors: CacheEntry<Map<String, Value>>,
}

impl SensorPushClient {
    /// Build a client against the production API and log in.
    ///
    /// A failed login leaves the client constructed but unauthenticated;
    /// data calls will re-attempt the login before querying.
    pub fn new(credentials: Credentials) -> Result<Self> {
        Self::with_base_url(credentials, API_URL)
    }

    /// Build a client against a non-default API root (staging, tests).
    pub fn with_base_url(credentials: Credentials, base_url: impl Into<String>) -> Result<Self> {
        let http = HttpClient::builder().timeout(HTTP_TIMEOUT).build()?;
        let mut client = Self {
            http,
            base_url: base_url.into(),
            credentials,
            auth: None,
            gateways: CacheEntry::default(),
            sensors: CacheEntry::default(),
        };
        client.login();
        Ok(client)
    }

    /// Log in with the stored credentials.
    ///
    /// Two-step OAuth exchange: username/password for an authorization
    /// code, then the code for an access/refresh token pair. Returns
    /// `false` and leaves the session unauthenticated when either step
    /// comes back without the expected field. The refresh token is
    /// stored but never exchanged; an expired session goes through the
    /// full exchange again.
    pub fn login(&mut self) -> bool {
        debug!("creating SensorPush session");
        self.auth = None;

        let mut params = Map::new();
        params.insert("email".into(), self.credentials.username.clone().into());
        params.insert("password".into(), self.credentials.password.clone().into());
        let authorization = self
            .request(
                OAUTH_AUTHORIZE_ENDPOINT,
                Method::POST,
                Some(params),
                None,
                DEFAULT_RETRY,
                false,
            )
            .and_then(|body| serde_json::from_value::<AuthorizeResponse>(body).ok())
            .and_then(|response| response.authorization);
        let Some(authorization) = authorization else {
            error!("login failed: no authorization code returned");
            return false;
        };

        let mut params = Map::new();
        params.insert("authorization".into(), authorization.into());
        let tokens = self
            .request(
                OAUTH_TOKEN_ENDPOINT,
                Method::POST,
                Some(params),
                None,
                DEFAULT_RETRY,
                false,
            )
            .and_then(|body| serde_json::from_value::<TokenResponse>(body).ok());
        let Some(TokenResponse {
            accesstoken: Some(access),
            refreshtoken: Some(refresh),
        }) = tokens
        else {
            error!("login failed: token exchange returned no token pair");
            return false;
        };

        self.auth = Some(AuthState::new(access, refresh));
        debug!("SensorPush session authenticated");
        true
    }

    /// Whether an access token is present and still fresh.
    pub fn is_connected(&self) -> bool {
        self.auth.as_ref().is_some_and(AuthState::is_fresh)
    }

    /// Send one API request and decode its JSON body.
    ///
    /// Headers and parameters start from a fresh base set on every call;
    /// caller extras are overlaid on top, so nothing carries over from a
    /// previous request. With `force_login` set, a stale session is
    /// re-established first. The call is attempted up to `retry + 1`
    /// times; the first 200 response wins, and exhausting all attempts
    /// yields `None` rather than an error. Methods other than GET, PUT,
    /// and POST are a caller error: logged and short-circuited with no
    /// request sent.
    pub fn request(
        &mut self,
        endpoint: &str,
        method: Method,
        extra_params: Option<Map<String, Value>>,
        extra_headers: Option<HeaderMap>,
        retry: u32,
        force_login: bool,
    ) -> Option<Value> {
        if force_login && !self.is_connected() {
            debug!("session missing or expired, logging in again");
            self.login();
        }

        if !matches!(method, Method::GET | Method::PUT | Method::POST) {
            error!("unsupported HTTP method {}, request not sent", method);
            return None;
        }

        let mut params = Map::new();
        if let Some(extra) = extra_params {
            params.extend(extra);
        }
        let mut headers = self.base_headers();
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let url = format!("{}{}", self.base_url, endpoint);
        for attempt in 0..=retry {
            debug!("querying {} (attempt {}/{})", url, attempt + 1, retry + 1);

            let mut builder = self
                .http
                .request(method.clone(), &url)
                .headers(headers.clone());
            if method != Method::GET {
                builder = builder.json(&params);
            }

            match builder.send() {
                Ok(response) if response.status() == StatusCode::OK => {
                    match response.json::<Value>() {
                        Ok(body) => return Some(body),
                        Err(err) => warn!("response from {} was not valid JSON: {}", url, err),
                    }
                }
                Ok(response) => {
                    warn!("request to {} returned status {}", url, response.status());
                }
                Err(err) => warn!("request to {} failed: {}", url, err),
            }
        }

        warn!("giving up on {} after {} attempts", url, retry + 1);
        None
    }

    /// Gateways registered to the account, fetched once and then served
    /// from cache until an explicit [`refresh`](Self::refresh).
    pub fn gateways(&mut self) -> Option<&Map<String, Value>> {
        if self.gateways.needs_fetch() {
            if let Some(listing) = self.fetch_devices(LIST_GATEWAYS_ENDPOINT) {
                self.gateways.populate(listing);
            }
        }
        self.gateways.value()
    }

    /// Sensors registered to the account, fetched once and then served
    /// from cache until an explicit [`refresh`](Self::refresh).
    pub fn sensors(&mut self) -> Option<&Map<String, Value>> {
        if self.sensors.needs_fetch() {
            if let Some(listing) = self.fetch_devices(LIST_SENSORS_ENDPOINT) {
                self.sensors.populate(listing);
            }
        }
        self.sensors.value()
    }

    fn fetch_devices(&mut self, endpoint: &str) -> Option<Map<String, Value>> {
        let body = self.request(endpoint, Method::POST, None, None, DEFAULT_RETRY, true)?;
        match body {
            Value::Object(listing) => Some(listing),
            _ => {
                warn!("device listing from {} was not a JSON object", endpoint);
                None
            }
        }
    }

    /// Query recent samples, at most `limit` per sensor, optionally
    /// bounded to a time range.
    ///
    /// The decoded response is enriched in place with calibrated
    /// humidity/temperature values from the current sensor metadata
    /// before being returned; sample responses are never cached. The API
    /// documents a maximum `limit` of 20 but this client does not
    /// enforce it.
    pub fn samples(
        &mut self,
        limit: u32,
        start_time: Option<DateTime<Utc>>,
        stop_time: Option<DateTime<Utc>>,
    ) -> Option<Value> {
        let mut params = Map::new();
        params.insert("limit".into(), limit.into());
        if let Some(start) = start_time {
            params.insert("startTime".into(), format_bound(&start).into());
        }
        if let Some(stop) = stop_time {
            params.insert("stopTime".into(), format_bound(&stop).into());
        }

        let mut body = self.request(
            QUERY_SAMPLES_ENDPOINT,
            Method::POST,
            Some(params),
            None,
            DEFAULT_RETRY,
            true,
        )?;

        let empty = Map::new();
        let sensors = match self.sensors() {
            Some(sensors) => sensors,
            None => {
                warn!("sensor metadata unavailable, calibrating with zero offsets");
                &empty
            }
        };
        calibration::apply_offsets(&mut body, sensors);
        Some(body)
    }

    /// Force a new login, then clear and refetch the flagged caches.
    pub fn refresh(&mut self, update_gateways: bool, update_sensors: bool) {
        self.login();
        if update_gateways {
            self.gateways.invalidate();
            let _ = self.gateways();
        }
        if update_sensors {
            self.sensors.invalidate();
            let _ = self.sensors();
        }
    }

    fn base_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(auth) = &self.auth {
            if let Ok(token) = HeaderValue::from_str(&auth.access_token) {
                headers.insert(AUTHORIZATION, token);
            }
        }
        headers
    }
}

/// Timestamp format the samples endpoint expects for range bounds.
fn format_bound(when: &DateTime<Utc>) -> String {
    when.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}
