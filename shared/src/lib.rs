//! Vehicle Relay Shared Wire Types
//!
//! This crate provides the wire-level types shared by the relay server and
//! anything that talks to it: the HTTP/1.1 codec, status codes, the
//! credential body and the default settings.

pub mod codec;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use codec::{Request, RequestDecoder, Response};

/// Default values for every recognized configuration key
pub mod defaults {
    /// Remote call attempts per request
    pub const RETRIES: u32 = 3;

    /// Fixed delay between remote call attempts
    pub const RETRY_DELAY_MS: u64 = 1000;

    /// Temperatures in request paths are Celsius
    pub const METRIC: bool = true;

    /// Listen address
    pub const BIND: &str = "0.0.0.0";

    /// Listen port
    pub const PORT: u16 = 3514;

    /// Size of the development fleet
    pub const SIMULATED_VEHICLES: usize = 1;

    /// Idle time after which a simulated vehicle falls asleep
    pub const SIMULATED_SLEEP_AFTER_MS: u64 = 10 * 60 * 1000;

    /// How often the config file is checked for changes
    pub const CONFIG_POLL_INTERVAL_MS: u64 = 2000;

    /// Idle keep-alive connections are closed after this long
    pub const IDLE_TIMEOUT_MS: u64 = 30_000;

    /// Config file base name searched for at startup
    pub const CONFIG_NAME: &str = "relay";
}

/// Credential body carried by every command request
///
/// ```json
/// {"AuthToken": "<token>"}
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthToken {
    #[serde(rename = "AuthToken")]
    pub auth_token: String,
}

impl AuthToken {
    /// Decode the credential from a raw request body
    pub fn from_body(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthToken")
            .field("auth_token", &"<redacted>")
            .finish()
    }
}

/// HTTP status codes the relay answers with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    Ok,
    BadRequest,
    Forbidden,
    NotFound,
    MethodNotAllowed,
    PayloadTooLarge,
    BadGateway,
}

impl StatusCode {
    /// Numeric status code
    pub fn code(self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::BadRequest => 400,
            StatusCode::Forbidden => 403,
            StatusCode::NotFound => 404,
            StatusCode::MethodNotAllowed => 405,
            StatusCode::PayloadTooLarge => 413,
            StatusCode::BadGateway => 502,
        }
    }

    /// Canonical reason phrase for the status line
    pub fn reason_phrase(self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::Forbidden => "Forbidden",
            StatusCode::NotFound => "Not Found",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
            StatusCode::PayloadTooLarge => "Payload Too Large",
            StatusCode::BadGateway => "Bad Gateway",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code(), self.reason_phrase())
    }
}
