//! Terminal result of a command request

use crate::vehicle::VehicleError;
use relay_shared::{Response, StatusCode};
use thiserror::Error;

/// Request problems that are the caller's fault
///
/// The display text is the short reason sent back in the response body.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientError {
    #[error("bad request")]
    BadRequest,

    #[error("unauthorized")]
    Unauthorized,

    #[error("vehicle not found")]
    VehicleNotFound,

    #[error("invalid charge limit")]
    InvalidChargeLimit,

    #[error("not found")]
    UnknownRoute,

    #[error("method not allowed")]
    MethodNotAllowed,
}

impl ClientError {
    pub fn status(&self) -> StatusCode {
        match self {
            ClientError::BadRequest | ClientError::InvalidChargeLimit => StatusCode::BadRequest,
            ClientError::Unauthorized => StatusCode::Forbidden,
            ClientError::VehicleNotFound | ClientError::UnknownRoute => StatusCode::NotFound,
            ClientError::MethodNotAllowed => StatusCode::MethodNotAllowed,
        }
    }
}

/// Outcome of one command request, produced exactly once
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success,
    ClientError(ClientError),
    /// Every attempt failed; `last_error` is `None` only when the retry
    /// bound allowed no attempt at all
    RemoteFailure { last_error: Option<VehicleError> },
}

impl Outcome {
    /// Render as a plain-text response; remote error details stay server-side
    pub fn to_response(&self) -> Response {
        match self {
            Outcome::Success => Response::ok(),
            Outcome::ClientError(err) => Response::text(err.status(), err.to_string()),
            Outcome::RemoteFailure { .. } => {
                Response::text(StatusCode::BadGateway, "remote command failed")
            }
        }
    }
}

impl From<ClientError> for Outcome {
    fn from(err: ClientError) -> Self {
        Outcome::ClientError(err)
    }
}
