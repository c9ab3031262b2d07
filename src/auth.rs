//! Shared-secret token authentication
//!
//! A request is authorized when its body decodes to `{"AuthToken": "..."}`
//! and the token is in the currently loaded `auth_tokens` list. The check is
//! a plain equality test; it is a shared-secret gate with no timing-attack
//! hardening.

use crate::config::LiveConfig;
use relay_shared::AuthToken;
use tracing::{debug, warn};

pub struct TokenAuthenticator {
    config: LiveConfig,
}

impl TokenAuthenticator {
    pub fn new(config: LiveConfig) -> Self {
        Self { config }
    }

    /// Check the credential in a raw request body against the current token set
    ///
    /// Never fails: a missing or malformed body is simply rejected.
    pub async fn authenticate(&self, body: &[u8]) -> bool {
        if body.is_empty() {
            warn!("Missing body, can't authenticate request");
            return false;
        }

        let credential = match AuthToken::from_body(body) {
            Ok(credential) => credential,
            Err(e) => {
                warn!("Malformed body, can't authenticate request: {}", e);
                return false;
            }
        };

        let settings = self.config.snapshot().await;
        if is_accepted(&settings.auth_tokens, &credential.auth_token) {
            debug!("Token accepted");
            true
        } else {
            warn!(
                "Invalid token ({} chars) rejected",
                credential.auth_token.chars().count()
            );
            false
        }
    }
}

/// Binary search for `candidate` in an already sorted token list
pub fn is_accepted(sorted_tokens: &[String], candidate: &str) -> bool {
    sorted_tokens
        .binary_search_by(|token| token.as_str().cmp(candidate))
        .is_ok()
}
