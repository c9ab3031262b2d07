//! Retrying command executor

use super::Outcome;
use crate::config::LiveConfig;
use crate::vehicle::{Operation, Vehicle};
use tracing::{debug, error, warn};

/// Runs one remote operation under the configured retry policy
///
/// The policy is read from the live config at the start of every call, so a
/// reload applies from the next request on. Requests already retrying keep
/// the policy they started with.
pub struct RetryingExecutor {
    config: LiveConfig,
}

impl RetryingExecutor {
    /// Create a new executor
    pub fn new(config: LiveConfig) -> Self {
        Self { config }
    }

    /// Attempt `operation` until it succeeds or the attempt bound is reached
    ///
    /// Attempts are separated by a fixed delay. No delay follows the last
    /// failed attempt.
    pub async fn execute(&self, vehicle: &dyn Vehicle, operation: Operation) -> Outcome {
        let policy = self.config.snapshot().await.retry_policy();
        let mut attempts = 0;
        let mut last_error = None;

        while attempts < policy.max_attempts {
            match operation.apply(vehicle).await {
                Ok(()) => {
                    debug!(
                        "{} on {} succeeded (attempt {}/{})",
                        operation,
                        vehicle.display_name(),
                        attempts + 1,
                        policy.max_attempts
                    );
                    return Outcome::Success;
                }
                Err(e) => {
                    attempts += 1;
                    warn!(
                        "{} on {} failed (attempt {}/{}): {}",
                        operation,
                        vehicle.display_name(),
                        attempts,
                        policy.max_attempts,
                        e
                    );
                    last_error = Some(e);

                    if attempts < policy.max_attempts {
                        tokio::time::sleep(policy.delay).await;
                    }
                }
            }
        }

        match &last_error {
            Some(e) => error!(
                "{} on {} failed after {} attempts: {}",
                operation,
                vehicle.display_name(),
                attempts,
                e
            ),
            None => error!(
                "{} on {} not attempted: retries is 0",
                operation,
                vehicle.display_name()
            ),
        }

        Outcome::RemoteFailure { last_error }
    }
}
