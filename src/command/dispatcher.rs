//! Request dispatcher: route, parse, authenticate, resolve, bind, execute

use super::validate::{self, ParsedParams};
use super::{ClientError, CommandDescriptor, Outcome, RetryingExecutor};
use crate::auth::TokenAuthenticator;
use crate::config::LiveConfig;
use crate::vehicle::{Operation, Vehicle};
use relay_shared::{Request, Response};
use std::sync::Arc;
use tracing::debug;

/// Turns command requests into outcomes
///
/// Every command goes through the same steps, stopping at the first error:
/// 1. parse path parameters (`400 bad request`)
/// 2. authenticate the body (`403 unauthorized`)
/// 3. resolve the vehicle index (`404 vehicle not found`)
/// 4. command-specific range checks (`400` with a specific reason)
/// 5. execute with retry (`502` once attempts are exhausted)
pub struct Dispatcher {
    config: LiveConfig,
    authenticator: TokenAuthenticator,
    executor: RetryingExecutor,
    vehicles: Vec<Arc<dyn Vehicle>>,
}

impl Dispatcher {
    /// Create a dispatcher over a fixed vehicle list
    pub fn new(config: LiveConfig, vehicles: Vec<Arc<dyn Vehicle>>) -> Self {
        Self {
            authenticator: TokenAuthenticator::new(config.clone()),
            executor: RetryingExecutor::new(config.clone()),
            config,
            vehicles,
        }
    }

    pub fn vehicle_count(&self) -> usize {
        self.vehicles.len()
    }

    /// Handle a decoded HTTP request
    pub async fn handle(&self, request: &Request) -> Response {
        self.dispatch(&request.method, &request.path, &request.body)
            .await
            .to_response()
    }

    /// Run one command request to its terminal outcome
    pub async fn dispatch(&self, method: &str, path: &str, body: &[u8]) -> Outcome {
        let (descriptor, params) = match route(method, path) {
            Ok(routed) => routed,
            Err(e) => return e.into(),
        };

        match self.prepare(descriptor, params, body).await {
            Ok((vehicle, operation)) => {
                debug!("Dispatching {} to {}", operation, vehicle.display_name());
                self.executor.execute(vehicle.as_ref(), operation).await
            }
            Err(e) => e.into(),
        }
    }

    async fn prepare(
        &self,
        descriptor: &CommandDescriptor,
        params: ParsedParams,
        body: &[u8],
    ) -> Result<(Arc<dyn Vehicle>, Operation), ClientError> {
        if !self.authenticator.authenticate(body).await {
            return Err(ClientError::Unauthorized);
        }

        let vehicle = self.resolve(params.vehicle)?;

        let metric = self.config.snapshot().await.metric;
        let operation = validate::bind(descriptor.binding, params.value, metric)?;

        Ok((vehicle, operation))
    }

    fn resolve(&self, index: i64) -> Result<Arc<dyn Vehicle>, ClientError> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.vehicles.get(i))
            .cloned()
            .ok_or(ClientError::VehicleNotFound)
    }
}

/// Match the path against the command table and parse its parameters
fn route(
    method: &str,
    path: &str,
) -> Result<(&'static CommandDescriptor, ParsedParams), ClientError> {
    let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();

    let descriptor = segments
        .first()
        .and_then(|name| CommandDescriptor::lookup(name))
        .ok_or(ClientError::UnknownRoute)?;

    if segments.len() != descriptor.param_count() + 1 {
        return Err(ClientError::UnknownRoute);
    }
    if method != "POST" {
        return Err(ClientError::MethodNotAllowed);
    }

    let params = validate::parse(descriptor, &segments[1..])?;
    Ok((descriptor, params))
}
