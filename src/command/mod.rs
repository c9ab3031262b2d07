//! Command dispatch and retry
//!
//! This module handles:
//! - The table of supported commands and the remote call each maps to
//! - Parsing and range-checking path parameters
//! - Running the remote call under the configured retry policy
//! - Turning every request into exactly one terminal outcome

mod descriptor;
mod dispatcher;
mod executor;
mod outcome;
pub mod validate;

pub use descriptor::{Binding, CommandDescriptor, COMMANDS};
pub use dispatcher::Dispatcher;
pub use executor::RetryingExecutor;
pub use outcome::{ClientError, Outcome};
