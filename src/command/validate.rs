//! Path parameter parsing and range checks
//!
//! Parsing is purely syntactic and happens before authentication. Range
//! checks that need runtime state (does the vehicle exist) or that carry a
//! specific reason (charge limit) run afterwards, in [`bind`].

use super::{Binding, ClientError, CommandDescriptor};
use crate::vehicle::Operation;

/// Syntactically valid path parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParsedParams {
    /// Zero-based vehicle index; may be out of range or negative
    pub vehicle: i64,
    pub value: ParamValue,
}

/// The command-specific extra parameter, parsed but not yet range-checked
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    None,
    Integer(i64),
    Number(f64),
}

/// Parse the segments following the command name
pub fn parse(
    descriptor: &CommandDescriptor,
    segments: &[&str],
) -> Result<ParsedParams, ClientError> {
    if segments.len() != descriptor.param_count() {
        return Err(ClientError::BadRequest);
    }

    let vehicle = parse_integer(segments[0])?;
    let value = match descriptor.binding {
        Binding::Fixed(_) => ParamValue::None,
        Binding::ChargeLimit => ParamValue::Integer(parse_integer(segments[1])?),
        Binding::Temperature => ParamValue::Number(parse_number(segments[1])?),
    };

    Ok(ParsedParams { vehicle, value })
}

/// ASCII digits with an optional leading `-`; no `+` sign
fn parse_integer(segment: &str) -> Result<i64, ClientError> {
    let digits = segment.strip_prefix('-').unwrap_or(segment);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ClientError::BadRequest);
    }
    segment.parse().map_err(|_| ClientError::BadRequest)
}

fn parse_number(segment: &str) -> Result<f64, ClientError> {
    match segment.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(ClientError::BadRequest),
    }
}

/// Accept `0 < limit <= 100`
pub fn check_charge_limit(limit: i64) -> Result<u8, ClientError> {
    if limit > 0 && limit <= 100 {
        Ok(limit as u8)
    } else {
        Err(ClientError::InvalidChargeLimit)
    }
}

/// Convert a path temperature to Celsius for the remote API
pub fn to_celsius(value: f64, metric: bool) -> f64 {
    if metric {
        value
    } else {
        (value - 32.0) / 1.8
    }
}

/// Range-check the parameter and bind it to the descriptor's remote call
pub fn bind(binding: Binding, value: ParamValue, metric: bool) -> Result<Operation, ClientError> {
    match (binding, value) {
        (Binding::Fixed(operation), _) => Ok(operation),
        (Binding::ChargeLimit, ParamValue::Integer(limit)) => {
            Ok(Operation::SetChargeLimit(check_charge_limit(limit)?))
        }
        (Binding::Temperature, ParamValue::Number(temp)) => {
            Ok(Operation::SetTemperature(to_celsius(temp, metric)))
        }
        _ => Err(ClientError::BadRequest),
    }
}
