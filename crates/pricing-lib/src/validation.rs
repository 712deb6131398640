//! Request payload validation
//!
//! Turns an unordered feature-name → value mapping into a single row in
//! the exact column order the pipeline expects. Extra keys are dropped.
//! Missing keys are reported on their own; null and non-numeric values are
//! reported together, every offending name listed.

use crate::error::ValidationError;
use crate::models::PredictionRequest;
use crate::schema::ExpectedSchema;
use serde_json::{Map, Value};

/// Raw caller payload
pub type InputPayload = Map<String, Value>;

/// Outcome of coercing one payload value
enum Coerced {
    Number(f64),
    Missing,
    NotNumeric,
}

/// Accepts JSON numbers and numeric strings; null and NaN count as missing.
fn coerce(value: &Value) -> Coerced {
    let number = match value {
        Value::Null => return Coerced::Missing,
        Value::Number(n) => n.as_f64(),
        Value::String(s) => match s.trim() {
            "" => return Coerced::Missing,
            trimmed => trimmed.parse::<f64>().ok(),
        },
        _ => None,
    };

    match number {
        Some(v) if v.is_nan() => Coerced::Missing,
        Some(v) if v.is_finite() => Coerced::Number(v),
        _ => Coerced::NotNumeric,
    }
}

/// Build the ordered prediction row for `payload`.
pub fn build_request_row(
    payload: &InputPayload,
    schema: &ExpectedSchema,
) -> Result<PredictionRequest, ValidationError> {
    let mut missing: Vec<String> = schema
        .features()
        .iter()
        .filter(|name| !payload.contains_key(name.as_str()))
        .cloned()
        .collect();
    if !missing.is_empty() {
        missing.sort();
        return Err(ValidationError::MissingFeatures { features: missing });
    }

    let mut values = Vec::with_capacity(schema.len());
    let mut null_values = Vec::new();
    let mut non_numeric = Vec::new();

    for name in schema.features() {
        match coerce(&payload[name.as_str()]) {
            Coerced::Number(v) => values.push(v),
            Coerced::Missing => null_values.push(name.clone()),
            Coerced::NotNumeric => non_numeric.push(name.clone()),
        }
    }

    match (null_values.is_empty(), non_numeric.is_empty()) {
        (true, true) => Ok(PredictionRequest::new(schema.shared(), values)),
        (false, true) => Err(ValidationError::MissingValues {
            features: null_values,
        }),
        (true, false) => Err(ValidationError::NonNumericValues {
            features: non_numeric,
        }),
        (false, false) => Err(ValidationError::InvalidValues {
            missing_values: null_values,
            non_numeric,
        }),
    }
}

/// Same as [`build_request_row`] for an arbitrary JSON value.
pub fn build_request_row_from_value(
    payload: &Value,
    schema: &ExpectedSchema,
) -> Result<PredictionRequest, ValidationError> {
    match payload {
        Value::Object(map) => build_request_row(map, schema),
        _ => Err(ValidationError::NotAnObject),
    }
}
