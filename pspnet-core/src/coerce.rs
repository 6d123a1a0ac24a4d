//! Lax value coercion for dynamic field overrides.
//!
//! Numeric fields accept numbers and numeric strings, string and path fields
//! accept strings only. Anything else is rejected with a [`ValidationError`]
//! naming the field, the expected type and the offending value.

use serde_json::Value;
use std::path::PathBuf;

use crate::error::ValidationError;

pub(crate) fn string(field: &str, value: &Value) -> Result<String, ValidationError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        other => Err(ValidationError::new(field, "string", other.to_string())),
    }
}

pub(crate) fn path(field: &str, value: &Value) -> Result<PathBuf, ValidationError> {
    match value {
        Value::String(s) => Ok(PathBuf::from(s)),
        other => Err(ValidationError::new(field, "path", other.to_string())),
    }
}

/// Coerce to an unsigned integer type. Floats must have no fractional part.
pub(crate) fn unsigned<T>(field: &str, value: &Value) -> Result<T, ValidationError>
where
    T: TryFrom<u64>,
{
    let expected = std::any::type_name::<T>();
    let reject = || ValidationError::new(field, expected, value.to_string());

    let raw = match value {
        Value::Number(n) => match n.as_u64() {
            Some(u) => u,
            None => {
                let f = n.as_f64().ok_or_else(reject)?;
                // 2^64 is exactly representable; anything at or above it overflows.
                if f.fract() != 0.0 || f < 0.0 || f >= 18_446_744_073_709_551_616.0 {
                    return Err(reject());
                }
                f as u64
            }
        },
        Value::String(s) => s.trim().parse::<u64>().map_err(|_| reject())?,
        _ => return Err(reject()),
    };

    T::try_from(raw).map_err(|_| reject())
}

pub(crate) fn float(field: &str, value: &Value) -> Result<f64, ValidationError> {
    let reject = || ValidationError::new(field, "float", value.to_string());
    match value {
        Value::Number(n) => n.as_f64().ok_or_else(reject),
        Value::String(s) => s.trim().parse::<f64>().map_err(|_| reject()),
        _ => Err(reject()),
    }
}
