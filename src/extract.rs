use crate::reader::Record;
use std::fmt;

/// Why a row was left out of the plot. Skips are values, not errors: the
/// pipelines log them at debug level and keep going.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    MissingField(String),
    NotNumeric { field: String, value: String },
    NotFinite { field: String, value: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingField(field) => write!(f, "missing field '{}'", field),
            SkipReason::NotNumeric { field, value } => {
                write!(f, "field '{}' is not numeric: '{}'", field, value)
            }
            SkipReason::NotFinite { field, value } => {
                write!(f, "field '{}' is not finite: '{}'", field, value)
            }
        }
    }
}

/// Extract a named field as a finite floating-point number.
pub fn numeric(record: &Record<'_>, field: &str) -> Result<f64, SkipReason> {
    let raw = record
        .get(field)
        .ok_or_else(|| SkipReason::MissingField(field.to_string()))?;
    let value: f64 = raw.trim().parse().map_err(|_| SkipReason::NotNumeric {
        field: field.to_string(),
        value: raw.to_string(),
    })?;
    if !value.is_finite() {
        return Err(SkipReason::NotFinite {
            field: field.to_string(),
            value: raw.to_string(),
        });
    }
    Ok(value)
}

/// Extract a named field as a raw string.
pub fn text<'a>(record: &Record<'a>, field: &str) -> Result<&'a str, SkipReason> {
    record
        .get(field)
        .ok_or_else(|| SkipReason::MissingField(field.to_string()))
}

/// ln(z + 1), the transform applied to heatmap z values under --log.
pub fn log1p(z: f64) -> f64 {
    (z + 1.0).ln()
}
