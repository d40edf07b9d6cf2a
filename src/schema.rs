//! Declared schema of the churn dataset and per-field type coercion.
//!
//! The column set is fixed and never inferred from the file. The reader trusts
//! that the source columns appear in exactly this order; a file whose header
//! differs will be silently misaligned, and no header check is attempted.

use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use log::trace;
use std::fmt;
use std::sync::Arc;

/// A single typed cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Str(String),
    Double(f64),
    Long(i64),
}

/// One record, positionally aligned with its schema.
pub type Row = Vec<Value>;

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(d) => Some(*d),
            Value::Long(l) => Some(*l as f64),
            _ => None,
        }
    }

    /// Text used for delimited output: nulls become empty fields.
    pub fn to_field(&self) -> String {
        match self {
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Str(s) => f.write_str(s),
            // Integral doubles keep one decimal place (`1.0`, not `1`).
            Value::Double(d) if d.is_finite() && d.fract() == 0.0 && d.abs() < 1e16 => {
                write!(f, "{d:.1}")
            }
            Value::Double(d) => write!(f, "{d}"),
            Value::Long(l) => write!(f, "{l}"),
        }
    }
}

const DOUBLE_COLUMNS: [&str; 3] = ["tenure", "MonthlyCharges", "TotalCharges"];

const COLUMNS: [&str; 21] = [
    "customerID",
    "gender",
    "SeniorCitizen",
    "Partner",
    "Dependents",
    "tenure",
    "PhoneService",
    "MultipleLines",
    "InternetService",
    "OnlineSecurity",
    "OnlineBackup",
    "DeviceProtection",
    "TechSupport",
    "StreamingTV",
    "StreamingMovies",
    "Contract",
    "PaperlessBilling",
    "PaymentMethod",
    "MonthlyCharges",
    "TotalCharges",
    "Churn",
];

/// The 21-column schema of the telco churn CSV. Every column is nullable.
pub fn telco_churn_schema() -> SchemaRef {
    let fields: Vec<Field> = COLUMNS
        .iter()
        .map(|name| {
            let dt = if DOUBLE_COLUMNS.contains(name) {
                DataType::Float64
            } else {
                DataType::Utf8
            };
            Field::new(*name, dt, true)
        })
        .collect();
    Arc::new(Schema::new(fields))
}

/// Column types the reader and writers know how to coerce.
pub fn is_supported(dt: &DataType) -> bool {
    matches!(dt, DataType::Utf8 | DataType::Float64 | DataType::Int64)
}

/// SQL-style name of a column type (`string`, `double`, `bigint`).
pub fn type_name(dt: &DataType) -> &'static str {
    match dt {
        DataType::Utf8 => "string",
        DataType::Float64 => "double",
        DataType::Int64 => "bigint",
        _ => "unsupported",
    }
}

/// Coerce one raw field to `dt`.
///
/// The null sentinel, blank fields and anything that fails to parse all become
/// [`Value::Null`]; coercion never fails.
pub fn coerce_field(raw: &str, dt: &DataType, null_value: Option<&str>) -> Value {
    if null_value == Some(raw) {
        return Value::Null;
    }
    match dt {
        DataType::Utf8 if raw.is_empty() => Value::Null,
        DataType::Utf8 => Value::Str(raw.to_string()),
        DataType::Float64 => {
            let t = raw.trim();
            if t.is_empty() {
                return Value::Null;
            }
            t.parse::<f64>().map(Value::Double).unwrap_or_else(|_| {
                trace!("'{raw}' is not a double; storing null");
                Value::Null
            })
        }
        DataType::Int64 => {
            let t = raw.trim();
            if t.is_empty() {
                return Value::Null;
            }
            t.parse::<i64>().map(Value::Long).unwrap_or_else(|_| {
                trace!("'{raw}' is not a bigint; storing null");
                Value::Null
            })
        }
        _ => Value::Null,
    }
}

/// Coerce a raw record to a [`Row`] aligned with `schema`.
///
/// Missing trailing fields become null and surplus fields are dropped.
pub fn coerce_record(fields: &[String], schema: &Schema, null_value: Option<&str>) -> Row {
    schema
        .fields()
        .iter()
        .enumerate()
        .map(|(i, field)| {
            fields
                .get(i)
                .map_or(Value::Null, |raw| coerce_field(raw, field.data_type(), null_value))
        })
        .collect()
}
