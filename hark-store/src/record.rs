//! The structured record model.
//!
//! A record type declares its table, its field list, the subset of fields that
//! must be present, and the key fields that are jointly unique. The store is
//! generic over this trait.

use sqlx::sqlite::SqliteRow;

use hark_core::error::{HarkError, Result};

use crate::value::{Constraints, Value};

pub trait Record: Sized + Send + Sync + Unpin {
    /// Human-readable type name used in error messages.
    const MODEL: &'static str;
    const TABLE: &'static str;
    const FIELDS: &'static [&'static str];
    const REQUIRED: &'static [&'static str];
    const KEY: &'static [&'static str];

    /// The value of one of `FIELDS`. Unknown names yield `Value::Null`.
    fn value(&self, field: &str) -> Value;

    fn from_row(row: &SqliteRow) -> Result<Self>;

    fn values(&self) -> Vec<Value> {
        Self::FIELDS.iter().map(|field| self.value(field)).collect()
    }

    fn validate(&self) -> Result<()> {
        validate_required(self)
    }

    /// Constraints that identify this record by its key fields.
    fn key_constraints(&self) -> Constraints {
        Self::KEY
            .iter()
            .fold(Constraints::new(), |c, field| c.eq(field, self.value(field)))
    }

    /// `field=value` pairs for every field, for logs and operator messages.
    fn describe(&self) -> String {
        Self::FIELDS
            .iter()
            .map(|field| format!("{}={}", field, self.value(field)))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Every required field must be non-null and, for text, non-empty.
pub fn validate_required<R: Record>(record: &R) -> Result<()> {
    for field in R::REQUIRED {
        let missing = match record.value(field) {
            Value::Null => true,
            Value::Text(s) => s.is_empty(),
            Value::Integer(_) => false,
        };
        if missing {
            return Err(HarkError::ModelInvalid {
                model: R::MODEL,
                reason: format!("required field '{}' is missing", field),
            });
        }
    }
    Ok(())
}

pub(crate) fn column_error(model: &'static str, err: sqlx::Error) -> HarkError {
    HarkError::Database(format!("could not map {} row: {}", model, err))
}
