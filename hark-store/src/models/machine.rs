use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, Row};
use uuid::Uuid;

use hark_core::error::{HarkError, Result};

use super::kind::{DriverKind, Guest};
use crate::record::{column_error, validate_required, Record};
use crate::value::Value;

/// Machines must be given at least this much memory.
pub const MEMORY_MINIMUM: i64 = 512;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Machine {
    pub machine_id: String,
    pub name: String,
    pub driver: DriverKind,
    pub guest: Guest,
    pub memory_mb: i64,
}

impl Machine {
    /// A new machine with a freshly generated `machine_id`.
    pub fn new(name: impl Into<String>, driver: DriverKind, guest: Guest, memory_mb: i64) -> Self {
        Self {
            machine_id: Uuid::new_v4().to_string(),
            name: name.into(),
            driver,
            guest,
            memory_mb,
        }
    }
}

impl Record for Machine {
    const MODEL: &'static str = "Machine";
    const TABLE: &'static str = "machine";
    const FIELDS: &'static [&'static str] = &["machine_id", "name", "driver", "guest", "memory_mb"];
    const REQUIRED: &'static [&'static str] = &["machine_id", "name", "driver", "guest", "memory_mb"];
    const KEY: &'static [&'static str] = &["name"];

    fn value(&self, field: &str) -> Value {
        match field {
            "machine_id" => Value::from(&self.machine_id),
            "name" => Value::from(&self.name),
            "driver" => Value::from(self.driver.as_str()),
            "guest" => Value::from(self.guest.as_str()),
            "memory_mb" => Value::from(self.memory_mb),
            _ => Value::Null,
        }
    }

    fn from_row(row: &SqliteRow) -> Result<Self> {
        let get = |field: &str| -> Result<String> {
            row.try_get::<String, _>(field)
                .map_err(|e| column_error(Self::MODEL, e))
        };

        Ok(Self {
            machine_id: get("machine_id")?,
            name: get("name")?,
            driver: get("driver")?.parse()?,
            guest: get("guest")?.parse()?,
            memory_mb: row
                .try_get::<i64, _>("memory_mb")
                .map_err(|e| column_error(Self::MODEL, e))?,
        })
    }

    fn validate(&self) -> Result<()> {
        validate_required(self)?;
        if self.memory_mb < MEMORY_MINIMUM {
            return Err(HarkError::ModelInvalid {
                model: Self::MODEL,
                reason: format!(
                    "memory_mb must be at least {}, got {}",
                    MEMORY_MINIMUM, self.memory_mb
                ),
            });
        }
        Ok(())
    }
}
