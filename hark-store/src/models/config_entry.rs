use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, Row};

use hark_core::error::Result;

use crate::record::{column_error, Record};
use crate::value::Value;

/// A named value persisted across runs, for state drivers set up once per
/// installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub name: String,
    pub value: String,
}

impl ConfigEntry {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl Record for ConfigEntry {
    const MODEL: &'static str = "ConfigEntry";
    const TABLE: &'static str = "config";
    const FIELDS: &'static [&'static str] = &["name", "value"];
    const REQUIRED: &'static [&'static str] = &["name", "value"];
    const KEY: &'static [&'static str] = &["name"];

    fn value(&self, field: &str) -> Value {
        match field {
            "name" => Value::from(&self.name),
            "value" => Value::from(&self.value),
            _ => Value::Null,
        }
    }

    fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            name: row.try_get("name").map_err(|e| column_error(Self::MODEL, e))?,
            value: row.try_get("value").map_err(|e| column_error(Self::MODEL, e))?,
        })
    }
}
