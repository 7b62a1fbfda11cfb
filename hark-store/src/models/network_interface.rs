use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, Row};

use hark_core::error::Result;

use crate::record::{column_error, Record};
use crate::value::Value;

/// Interface kind for host-only, host-routable addresses.
pub const PRIVATE_KIND: &str = "private";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInterface {
    pub machine_id: String,
    pub kind: String,
    pub addr: String,
}

impl NetworkInterface {
    pub fn private(machine_id: impl Into<String>, addr: impl Into<String>) -> Self {
        Self {
            machine_id: machine_id.into(),
            kind: PRIVATE_KIND.to_string(),
            addr: addr.into(),
        }
    }
}

impl Record for NetworkInterface {
    const MODEL: &'static str = "NetworkInterface";
    const TABLE: &'static str = "network_interface";
    const FIELDS: &'static [&'static str] = &["machine_id", "kind", "addr"];
    const REQUIRED: &'static [&'static str] = &["machine_id", "kind", "addr"];
    const KEY: &'static [&'static str] = &["kind", "addr"];

    fn value(&self, field: &str) -> Value {
        match field {
            "machine_id" => Value::from(&self.machine_id),
            "kind" => Value::from(&self.kind),
            "addr" => Value::from(&self.addr),
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
            kind: get("kind")?,
            addr: get("addr")?,
        })
    }
}
