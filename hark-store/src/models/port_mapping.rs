use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, Row};

use hark_core::error::{HarkError, Result};

use crate::record::{column_error, Record};
use crate::value::Value;

pub const SSH_GUEST_PORT: u16 = 22;
pub const SSH_MAPPING_NAME: &str = "ssh";

/// A host port forwarded to a guest port of one machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortMapping {
    pub host_port: u16,
    pub guest_port: u16,
    pub machine_id: String,
    pub name: String,
}

impl PortMapping {
    /// The mapping every machine gets so the operator can reach it over SSH.
    pub fn ssh(machine_id: impl Into<String>, host_port: u16) -> Self {
        Self {
            host_port,
            guest_port: SSH_GUEST_PORT,
            machine_id: machine_id.into(),
            name: SSH_MAPPING_NAME.to_string(),
        }
    }
}

fn port(row: &SqliteRow, field: &str) -> Result<u16> {
    let raw = row
        .try_get::<i64, _>(field)
        .map_err(|e| column_error(PortMapping::MODEL, e))?;
    u16::try_from(raw)
        .map_err(|_| HarkError::Database(format!("{} out of range for a port: {}", field, raw)))
}

impl Record for PortMapping {
    const MODEL: &'static str = "PortMapping";
    const TABLE: &'static str = "port_mapping";
    const FIELDS: &'static [&'static str] = &["host_port", "guest_port", "machine_id", "name"];
    const REQUIRED: &'static [&'static str] = &["host_port", "guest_port", "machine_id", "name"];
    const KEY: &'static [&'static str] = &["host_port"];

    fn value(&self, field: &str) -> Value {
        match field {
            "host_port" => Value::from(self.host_port),
            "guest_port" => Value::from(self.guest_port),
            "machine_id" => Value::from(&self.machine_id),
            "name" => Value::from(&self.name),
            _ => Value::Null,
        }
    }

    fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            host_port: port(row, "host_port")?,
            guest_port: port(row, "guest_port")?,
            machine_id: row
                .try_get("machine_id")
                .map_err(|e| column_error(Self::MODEL, e))?,
            name: row.try_get("name").map_err(|e| column_error(Self::MODEL, e))?,
        })
    }
}
