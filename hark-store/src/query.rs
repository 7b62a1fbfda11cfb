//! SQL text and parameter bindings for record reads, inserts and deletes.
//!
//! Column names come only from a record's declared `FIELDS`; every value is
//! bound as a parameter.

use hark_core::error::{HarkError, Result};

use crate::record::Record;
use crate::value::{Constraints, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub sql: String,
    pub bindings: Vec<Value>,
}

/// `" WHERE a = ? AND b IS NULL"`, or an empty string for no constraints.
fn where_clause<R: Record>(constraints: &Constraints) -> Result<(String, Vec<Value>)> {
    let mut predicates = Vec::with_capacity(constraints.len());
    let mut bindings = Vec::new();

    for (field, value) in constraints.iter() {
        if !R::FIELDS.iter().any(|known| *known == field) {
            return Err(HarkError::InvalidQueryConstraint(format!(
                "{} has no field '{}'",
                R::MODEL,
                field
            )));
        }
        match value {
            Value::Null => predicates.push(format!("{} IS NULL", field)),
            other => {
                predicates.push(format!("{} = ?", field));
                bindings.push(other.clone());
            }
        }
    }

    if predicates.is_empty() {
        Ok((String::new(), bindings))
    } else {
        Ok((format!(" WHERE {}", predicates.join(" AND ")), bindings))
    }
}

pub fn read_query<R: Record>(constraints: &Constraints) -> Result<Query> {
    let (clause, bindings) = where_clause::<R>(constraints)?;
    Ok(Query {
        sql: format!("SELECT {} FROM {}{};", R::FIELDS.join(", "), R::TABLE, clause),
        bindings,
    })
}

pub fn insert_query<R: Record>(record: &R) -> Query {
    let placeholders = vec!["?"; R::FIELDS.len()].join(", ");
    Query {
        sql: format!(
            "INSERT INTO {} ({}) VALUES ({});",
            R::TABLE,
            R::FIELDS.join(", "),
            placeholders
        ),
        bindings: record.values(),
    }
}

/// Deleting with no constraints would empty the table, so it is rejected.
pub fn delete_where_query<R: Record>(constraints: &Constraints) -> Result<Query> {
    if constraints.is_empty() {
        return Err(HarkError::InvalidQueryConstraint(format!(
            "refusing to delete from {} without constraints",
            R::TABLE
        )));
    }
    let (clause, bindings) = where_clause::<R>(constraints)?;
    Ok(Query {
        sql: format!("DELETE FROM {}{};", R::TABLE, clause),
        bindings,
    })
}

pub fn delete_query<R: Record>(record: &R) -> Result<Query> {
    delete_where_query::<R>(&record.key_constraints())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConfigEntry, DriverKind, Guest, Machine, NetworkInterface, PortMapping};

    #[test]
    fn test_read_query_without_constraints() {
        let q = read_query::<ConfigEntry>(&Constraints::new()).unwrap();
        assert_eq!(q.sql, "SELECT name, value FROM config;");
        assert!(q.bindings.is_empty());
    }

    #[test]
    fn test_read_query_binds_values() {
        let q = read_query::<ConfigEntry>(&Constraints::new().eq("name", "bleh")).unwrap();
        assert_eq!(q.sql, "SELECT name, value FROM config WHERE name = ?;");
        assert_eq!(q.bindings, vec![Value::Text("bleh".into())]);

        let q = read_query::<PortMapping>(&Constraints::new().eq("host_port", 5).eq("name", "ssh"))
            .unwrap();
        assert_eq!(
            q.sql,
            "SELECT host_port, guest_port, machine_id, name FROM port_mapping WHERE host_port = ? AND name = ?;"
        );
        assert_eq!(q.bindings, vec![Value::Integer(5), Value::Text("ssh".into())]);
    }

    #[test]
    fn test_read_query_null_uses_is_null() {
        let q = read_query::<ConfigEntry>(&Constraints::new().is_null("value")).unwrap();
        assert_eq!(q.sql, "SELECT name, value FROM config WHERE value IS NULL;");
        assert!(q.bindings.is_empty());
    }

    #[test]
    fn test_quotes_are_bound_not_interpolated() {
        let q = read_query::<ConfigEntry>(&Constraints::new().eq("name", "it's")).unwrap();
        assert!(!q.sql.contains("it's"));
        assert_eq!(q.bindings, vec![Value::Text("it's".into())]);
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let err = read_query::<ConfigEntry>(&Constraints::new().eq("name; DROP TABLE config", 1))
            .unwrap_err();
        assert!(matches!(err, HarkError::InvalidQueryConstraint(_)));
    }

    #[test]
    fn test_insert_query() {
        let entry = ConfigEntry::new("answer", "42");
        let q = insert_query(&entry);
        assert_eq!(q.sql, "INSERT INTO config (name, value) VALUES (?, ?);");
        assert_eq!(
            q.bindings,
            vec![Value::Text("answer".into()), Value::Text("42".into())]
        );
    }

    #[test]
    fn test_delete_query_uses_key_fields() {
        let m = Machine::new("hi", DriverKind::VirtualBox, Guest::Debian8, 512);
        let q = delete_query(&m).unwrap();
        assert_eq!(q.sql, "DELETE FROM machine WHERE name = ?;");
        assert_eq!(q.bindings, vec![Value::Text("hi".into())]);

        let iface = NetworkInterface::private("abc", "192.168.56.2");
        let q = delete_query(&iface).unwrap();
        assert_eq!(q.sql, "DELETE FROM network_interface WHERE kind = ? AND addr = ?;");
    }

    #[test]
    fn test_delete_where_requires_constraints() {
        let err = delete_where_query::<Machine>(&Constraints::new()).unwrap_err();
        assert!(matches!(err, HarkError::InvalidQueryConstraint(_)));
    }
}
