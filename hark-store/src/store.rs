//! The persistence layer: typed records in, typed records out.

// Standard library
use std::path::Path;

// External crates
use sqlx::query::Query as SqlxQuery;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqlitePool};
use tracing::{debug, info, instrument};

// Internal imports
use hark_core::error::{HarkError, Result};

use crate::db::{self, db_error};
use crate::models::{Machine, NetworkInterface, PortMapping};
use crate::query::{self, Query};
use crate::record::Record;
use crate::value::{Constraints, Value};

/// Bind each value in order to the statement's `?` placeholders.
fn bind_values<'q>(
    mut statement: SqlxQuery<'q, Sqlite, SqliteArguments<'q>>,
    values: &'q [Value],
) -> SqlxQuery<'q, Sqlite, SqliteArguments<'q>> {
    for value in values {
        statement = match value {
            Value::Integer(i) => statement.bind(*i),
            Value::Text(s) => statement.bind(s.as_str()),
            Value::Null => statement.bind(Option::<String>::None),
        };
    }
    statement
}

fn statement(q: &Query) -> SqlxQuery<'_, Sqlite, SqliteArguments<'_>> {
    bind_values(sqlx::query(&q.sql), &q.bindings)
}

/// A sqlite-backed store of hark records.
///
/// Single-writer: nothing here coordinates concurrent mutation beyond what
/// sqlite itself provides.
#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open the store at `path`, creating the file and applying the schema
    /// on first use.
    #[instrument(skip_all, fields(db_path = %path.display()))]
    pub async fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("Setting up DB schema: {}", path.display());
        }
        let pool = db::create_pool(path).await?;
        db::run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn in_memory() -> Result<Self> {
        let pool = db::create_memory_pool().await?;
        db::run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Validate and insert a record.
    ///
    /// Fails with [`HarkError::DuplicateModel`] when a record with the same
    /// key already exists.
    pub async fn create<R: Record>(&self, record: &R) -> Result<()> {
        record.validate()?;
        let q = query::insert_query(record);
        debug!("{}: {}", R::MODEL, q.sql);

        match statement(&q).execute(&self.pool).await {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
                Err(HarkError::DuplicateModel {
                    model: R::MODEL,
                    fields: record.key_constraints().to_string(),
                })
            }
            Err(err) => Err(db_error(err)),
        }
    }

    /// All records of type `R` matching every constraint.
    pub async fn read<R: Record>(&self, constraints: &Constraints) -> Result<Vec<R>> {
        let q = query::read_query::<R>(constraints)?;
        let rows = statement(&q).fetch_all(&self.pool).await.map_err(db_error)?;
        rows.iter().map(R::from_row).collect()
    }

    pub async fn read_all<R: Record>(&self) -> Result<Vec<R>> {
        self.read(&Constraints::new()).await
    }

    /// Delete the row(s) matching the record's key fields.
    pub async fn delete<R: Record>(&self, record: &R) -> Result<u64> {
        let q = query::delete_query(record)?;
        let result = statement(&q).execute(&self.pool).await.map_err(db_error)?;
        Ok(result.rows_affected())
    }

    /// Delete every row of type `R` matching the constraints.
    pub async fn delete_where<R: Record>(&self, constraints: &Constraints) -> Result<u64> {
        let q = query::delete_where_query::<R>(constraints)?;
        let result = statement(&q).execute(&self.pool).await.map_err(db_error)?;
        Ok(result.rows_affected())
    }

    /// Delete a machine together with its port mappings and network
    /// interfaces, in one transaction.
    pub async fn delete_machine(&self, machine: &Machine) -> Result<()> {
        let owned = Constraints::new().eq("machine_id", &machine.machine_id);
        let statements = [
            query::delete_query(machine)?,
            query::delete_where_query::<PortMapping>(&owned)?,
            query::delete_where_query::<NetworkInterface>(&owned)?,
        ];

        let mut tx = self.pool.begin().await.map_err(db_error)?;
        for q in &statements {
            statement(q).execute(&mut *tx).await.map_err(db_error)?;
        }
        tx.commit().await.map_err(db_error)?;

        debug!("Deleted machine '{}' and its dependent rows", machine.name);
        Ok(())
    }
}
