#![forbid(unsafe_code)]

use rusqlite::{Connection, Error as SqliteError, OptionalExtension, Transaction};
use thiserror::Error;

use crate::registry::{EntityKind, EntityType, FieldType, IdentityPolicy};

pub const SCHEMA_VERSION: i64 = 1;

const VERSION_TABLE: &str = "geocatalog_schema_version";

/// SQL expression producing an RFC 3339 UTC timestamp with milliseconds.
pub(crate) const NOW_UTC: &str = "strftime('%Y-%m-%dT%H:%M:%fZ', 'now')";

/// Create every entity table, its spatial index and the schema version record.
///
/// Every statement uses `IF NOT EXISTS`, so provisioning an already
/// initialised database is a no-op. Existing installations must match
/// [`SCHEMA_VERSION`]; mismatches are rejected.
///
/// # Examples
/// ```
/// use rusqlite::Connection;
/// use geocatalog_core::store::provision_schema;
///
/// let mut conn = Connection::open_in_memory().expect("create in-memory database");
/// provision_schema(&mut conn).expect("create catalog schema");
/// provision_schema(&mut conn).expect("provisioning twice is harmless");
///
/// let version: i64 = conn
///     .query_row("SELECT version FROM geocatalog_schema_version", [], |row| row.get(0))
///     .expect("read schema version");
/// assert_eq!(version, 1);
/// ```
pub fn provision_schema(connection: &mut Connection) -> Result<(), SchemaError> {
    let transaction = connection
        .transaction()
        .map_err(|source| SchemaError::Migration {
            table: VERSION_TABLE,
            step: "begin schema transaction",
            source,
        })?;

    ensure_schema_version(&transaction)?;
    for kind in EntityKind::ALL {
        create_entity_table(&transaction, kind.entity_type())?;
    }

    transaction
        .commit()
        .map_err(|source| SchemaError::Migration {
            table: VERSION_TABLE,
            step: "commit schema transaction",
            source,
        })
}

/// Name of the R*Tree companion table for an entity table.
pub(crate) fn rtree_table(entity: &EntityType) -> String {
    format!("{}_rtree", entity.table)
}

fn create_entity_table(
    transaction: &Transaction<'_>,
    entity: &'static EntityType,
) -> Result<(), SchemaError> {
    run_migration_step(transaction, entity, "create table", &table_ddl(entity))?;

    let rtree = rtree_table(entity);
    run_migration_step(
        transaction,
        entity,
        "create spatial index",
        &format!(
            "CREATE VIRTUAL TABLE IF NOT EXISTS {rtree} USING rtree(id, min_x, max_x, min_y, max_y)"
        ),
    )?;
    run_migration_step(
        transaction,
        entity,
        "create spatial index cleanup trigger",
        &format!(
            "CREATE TRIGGER IF NOT EXISTS {rtree}_delete AFTER DELETE ON {table}
            BEGIN
                DELETE FROM {rtree} WHERE id = old.id;
            END",
            table = entity.table,
        ),
    )
}

fn table_ddl(entity: &EntityType) -> String {
    let mut columns = vec![match entity.identity {
        IdentityPolicy::Generated => "id INTEGER PRIMARY KEY AUTOINCREMENT".to_owned(),
        IdentityPolicy::External => "id INTEGER PRIMARY KEY".to_owned(),
    }];
    columns.push(if entity.nullable_geometry {
        "geometry BLOB".to_owned()
    } else {
        "geometry BLOB NOT NULL".to_owned()
    });
    for field in entity.fields {
        let sql_type = match field.field_type {
            FieldType::Text { .. } => "TEXT",
            FieldType::Integer => "INTEGER",
        };
        let mut column = format!("{} {sql_type}", field.name);
        if !field.nullable {
            column.push_str(" NOT NULL");
        }
        if field.unique {
            column.push_str(" UNIQUE");
        }
        columns.push(column);
    }
    if entity.properties {
        columns.push("properties_data TEXT".to_owned());
    }
    if entity.timestamps {
        columns.push(format!("created_at TEXT NOT NULL DEFAULT ({NOW_UTC})"));
        columns.push(format!("updated_at TEXT NOT NULL DEFAULT ({NOW_UTC})"));
    }
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
        entity.table,
        columns.join(",\n    ")
    )
}

fn ensure_schema_version(transaction: &Transaction<'_>) -> Result<(), SchemaError> {
    transaction
        .execute(
            "CREATE TABLE IF NOT EXISTS geocatalog_schema_version (
                version INTEGER PRIMARY KEY CHECK (version > 0),
                applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
            ) WITHOUT ROWID",
            [],
        )
        .map_err(|source| SchemaError::Migration {
            table: VERSION_TABLE,
            step: "create schema version table",
            source,
        })?;

    let existing_version: Option<i64> = transaction
        .query_row(
            "SELECT version FROM geocatalog_schema_version LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()
        .map_err(|source| SchemaError::Migration {
            table: VERSION_TABLE,
            step: "read schema version",
            source,
        })?;

    match existing_version {
        Some(version) if version == SCHEMA_VERSION => {}
        Some(found) => {
            return Err(SchemaError::VersionMismatch {
                expected: SCHEMA_VERSION,
                found,
            });
        }
        None => {
            transaction
                .execute(
                    "INSERT INTO geocatalog_schema_version (version) VALUES (?1)",
                    [SCHEMA_VERSION],
                )
                .map_err(|source| SchemaError::Migration {
                    table: VERSION_TABLE,
                    step: "record schema version",
                    source,
                })?;
        }
    }

    Ok(())
}

fn run_migration_step(
    transaction: &Transaction<'_>,
    entity: &'static EntityType,
    step: &'static str,
    sql: &str,
) -> Result<(), SchemaError> {
    transaction
        .execute(sql, [])
        .map(|_| ())
        .map_err(|source| SchemaError::Migration {
            table: entity.table,
            step,
            source,
        })
}

/// Errors raised when provisioning the catalog schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("failed to {step} for {table}")]
    Migration {
        table: &'static str,
        step: &'static str,
        #[source]
        source: SqliteError,
    },
    #[error(
        "expected catalog schema version {expected} but found {found}; apply migrations before retrying"
    )]
    VersionMismatch { expected: i64, found: i64 },
}
