//! SQLite-backed persistence for catalog objects.
//!
//! [`GeoStore`] is a cheap, cloneable handle holding the database path. Every
//! operation opens its own connection and runs inside one transaction, so
//! isolation comes from SQLite rather than in-process locks.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use rusqlite::{
    Connection, OptionalExtension, Row, Transaction,
    types::Value as SqlValue,
};

use crate::{
    error::{GeoObjectError, store_error},
    geometry::{self, StoreGeometry},
    object::{GeoObject, Timestamps},
    payload::{PROPERTIES_KEY, Properties, ScalarValue},
    registry::{EntityType, FieldType},
};

mod bulk;
mod engine;
mod schema;

pub use bulk::{BulkWriter, StagedRow};
pub use schema::{SCHEMA_VERSION, SchemaError, provision_schema};

/// Time a connection waits on a locked database.
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to a catalog database on disk.
#[derive(Debug, Clone)]
pub struct GeoStore {
    path: Arc<PathBuf>,
}

impl GeoStore {
    /// Open the database at `path`, creating it and its schema when absent.
    ///
    /// The journal is switched to WAL so readers do not block the writer.
    ///
    /// # Errors
    ///
    /// Fails when the database cannot be opened or the schema cannot be
    /// provisioned.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, GeoObjectError> {
        let store = Self {
            path: Arc::new(path.into()),
        };
        let connection = store.connect()?;
        connection
            .pragma_update_and_check(None, "journal_mode", "WAL", |row| {
                row.get::<_, String>(0)
            })
            .map_err(store_error("enable WAL journaling"))?;
        drop(connection);
        store.provision()?;
        Ok(store)
    }

    /// Location of the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create any missing tables; see [`provision_schema`].
    ///
    /// # Errors
    ///
    /// Fails when a migration step fails or the stored schema version differs.
    pub fn provision(&self) -> Result<(), GeoObjectError> {
        let mut connection = self.connect()?;
        provision_schema(&mut connection)?;
        Ok(())
    }

    pub(crate) fn connect(&self) -> Result<Connection, GeoObjectError> {
        let connection =
            Connection::open(self.path.as_path()).map_err(|source| GeoObjectError::Open {
                path: self.path.to_path_buf(),
                source,
            })?;
        connection
            .busy_timeout(BUSY_TIMEOUT)
            .map_err(store_error("configure busy timeout"))?;
        Ok(connection)
    }
}

/// Values written by one insert, aligned with the entity's columns.
pub(crate) struct RowWrite<'a> {
    pub(crate) id: Option<i64>,
    pub(crate) geometry: &'a StoreGeometry,
    pub(crate) values: &'a [Option<ScalarValue>],
    pub(crate) properties: Option<&'a Properties>,
}

pub(crate) fn insert_row(
    transaction: &Transaction<'_>,
    entity: &EntityType,
    row: &RowWrite<'_>,
) -> rusqlite::Result<i64> {
    let mut columns = Vec::new();
    let mut params = Vec::new();
    if let Some(id) = row.id {
        columns.push("id");
        params.push(SqlValue::Integer(id));
    }
    columns.push("geometry");
    params.push(SqlValue::Blob(row.geometry.as_bytes().to_vec()));
    for (field, value) in entity.fields.iter().zip(row.values) {
        columns.push(field.name);
        params.push(scalar_param(value.as_ref()));
    }
    if entity.properties {
        columns.push(PROPERTIES_KEY);
        params.push(properties_param(row.properties)?);
    }

    let placeholders: Vec<String> = (1..=params.len()).map(|index| format!("?{index}")).collect();
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        entity.table,
        columns.join(", "),
        placeholders.join(", ")
    );
    transaction
        .prepare_cached(&sql)?
        .execute(rusqlite::params_from_iter(params))?;
    Ok(transaction.last_insert_rowid())
}

/// Refresh the spatial index entry for one row.
pub(crate) fn write_envelope(
    transaction: &Transaction<'_>,
    entity: &'static EntityType,
    id: i64,
    stored: &StoreGeometry,
) -> Result<(), GeoObjectError> {
    let rtree = schema::rtree_table(entity);
    let envelope =
        geometry::bounding_box(stored).map_err(|source| GeoObjectError::CorruptGeometry {
            entity: entity.kind,
            id,
            source,
        })?;
    match envelope {
        Some(rect) => transaction
            .prepare_cached(&format!(
                "INSERT OR REPLACE INTO {rtree} (id, min_x, max_x, min_y, max_y)
                 VALUES (?1, ?2, ?3, ?4, ?5)"
            ))
            .and_then(|mut statement| {
                statement.execute(rusqlite::params![
                    id,
                    rect.min().x,
                    rect.max().x,
                    rect.min().y,
                    rect.max().y
                ])
            })
            .map(|_| ())
            .map_err(store_error("write spatial index entry")),
        None => transaction
            .execute(&format!("DELETE FROM {rtree} WHERE id = ?1"), [id])
            .map(|_| ())
            .map_err(store_error("clear spatial index entry")),
    }
}

/// Conflict for a unique violation, named by the registry field SQLite
/// reports as `table.column`. The SQLite message itself is not surfaced.
pub(crate) fn unique_conflict(entity: &EntityType, message: Option<&str>) -> GeoObjectError {
    let field = message
        .and_then(|message| message.rsplit('.').next())
        .and_then(|column| entity.field(column.trim()));
    let detail = field.map_or_else(
        || "a unique value already exists".to_owned(),
        |field| format!("{} value already exists", field.name),
    );
    GeoObjectError::Conflict {
        entity: entity.kind,
        detail,
    }
}

pub(crate) fn scalar_param(value: Option<&ScalarValue>) -> SqlValue {
    match value {
        None => SqlValue::Null,
        Some(ScalarValue::Integer(value)) => SqlValue::Integer(*value),
        Some(ScalarValue::Text(text)) => SqlValue::Text(text.clone()),
    }
}

pub(crate) fn properties_param(properties: Option<&Properties>) -> rusqlite::Result<SqlValue> {
    properties.map_or(Ok(SqlValue::Null), |properties| {
        serde_json::to_string(properties)
            .map(SqlValue::Text)
            .map_err(|err| rusqlite::Error::ToSqlConversionFailure(Box::new(err)))
    })
}

/// Columns of the Read projection, in [`RawRow`] order.
fn select_columns(entity: &EntityType) -> String {
    let mut columns = vec!["id", "geometry"];
    columns.extend(entity.fields.iter().map(|field| field.name));
    if entity.properties {
        columns.push(PROPERTIES_KEY);
    }
    if entity.timestamps {
        columns.extend(["created_at", "updated_at"]);
    }
    columns.join(", ")
}

/// Row as read from SQLite, before geometry and properties are decoded.
struct RawRow {
    id: i64,
    geometry: Option<Vec<u8>>,
    values: Vec<Option<ScalarValue>>,
    properties: Option<String>,
    timestamps: Option<Timestamps>,
}

impl RawRow {
    fn read(entity: &EntityType, row: &Row<'_>) -> rusqlite::Result<Self> {
        let mut index = 2;
        let mut values = Vec::with_capacity(entity.fields.len());
        for field in entity.fields {
            let value = match field.field_type {
                FieldType::Text { .. } => row.get::<_, Option<String>>(index)?.map(ScalarValue::Text),
                FieldType::Integer => row.get::<_, Option<i64>>(index)?.map(ScalarValue::Integer),
            };
            values.push(value);
            index += 1;
        }
        let properties = if entity.properties {
            let blob = row.get(index)?;
            index += 1;
            blob
        } else {
            None
        };
        let timestamps = if entity.timestamps {
            Some(Timestamps {
                created_at: row.get(index)?,
                updated_at: row.get(index + 1)?,
            })
        } else {
            None
        };
        Ok(Self {
            id: row.get(0)?,
            geometry: row.get(1)?,
            values,
            properties,
            timestamps,
        })
    }

    fn into_object(self, entity: &'static EntityType) -> Result<GeoObject, GeoObjectError> {
        let stored = self.geometry.map(StoreGeometry::from_ewkb);
        let geometry =
            geometry::decode(stored.as_ref()).map_err(|source| GeoObjectError::CorruptGeometry {
                entity: entity.kind,
                id: self.id,
                source,
            })?;
        let properties = self
            .properties
            .map(|blob| serde_json::from_str::<Properties>(&blob))
            .transpose()
            .map_err(|source| GeoObjectError::CorruptProperties {
                entity: entity.kind,
                id: self.id,
                source,
            })?;
        Ok(GeoObject {
            entity,
            id: self.id,
            geometry,
            values: self.values,
            properties,
            timestamps: self.timestamps,
        })
    }
}

pub(crate) fn fetch(
    connection: &Connection,
    entity: &'static EntityType,
    id: i64,
) -> Result<Option<GeoObject>, GeoObjectError> {
    let sql = format!(
        "SELECT {} FROM {} WHERE id = ?1",
        select_columns(entity),
        entity.table
    );
    let raw = connection
        .prepare_cached(&sql)
        .and_then(|mut statement| {
            statement
                .query_row([id], |row| RawRow::read(entity, row))
                .optional()
        })
        .map_err(store_error("read object"))?;
    raw.map(|raw| raw.into_object(entity)).transpose()
}

pub(crate) fn fetch_page(
    connection: &Connection,
    entity: &'static EntityType,
    skip: i64,
    limit: i64,
) -> Result<Vec<GeoObject>, GeoObjectError> {
    let sql = format!(
        "SELECT {} FROM {} ORDER BY id LIMIT ?1 OFFSET ?2",
        select_columns(entity),
        entity.table
    );
    let raws = connection
        .prepare_cached(&sql)
        .and_then(|mut statement| {
            let rows = statement.query_map([limit, skip], |row| RawRow::read(entity, row))?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
        })
        .map_err(store_error("list objects"))?;
    raws.into_iter().map(|raw| raw.into_object(entity)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::EntityKind;
    use rstest::rstest;

    #[rstest]
    #[case(Some("UNIQUE constraint failed: streets.fid"), "fid value already exists")]
    #[case(Some("UNIQUE constraint failed: streets.unknown"), "a unique value already exists")]
    #[case(None, "a unique value already exists")]
    fn unique_conflicts_name_registry_fields(
        #[case] message: Option<&str>,
        #[case] expected: &str,
    ) {
        let err = unique_conflict(EntityKind::Streets.entity_type(), message);
        match err {
            GeoObjectError::Conflict { detail, .. } => assert_eq!(detail, expected),
            other => panic!("expected a conflict, got {other:?}"),
        }
    }
}
