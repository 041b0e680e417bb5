//! Batch writes used by the import pipeline.
//!
//! [`BulkWriter`] is the only path that truncates tables or writes
//! import-only columns such as `fid`. The HTTP surface never constructs one.

use std::fmt;

use log::info;
use rusqlite::{Connection, TransactionBehavior, ffi};

use super::{GeoStore, RowWrite, insert_row, unique_conflict, write_envelope};
use crate::{
    error::{GeoObjectError, store_error},
    geometry::StoreGeometry,
    payload::{Properties, ScalarValue},
    registry::{EntityKind, EntityType},
};

/// One feature staged for insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct StagedRow {
    /// Encoded geometry.
    pub geometry: StoreGeometry,
    /// Scalar values keyed by field name; absent fields are stored as `NULL`.
    pub fields: Vec<(&'static str, ScalarValue)>,
    /// Source properties, stored verbatim.
    pub properties: Option<Properties>,
}

impl StagedRow {
    fn aligned_values(&self, entity: &EntityType) -> Vec<Option<ScalarValue>> {
        entity
            .fields
            .iter()
            .map(|field| {
                self.fields
                    .iter()
                    .find(|(name, _)| *name == field.name)
                    .map(|(_, value)| value.clone())
            })
            .collect()
    }
}

/// Single-writer handle for truncating and batch-loading entity tables.
pub struct BulkWriter {
    connection: Connection,
}

impl fmt::Debug for BulkWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BulkWriter")
            .field("path", &self.connection.path())
            .finish_non_exhaustive()
    }
}

impl GeoStore {
    /// Open a writer for bulk loads.
    ///
    /// # Errors
    ///
    /// Fails when the database cannot be opened.
    pub fn bulk_writer(&self) -> Result<BulkWriter, GeoObjectError> {
        Ok(BulkWriter {
            connection: self.connect()?,
        })
    }
}

impl BulkWriter {
    /// Delete every row of every entity table in one transaction.
    ///
    /// Returns the number of rows removed.
    ///
    /// # Errors
    ///
    /// Fails when any delete fails; no table is cleared in that case.
    pub fn clear_all(&mut self) -> Result<usize, GeoObjectError> {
        let transaction = self
            .connection
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(store_error("begin clear transaction"))?;
        let mut removed = 0;
        for kind in EntityKind::ALL {
            let entity = kind.entity_type();
            removed += transaction
                .execute(&format!("DELETE FROM {}", entity.table), [])
                .map_err(store_error("clear entity table"))?;
        }
        transaction
            .commit()
            .map_err(store_error("commit clear transaction"))?;
        info!("cleared {removed} catalog rows");
        Ok(removed)
    }

    /// Insert `rows` into the entity's table and commit once.
    ///
    /// Identities are assigned by the store. A failure rolls back the whole
    /// batch.
    ///
    /// # Errors
    ///
    /// Returns [`GeoObjectError::Conflict`] when an import-only unique column
    /// collides, or a store failure.
    pub fn insert_batch(
        &mut self,
        entity: &'static EntityType,
        rows: &[StagedRow],
    ) -> Result<usize, GeoObjectError> {
        let transaction = self
            .connection
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(store_error("begin batch transaction"))?;
        for staged in rows {
            let values = staged.aligned_values(entity);
            let row = RowWrite {
                id: None,
                geometry: &staged.geometry,
                values: &values,
                properties: staged.properties.as_ref(),
            };
            let id = insert_row(&transaction, entity, &row)
                .map_err(|source| batch_error(entity, source))?;
            write_envelope(&transaction, entity, id, &staged.geometry)?;
        }
        transaction
            .commit()
            .map_err(store_error("commit batch transaction"))?;
        Ok(rows.len())
    }
}

fn batch_error(entity: &EntityType, source: rusqlite::Error) -> GeoObjectError {
    if let rusqlite::Error::SqliteFailure(failure, message) = &source {
        if failure.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE {
            return unique_conflict(entity, message.as_deref());
        }
    }
    GeoObjectError::Store {
        operation: "insert staged row",
        source,
    }
}
