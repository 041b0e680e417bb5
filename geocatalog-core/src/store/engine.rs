//! Generic create/read/update/delete over any registered entity type.

use geojson::JsonValue;
use log::debug;
use rusqlite::{OptionalExtension, Transaction, TransactionBehavior, ffi, types::Value as SqlValue};

use super::{
    GeoStore, RowWrite, fetch, fetch_page, insert_row, properties_param, scalar_param,
    schema::NOW_UTC, unique_conflict, write_envelope,
};
use crate::{
    entities::GeoEntity,
    error::{GeoObjectError, store_error},
    object::GeoObject,
    payload::{CreatePayload, PROPERTIES_KEY, UpdatePatch},
    registry::{EntityType, resolve},
};

impl GeoStore {
    /// Validate `payload` and insert it as a new object of type `key`.
    ///
    /// The identity check and the insert share one `BEGIN IMMEDIATE`
    /// transaction, so of two racing creates with the same external id
    /// exactly one succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`GeoObjectError::UnknownType`], [`GeoObjectError::Validation`],
    /// [`GeoObjectError::Conflict`], or a store failure.
    pub fn create(&self, key: &str, payload: &JsonValue) -> Result<GeoObject, GeoObjectError> {
        self.create_entity(resolve(key)?, payload)
    }

    /// Fetch one object by identity.
    ///
    /// # Errors
    ///
    /// Returns [`GeoObjectError::NotFound`] when no row has `id`.
    pub fn get(&self, key: &str, id: i64) -> Result<GeoObject, GeoObjectError> {
        self.get_entity(resolve(key)?, id)
    }

    /// List objects in storage order. `limit = 0` yields an empty page.
    ///
    /// # Errors
    ///
    /// Returns [`GeoObjectError::UnknownType`] or a store failure.
    pub fn list(&self, key: &str, skip: u64, limit: u64) -> Result<Vec<GeoObject>, GeoObjectError> {
        self.list_entities(resolve(key)?, skip, limit)
    }

    /// Apply a merge-patch to an existing object.
    ///
    /// # Errors
    ///
    /// Returns [`GeoObjectError::NotFound`] before validating the payload,
    /// then [`GeoObjectError::Validation`] for a malformed patch.
    pub fn update(
        &self,
        key: &str,
        id: i64,
        payload: &JsonValue,
    ) -> Result<GeoObject, GeoObjectError> {
        self.update_entity(resolve(key)?, id, payload)
    }

    /// Delete an object and return its last state.
    ///
    /// # Errors
    ///
    /// Returns [`GeoObjectError::NotFound`] when no row has `id`.
    pub fn remove(&self, key: &str, id: i64) -> Result<GeoObject, GeoObjectError> {
        self.remove_entity(resolve(key)?, id)
    }

    /// Typed variant of [`GeoStore::create`].
    ///
    /// # Errors
    ///
    /// As [`GeoStore::create`], plus [`GeoObjectError::Projection`].
    pub fn create_typed<E: GeoEntity>(&self, payload: &E::Create) -> Result<E, GeoObjectError> {
        self.create_as::<E>(&to_payload(E::KIND.entity_type(), payload)?)
    }

    /// Validate an untyped body against `E` and return the typed projection.
    ///
    /// Violations are collected exactly as for [`GeoStore::create`], so a
    /// body missing several fields reports all of them.
    ///
    /// # Errors
    ///
    /// As [`GeoStore::create`], plus [`GeoObjectError::Projection`].
    pub fn create_as<E: GeoEntity>(&self, payload: &JsonValue) -> Result<E, GeoObjectError> {
        typed(&self.create_entity(E::KIND.entity_type(), payload)?)
    }

    /// Typed variant of [`GeoStore::get`].
    ///
    /// # Errors
    ///
    /// As [`GeoStore::get`], plus [`GeoObjectError::Projection`].
    pub fn get_typed<E: GeoEntity>(&self, id: i64) -> Result<E, GeoObjectError> {
        typed(&self.get_entity(E::KIND.entity_type(), id)?)
    }

    /// Typed variant of [`GeoStore::list`].
    ///
    /// # Errors
    ///
    /// As [`GeoStore::list`], plus [`GeoObjectError::Projection`].
    pub fn list_typed<E: GeoEntity>(&self, skip: u64, limit: u64) -> Result<Vec<E>, GeoObjectError> {
        self.list_entities(E::KIND.entity_type(), skip, limit)?
            .iter()
            .map(typed::<E>)
            .collect()
    }

    /// Typed variant of [`GeoStore::update`].
    ///
    /// # Errors
    ///
    /// As [`GeoStore::update`], plus [`GeoObjectError::Projection`].
    pub fn update_typed<E: GeoEntity>(
        &self,
        id: i64,
        payload: &E::Update,
    ) -> Result<E, GeoObjectError> {
        self.update_as::<E>(id, &to_payload(E::KIND.entity_type(), payload)?)
    }

    /// Untyped-body variant of [`GeoStore::update_typed`].
    ///
    /// # Errors
    ///
    /// As [`GeoStore::update`], plus [`GeoObjectError::Projection`].
    pub fn update_as<E: GeoEntity>(&self, id: i64, payload: &JsonValue) -> Result<E, GeoObjectError> {
        typed(&self.update_entity(E::KIND.entity_type(), id, payload)?)
    }

    /// Typed variant of [`GeoStore::remove`].
    ///
    /// # Errors
    ///
    /// As [`GeoStore::remove`], plus [`GeoObjectError::Projection`].
    pub fn remove_typed<E: GeoEntity>(&self, id: i64) -> Result<E, GeoObjectError> {
        typed(&self.remove_entity(E::KIND.entity_type(), id)?)
    }

    fn create_entity(
        &self,
        entity: &'static EntityType,
        payload: &JsonValue,
    ) -> Result<GeoObject, GeoObjectError> {
        let create = CreatePayload::validate(entity, payload)?;
        let mut connection = self.connect()?;
        let transaction = connection
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(store_error("begin create transaction"))?;

        if let Some(id) = create.id {
            if row_exists(&transaction, entity, id)? {
                return Err(id_conflict(entity, id));
            }
        }

        let row = RowWrite {
            id: create.id,
            geometry: &create.geometry,
            values: &create.values,
            properties: create.properties.as_ref(),
        };
        let id = insert_row(&transaction, entity, &row)
            .map_err(|source| classify_write_error(entity, create.id, source))?;
        write_envelope(&transaction, entity, id, &create.geometry)?;
        let object = fetch(&transaction, entity, id)?.ok_or(GeoObjectError::NotFound {
            entity: entity.kind,
            id,
        })?;

        transaction
            .commit()
            .map_err(store_error("commit create transaction"))?;
        debug!("created {} object {id}", entity.key());
        Ok(object)
    }

    fn get_entity(&self, entity: &'static EntityType, id: i64) -> Result<GeoObject, GeoObjectError> {
        let connection = self.connect()?;
        fetch(&connection, entity, id)?.ok_or(GeoObjectError::NotFound {
            entity: entity.kind,
            id,
        })
    }

    fn list_entities(
        &self,
        entity: &'static EntityType,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<GeoObject>, GeoObjectError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let connection = self.connect()?;
        fetch_page(
            &connection,
            entity,
            i64::try_from(skip).unwrap_or(i64::MAX),
            i64::try_from(limit).unwrap_or(i64::MAX),
        )
    }

    fn update_entity(
        &self,
        entity: &'static EntityType,
        id: i64,
        payload: &JsonValue,
    ) -> Result<GeoObject, GeoObjectError> {
        let mut connection = self.connect()?;
        let transaction = connection
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(store_error("begin update transaction"))?;

        if !row_exists(&transaction, entity, id)? {
            return Err(GeoObjectError::NotFound {
                entity: entity.kind,
                id,
            });
        }
        let patch = UpdatePatch::validate(entity, id, payload)?;
        apply_patch(&transaction, entity, id, &patch)
            .map_err(|source| classify_write_error(entity, None, source))?;
        if let Some(geometry) = &patch.geometry {
            write_envelope(&transaction, entity, id, geometry)?;
        }
        let object = fetch(&transaction, entity, id)?.ok_or(GeoObjectError::NotFound {
            entity: entity.kind,
            id,
        })?;

        transaction
            .commit()
            .map_err(store_error("commit update transaction"))?;
        debug!("updated {} object {id}", entity.key());
        Ok(object)
    }

    fn remove_entity(
        &self,
        entity: &'static EntityType,
        id: i64,
    ) -> Result<GeoObject, GeoObjectError> {
        let mut connection = self.connect()?;
        let transaction = connection
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(store_error("begin delete transaction"))?;

        let object = fetch(&transaction, entity, id)?.ok_or(GeoObjectError::NotFound {
            entity: entity.kind,
            id,
        })?;
        transaction
            .execute(&format!("DELETE FROM {} WHERE id = ?1", entity.table), [id])
            .map_err(store_error("delete object"))?;

        transaction
            .commit()
            .map_err(store_error("commit delete transaction"))?;
        debug!("deleted {} object {id}", entity.key());
        Ok(object)
    }
}

fn row_exists(
    transaction: &Transaction<'_>,
    entity: &EntityType,
    id: i64,
) -> Result<bool, GeoObjectError> {
    transaction
        .query_row(
            &format!("SELECT 1 FROM {} WHERE id = ?1", entity.table),
            [id],
            |_| Ok(()),
        )
        .optional()
        .map(|found| found.is_some())
        .map_err(store_error("check object identity"))
}

fn apply_patch(
    transaction: &Transaction<'_>,
    entity: &EntityType,
    id: i64,
    patch: &UpdatePatch,
) -> rusqlite::Result<()> {
    let mut assignments = Vec::new();
    let mut params = Vec::new();
    if let Some(geometry) = &patch.geometry {
        assignments.push("geometry".to_owned());
        params.push(SqlValue::Blob(geometry.as_bytes().to_vec()));
    }
    for (field, value) in &patch.values {
        assignments.push(field.name.to_owned());
        params.push(scalar_param(value.as_ref()));
    }
    if let Some(properties) = &patch.properties {
        assignments.push(PROPERTIES_KEY.to_owned());
        params.push(properties_param(properties.as_ref())?);
    }

    let mut set_clause: Vec<String> = assignments
        .iter()
        .enumerate()
        .map(|(index, column)| format!("{column} = ?{}", index + 1))
        .collect();
    if entity.timestamps {
        set_clause.push(format!("updated_at = {NOW_UTC}"));
    }
    if set_clause.is_empty() {
        return Ok(());
    }

    params.push(SqlValue::Integer(id));
    let sql = format!(
        "UPDATE {} SET {} WHERE id = ?{}",
        entity.table,
        set_clause.join(", "),
        params.len()
    );
    transaction.execute(&sql, rusqlite::params_from_iter(params))?;
    Ok(())
}

fn id_conflict(entity: &EntityType, id: i64) -> GeoObjectError {
    GeoObjectError::Conflict {
        entity: entity.kind,
        detail: format!("id {id} already exists"),
    }
}

/// Map primary-key and unique violations to conflicts; everything else is a
/// store failure.
fn classify_write_error(
    entity: &EntityType,
    id: Option<i64>,
    source: rusqlite::Error,
) -> GeoObjectError {
    let conflict = match &source {
        rusqlite::Error::SqliteFailure(failure, message) => match failure.extended_code {
            ffi::SQLITE_CONSTRAINT_PRIMARYKEY => Some(id.map_or_else(
                || GeoObjectError::Conflict {
                    entity: entity.kind,
                    detail: "id already exists".to_owned(),
                },
                |id| id_conflict(entity, id),
            )),
            ffi::SQLITE_CONSTRAINT_UNIQUE => Some(unique_conflict(entity, message.as_deref())),
            _ => None,
        },
        _ => None,
    };
    match conflict {
        Some(conflict) => conflict,
        None => GeoObjectError::Store {
            operation: "write object",
            source,
        },
    }
}

fn to_payload<T: serde::Serialize>(
    entity: &EntityType,
    payload: &T,
) -> Result<JsonValue, GeoObjectError> {
    serde_json::to_value(payload).map_err(|source| GeoObjectError::Projection {
        entity: entity.kind,
        source,
    })
}

fn typed<E: GeoEntity>(object: &GeoObject) -> Result<E, GeoObjectError> {
    object
        .into_typed()
        .map_err(|source| GeoObjectError::Projection {
            entity: object.kind(),
            source,
        })
}
