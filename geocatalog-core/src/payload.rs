//! Validation of Create and Update payloads against an entity type.
//!
//! Payloads arrive as JSON objects. Validation collects every violated field
//! before failing so callers can report them together. Keys outside the
//! entity's shape are ignored and logged at debug level.

use std::fmt;

use geojson::{JsonObject, JsonValue};
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    geometry::{self, StoreGeometry},
    registry::{EntityType, FieldAccess, FieldDef, FieldType, IdentityPolicy},
};

/// Opaque JSON object stored verbatim alongside a row.
pub type Properties = JsonObject;

/// Payload key holding the opaque properties object.
pub const PROPERTIES_KEY: &str = "properties_data";

/// Typed value of a scalar column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    /// Integer column value.
    Integer(i64),
    /// Text column value.
    Text(String),
}

impl ScalarValue {
    /// Borrow the text, if this is a text value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Integer(_) => None,
        }
    }

    /// Return the integer, if this is an integer value.
    #[must_use]
    pub const fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            Self::Text(_) => None,
        }
    }
}

impl From<&str> for ScalarValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<i64> for ScalarValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

/// One violated field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    /// Payload key, or `body` when the payload itself is malformed.
    pub field: String,
    /// Human-readable reason.
    pub message: String,
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// A payload broke its entity's Create or Update shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid payload: {}", render(.violations))]
pub struct ValidationError {
    violations: Vec<FieldViolation>,
}

impl ValidationError {
    /// Build an error for a single field.
    #[must_use]
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        Self {
            violations: vec![FieldViolation {
                field: field.to_owned(),
                message: message.into(),
            }],
        }
    }

    /// Every violated field in payload-shape order.
    #[must_use]
    pub fn violations(&self) -> &[FieldViolation] {
        &self.violations
    }

    /// Whether `field` is among the violations.
    #[must_use]
    pub fn mentions(&self, field: &str) -> bool {
        self.violations.iter().any(|violation| violation.field == field)
    }
}

fn render(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Default)]
struct Violations(Vec<FieldViolation>);

impl Violations {
    fn push(&mut self, field: &str, message: impl Into<String>) {
        self.0.push(FieldViolation {
            field: field.to_owned(),
            message: message.into(),
        });
    }

    fn finish(self) -> Result<(), ValidationError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { violations: self.0 })
        }
    }
}

/// A validated Create payload.
#[derive(Debug, Clone)]
pub struct CreatePayload {
    pub(crate) id: Option<i64>,
    pub(crate) geometry: StoreGeometry,
    /// Aligned with [`EntityType::fields`].
    pub(crate) values: Vec<Option<ScalarValue>>,
    pub(crate) properties: Option<Properties>,
}

impl CreatePayload {
    /// Validate `payload` against the entity's Create shape.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] listing every violated field.
    pub fn validate(entity: &EntityType, payload: &JsonValue) -> Result<Self, ValidationError> {
        let object = as_object(payload)?;
        log_ignored_keys(entity, object);
        let mut violations = Violations::default();

        let id = match (entity.identity, object.get("id")) {
            (IdentityPolicy::External, None | Some(JsonValue::Null)) => {
                violations.push("id", "field required");
                None
            }
            (IdentityPolicy::External, Some(raw)) => {
                let id = raw.as_i64();
                if id.is_none() {
                    violations.push("id", "expected an integer");
                }
                id
            }
            (IdentityPolicy::Generated, None | Some(JsonValue::Null)) => None,
            (IdentityPolicy::Generated, Some(_)) => {
                violations.push("id", "identity is assigned by the store");
                None
            }
        };

        let geometry = match object.get("geometry") {
            None | Some(JsonValue::Null) => {
                violations.push("geometry", "field required");
                None
            }
            Some(raw) => encode_geometry(entity, raw, &mut violations),
        };

        let values = entity
            .fields
            .iter()
            .map(|field| create_value(field, object.get(field.name), &mut violations))
            .collect();

        let properties = if entity.properties {
            properties_value(object.get(PROPERTIES_KEY), &mut violations).flatten()
        } else {
            None
        };

        violations.finish()?;
        let geometry = geometry.ok_or_else(|| ValidationError::single("geometry", "field required"))?;
        Ok(Self {
            id,
            geometry,
            values,
            properties,
        })
    }

    /// Caller-supplied identity, for external-identity types.
    #[must_use]
    pub const fn id(&self) -> Option<i64> {
        self.id
    }
}

/// A validated Update payload with merge-patch semantics.
///
/// Only keys present in the payload are written. An explicit `null` clears a
/// nullable column; a `null` or absent geometry keeps the stored one.
#[derive(Debug, Clone, Default)]
pub struct UpdatePatch {
    pub(crate) geometry: Option<StoreGeometry>,
    pub(crate) values: Vec<(&'static FieldDef, Option<ScalarValue>)>,
    pub(crate) properties: Option<Option<Properties>>,
}

impl UpdatePatch {
    /// Validate `payload` against the entity's Update shape for row `id`.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] listing every violated field.
    pub fn validate(
        entity: &'static EntityType,
        id: i64,
        payload: &JsonValue,
    ) -> Result<Self, ValidationError> {
        let object = as_object(payload)?;
        log_ignored_keys(entity, object);
        let mut violations = Violations::default();

        match object.get("id") {
            None | Some(JsonValue::Null) => {}
            Some(raw) if raw.as_i64() == Some(id) => {}
            Some(_) => violations.push("id", "identity cannot be changed"),
        }

        let geometry = match object.get("geometry") {
            None | Some(JsonValue::Null) => None,
            Some(raw) => encode_geometry(entity, raw, &mut violations),
        };

        let mut values = Vec::new();
        for field in entity.fields.iter().filter(|field| field.is_writable()) {
            match object.get(field.name) {
                None => {}
                Some(JsonValue::Null) if field.nullable => values.push((field, None)),
                Some(JsonValue::Null) => violations.push(field.name, "may not be null"),
                Some(raw) => {
                    if let Some(value) = scalar_value(field, raw, &mut violations) {
                        values.push((field, Some(value)));
                    }
                }
            }
        }

        let properties = if entity.properties {
            properties_value(object.get(PROPERTIES_KEY), &mut violations)
        } else {
            None
        };

        violations.finish()?;
        Ok(Self {
            geometry,
            values,
            properties,
        })
    }
}

fn as_object(payload: &JsonValue) -> Result<&JsonObject, ValidationError> {
    payload
        .as_object()
        .ok_or_else(|| ValidationError::single("body", "expected a JSON object"))
}

fn log_ignored_keys(entity: &EntityType, object: &JsonObject) {
    let ignored: Vec<&str> = object
        .keys()
        .map(String::as_str)
        .filter(|key| !is_known_key(entity, key))
        .collect();
    if !ignored.is_empty() {
        debug!(
            "ignoring unknown {} payload keys: {}",
            entity.key(),
            ignored.join(", ")
        );
    }
}

fn is_known_key(entity: &EntityType, key: &str) -> bool {
    match key {
        "id" | "geometry" => true,
        PROPERTIES_KEY => entity.properties,
        _ => entity.field(key).is_some_and(FieldDef::is_writable),
    }
}

fn encode_geometry(
    entity: &EntityType,
    raw: &JsonValue,
    violations: &mut Violations,
) -> Option<StoreGeometry> {
    let encoded =
        geometry::parse(raw).and_then(|parsed| geometry::encode_as(entity.geometry, &parsed));
    match encoded {
        Ok(stored) => Some(stored),
        Err(err) => {
            violations.push("geometry", err.to_string());
            None
        }
    }
}

fn create_value(
    field: &FieldDef,
    raw: Option<&JsonValue>,
    violations: &mut Violations,
) -> Option<ScalarValue> {
    if !field.is_writable() {
        return None;
    }
    let required = field.access == FieldAccess::Required;
    match raw {
        None if required => {
            violations.push(field.name, "field required");
            None
        }
        Some(JsonValue::Null) if required || !field.nullable => {
            violations.push(field.name, "may not be null");
            None
        }
        None | Some(JsonValue::Null) => None,
        Some(raw) => scalar_value(field, raw, violations),
    }
}

fn scalar_value(
    field: &FieldDef,
    raw: &JsonValue,
    violations: &mut Violations,
) -> Option<ScalarValue> {
    match field.field_type {
        FieldType::Text { max_len } => {
            let Some(text) = raw.as_str() else {
                violations.push(field.name, "expected a string");
                return None;
            };
            match max_len {
                Some(max_len) if text.chars().count() > max_len => {
                    violations.push(
                        field.name,
                        format!("must be at most {max_len} characters long"),
                    );
                    return None;
                }
                _ => {}
            }
            Some(ScalarValue::Text(text.to_owned()))
        }
        FieldType::Integer => {
            let value = raw.as_i64();
            if value.is_none() {
                violations.push(field.name, "expected an integer");
            }
            value.map(ScalarValue::Integer)
        }
    }
}

/// `None` when absent, `Some(None)` for an explicit `null`.
fn properties_value(
    raw: Option<&JsonValue>,
    violations: &mut Violations,
) -> Option<Option<Properties>> {
    match raw {
        None => None,
        Some(JsonValue::Null) => Some(None),
        Some(JsonValue::Object(object)) => Some(Some(object.clone())),
        Some(_) => {
            violations.push(PROPERTIES_KEY, "expected a JSON object");
            None
        }
    }
}
