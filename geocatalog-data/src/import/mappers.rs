//! Declarative property mappers for the known source layers.
//!
//! Each mapper is a fixed list of [`FieldRule`]s. A rule copies one source
//! property into one entity field, converting it to the field's storage type.
//! Absent properties fall back to the rule's default, which is usually `null`.

use geocatalog_core::{
    EntityKind, EntityType, Properties, ScalarValue, registry::FieldType,
};
use geojson::JsonValue;
use log::debug;

/// Copy of one source property into one entity field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRule {
    /// Destination field name in the entity type.
    pub field: &'static str,
    /// Property key in the source feature.
    pub source_key: &'static str,
    /// Text used when the source key is absent.
    pub default: Option<&'static str>,
}

impl FieldRule {
    const fn same(name: &'static str) -> Self {
        Self::renamed(name, name)
    }

    const fn renamed(source_key: &'static str, field: &'static str) -> Self {
        Self {
            field,
            source_key,
            default: None,
        }
    }

    const fn or(self, default: &'static str) -> Self {
        Self {
            default: Some(default),
            ..self
        }
    }
}

/// Property mapping for one entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyMapping {
    /// Entity type the mapped rows belong to.
    pub kind: EntityKind,
    /// Field rules applied in order.
    pub rules: &'static [FieldRule],
}

/// Bus and tram stops.
pub const BUS_STOPS: PropertyMapping = PropertyMapping {
    kind: EntityKind::BusStops,
    rules: &[
        FieldRule::same("fid"),
        FieldRule::same("name_mpv"),
        FieldRule::same("rayon"),
        FieldRule::same("ao"),
        FieldRule::same("address_mpv"),
        FieldRule::same("marshrut"),
    ],
};

/// Administrative districts.
pub const DISTRICTS: PropertyMapping = PropertyMapping {
    kind: EntityKind::Districts,
    rules: &[
        FieldRule::same("fid"),
        FieldRule::renamed("NAME", "name"),
        FieldRule::renamed("NAME_AO", "name_ao"),
    ],
};

/// Metro, MCD and MCC stations.
pub const STATIONS: PropertyMapping = PropertyMapping {
    kind: EntityKind::Stations,
    rules: &[
        FieldRule::same("name_station"),
        FieldRule::same("name_line"),
        FieldRule::renamed("type", "station_type").or("unknown"),
    ],
};

/// Pedestrian streets.
pub const STREETS: PropertyMapping = PropertyMapping {
    kind: EntityKind::Streets,
    rules: &[
        FieldRule::same("fid"),
        FieldRule::renamed("ST_NAME", "st_name"),
        FieldRule::renamed("ROAD_CATEG", "road_categ"),
    ],
};

impl PropertyMapping {
    /// Registry record of the mapped entity type.
    #[must_use]
    pub const fn entity_type(&self) -> &'static EntityType {
        self.kind.entity_type()
    }

    /// Map a feature's properties onto scalar field values.
    ///
    /// Fields whose value is `null`, absent without a default, or not
    /// convertible to the field's type are left out and stored as `NULL`.
    #[must_use]
    pub fn apply(&self, properties: &Properties) -> Vec<(&'static str, ScalarValue)> {
        let entity = self.entity_type();
        self.rules
            .iter()
            .filter_map(|rule| {
                let field = entity.field(rule.field)?;
                let value = match properties.get(rule.source_key) {
                    Some(raw) => convert(field.field_type, raw).or_else(|| {
                        debug!(
                            "dropping {}.{} value {raw} that does not fit the column",
                            entity.key(),
                            rule.field
                        );
                        None
                    }),
                    None => rule.default.map(ScalarValue::from),
                }?;
                Some((rule.field, value))
            })
            .collect()
    }
}

fn convert(field_type: FieldType, raw: &JsonValue) -> Option<ScalarValue> {
    match (field_type, raw) {
        (_, JsonValue::Null) => None,
        (FieldType::Integer, JsonValue::Number(number)) => {
            number.as_i64().map(ScalarValue::Integer)
        }
        (FieldType::Integer, JsonValue::String(text)) => {
            text.trim().parse().ok().map(ScalarValue::Integer)
        }
        (FieldType::Integer, _) => None,
        (FieldType::Text { .. }, JsonValue::String(text)) => Some(ScalarValue::Text(text.clone())),
        (FieldType::Text { .. }, other) => Some(ScalarValue::Text(other.to_string())),
    }
}
