//! Raw schema types matching the schema JSON (camelCase keys).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

/// One stored entity instance: field name to JSON value.
pub type Record = Map<String, Value>;

/// Seed file contents: entity name to records.
pub type SeedData = HashMap<String, Vec<Record>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Object,
    Array,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Object => "object",
            FieldType::Array => "array",
        }
    }

    /// Whether `value` has this JSON type. `null` is handled by callers.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Number => value.is_number(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::Object => value.is_object(),
            FieldType::Array => value.is_array(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FieldConfig {
    #[serde(rename = "type")]
    pub type_: FieldType,
    #[serde(default)]
    pub required: bool,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EntityConfig {
    #[serde(default)]
    pub fields: BTreeMap<String, FieldConfig>,
}

impl EntityConfig {
    pub fn field_type(&self, name: &str) -> Option<FieldType> {
        self.fields.get(name).map(|f| f.type_)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthConfig {
    pub token: String,
}

/// Envelope templates. Any JSON tree; string leaves may carry `$variables`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ResponseWrapperConfig {
    #[serde(default)]
    pub single: Option<Value>,
    #[serde(default)]
    pub list: Option<Value>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaginationStyle {
    Cursor,
    Offset,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationConfig {
    pub style: PaginationStyle,
    #[serde(default)]
    pub default_limit: Option<usize>,
    #[serde(default)]
    pub max_limit: Option<usize>,
}

/// A schema-declared route such as `GET /users/:userId/tweets`.
///
/// `filters` maps a path parameter name to the entity field it filters on, or
/// an entity field name to a literal value when the key is not a parameter.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CustomRouteConfig {
    pub method: String,
    pub path: String,
    pub entity: String,
    #[serde(default)]
    pub filters: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    #[serde(default)]
    pub base_path: Option<String>,
    pub entities: BTreeMap<String, EntityConfig>,
    #[serde(default)]
    pub response_headers: BTreeMap<String, String>,
    #[serde(default)]
    pub auth: Option<AuthConfig>,
    #[serde(default)]
    pub response_wrapper: Option<ResponseWrapperConfig>,
    #[serde(default)]
    pub pagination: Option<PaginationConfig>,
    #[serde(default)]
    pub routes: Vec<CustomRouteConfig>,
}

impl Schema {
    pub fn entity(&self, name: &str) -> Option<&EntityConfig> {
        self.entities.get(name)
    }

    pub fn entity_names(&self) -> Vec<String> {
        self.entities.keys().cloned().collect()
    }
}
