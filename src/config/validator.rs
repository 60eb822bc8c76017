//! Schema validation: entity shape, custom-route references, seed data.

use crate::config::{FieldType, Schema, SeedData};
use crate::error::ConfigError;
use regex::Regex;
use std::collections::HashSet;

const ROUTE_METHODS: &[&str] = &["GET", "POST", "PUT", "PATCH", "DELETE"];

pub fn validate(schema: &Schema) -> Result<(), ConfigError> {
    if schema.entities.is_empty() {
        return Err(ConfigError::EmptySchema);
    }

    for (name, entity) in &schema.entities {
        if entity.fields.is_empty() {
            return Err(ConfigError::NoFields { entity: name.clone() });
        }
        match entity.field_type("id") {
            None => return Err(ConfigError::MissingIdField { entity: name.clone() }),
            Some(FieldType::String) => {}
            Some(_) => return Err(ConfigError::InvalidIdType { entity: name.clone() }),
        }
    }

    validate_routes(schema)
}

fn validate_routes(schema: &Schema) -> Result<(), ConfigError> {
    let param_re = Regex::new(r"^:[A-Za-z_][A-Za-z0-9_]*$")
        .map_err(|e| ConfigError::InvalidRoute(e.to_string()))?;
    let mut seen = HashSet::new();

    for route in &schema.routes {
        let method = route.method.to_ascii_uppercase();
        if !ROUTE_METHODS.contains(&method.as_str()) {
            return Err(ConfigError::InvalidRoute(format!(
                "unsupported method '{}' for {}",
                route.method, route.path
            )));
        }
        if !route.path.starts_with('/') {
            return Err(ConfigError::InvalidRoute(format!(
                "path '{}' must start with '/'",
                route.path
            )));
        }
        let mut params = HashSet::new();
        for segment in route.path.split('/').filter(|s| s.starts_with(':')) {
            if !param_re.is_match(segment) {
                return Err(ConfigError::InvalidRoute(format!(
                    "bad parameter '{}' in {}",
                    segment, route.path
                )));
            }
            if !params.insert(segment) {
                return Err(ConfigError::InvalidRoute(format!(
                    "parameter '{}' repeated in {}",
                    segment, route.path
                )));
            }
        }
        if schema.entity(&route.entity).is_none() {
            return Err(ConfigError::UnknownEntity {
                context: format!("custom route {} {}", method, route.path),
                entity: route.entity.clone(),
            });
        }
        if !seen.insert((method.clone(), route.path.clone())) {
            return Err(ConfigError::DuplicateRoute {
                method,
                path: route.path.clone(),
            });
        }
    }
    Ok(())
}

/// Check seed records against the schema. Extra fields pass; `null` passes for any type.
pub fn validate_seed(schema: &Schema, seed: &SeedData) -> Result<(), ConfigError> {
    for (entity_name, records) in seed {
        let entity = schema.entity(entity_name).ok_or_else(|| ConfigError::UnknownEntity {
            context: "seed data".into(),
            entity: entity_name.clone(),
        })?;
        for (i, record) in records.iter().enumerate() {
            for (field_name, field) in &entity.fields {
                if field.required && !record.contains_key(field_name) {
                    return Err(ConfigError::SeedValidation(format!(
                        "{}[{}]: required field '{}' is missing",
                        entity_name, i, field_name
                    )));
                }
            }
            for (field_name, value) in record {
                let Some(field_type) = entity.field_type(field_name) else {
                    continue;
                };
                if !value.is_null() && !field_type.accepts(value) {
                    return Err(ConfigError::SeedValidation(format!(
                        "{}[{}]: field '{}' expected {}",
                        entity_name,
                        i,
                        field_name,
                        field_type.as_str()
                    )));
                }
            }
        }
    }
    Ok(())
}
