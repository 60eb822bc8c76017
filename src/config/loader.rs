//! Load the schema and seed data from JSON files or strings.

use crate::config::{validate, Schema, SeedData};
use crate::error::ConfigError;
use std::path::Path;

/// Parse and validate a schema. Any failure is fatal at startup.
pub fn load_schema_from_str(json: &str) -> Result<Schema, ConfigError> {
    let schema: Schema = serde_json::from_str(json)
        .map_err(|e| ConfigError::Load(format!("failed to parse schema JSON: {}", e)))?;
    validate(&schema)?;
    tracing::debug!(entities = ?schema.entity_names(), routes = schema.routes.len(), "schema loaded");
    Ok(schema)
}

pub fn load_schema_from_file(path: impl AsRef<Path>) -> Result<Schema, ConfigError> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Load(format!("failed to read schema file {}: {}", path.display(), e)))?;
    load_schema_from_str(&json)
}

/// Parse seed data. Validation against a schema is separate (`validate_seed`).
pub fn load_seed_from_str(json: &str) -> Result<SeedData, ConfigError> {
    serde_json::from_str(json).map_err(|e| ConfigError::Load(format!("failed to parse seed JSON: {}", e)))
}

pub fn load_seed_from_file(path: impl AsRef<Path>) -> Result<SeedData, ConfigError> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Load(format!("failed to read seed file {}: {}", path.display(), e)))?;
    load_seed_from_str(&json)
}
