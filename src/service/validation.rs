//! Request validation from declared field types.

use crate::config::{EntityConfig, FieldType, Record};
use crate::error::AppError;
use serde_json::Value;

pub struct RequestValidator;

impl RequestValidator {
    /// POST: required fields (other than `id`) must be present; present fields must type-check.
    pub fn validate_create(body: &Record, entity: &EntityConfig) -> Result<(), AppError> {
        Self::validate(body, entity, true)
    }

    /// PUT: same rules as create.
    pub fn validate_update(body: &Record, entity: &EntityConfig) -> Result<(), AppError> {
        Self::validate(body, entity, true)
    }

    /// PATCH: only the fields present are checked.
    pub fn validate_patch(body: &Record, entity: &EntityConfig) -> Result<(), AppError> {
        Self::validate(body, entity, false)
    }

    fn validate(body: &Record, entity: &EntityConfig, check_required: bool) -> Result<(), AppError> {
        if check_required {
            for (name, field) in &entity.fields {
                if name != "id" && field.required && !body.contains_key(name) {
                    return Err(AppError::Validation(format!("required field \"{}\" is missing", name)));
                }
            }
        }
        for (name, value) in body {
            if name == "id" {
                continue;
            }
            if let Some(field_type) = entity.field_type(name) {
                validate_field(name, value, field_type)?;
            }
        }
        Ok(())
    }
}

fn validate_field(name: &str, v: &Value, field_type: FieldType) -> Result<(), AppError> {
    if v.is_null() || field_type.accepts(v) {
        return Ok(());
    }
    Err(AppError::Validation(format!(
        "field \"{}\": expected {}, got {}",
        name,
        field_type.as_str(),
        type_name_of_json(v)
    )))
}

fn type_name_of_json(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
