//! Entity CRUD handlers: list, create, read, update, patch, delete.

use crate::config::{EntityConfig, PaginationConfig, Record};
use crate::error::{AppError, StoreError};
use crate::response::json_response;
use crate::service::RequestValidator;
use crate::state::AppState;
use crate::store::QueryOptions;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::Value;

pub(crate) fn parse_body(bytes: &[u8]) -> Result<Record, AppError> {
    let value: Value = serde_json::from_slice(bytes).map_err(|_| AppError::BadRequest("Invalid JSON".into()))?;
    body_to_map(value)
}

fn body_to_map(value: Value) -> Result<Record, AppError> {
    match value {
        Value::Object(m) => Ok(m),
        _ => Err(AppError::BadRequest("body must be a JSON object".into())),
    }
}

pub(crate) fn entity_config<'a>(state: &'a AppState, entity: &str) -> Result<&'a EntityConfig, AppError> {
    state
        .schema
        .entity(entity)
        .ok_or_else(|| StoreError::EntityTypeNotFound(entity.to_string()).into())
}

/// Build store options from query-string pairs. Declared fields become equality
/// filters; `limit`/`max_results`, `offset` and `cursor` count only when pagination
/// is configured. The first occurrence of a repeated key wins.
pub fn query_options(
    entity: &EntityConfig,
    pagination: Option<&PaginationConfig>,
    params: &[(String, String)],
) -> QueryOptions {
    let mut opts = QueryOptions::default();
    let mut limit: Option<&str> = None;
    let mut max_results: Option<&str> = None;

    for (k, v) in params {
        match k.as_str() {
            "limit" if pagination.is_some() => {
                limit.get_or_insert(v.as_str());
            }
            "max_results" if pagination.is_some() => {
                max_results.get_or_insert(v.as_str());
            }
            "offset" if pagination.is_some() => {
                if opts.offset.is_none() {
                    opts.offset = v.parse().ok();
                }
            }
            "cursor" if pagination.is_some() => {
                if opts.cursor.is_none() && !v.is_empty() {
                    opts.cursor = Some(v.clone());
                }
            }
            _ => {
                if entity.fields.contains_key(k) && !opts.filters.contains_key(k) {
                    opts.filters.insert(k.clone(), v.clone());
                }
            }
        }
    }

    if let Some(pagination) = pagination {
        opts.limit = effective_limit(pagination, limit.or(max_results));
    }
    opts
}

fn effective_limit(pagination: &PaginationConfig, requested: Option<&str>) -> Option<usize> {
    let requested = requested
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|n| *n > 0);
    let limit = requested.or(pagination.default_limit.filter(|n| *n > 0))?;
    Some(match pagination.max_limit {
        Some(max) if max > 0 => limit.min(max),
        _ => limit,
    })
}

pub fn list(state: &AppState, entity: &str, params: &[(String, String)]) -> Result<Response, AppError> {
    let cfg = entity_config(state, entity)?;
    let opts = query_options(cfg, state.responder.pagination(), params);
    let result = state.store.query(entity, &opts)?;
    Ok(json_response(StatusCode::OK, &state.responder.list(result)))
}

pub fn create(state: &AppState, entity: &str, body: &[u8]) -> Result<Response, AppError> {
    let cfg = entity_config(state, entity)?;
    let body = parse_body(body)?;
    RequestValidator::validate_create(&body, cfg)?;
    let id = state.store.create(entity, body)?;
    let record = state
        .store
        .get(entity, &id)
        .map_err(|e| AppError::Internal(format!("failed to read back created record: {}", e)))?;
    tracing::debug!(entity = %entity, id = %id, "created record");
    Ok(json_response(StatusCode::CREATED, &state.responder.single(record)))
}

pub fn read(state: &AppState, entity: &str, id: &str) -> Result<Response, AppError> {
    entity_config(state, entity)?;
    let record = state.store.get(entity, id)?;
    Ok(json_response(StatusCode::OK, &state.responder.single(record)))
}

pub fn update(state: &AppState, entity: &str, id: &str, body: &[u8]) -> Result<Response, AppError> {
    let cfg = entity_config(state, entity)?;
    let body = parse_body(body)?;
    RequestValidator::validate_update(&body, cfg)?;
    state.store.update(entity, id, body)?;
    let record = state.store.get(entity, id)?;
    Ok(json_response(StatusCode::OK, &state.responder.single(record)))
}

pub fn patch(state: &AppState, entity: &str, id: &str, body: &[u8]) -> Result<Response, AppError> {
    let cfg = entity_config(state, entity)?;
    let body = parse_body(body)?;
    RequestValidator::validate_patch(&body, cfg)?;
    state.store.patch(entity, id, body)?;
    let record = state.store.get(entity, id)?;
    Ok(json_response(StatusCode::OK, &state.responder.single(record)))
}

pub fn delete(state: &AppState, entity: &str, id: &str) -> Result<Response, AppError> {
    entity_config(state, entity)?;
    state.store.delete(entity, id)?;
    tracing::debug!(entity = %entity, id = %id, "deleted record");
    Ok(StatusCode::NO_CONTENT.into_response())
}
