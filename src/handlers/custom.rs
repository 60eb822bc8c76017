//! Custom-route handler: path parameters become store filters.

use crate::error::AppError;
use crate::handlers::entity::{entity_config, query_options};
use crate::response::json_response;
use crate::routes::CustomRoute;
use crate::state::AppState;
use axum::{http::StatusCode, response::Response};
use std::collections::BTreeMap;

/// Filters derived from the route's mapping table and the matched path parameters.
///
/// A mapping key naming a path parameter filters the mapped field by that
/// parameter's value; any other key filters itself by the literal value.
/// Parameters absent from the table filter on their own name.
pub fn route_filters(route: &CustomRoute, params: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    let mut filters = BTreeMap::new();
    for (key, value) in &route.filters {
        match params.get(key) {
            Some(param_value) => filters.insert(value.clone(), param_value.clone()),
            None => filters.insert(key.clone(), value.clone()),
        };
    }
    for (name, value) in params {
        if !route.filters.contains_key(name) {
            filters.insert(name.clone(), value.clone());
        }
    }
    filters
}

/// Query the route's entity. An `id`-filtered route with exactly one match
/// answers with that single record; everything else is a list.
pub fn execute(
    state: &AppState,
    route: &CustomRoute,
    params: &BTreeMap<String, String>,
    query: &[(String, String)],
) -> Result<Response, AppError> {
    let cfg = entity_config(state, &route.entity)?;
    let mut opts = query_options(cfg, state.responder.pagination(), query);
    opts.filters.extend(route_filters(route, params));
    let by_id = opts.filters.contains_key("id");

    let mut result = state.store.query(&route.entity, &opts)?;
    if by_id && result.items.len() == 1 {
        if let Some(record) = result.items.pop() {
            return Ok(json_response(StatusCode::OK, &state.responder.single(record)));
        }
    }
    Ok(json_response(StatusCode::OK, &state.responder.list(result)))
}
