//! Route dispatcher: resolves method + path against the route table and runs the handler.

use crate::error::AppError;
use crate::handlers::{custom, entity};
use crate::routes::{CrudTarget, CustomRoute, RouteTable};
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{Method, Uri},
    response::{IntoResponse, Response},
};
use percent_encoding::percent_decode_str;
use std::borrow::Cow;
use std::collections::BTreeMap;

/// What a request resolved to.
#[derive(Debug)]
pub enum Operation<'a> {
    List { entity: &'a str },
    Create { entity: &'a str },
    Read { entity: &'a str, id: &'a str },
    Update { entity: &'a str, id: &'a str },
    Patch { entity: &'a str, id: &'a str },
    Delete { entity: &'a str, id: &'a str },
    Custom {
        route: &'a CustomRoute,
        params: BTreeMap<String, String>,
    },
}

/// Custom routes first, then CRUD paths. A path known under some other method is 405.
pub fn resolve<'a>(routes: &'a RouteTable, method: &Method, path: &'a str) -> Result<Operation<'a>, AppError> {
    if let Some((route, params)) = routes.match_custom(method, path) {
        return Ok(Operation::Custom { route, params });
    }

    match routes.match_crud(path) {
        Some(CrudTarget::Collection { entity }) => match *method {
            Method::GET => return Ok(Operation::List { entity }),
            Method::POST => return Ok(Operation::Create { entity }),
            _ => return Err(AppError::RouteNotMatched { path_known: true }),
        },
        Some(CrudTarget::Item { entity, id }) => match *method {
            Method::GET => return Ok(Operation::Read { entity, id }),
            Method::PUT => return Ok(Operation::Update { entity, id }),
            Method::PATCH => return Ok(Operation::Patch { entity, id }),
            Method::DELETE => return Ok(Operation::Delete { entity, id }),
            _ => return Err(AppError::RouteNotMatched { path_known: true }),
        },
        None => {}
    }

    Err(AppError::RouteNotMatched {
        path_known: routes.custom_path_known(path),
    })
}

fn run(state: &AppState, op: Operation<'_>, query: &[(String, String)], body: &[u8]) -> Result<Response, AppError> {
    match op {
        Operation::List { entity } => entity::list(state, entity, query),
        Operation::Create { entity } => entity::create(state, entity, body),
        Operation::Read { entity, id } => entity::read(state, entity, id),
        Operation::Update { entity, id } => entity::update(state, entity, id, body),
        Operation::Patch { entity, id } => entity::patch(state, entity, id, body),
        Operation::Delete { entity, id } => entity::delete(state, entity, id),
        Operation::Custom { route, params } => custom::execute(state, route, &params, query),
    }
}

/// Percent-decoded request path, so IDs and custom-route parameters match
/// stored values. Invalid UTF-8 after decoding is a 400.
pub fn decode_path(raw: &str) -> Result<Cow<'_, str>, AppError> {
    percent_decode_str(raw)
        .decode_utf8()
        .map_err(|_| AppError::BadRequest("invalid percent-encoding in path".into()))
}

/// Router fallback that serves every generated and custom route.
pub async fn dispatch(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    Query(query): Query<Vec<(String, String)>>,
    body: Bytes,
) -> Response {
    handle(&state, &method, uri.path(), &query, &body).into_response()
}

fn handle(
    state: &AppState,
    method: &Method,
    raw_path: &str,
    query: &[(String, String)],
    body: &[u8],
) -> Result<Response, AppError> {
    let path = decode_path(raw_path)?;
    let op = resolve(&state.routes, method, &path)?;
    run(state, op, query, body)
}
