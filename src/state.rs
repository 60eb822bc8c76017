//! Shared application state for the router. Built once at startup; only the store mutates.

use crate::config::Schema;
use crate::error::ConfigError;
use crate::response::Responder;
use crate::routes::RouteTable;
use crate::store::InMemoryStore;
use axum::http::{header, HeaderName, HeaderValue};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub schema: Arc<Schema>,
    pub store: Arc<InMemoryStore>,
    pub routes: Arc<RouteTable>,
    pub responder: Arc<Responder>,
    /// Static headers from the schema, minus `content-type` and `content-length`.
    pub response_headers: Arc<Vec<(HeaderName, HeaderValue)>>,
}

impl AppState {
    /// Build the route table and response config around an existing store.
    pub fn new(schema: Schema, store: Arc<InMemoryStore>) -> Result<Self, ConfigError> {
        let routes = RouteTable::build(&schema)?;
        let responder = Responder::from_schema(&schema);
        let response_headers = parse_response_headers(&schema)?;
        Ok(AppState {
            schema: Arc::new(schema),
            store,
            routes: Arc::new(routes),
            responder: Arc::new(responder),
            response_headers: Arc::new(response_headers),
        })
    }
}

fn parse_response_headers(schema: &Schema) -> Result<Vec<(HeaderName, HeaderValue)>, ConfigError> {
    let mut out = Vec::with_capacity(schema.response_headers.len());
    for (name, value) in &schema.response_headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| ConfigError::InvalidHeader(name.clone()))?;
        if name == header::CONTENT_TYPE || name == header::CONTENT_LENGTH {
            tracing::warn!(header = %name, "ignoring protected response header");
            continue;
        }
        let value = HeaderValue::from_str(value)
            .map_err(|_| ConfigError::InvalidHeader(format!("{}: {}", name, value)))?;
        out.push((name, value));
    }
    Ok(out)
}
