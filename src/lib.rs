//! Ape mock: schema-driven mock REST backend over an in-memory store.
//!
//! A JSON schema declares entity types, optional custom routes, response
//! envelopes, pagination and a bearer token. [`api_router`] serves CRUD for
//! every entity plus the custom routes, backed by [`InMemoryStore`].

pub mod config;
pub mod dispatch;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod service;
pub mod state;
pub mod store;
pub mod template;

pub use config::{load_schema_from_file, load_schema_from_str, load_seed_from_file, validate_seed, Schema, SeedData};
pub use error::{AppError, ConfigError, StoreError};
pub use response::Responder;
pub use routes::{api_router, RouteTable};
pub use state::AppState;
pub use store::{InMemoryStore, QueryOptions, QueryResult};
