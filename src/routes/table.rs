//! Route table built once from the schema: two CRUD routes per entity plus custom routes.

use crate::config::Schema;
use crate::error::ConfigError;
use crate::routes::pattern::PathPattern;
use axum::http::Method;
use std::collections::{BTreeMap, HashMap};

/// Trim whitespace; empty means no prefix. Otherwise one leading slash and no trailing slash.
pub fn normalize_base_path(base_path: &str) -> String {
    let trimmed = base_path.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return String::new();
    }
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RouteDescriptor {
    /// `GET` list and `POST` create.
    Collection { entity: String, path: String },
    /// `GET`, `PUT`, `PATCH` and `DELETE` on one record.
    Item { entity: String, path: String },
}

impl RouteDescriptor {
    pub fn entity(&self) -> &str {
        match self {
            RouteDescriptor::Collection { entity, .. } | RouteDescriptor::Item { entity, .. } => entity,
        }
    }

    pub fn path(&self) -> &str {
        match self {
            RouteDescriptor::Collection { path, .. } | RouteDescriptor::Item { path, .. } => path,
        }
    }

    pub fn methods(&self) -> &'static [&'static str] {
        match self {
            RouteDescriptor::Collection { .. } => &["GET", "POST"],
            RouteDescriptor::Item { .. } => &["GET", "PUT", "PATCH", "DELETE"],
        }
    }
}

#[derive(Clone, Debug)]
pub struct CustomRoute {
    pub method: Method,
    /// Base-path-prefixed pattern.
    pub pattern: PathPattern,
    pub entity: String,
    pub filters: BTreeMap<String, String>,
}

/// Where a CRUD path points.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CrudTarget<'a> {
    Collection { entity: &'a str },
    Item { entity: &'a str, id: &'a str },
}

#[derive(Clone, Debug, Default)]
pub struct RouteTable {
    base_path: String,
    entity_routes: Vec<RouteDescriptor>,
    collections: HashMap<String, String>,
    custom: BTreeMap<(String, String), CustomRoute>,
}

impl RouteTable {
    pub fn build(schema: &Schema) -> Result<Self, ConfigError> {
        let base_path = normalize_base_path(schema.base_path.as_deref().unwrap_or(""));
        let mut table = RouteTable {
            base_path: base_path.clone(),
            ..Default::default()
        };

        for entity in schema.entities.keys() {
            let collection_path = format!("{}/{}", base_path, entity);
            table.entity_routes.push(RouteDescriptor::Collection {
                entity: entity.clone(),
                path: collection_path.clone(),
            });
            table.entity_routes.push(RouteDescriptor::Item {
                entity: entity.clone(),
                path: format!("{}/{{id}}", collection_path),
            });
            tracing::debug!(entity = %entity, path = %collection_path, "registered CRUD routes");
            table.collections.insert(collection_path, entity.clone());
        }

        for route in &schema.routes {
            let method = Method::from_bytes(route.method.to_ascii_uppercase().as_bytes())
                .map_err(|_| ConfigError::InvalidRoute(format!("unsupported method '{}'", route.method)))?;
            if schema.entity(&route.entity).is_none() {
                return Err(ConfigError::UnknownEntity {
                    context: format!("custom route {} {}", method, route.path),
                    entity: route.entity.clone(),
                });
            }
            let pattern = PathPattern::parse(&format!("{}{}", base_path, route.path));
            let key = (method.to_string(), pattern.to_string());
            if table.custom.contains_key(&key) {
                return Err(ConfigError::DuplicateRoute {
                    method: key.0,
                    path: key.1,
                });
            }
            tracing::info!(method = %method, path = %pattern, entity = %route.entity, "registered custom route");
            table.custom.insert(
                key,
                CustomRoute {
                    method,
                    pattern,
                    entity: route.entity.clone(),
                    filters: route.filters.clone(),
                },
            );
        }

        Ok(table)
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn entity_routes(&self) -> &[RouteDescriptor] {
        &self.entity_routes
    }

    pub fn custom_routes(&self) -> impl Iterator<Item = &CustomRoute> {
        self.custom.values()
    }

    /// The custom route registered for this method whose pattern matches `path`.
    pub fn match_custom(&self, method: &Method, path: &str) -> Option<(&CustomRoute, BTreeMap<String, String>)> {
        self.custom
            .values()
            .filter(|route| route.method == *method)
            .find_map(|route| route.pattern.matches(path).map(|params| (route, params)))
    }

    /// Whether any custom route, under any method, matches `path`.
    pub fn custom_path_known(&self, path: &str) -> bool {
        self.custom.values().any(|route| route.pattern.matches(path).is_some())
    }

    /// `<collection>` or `<collection>/<id>` with a non-empty, single-segment id.
    pub fn match_crud<'a>(&'a self, path: &'a str) -> Option<CrudTarget<'a>> {
        if let Some(entity) = self.collections.get(path) {
            return Some(CrudTarget::Collection { entity });
        }
        let (collection, id) = path.rsplit_once('/')?;
        if id.is_empty() {
            return None;
        }
        self.collections
            .get(collection)
            .map(|entity| CrudTarget::Item { entity, id })
    }
}
