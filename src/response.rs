//! Response shaping: envelope templates, implicit pagination envelope, JSON encoding.

use crate::config::{PaginationConfig, PaginationStyle, Record, Schema};
use crate::store::QueryResult;
use crate::template::{self, Bindings};
use axum::{
    body::Body,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::{json, Value};

/// Shapes store results for the wire using the schema's wrapper and pagination config.
#[derive(Clone, Debug, Default)]
pub struct Responder {
    single: Option<Value>,
    list: Option<Value>,
    pagination: Option<PaginationConfig>,
}

impl Responder {
    pub fn from_schema(schema: &Schema) -> Self {
        let wrapper = schema.response_wrapper.clone().unwrap_or_default();
        Responder {
            single: wrapper.single,
            list: wrapper.list,
            pagination: schema.pagination.clone(),
        }
    }

    pub fn pagination(&self) -> Option<&PaginationConfig> {
        self.pagination.as_ref()
    }

    /// Bare record, or the `single` template with `$entity` bound.
    pub fn single(&self, entity: Record) -> Value {
        let entity = Value::Object(entity);
        match &self.single {
            Some(tmpl) => template::apply(tmpl, &Bindings::new().bind("$entity", entity)),
            None => entity,
        }
    }

    /// Bare array, the `list` template, or an implicit `{data, meta}` envelope
    /// when pagination is configured and the page is not the whole result.
    pub fn list(&self, result: QueryResult) -> Value {
        let count = result.items.len();
        let items: Vec<Value> = result.items.into_iter().map(Value::Object).collect();

        if let Some(tmpl) = &self.list {
            let bindings = Bindings::new()
                .bind("$entities", items)
                .bind("$count", count)
                .bind("$result_count", count)
                .bind("$total_count", result.total_count)
                .bind("$next_token", result.next_cursor.map_or(Value::Null, Value::String));
            return template::apply(tmpl, &bindings);
        }

        if let Some(pagination) = &self.pagination {
            if result.next_cursor.is_some() || result.total_count > count {
                let mut meta = json!({ "result_count": count });
                if let (PaginationStyle::Cursor, Some(next)) = (pagination.style, &result.next_cursor) {
                    meta["next_token"] = Value::String(next.clone());
                }
                return json!({ "data": items, "meta": meta });
            }
        }

        Value::Array(items)
    }
}

/// Serialize `body` as a JSON response. An encoding failure is logged and the
/// status goes out with an empty body.
pub fn json_response(status: StatusCode, body: &Value) -> Response {
    match serde_json::to_vec(body) {
        Ok(bytes) => (status, [(header::CONTENT_TYPE, "application/json")], Body::from(bytes)).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "error encoding JSON response");
            status.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(json: &str) -> Schema {
        serde_json::from_str(json).unwrap()
    }

    fn rec(id: &str) -> Record {
        let mut r = Record::new();
        r.insert("id".into(), Value::String(id.into()));
        r
    }

    fn result(ids: &[&str], total: usize, next: Option<&str>) -> QueryResult {
        QueryResult {
            items: ids.iter().map(|id| rec(id)).collect(),
            total_count: total,
            next_cursor: next.map(String::from),
        }
    }

    const ENTITIES: &str = r#""entities": {"users": {"fields": {"id": {"type": "string"}}}}"#;

    #[test]
    fn bare_without_config() {
        let r = Responder::from_schema(&schema(&format!("{{{ENTITIES}}}")));
        assert_eq!(r.single(rec("1")), json!({"id": "1"}));
        assert_eq!(r.list(result(&["1"], 1, None)), json!([{"id": "1"}]));
    }

    #[test]
    fn single_and_list_templates() {
        let r = Responder::from_schema(&schema(&format!(
            r#"{{{ENTITIES}, "responseWrapper": {{
                "single": {{"data": "$entity"}},
                "list": {{"data": "$entities", "meta": {{"result_count": "$count", "total": "$total_count", "next": "$next_token"}}}}
            }}}}"#
        )));
        assert_eq!(r.single(rec("1")), json!({"data": {"id": "1"}}));
        assert_eq!(
            r.list(result(&["1", "2"], 5, Some("2"))),
            json!({"data": [{"id": "1"}, {"id": "2"}], "meta": {"result_count": 2, "total": 5, "next": "2"}})
        );
        assert_eq!(
            r.list(result(&[], 0, None)),
            json!({"data": [], "meta": {"result_count": 0, "total": 0, "next": null}})
        );
    }

    #[test]
    fn implicit_envelope_only_when_paging_matters() {
        let r = Responder::from_schema(&schema(&format!(
            r#"{{{ENTITIES}, "pagination": {{"style": "cursor", "defaultLimit": 2}}}}"#
        )));
        assert_eq!(r.list(result(&["1"], 1, None)), json!([{"id": "1"}]));
        assert_eq!(
            r.list(result(&["1", "2"], 3, Some("2"))),
            json!({"data": [{"id": "1"}, {"id": "2"}], "meta": {"result_count": 2, "next_token": "2"}})
        );
    }

    #[test]
    fn offset_style_omits_next_token() {
        let r = Responder::from_schema(&schema(&format!(
            r#"{{{ENTITIES}, "pagination": {{"style": "offset", "defaultLimit": 2}}}}"#
        )));
        assert_eq!(
            r.list(result(&["3", "4"], 5, Some("4"))),
            json!({"data": [{"id": "3"}, {"id": "4"}], "meta": {"result_count": 2}})
        );
    }
}
