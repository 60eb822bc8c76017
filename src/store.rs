//! In-memory entity store with filtered, paginated queries.
//!
//! One reader/writer lock guards every collection. Reads (`get`, `list`, `query`)
//! share it; writes (`create`, `update`, `patch`, `delete`, `seed`) take it exclusively.
//! No operation calls back into the store while holding the lock.

use crate::config::{FieldType, Record, Schema};
use crate::error::StoreError;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Equality filters (AND), plus optional pagination.
///
/// `cursor` wins over `offset` when both are set. A `limit` of zero means no limit.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryOptions {
    pub filters: BTreeMap<String, String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub cursor: Option<String>,
}

impl QueryOptions {
    pub fn filter(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(field.into(), value.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn cursor(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = Some(cursor.into());
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryResult {
    /// Matching records after pagination, in ascending ID order.
    pub items: Vec<Record>,
    /// Matching records before pagination.
    pub total_count: usize,
    /// ID of the last item on this page; set only when more pages exist.
    pub next_cursor: Option<String>,
}

#[derive(Debug, Default)]
struct Collection {
    records: HashMap<String, Record>,
    field_types: HashMap<String, FieldType>,
    /// High-water mark for generated IDs.
    counter: u64,
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store with an empty collection for every entity in the schema.
    pub fn from_schema(schema: &Schema) -> Result<Self, StoreError> {
        let store = Self::new();
        for (name, entity) in &schema.entities {
            let field_types = entity
                .fields
                .iter()
                .map(|(field, cfg)| (field.clone(), cfg.type_))
                .collect();
            store.initialize(name, field_types)?;
        }
        Ok(store)
    }

    /// Register an entity type. Declared field types drive filter coercion.
    /// Re-initializing an existing type keeps its records and counter.
    pub fn initialize(
        &self,
        entity: &str,
        field_types: HashMap<String, FieldType>,
    ) -> Result<(), StoreError> {
        let mut collections = self.write()?;
        collections.entry(entity.to_string()).or_default().field_types = field_types;
        Ok(())
    }

    /// Insert a record and return its ID.
    ///
    /// A missing, null or empty `id` gets the next counter value. A caller-supplied
    /// ID is used verbatim and silently replaces any record already stored under it.
    pub fn create(&self, entity: &str, mut record: Record) -> Result<String, StoreError> {
        let mut collections = self.write()?;
        let collection = collection_mut(&mut collections, entity)?;

        let id = match record.get("id") {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            None | Some(Value::Null) | Some(Value::String(_)) => {
                collection.counter = collection
                    .counter
                    .checked_add(1)
                    .ok_or_else(|| StoreError::IdSpaceExhausted(entity.to_string()))?;
                collection.counter.to_string()
            }
            Some(other) => other.to_string(),
        };
        record.insert("id".into(), Value::String(id.clone()));
        collection.records.insert(id.clone(), record);
        Ok(id)
    }

    pub fn get(&self, entity: &str, id: &str) -> Result<Record, StoreError> {
        let collections = self.read()?;
        collection(&collections, entity)?
            .records
            .get(id)
            .cloned()
            .ok_or_else(|| not_found(entity, id))
    }

    /// Every record of the type, in ascending ID order.
    pub fn list(&self, entity: &str) -> Result<Vec<Record>, StoreError> {
        Ok(self.query(entity, &QueryOptions::default())?.items)
    }

    pub fn query(&self, entity: &str, opts: &QueryOptions) -> Result<QueryResult, StoreError> {
        let collections = self.read()?;
        let collection = collection(&collections, entity)?;

        let mut ids: Vec<&String> = collection.records.keys().collect();
        ids.sort();

        let filtered: Vec<&Record> = ids
            .into_iter()
            .filter_map(|id| collection.records.get(id))
            .filter(|record| matches_filters(record, &opts.filters, &collection.field_types))
            .collect();
        let total_count = filtered.len();

        let start = match (&opts.cursor, opts.offset) {
            (Some(cursor), _) => filtered
                .iter()
                .position(|record| record_id(record) == Some(cursor.as_str()))
                .map_or(filtered.len(), |i| i + 1),
            (None, Some(offset)) => offset.min(filtered.len()),
            (None, None) => 0,
        };
        let mut page = &filtered[start..];

        let mut next_cursor = None;
        if let Some(limit) = opts.limit.filter(|l| *l > 0) {
            if page.len() > limit {
                page = &page[..limit];
                next_cursor = page.last().and_then(|r| record_id(r)).map(String::from);
            }
        }

        Ok(QueryResult {
            items: page.iter().map(|r| (*r).clone()).collect(),
            total_count,
            next_cursor,
        })
    }

    /// Replace a record. The stored `id` always equals the `id` argument.
    pub fn update(&self, entity: &str, id: &str, mut record: Record) -> Result<(), StoreError> {
        let mut collections = self.write()?;
        let collection = collection_mut(&mut collections, entity)?;
        let slot = collection.records.get_mut(id).ok_or_else(|| not_found(entity, id))?;
        record.insert("id".into(), Value::String(id.to_string()));
        *slot = record;
        Ok(())
    }

    /// Merge `partial` into a record. The `id` key is ignored.
    pub fn patch(&self, entity: &str, id: &str, partial: Record) -> Result<(), StoreError> {
        let mut collections = self.write()?;
        let collection = collection_mut(&mut collections, entity)?;
        let existing = collection.records.get_mut(id).ok_or_else(|| not_found(entity, id))?;
        for (key, value) in partial {
            if key != "id" {
                existing.insert(key, value);
            }
        }
        Ok(())
    }

    pub fn delete(&self, entity: &str, id: &str) -> Result<(), StoreError> {
        let mut collections = self.write()?;
        let collection = collection_mut(&mut collections, entity)?;
        collection
            .records
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| not_found(entity, id))
    }

    /// Bulk-load records that carry a non-empty string `id`; others are skipped.
    /// Advances the ID counter past the highest all-digit ID. Returns the number stored.
    pub fn seed(&self, entity: &str, records: Vec<Record>) -> Result<usize, StoreError> {
        let mut collections = self.write()?;
        let collection = collection_mut(&mut collections, entity)?;
        let mut stored = 0;
        for record in records {
            let Some(id) = record_id(&record).filter(|id| !id.is_empty()).map(String::from) else {
                continue;
            };
            if let Some(n) = numeric_id(&id) {
                collection.counter = collection.counter.max(n);
            }
            collection.records.insert(id, record);
            stored += 1;
        }
        Ok(stored)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, Collection>>, StoreError> {
        self.collections.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, Collection>>, StoreError> {
        self.collections.write().map_err(|_| StoreError::LockPoisoned)
    }
}

fn collection<'a>(
    collections: &'a HashMap<String, Collection>,
    entity: &str,
) -> Result<&'a Collection, StoreError> {
    collections
        .get(entity)
        .ok_or_else(|| StoreError::EntityTypeNotFound(entity.to_string()))
}

fn collection_mut<'a>(
    collections: &'a mut HashMap<String, Collection>,
    entity: &str,
) -> Result<&'a mut Collection, StoreError> {
    collections
        .get_mut(entity)
        .ok_or_else(|| StoreError::EntityTypeNotFound(entity.to_string()))
}

fn not_found(entity: &str, id: &str) -> StoreError {
    StoreError::NotFound {
        entity: entity.to_string(),
        id: id.to_string(),
    }
}

fn record_id(record: &Record) -> Option<&str> {
    record.get("id").and_then(Value::as_str)
}

fn numeric_id(id: &str) -> Option<u64> {
    if id.bytes().all(|b| b.is_ascii_digit()) {
        id.parse().ok()
    } else {
        None
    }
}

fn matches_filters(
    record: &Record,
    filters: &BTreeMap<String, String>,
    field_types: &HashMap<String, FieldType>,
) -> bool {
    filters.iter().all(|(field, expected)| match record.get(field) {
        Some(stored) => value_matches(stored, expected, field_types.get(field).copied()),
        None => false,
    })
}

/// Compare a stored value with a filter string, coercing by the declared field
/// type, or by the stored JSON type for undeclared fields.
fn value_matches(stored: &Value, expected: &str, declared: Option<FieldType>) -> bool {
    let kind = declared.or(match stored {
        Value::String(_) => Some(FieldType::String),
        Value::Number(_) => Some(FieldType::Number),
        Value::Bool(_) => Some(FieldType::Boolean),
        _ => None,
    });
    match kind {
        Some(FieldType::String) => stored.as_str() == Some(expected),
        Some(FieldType::Number) => match (stored.as_f64(), expected.parse::<f64>()) {
            (Some(a), Ok(b)) => a == b,
            _ => false,
        },
        Some(FieldType::Boolean) => match (stored.as_bool(), parse_bool(expected)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
        Some(FieldType::Object) | Some(FieldType::Array) | None => formatted(stored) == expected,
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

fn formatted(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("record must be an object"),
        }
    }

    fn users_store() -> InMemoryStore {
        let store = InMemoryStore::new();
        let fields = HashMap::from([
            ("id".to_string(), FieldType::String),
            ("name".to_string(), FieldType::String),
            ("age".to_string(), FieldType::Number),
            ("active".to_string(), FieldType::Boolean),
            ("tags".to_string(), FieldType::Array),
        ]);
        store.initialize("users", fields).unwrap();
        store
    }

    fn ids(result: &QueryResult) -> Vec<&str> {
        result.items.iter().filter_map(record_id).collect()
    }

    #[test]
    fn unknown_entity_type() {
        let store = users_store();
        let err = store.get("ghosts", "1").unwrap_err();
        assert_eq!(err, StoreError::EntityTypeNotFound("ghosts".into()));
        assert!(store.create("ghosts", Record::new()).is_err());
        assert!(store.query("ghosts", &QueryOptions::default()).is_err());
        assert!(store.seed("ghosts", vec![]).is_err());
    }

    #[test]
    fn create_generates_sequential_ids() {
        let store = users_store();
        let a = store.create("users", record(json!({"name": "A"}))).unwrap();
        let b = store.create("users", record(json!({"name": "B", "id": ""}))).unwrap();
        let c = store.create("users", record(json!({"name": "C", "id": null}))).unwrap();
        assert_eq!((a.as_str(), b.as_str(), c.as_str()), ("1", "2", "3"));
        assert_eq!(store.get("users", "2").unwrap()["id"], json!("2"));
    }

    #[test]
    fn create_with_caller_id_overwrites_silently() {
        let store = users_store();
        store.create("users", record(json!({"id": "x", "name": "first"}))).unwrap();
        let id = store.create("users", record(json!({"id": "x", "name": "second"}))).unwrap();
        assert_eq!(id, "x");
        assert_eq!(store.get("users", "x").unwrap()["name"], json!("second"));
        assert_eq!(store.list("users").unwrap().len(), 1);
    }

    #[test]
    fn create_stringifies_non_string_id() {
        let store = users_store();
        let id = store.create("users", record(json!({"id": 7}))).unwrap();
        assert_eq!(id, "7");
        assert_eq!(store.get("users", "7").unwrap()["id"], json!("7"));
    }

    #[test]
    fn generated_ids_exceed_seeded_ids() {
        let store = users_store();
        let seeded = store
            .seed(
                "users",
                vec![
                    record(json!({"id": "12", "name": "a"})),
                    record(json!({"id": "alpha", "name": "b"})),
                    record(json!({"id": 99, "name": "skipped"})),
                    record(json!({"name": "no id"})),
                    record(json!({"id": "", "name": "empty"})),
                    record(json!({"id": "3", "name": "c"})),
                ],
            )
            .unwrap();
        assert_eq!(seeded, 3);
        let next = store.create("users", Record::new()).unwrap();
        assert_eq!(next, "13");
        let after = store.create("users", Record::new()).unwrap();
        assert!(after.parse::<u64>().unwrap() > next.parse::<u64>().unwrap());
    }

    #[test]
    fn update_forces_path_id() {
        let store = users_store();
        store.create("users", record(json!({"id": "1", "name": "A", "age": 3}))).unwrap();
        store.update("users", "1", record(json!({"id": "other", "name": "B"}))).unwrap();
        let stored = store.get("users", "1").unwrap();
        assert_eq!(stored, record(json!({"id": "1", "name": "B"})));
        assert!(store.get("users", "other").is_err());

        let err = store.update("users", "404", Record::new()).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn patch_merges_but_keeps_id() {
        let store = users_store();
        store.create("users", record(json!({"id": "1", "name": "A", "age": 3}))).unwrap();
        store.patch("users", "1", record(json!({"id": "2", "age": 4}))).unwrap();
        assert_eq!(
            store.get("users", "1").unwrap(),
            record(json!({"id": "1", "name": "A", "age": 4}))
        );
        assert!(matches!(
            store.patch("users", "9", Record::new()),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn delete_then_get_is_not_found() {
        let store = users_store();
        store.create("users", record(json!({"id": "1"}))).unwrap();
        store.delete("users", "1").unwrap();
        assert!(matches!(store.get("users", "1"), Err(StoreError::NotFound { .. })));
        assert!(matches!(store.delete("users", "1"), Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn returned_records_are_copies() {
        let store = users_store();
        store.create("users", record(json!({"id": "1", "name": "A"}))).unwrap();
        let mut copy = store.get("users", "1").unwrap();
        copy.insert("name".into(), json!("mutated"));
        assert_eq!(store.get("users", "1").unwrap()["name"], json!("A"));
    }

    fn seeded_store() -> InMemoryStore {
        let store = users_store();
        store
            .seed(
                "users",
                vec![
                    record(json!({"id": "1", "name": "Alice", "age": 30, "active": true, "tags": ["a"]})),
                    record(json!({"id": "2", "name": "Bob", "age": 25.0, "active": false})),
                    record(json!({"id": "3", "name": "Carol", "age": 30, "active": true})),
                    record(json!({"id": "4", "name": "Dan", "active": true, "nick": null})),
                    record(json!({"id": "5", "name": "Eve", "age": 41, "active": false, "extra": 7})),
                ],
            )
            .unwrap();
        store
    }

    #[test]
    fn query_orders_ids_lexicographically() {
        let store = users_store();
        for id in ["10", "9", "1", "b", "a"] {
            store.create("users", record(json!({"id": id}))).unwrap();
        }
        let result = store.query("users", &QueryOptions::default()).unwrap();
        assert_eq!(ids(&result), vec!["1", "10", "9", "a", "b"]);
        assert_eq!(result.total_count, 5);
        assert_eq!(result.next_cursor, None);
    }

    #[test]
    fn filter_coercion_by_declared_type() {
        let store = seeded_store();
        let q = |opts: QueryOptions| ids(&store.query("users", &opts).unwrap()).join(",");

        assert_eq!(q(QueryOptions::default().filter("name", "Alice")), "1");
        assert_eq!(q(QueryOptions::default().filter("age", "30")), "1,3");
        assert_eq!(q(QueryOptions::default().filter("age", "25")), "2");
        assert_eq!(q(QueryOptions::default().filter("age", "30.0")), "1,3");
        assert_eq!(q(QueryOptions::default().filter("age", "thirty")), "");
        assert_eq!(q(QueryOptions::default().filter("active", "true")), "1,3,4");
        assert_eq!(q(QueryOptions::default().filter("active", "0")), "2,5");
        assert_eq!(q(QueryOptions::default().filter("tags", r#"["a"]"#)), "1");
        // Undeclared fields coerce by stored JSON type.
        assert_eq!(q(QueryOptions::default().filter("extra", "7.0")), "5");
        assert_eq!(q(QueryOptions::default().filter("nick", "null")), "4");
        // Missing field never matches.
        assert_eq!(q(QueryOptions::default().filter("missing", "")), "");
    }

    #[test]
    fn filters_are_and_combined() {
        let store = seeded_store();
        let one = store.query("users", &QueryOptions::default().filter("age", "30")).unwrap();
        let both = store
            .query(
                "users",
                &QueryOptions::default().filter("age", "30").filter("name", "Carol"),
            )
            .unwrap();
        assert_eq!(ids(&both), vec!["3"]);
        assert!(both.items.len() <= one.items.len());
        assert!(both.items.iter().all(|r| one.items.contains(r)));
    }

    #[test]
    fn offset_pagination() {
        let store = seeded_store();
        let page = store
            .query("users", &QueryOptions::default().offset(2).limit(2))
            .unwrap();
        assert_eq!(ids(&page), vec!["3", "4"]);
        assert_eq!(page.total_count, 5);
        assert_eq!(page.next_cursor.as_deref(), Some("4"));

        let past_end = store.query("users", &QueryOptions::default().offset(5)).unwrap();
        assert!(past_end.items.is_empty());
        assert_eq!(past_end.total_count, 5);
    }

    #[test]
    fn limit_without_more_pages_has_no_cursor() {
        let store = seeded_store();
        let page = store.query("users", &QueryOptions::default().offset(3).limit(2)).unwrap();
        assert_eq!(ids(&page), vec!["4", "5"]);
        assert_eq!(page.next_cursor, None);

        let unlimited = store.query("users", &QueryOptions::default().limit(0)).unwrap();
        assert_eq!(unlimited.items.len(), 5);
        assert_eq!(unlimited.next_cursor, None);
    }

    #[test]
    fn cursor_after_last_or_unknown_is_empty() {
        let store = seeded_store();
        let last = store.query("users", &QueryOptions::default().cursor("5")).unwrap();
        assert!(last.items.is_empty());
        let unknown = store.query("users", &QueryOptions::default().cursor("zz")).unwrap();
        assert!(unknown.items.is_empty());
        assert_eq!(unknown.total_count, 5);
    }

    #[test]
    fn cursor_takes_precedence_over_offset() {
        let store = seeded_store();
        let mut opts = QueryOptions::default().cursor("1");
        opts.offset = Some(4);
        assert_eq!(ids(&store.query("users", &opts).unwrap()), vec!["2", "3", "4", "5"]);
    }

    #[test]
    fn cursor_paging_is_exhaustive_and_repeatable() {
        let store = seeded_store();
        let base = QueryOptions::default().filter("active", "true").limit(1);
        let mut seen = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let mut opts = base.clone();
            opts.cursor = cursor.clone();
            let page = store.query("users", &opts).unwrap();
            assert_eq!(page, store.query("users", &opts).unwrap());
            assert_eq!(page.total_count, 3);
            seen.extend(ids(&page).into_iter().map(String::from));
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        assert_eq!(seen, vec!["1", "3", "4"]);
    }

    #[test]
    fn from_schema_initializes_every_entity() {
        let schema: Schema = serde_json::from_str(
            r#"{"entities": {
                "users": {"fields": {"id": {"type": "string"}}},
                "posts": {"fields": {"id": {"type": "string"}, "views": {"type": "number"}}}
            }}"#,
        )
        .unwrap();
        let store = InMemoryStore::from_schema(&schema).unwrap();
        assert!(store.list("users").unwrap().is_empty());
        store.create("posts", record(json!({"views": 10}))).unwrap();
        let hits = store.query("posts", &QueryOptions::default().filter("views", "10")).unwrap();
        assert_eq!(hits.items.len(), 1);
    }

    #[test]
    fn exhausted_counter_is_an_error_not_a_panic() {
        let store = users_store();
        store
            .seed("users", vec![record(json!({"id": "18446744073709551615", "name": "Max"}))])
            .unwrap();
        assert_eq!(
            store.create("users", Record::new()),
            Err(StoreError::IdSpaceExhausted("users".into()))
        );
        assert_eq!(store.get("users", "18446744073709551615").unwrap()["name"], "Max");
        assert_eq!(store.create("users", record(json!({"id": "a"}))).unwrap(), "a");
    }

    #[test]
    fn concurrent_creates_get_unique_ids() {
        let store = users_store();
        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..25 {
                        store.create("users", Record::new()).unwrap();
                        store.query("users", &QueryOptions::default().limit(3)).unwrap();
                    }
                });
            }
        });
        let all = store.list("users").unwrap();
        assert_eq!(all.len(), 200);
    }
}
