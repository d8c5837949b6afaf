//! Answers queries from a fixed JSON graph, returning exactly the fields they select.

use graphql_query_diff::{
    QueryRoot, RangeCalls, Schema,
    query::{Field, FieldKind, Selection},
};
use serde_json::{Map, Value, json};

pub(crate) struct Server {
    data: Value,
}

impl Server {
    pub fn new(data: Value) -> Self {
        Server { data }
    }

    /// The value of the root field of `root`.
    pub fn respond(&self, root: &QueryRoot) -> Value {
        let field = root.field();
        let value = match root.identifying_argument() {
            Some(id) => find_record(&self.data, id).unwrap_or(&Value::Null),
            None => self.data.get(&field.name).unwrap_or(&Value::Null),
        };

        resolve_field(root.schema(), field, value)
    }
}

fn find_record<'a>(value: &'a Value, id: &str) -> Option<&'a Value> {
    match value {
        Value::Object(object) => {
            if object.get("id").and_then(Value::as_str) == Some(id) {
                return Some(value);
            }
            object.values().find_map(|value| find_record(value, id))
        }
        Value::Array(items) => items.iter().find_map(|item| find_record(item, id)),
        _ => None,
    }
}

fn resolve_field(schema: &Schema, field: &Field, value: &Value) -> Value {
    match (&field.kind, value) {
        (_, Value::Null) => Value::Null,
        (FieldKind::Scalar, value) => value.clone(),
        (FieldKind::Linked, Value::Object(object)) => Value::Object(resolve_selections(schema, &field.selections, object)),
        (FieldKind::Plural, Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::Object(object) => Value::Object(resolve_selections(schema, &field.selections, object)),
                _ => Value::Null,
            })
            .collect(),
        (FieldKind::Connection { .. }, Value::Object(connection)) => {
            let window = paginate(field, connection);
            Value::Object(resolve_selections(schema, &field.selections, &window))
        }
        _ => Value::Null,
    }
}

fn resolve_selections(schema: &Schema, selections: &[Selection], object: &Map<String, Value>) -> Map<String, Value> {
    let mut resolved = Map::new();

    for selection in selections {
        match selection {
            Selection::Field(field) => {
                let value = object.get(&field.name).unwrap_or(&Value::Null);
                merge(&mut resolved, field.response_key().to_string(), resolve_field(schema, field, value));
            }
            Selection::Fragment(fragment) => {
                let typename = object.get("__typename").and_then(Value::as_str);
                let applies = match (&fragment.type_condition, typename) {
                    (Some(condition), Some(typename)) => schema.type_condition_applies(condition, typename),
                    _ => true,
                };

                if applies {
                    for (key, value) in resolve_selections(schema, &fragment.selections, object) {
                        merge(&mut resolved, key, value);
                    }
                }
            }
        }
    }

    resolved
}

fn merge(target: &mut Map<String, Value>, key: String, value: Value) {
    match (target.get_mut(&key), value) {
        (Some(Value::Object(existing)), Value::Object(incoming)) => {
            for (key, value) in incoming {
                merge(existing, key, value);
            }
        }
        (Some(Value::Array(existing)), Value::Array(incoming)) if existing.len() == incoming.len() => {
            for (existing, incoming) in existing.iter_mut().zip(incoming) {
                if let (Value::Object(existing), Value::Object(incoming)) = (existing, incoming) {
                    for (key, value) in incoming {
                        merge(existing, key, value);
                    }
                }
            }
        }
        (_, value) => {
            target.insert(key, value);
        }
    }
}

/// The connection with its edges restricted to the requested window, and the matching page info.
fn paginate(field: &Field, connection: &Map<String, Value>) -> Map<String, Value> {
    let edges = connection
        .get("edges")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let position = |cursor: &str| edges.iter().position(|edge| edge["cursor"] == cursor);

    let (window, has_previous_page, has_next_page) = match RangeCalls::from_arguments(&field.arguments).unwrap() {
        RangeCalls::First { count, after } => {
            let start = match after {
                None => 0,
                Some(cursor) => position(&cursor).map_or(edges.len(), |index| index + 1),
            };
            let end = (start + count).min(edges.len());
            (edges[start..end].to_vec(), start > 0, end < edges.len())
        }
        RangeCalls::Last { count, before } => {
            let end = match before {
                None => edges.len(),
                Some(cursor) => position(&cursor).unwrap_or(0),
            };
            let start = end.saturating_sub(count);
            (edges[start..end].to_vec(), start > 0, end < edges.len())
        }
        RangeCalls::Find(id) => {
            let found = edges
                .iter()
                .filter(|edge| edge["node"]["id"] == id.as_str())
                .cloned()
                .collect();
            (found, false, false)
        }
        RangeCalls::All => (edges.clone(), false, false),
    };

    let mut window_connection = connection.clone();
    window_connection.insert("edges".into(), Value::Array(window));
    window_connection.insert(
        "pageInfo".into(),
        json!({ "hasNextPage": has_next_page, "hasPreviousPage": has_previous_page }),
    );

    window_connection
}
