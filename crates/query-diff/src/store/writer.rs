use serde_json::{Map, Value};

use super::{FieldValue, RecordId, RecordStore};
use crate::{
    DiffConfig, QueryRoot,
    error::StoreError,
    query::{Field, FieldKind, Selection},
    range::{PageInfo, RangeCalls, RangeEdge},
};

type Object = Map<String, Value>;

/// Normalizes the response of a query into the store.
pub struct RecordWriter<'a> {
    store: &'a mut RecordStore,
}

impl<'a> RecordWriter<'a> {
    pub fn new(store: &'a mut RecordStore) -> Self {
        RecordWriter { store }
    }

    /// Writes `payload`, the value of the root field of `root` in a response, into the store.
    pub fn write_payload(&mut self, root: &QueryRoot, payload: &Value) -> Result<(), StoreError> {
        let config = root.schema().config();
        let field = root.field();
        let root_record = RecordId::root();

        if let Some(id) = root.identifying_argument() {
            let id = RecordId::new(id);
            let storage_key = field.storage_key();

            return match payload {
                Value::Null => {
                    self.store.delete_record(&id);
                    self.set_field(&root_record, storage_key, FieldValue::Null);
                    Ok(())
                }
                Value::Object(object) => {
                    self.write_record(config, &id, &field.selections, object, field.response_key())?;
                    self.set_field(&root_record, storage_key, FieldValue::Link(id));
                    Ok(())
                }
                _ => Err(StoreError::invalid_payload(field.response_key(), "expected an object")),
            };
        }

        self.store.put_record(&root_record);
        self.write_field(config, &root_record, field, payload, field.response_key())
    }

    fn write_record(
        &mut self,
        config: &DiffConfig,
        id: &RecordId,
        selections: &[Selection],
        object: &Object,
        path: &str,
    ) -> Result<(), StoreError> {
        let record = self.store.put_record(id);
        if let Some(typename) = object.get(&config.typename_field).and_then(Value::as_str) {
            record.typename = Some(typename.to_string());
        }

        for field in fields(selections) {
            if let Some(value) = object.get(field.response_key()) {
                let path = format!("{path}.{}", field.response_key());
                self.write_field(config, id, field, value, &path)?;
            }
        }

        Ok(())
    }

    fn write_field(
        &mut self,
        config: &DiffConfig,
        parent: &RecordId,
        field: &Field,
        value: &Value,
        path: &str,
    ) -> Result<(), StoreError> {
        let storage_key = field.storage_key();

        if value.is_null() {
            self.set_field(parent, storage_key, FieldValue::Null);
            return Ok(());
        }

        let stored = match field.kind {
            FieldKind::Scalar => FieldValue::Scalar(value.clone()),
            FieldKind::Linked => {
                let object = value
                    .as_object()
                    .ok_or_else(|| StoreError::invalid_payload(path, "expected an object"))?;

                let id = record_id(config, object).unwrap_or_else(|| RecordId::client(parent, &storage_key));
                self.write_record(config, &id, &field.selections, object, path)?;

                FieldValue::Link(id)
            }
            FieldKind::Plural => {
                let items = value
                    .as_array()
                    .ok_or_else(|| StoreError::invalid_payload(path, "expected a list"))?;

                let mut ids = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    let path = format!("{path}.{index}");
                    if item.is_null() {
                        continue;
                    }

                    let object = item
                        .as_object()
                        .ok_or_else(|| StoreError::invalid_payload(path.as_str(), "expected an object"))?;

                    let id = record_id(config, object)
                        .unwrap_or_else(|| RecordId::client(parent, &format!("{storage_key}:{index}")));
                    self.write_record(config, &id, &field.selections, object, &path)?;

                    ids.push(id);
                }

                FieldValue::Links(ids)
            }
            FieldKind::Connection { .. } => {
                let object = value
                    .as_object()
                    .ok_or_else(|| StoreError::invalid_payload(path, "expected an object"))?;

                let id = RecordId::client(parent, &storage_key);
                self.write_connection(config, &id, field, object, path)?;

                FieldValue::Connection(id)
            }
        };

        self.set_field(parent, storage_key, stored);
        Ok(())
    }

    fn write_connection(
        &mut self,
        config: &DiffConfig,
        id: &RecordId,
        field: &Field,
        object: &Object,
        path: &str,
    ) -> Result<(), StoreError> {
        let calls = RangeCalls::from_arguments(&field.arguments)
            .map_err(|err| StoreError::invalid_payload(path, err.to_string()))?;

        let record = self.store.put_record(id);
        if let Some(typename) = object.get(&config.typename_field).and_then(Value::as_str) {
            record.typename = Some(typename.to_string());
        }

        let mut edges = None;
        let mut page_info = None;

        for child in fields(&field.selections) {
            let Some(value) = object.get(child.response_key()) else {
                continue;
            };
            let path = format!("{path}.{}", child.response_key());

            if child.name == config.connection.edges {
                let written = self.write_edges(config, id, child, value, &path)?;
                if edges.is_none() {
                    edges = Some(written);
                }
            } else if child.name == config.connection.page_info {
                page_info = value.as_object();
            } else {
                self.write_field(config, id, child, value, &path)?;
            }
        }

        let Some(edges) = edges else {
            return Ok(());
        };

        let flag = |name: &str, fetched_whole_window: bool| {
            page_info
                .and_then(|page_info| page_info.get(name))
                .and_then(Value::as_bool)
                .unwrap_or(fetched_whole_window)
        };
        let fetched_whole_window = calls.count().is_some_and(|count| edges.len() >= count);
        let page_info = PageInfo {
            has_next_page: flag(
                &config.connection.has_next_page,
                matches!(calls, RangeCalls::First { .. }) && fetched_whole_window,
            ),
            has_previous_page: flag(
                &config.connection.has_previous_page,
                matches!(calls, RangeCalls::Last { .. }) && fetched_whole_window,
            ),
        };

        let range = self.store.put_record(id).range.get_or_insert_with(Default::default);
        if let Err(err) = range.merge(&calls, edges, page_info) {
            tracing::warn!("Ignoring the edges fetched at {path}: {err}");
        }

        Ok(())
    }

    fn write_edges(
        &mut self,
        config: &DiffConfig,
        connection: &RecordId,
        field: &Field,
        value: &Value,
        path: &str,
    ) -> Result<Vec<RangeEdge>, StoreError> {
        let items = value
            .as_array()
            .ok_or_else(|| StoreError::invalid_payload(path, "expected a list"))?;

        let mut edges = Vec::with_capacity(items.len());

        for (index, item) in items.iter().enumerate() {
            let path = format!("{path}.{index}");
            let object = item
                .as_object()
                .ok_or_else(|| StoreError::invalid_payload(path.as_str(), "expected an object"))?;

            let cursor = object
                .get(&config.connection.cursor)
                .and_then(Value::as_str)
                .ok_or_else(|| StoreError::invalid_payload(path.as_str(), "edges must have a cursor"))?;

            let edge_id = RecordId::client(connection, cursor);
            self.write_record(config, &edge_id, &field.selections, object, &path)?;
            self.set_field(
                &edge_id,
                config.connection.cursor.clone(),
                FieldValue::Scalar(Value::String(cursor.to_string())),
            );

            let node_id = self.store.linked_record_id(&edge_id, &config.connection.node)?;

            edges.push(RangeEdge {
                edge_id,
                cursor: cursor.to_string(),
                node_id,
            });
        }

        Ok(edges)
    }

    fn set_field(&mut self, record: &RecordId, storage_key: String, value: FieldValue) {
        self.store.put_record(record).fields.insert(storage_key, value);
    }
}

fn record_id(config: &DiffConfig, object: &Object) -> Option<RecordId> {
    match object.get(&config.id_field)? {
        // An empty identifier can't be used to refetch the record, it gets a client id instead.
        Value::String(id) if id.is_empty() => None,
        Value::String(id) => Some(RecordId::new(id.as_str())),
        Value::Number(id) => Some(RecordId::new(id.to_string())),
        _ => None,
    }
}

/// Fields of a selection set, looking through fragments.
fn fields(selections: &[Selection]) -> Vec<&Field> {
    let mut fields = Vec::new();
    collect_fields(selections, &mut fields);
    fields
}

fn collect_fields<'a>(selections: &'a [Selection], fields: &mut Vec<&'a Field>) {
    for selection in selections {
        match selection {
            Selection::Field(field) => fields.push(field),
            Selection::Fragment(fragment) => collect_fields(&fragment.selections, fields),
        }
    }
}
