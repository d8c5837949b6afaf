//! The normalized cache: an arena of records keyed by identifier.
//!
//! Records never point at each other directly, links are identifiers looked up in the arena.
//! Root fields are stored on a generated root record, see [`RecordId::root`].

mod record;
mod writer;

use fxhash::FxHashMap;

pub use self::{
    record::{FieldValue, Record, RecordId, RecordState},
    writer::RecordWriter,
};
use crate::{Range, error::StoreError};

#[derive(Debug, Default)]
pub struct RecordStore {
    /// `None` for records known not to exist.
    records: FxHashMap<RecordId, Option<Record>>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writer(&mut self) -> RecordWriter<'_> {
        RecordWriter::new(self)
    }

    pub fn record_state(&self, id: &RecordId) -> RecordState {
        match self.records.get(id) {
            None => RecordState::Unknown,
            Some(None) => RecordState::Nonexistent,
            Some(Some(_)) => RecordState::Present,
        }
    }

    pub fn record(&self, id: &RecordId) -> Option<&Record> {
        self.records.get(id)?.as_ref()
    }

    pub fn typename(&self, id: &RecordId) -> Option<&str> {
        self.record(id)?.typename()
    }

    pub fn has_field(&self, id: &RecordId, storage_key: &str) -> bool {
        self.field_value(id, storage_key).is_some()
    }

    pub fn field_value(&self, id: &RecordId, storage_key: &str) -> Option<&FieldValue> {
        self.record(id)?.field(storage_key)
    }

    /// The record linked at `storage_key`, `None` if the field is absent or null.
    pub fn linked_record_id(&self, id: &RecordId, storage_key: &str) -> Result<Option<RecordId>, StoreError> {
        match self.field_value(id, storage_key) {
            None | Some(FieldValue::Null) => Ok(None),
            Some(FieldValue::Link(linked)) => Ok(Some(linked.clone())),
            Some(_) => Err(not_found(id, storage_key, "a linked record")),
        }
    }

    pub fn linked_record_ids(&self, id: &RecordId, storage_key: &str) -> Result<Option<Vec<RecordId>>, StoreError> {
        match self.field_value(id, storage_key) {
            None | Some(FieldValue::Null) => Ok(None),
            Some(FieldValue::Links(linked)) => Ok(Some(linked.clone())),
            Some(_) => Err(not_found(id, storage_key, "a list of linked records")),
        }
    }

    /// The generated record of the connection stored at `storage_key`.
    pub fn connection_record_id(&self, id: &RecordId, storage_key: &str) -> Result<Option<RecordId>, StoreError> {
        match self.field_value(id, storage_key) {
            None | Some(FieldValue::Null) => Ok(None),
            Some(FieldValue::Connection(connection)) => Ok(Some(connection.clone())),
            Some(_) => Err(not_found(id, storage_key, "a connection")),
        }
    }

    pub fn range(&self, id: &RecordId, storage_key: &str) -> Result<Option<&Range>, StoreError> {
        let Some(connection) = self.connection_record_id(id, storage_key)? else {
            return Ok(None);
        };

        Ok(self.record(&connection).and_then(Record::range))
    }

    /// The record a root field resolved to, if the root field was fetched and wasn't null.
    pub fn root_record_id(&self, storage_key: &str) -> Result<Option<RecordId>, StoreError> {
        self.linked_record_id(&RecordId::root(), storage_key)
    }

    pub(crate) fn put_record(&mut self, id: &RecordId) -> &mut Record {
        self.records.entry(id.clone()).or_default().get_or_insert_with(Record::default)
    }

    pub(crate) fn delete_record(&mut self, id: &RecordId) {
        self.records.insert(id.clone(), None);
    }
}

fn not_found(id: &RecordId, storage_key: &str, expected: &'static str) -> StoreError {
    StoreError::NotFound {
        record_id: id.clone(),
        storage_key: storage_key.to_string(),
        expected,
    }
}
