use std::{borrow::Borrow, fmt};

use indexmap::IndexMap;

use crate::Range;

const CLIENT_ID_PREFIX: &str = "client:";

/// Identifier of a record in the store.
///
/// Identifiers starting with `client:` are generated locally for records the server didn't
/// identify and cannot be used to refetch them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        RecordId(id.into())
    }

    /// The record holding the root fields of queries.
    pub fn root() -> Self {
        RecordId(format!("{CLIENT_ID_PREFIX}root"))
    }

    /// Identifier generated for a record reached through `key` on `parent`.
    pub fn client(parent: &RecordId, key: &str) -> Self {
        if parent.is_client_id() {
            RecordId(format!("{parent}:{key}"))
        } else {
            RecordId(format!("{CLIENT_ID_PREFIX}{parent}:{key}"))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_client_id(&self) -> bool {
        self.0.starts_with(CLIENT_ID_PREFIX)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for RecordId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        RecordId::new(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    /// Never fetched.
    Unknown,
    /// Fetched and confirmed not to exist.
    Nonexistent,
    Present,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Scalar(serde_json::Value),
    Null,
    Link(RecordId),
    Links(Vec<RecordId>),
    /// Link to the generated record holding the connection's range and non-edge fields.
    Connection(RecordId),
}

#[derive(Debug, Clone, Default)]
pub struct Record {
    pub(crate) typename: Option<String>,
    pub(crate) fields: IndexMap<String, FieldValue>,
    pub(crate) range: Option<Range>,
}

impl Record {
    pub fn typename(&self) -> Option<&str> {
        self.typename.as_deref()
    }

    pub fn field(&self, storage_key: &str) -> Option<&FieldValue> {
        self.fields.get(storage_key)
    }

    pub fn range(&self) -> Option<&Range> {
        self.range.as_ref()
    }
}
