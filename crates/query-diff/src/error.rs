use std::borrow::Cow;

use crate::{ConfigError, RecordId, range::RangeError};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Range(#[from] RangeError),
    #[error(transparent)]
    Diff(#[from] DiffError),
}

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Could not parse the schema: {0}")]
    Parsing(String),
    #[error("The schema does not define the query type '{name}'")]
    MissingQueryType { name: String },
}

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("Could not parse the query: {0}")]
    Parsing(String),
    #[error("The document does not contain any operation")]
    NoOperation,
    #[error("Only queries can be diffed, found a {0}")]
    UnsupportedOperation(Cow<'static, str>),
    #[error("Fragment spreads are not supported at the root of a query")]
    RootFragmentSpread,
    #[error("{container} does not have a field named '{name}'")]
    UnknownField { container: String, name: String },
    #[error("Unknown fragment named '{name}'")]
    UnknownFragment { name: String },
    #[error("Variable ${name} is missing")]
    MissingVariable { name: String },
    #[error("Fragment cycle detected through '{name}'")]
    FragmentCycle { name: String },
}

/// Errors raised when reading from the record store.
///
/// These indicate that the query and the store disagree about the shape of a field, which can
/// only happen when a record was written with a different schema.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Expected {expected} at '{storage_key}' on record '{record_id}'")]
    NotFound {
        record_id: RecordId,
        storage_key: String,
        expected: &'static str,
    },
    #[error("Invalid payload at '{path}': {message}")]
    InvalidPayload { path: String, message: Cow<'static, str> },
}

impl StoreError {
    pub(crate) fn invalid_payload(path: impl Into<String>, message: impl Into<Cow<'static, str>>) -> Self {
        StoreError::InvalidPayload {
            path: path.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    #[error(transparent)]
    Store(#[from] StoreError),
}
