//! Computes the minimal queries needed to complete a GraphQL query against a normalized client
//! cache.
//!
//! Responses are normalized by [`RecordWriter`] into a [`RecordStore`]: a flat map of records
//! keyed by identifier, with paginated connections tracked as ranges of edges. [`diff_query`]
//! then walks a [`QueryRoot`] against the store and returns the queries fetching what's missing,
//! split so that each of them can be sent on its own:
//!
//! * the part of the original root which is missing,
//! * `node(id: ...)` queries for records with a server identifier,
//! * `find` queries for single edges of a connection,
//! * extensions of paginated windows which are only partially cached.
//!
//! ```rust,ignore
//! let schema = Arc::new(Schema::from_sdl(sdl)?);
//! let roots = QueryRoot::parse(&schema, "{ viewer { name } }", &Default::default())?;
//!
//! let mut store = RecordStore::new();
//! store.writer().write_payload(&roots[0], &serde_json::json!({ "name": "Ada" }))?;
//!
//! let missing = diff_query(&roots[0], &store, &mut QueryTracker::new(), &mut TracingDiagnostics)?;
//! assert!(missing.is_empty());
//! ```

mod config;
mod diagnostics;
mod diff;
mod error;
pub mod query;
pub mod range;
mod reconstruct;
mod schema;
pub mod store;
mod tracker;

pub use config::{ConfigError, ConnectionConfig, DiffConfig};
pub use diagnostics::{Diagnostic, DiagnosticSink, TracingDiagnostics};
pub use diff::diff_query;
pub use error::{DiffError, Error, QueryError, Result, SchemaError, StoreError};
pub use query::{NodeId, QueryRoot};
pub use range::{Range, RangeCalls, RangeCallsError, RangeError};
pub use schema::{ArgumentDefinition, ConnectionShape, FieldDefinition, Schema, TypeDefinition, TypeKind};
pub use store::{RecordId, RecordStore, RecordWriter};
pub use tracker::QueryTracker;
