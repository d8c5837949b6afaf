//! Compares a query with the store and computes the queries fetching what's missing.
//!
//! The query is walked depth-first in lock-step with the records it reads. Missing data bubbles
//! up until it reaches a record which can be refetched on its own: the root, an item of a list
//! or the node of an edge with a server identifier. Connections add their own refetches: a
//! `find` per edge missing edge fields and an extension of the window when some edges aren't
//! cached.

mod connection;
mod outcome;

use std::sync::Arc;

use self::outcome::{Outcome, union};
use crate::{
    DiagnosticSink, DiffConfig, QueryRoot, QueryTracker, RecordId, RecordStore, Schema,
    error::{DiffError, StoreError},
    query::{Field, FieldKind, Fragment, Selection},
    reconstruct::{QueryPath, Reconstructor},
    store::RecordState,
};

/// Computes the roots to fetch so that the store can answer `root`.
///
/// The remaining part of `root` itself comes first, if anything is missing from it, followed by
/// the roots split off in traversal order. An empty list means the store has everything.
/// Data which cannot be refetched is reported to `diagnostics` and left out.
#[tracing::instrument(skip_all, fields(root = %root.field().response_key()))]
pub fn diff_query(
    root: &QueryRoot,
    store: &RecordStore,
    tracker: &mut QueryTracker,
    diagnostics: &mut dyn DiagnosticSink,
) -> Result<Vec<QueryRoot>, DiffError> {
    let mut differ = Differ {
        schema: root.schema(),
        config: root.schema().config(),
        store,
        tracker,
        diagnostics,
        reconstructor: Reconstructor::new(root),
        split_roots: Vec::new(),
    };

    let node = Selection::Field(root.field().clone());
    let missing = match root.identifying_argument() {
        Some(id) => differ.diff_linked_record(&node, &RecordId::new(id), Some(QueryPath::root().push(&node)))?,
        None => differ.diff_field(&RecordId::root(), &node, root.field(), Some(&QueryPath::root()))?,
    };

    let mut roots = Vec::with_capacity(differ.split_roots.len() + 1);
    if let Some(Selection::Field(field)) = missing {
        roots.push(root.with_field(field));
    }
    roots.extend(differ.split_roots);

    tracing::debug!("{} queries needed", roots.len());

    Ok(roots)
}

struct Differ<'a> {
    schema: &'a Schema,
    config: &'a DiffConfig,
    store: &'a RecordStore,
    tracker: &'a mut QueryTracker,
    diagnostics: &'a mut dyn DiagnosticSink,
    reconstructor: Reconstructor<'a>,
    split_roots: Vec<QueryRoot>,
}

impl Differ<'_> {
    /// The part of `node`, a field leading to record `id`, which is missing.
    fn diff_linked_record(
        &mut self,
        node: &Selection,
        id: &RecordId,
        path: Option<QueryPath>,
    ) -> Result<Option<Selection>, DiffError> {
        match self.store.record_state(id) {
            RecordState::Unknown => Ok(Some(node.clone())),
            RecordState::Nonexistent => Ok(None),
            RecordState::Present => {
                self.tracker.track_node_for_id(id, node);
                let missing = self.diff_selections(id, node.selections(), path.as_ref())?;
                Ok(Outcome::from_missing(node, missing).into_selection(node))
            }
        }
    }

    /// Missing selections of a present record.
    fn diff_selections(
        &mut self,
        record: &RecordId,
        selections: &[Selection],
        path: Option<&QueryPath>,
    ) -> Result<Vec<Selection>, DiffError> {
        let mut missing = Vec::new();

        for selection in selections {
            let diff = match selection {
                Selection::Field(field) => self.diff_field(record, selection, field, path)?,
                Selection::Fragment(fragment) => self.diff_fragment(record, selection, fragment, path)?,
            };
            missing.extend(diff);
        }

        Ok(missing)
    }

    fn diff_fragment(
        &mut self,
        record: &RecordId,
        node: &Selection,
        fragment: &Fragment,
        path: Option<&QueryPath>,
    ) -> Result<Option<Selection>, DiffError> {
        if !self.fragment_applies(record, fragment) {
            return Ok(None);
        }

        let path = path.map(|path| path.push(node));
        let missing = self.diff_selections(record, &fragment.selections, path.as_ref())?;

        Ok(Outcome::from_missing(node, missing).into_selection(node))
    }

    fn diff_field(
        &mut self,
        record: &RecordId,
        node: &Selection,
        field: &Arc<Field>,
        path: Option<&QueryPath>,
    ) -> Result<Option<Selection>, DiffError> {
        if field.generated {
            return Ok(None);
        }

        let storage_key = field.storage_key();

        match field.kind {
            FieldKind::Scalar => Ok((!self.has_scalar(record, &storage_key)).then(|| node.clone())),
            FieldKind::Linked => {
                if !self.store.has_field(record, &storage_key) {
                    return Ok(Some(node.clone()));
                }
                let Some(linked) = self.read(self.store.linked_record_id(record, &storage_key))? else {
                    return Ok(Some(node.clone()));
                };
                let Some(linked) = linked else {
                    return Ok(None);
                };

                let path = if linked.is_client_id() {
                    path.map(|path| path.push(node))
                } else {
                    Some(QueryPath::node(&linked, &field.type_name))
                };

                self.diff_linked_record(node, &linked, path)
            }
            FieldKind::Plural => self.diff_plural(record, node, field, &storage_key),
            FieldKind::Connection { .. } => self.diff_connection(record, node, field, &storage_key, path),
        }
    }

    fn diff_plural(
        &mut self,
        record: &RecordId,
        node: &Selection,
        field: &Field,
        storage_key: &str,
    ) -> Result<Option<Selection>, DiffError> {
        if !self.store.has_field(record, storage_key) {
            return Ok(Some(node.clone()));
        }
        let Some(items) = self.read(self.store.linked_record_ids(record, storage_key))? else {
            return Ok(Some(node.clone()));
        };

        let mut missing = Vec::new();

        for item in items.unwrap_or_default() {
            let item_missing = match self.store.record_state(&item) {
                RecordState::Unknown => field.selections.clone(),
                RecordState::Nonexistent => continue,
                RecordState::Present => {
                    self.tracker.track_node_for_id(&item, node);
                    let path = (!item.is_client_id()).then(|| QueryPath::node(&item, &field.type_name));
                    self.diff_selections(&item, &field.selections, path.as_ref())?
                }
            };

            if item_missing.is_empty() {
                continue;
            }

            if item.is_client_id() {
                missing = union(&field.selections, missing, item_missing);
            } else {
                self.split_node(&item, &field.type_name, item_missing);
            }
        }

        Ok(Outcome::from_missing(node, missing).into_selection(node))
    }

    /// Emits `node(id: ...)` for data missing on a record with a server identifier.
    fn split_node(&mut self, id: &RecordId, type_name: &str, missing: Vec<Selection>) {
        tracing::debug!("Refetching record '{id}' by identifier");
        let root = self.reconstructor.node_root(id, type_name, missing);
        self.split_roots.push(root);
    }

    fn has_scalar(&self, record: &RecordId, storage_key: &str) -> bool {
        if storage_key == self.config.id_field && !record.is_client_id() {
            return true;
        }
        if storage_key == self.config.typename_field && self.store.typename(record).is_some() {
            return true;
        }

        self.store.has_field(record, storage_key)
    }

    /// A fragment applies unless the record's type is known and doesn't match its condition.
    fn fragment_applies(&self, record: &RecordId, fragment: &Fragment) -> bool {
        match (fragment.type_condition.as_deref(), self.store.typename(record)) {
            (Some(condition), Some(typename)) => self.schema.type_condition_applies(condition, typename),
            _ => true,
        }
    }

    /// Store values of an unexpected shape are a bug: fatal in debug builds, logged and treated
    /// as missing otherwise.
    fn read<T>(&self, result: Result<T, StoreError>) -> Result<Option<T>, DiffError> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(err) if cfg!(debug_assertions) => Err(err.into()),
            Err(err) => {
                tracing::error!("Treating unreadable data as missing: {err}");
                Ok(None)
            }
        }
    }
}
