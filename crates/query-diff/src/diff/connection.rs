use std::sync::Arc;

use super::{
    Differ,
    outcome::{Outcome, union},
};
use crate::{
    Diagnostic, QueryRoot, RecordId,
    error::DiffError,
    query::{Argument, Field, FieldKind, Selection},
    range::{RANGE_ARGUMENTS, RangeCalls, RangeDiff, RangeEdge},
    reconstruct::{QueryPath, UnsupportedRefetch},
    store::{Record, RecordState},
};

/// A connection being diffed.
struct ConnectionScope<'s> {
    field: &'s Field,
    /// Generated record holding the range and the non-edge fields.
    record: RecordId,
    range_diff: RangeDiff,
    /// Path to the record holding the connection.
    path: Option<&'s QueryPath>,
}

impl Differ<'_> {
    pub(super) fn diff_connection(
        &mut self,
        record: &RecordId,
        node: &Selection,
        field: &Field,
        storage_key: &str,
        path: Option<&QueryPath>,
    ) -> Result<Option<Selection>, DiffError> {
        if !self.store.has_field(record, storage_key) {
            return Ok(Some(node.clone()));
        }
        let Some(connection) = self.read(self.store.connection_record_id(record, storage_key))? else {
            return Ok(Some(node.clone()));
        };
        let Some(connection) = connection else {
            return Ok(None);
        };
        if self.store.record_state(&connection) != RecordState::Present {
            return Ok(Some(node.clone()));
        }

        let calls = match RangeCalls::from_arguments(&field.arguments) {
            Ok(calls) => calls,
            Err(err) => {
                tracing::debug!("Refetching connection `{}` entirely: {err}", field.name);
                return Ok(Some(node.clone()));
            }
        };

        let range_diff = match self.store.record(&connection).and_then(Record::range) {
            Some(range) => range.diff(&calls),
            None => RangeDiff {
                cached_edges: Vec::new(),
                residual: Some(calls),
                page_info_known: false,
            },
        };

        // Without a path the window can't be extended on its own, the parent refetches it whole.
        if range_diff.residual.is_some() && path.is_none() {
            return Ok(Some(node.clone()));
        }

        self.tracker.track_node_for_id(&connection, node);

        let scope = ConnectionScope {
            field,
            record: connection,
            range_diff,
            path,
        };

        let children_path = path.map(|path| path.push(node));
        let missing = self.diff_connection_selections(&scope, node.selections(), children_path.as_ref())?;

        let Some(residual) = &scope.range_diff.residual else {
            return Ok(Outcome::from_missing(node, missing).into_selection(node));
        };

        // The extension carries the full selection, covering the non-edge fields as well.
        let mut extension = field.clone();
        extension.arguments = with_range_arguments(field, residual);

        tracing::debug!("Extending the window of connection `{}` with {residual:?}", field.name);

        match self
            .reconstructor
            .build(path, vec![Selection::Field(Arc::new(extension))])
        {
            Ok(root) => {
                self.split_roots.push(root);
                Ok(None)
            }
            Err(UnsupportedRefetch) => Ok(Some(node.clone())),
        }
    }

    fn diff_connection_selections(
        &mut self,
        scope: &ConnectionScope<'_>,
        selections: &[Selection],
        path: Option<&QueryPath>,
    ) -> Result<Vec<Selection>, DiffError> {
        let config = self.config;
        let mut missing = Vec::new();

        for selection in selections {
            let diff = match selection {
                Selection::Field(field) if field.name == config.connection.edges => self.diff_edges(scope, selection, field)?,
                // Answered by the range, or refetched along with the extension of the window.
                Selection::Field(field) if field.name == config.connection.page_info => None,
                Selection::Field(field) => self.diff_field(&scope.record, selection, field, path)?,
                Selection::Fragment(fragment) => {
                    if !self.fragment_applies(&scope.record, fragment) {
                        continue;
                    }

                    let path = path.map(|path| path.push(selection));
                    let children = self.diff_connection_selections(scope, &fragment.selections, path.as_ref())?;
                    Outcome::from_missing(selection, children).into_selection(selection)
                }
            };
            missing.extend(diff);
        }

        Ok(missing)
    }

    /// Diffs every cached edge of the window. Returns the edge fields which could neither be
    /// refetched through `find` nor reported.
    fn diff_edges(
        &mut self,
        scope: &ConnectionScope<'_>,
        node: &Selection,
        edges: &Field,
    ) -> Result<Option<Selection>, DiffError> {
        let mut folded = Vec::new();

        for edge in &scope.range_diff.cached_edges {
            let mut node_unrefetchable = false;

            let edge_missing = match self.store.record_state(&edge.edge_id) {
                RecordState::Present => {
                    self.diff_edge_selections(scope, edge, &edges.selections, &mut node_unrefetchable)?
                }
                RecordState::Unknown | RecordState::Nonexistent => edges.selections.clone(),
            };

            if !edge_missing.is_empty() {
                match edge.node_id.as_ref().filter(|id| !id.is_client_id()) {
                    Some(node_id) if scope.field.is_findable() => {
                        match self.find_root(scope, node, edges, node_id, edge_missing.clone()) {
                            Ok(root) => self.split_roots.push(root),
                            Err(UnsupportedRefetch) => folded = union(&edges.selections, folded, edge_missing),
                        }
                    }
                    Some(_) => self.diagnostics.report(Diagnostic::ConnectionNotFindable {
                        connection: scope.field.name.clone(),
                    }),
                    None => node_unrefetchable = true,
                }
            }

            if node_unrefetchable && !scope.field.connection_without_node_id {
                self.diagnostics.report(Diagnostic::ConnectionNodeWithoutId {
                    connection: scope.field.name.clone(),
                });
            }
        }

        Ok(Outcome::from_missing(node, folded).into_selection(node))
    }

    /// Missing edge fields of an edge record. Data missing on its node is split off or flagged
    /// through `node_unrefetchable`.
    fn diff_edge_selections(
        &mut self,
        scope: &ConnectionScope<'_>,
        edge: &RangeEdge,
        selections: &[Selection],
        node_unrefetchable: &mut bool,
    ) -> Result<Vec<Selection>, DiffError> {
        let mut missing = Vec::new();

        for selection in selections {
            let diff = match selection {
                Selection::Field(field) if field.name == self.config.connection.node => {
                    self.diff_edge_node(edge, selection, field, node_unrefetchable)?;
                    None
                }
                Selection::Field(field) => self.diff_field(&edge.edge_id, selection, field, None)?,
                Selection::Fragment(fragment) => {
                    if !self.fragment_applies(&edge.edge_id, fragment) {
                        continue;
                    }

                    let children =
                        self.diff_edge_selections(scope, edge, &fragment.selections, node_unrefetchable)?;
                    Outcome::from_missing(selection, children).into_selection(selection)
                }
            };
            missing.extend(diff);
        }

        Ok(missing)
    }

    fn diff_edge_node(
        &mut self,
        edge: &RangeEdge,
        node: &Selection,
        field: &Field,
        node_unrefetchable: &mut bool,
    ) -> Result<(), DiffError> {
        let storage_key = field.storage_key();

        let linked = if self.store.has_field(&edge.edge_id, &storage_key) {
            self.read(self.store.linked_record_id(&edge.edge_id, &storage_key))?
        } else {
            None
        };
        let Some(linked) = linked else {
            *node_unrefetchable = true;
            return Ok(());
        };
        let Some(linked) = linked else {
            return Ok(());
        };

        let missing = match self.store.record_state(&linked) {
            RecordState::Unknown => field.selections.clone(),
            RecordState::Nonexistent => return Ok(()),
            RecordState::Present => {
                self.tracker.track_node_for_id(&linked, node);
                let path = (!linked.is_client_id()).then(|| QueryPath::node(&linked, &field.type_name));
                self.diff_selections(&linked, &field.selections, path.as_ref())?
            }
        };

        if missing.is_empty() {
            return Ok(());
        }

        if linked.is_client_id() {
            *node_unrefetchable = true;
        } else {
            self.split_node(&linked, &field.type_name, missing);
        }

        Ok(())
    }

    /// `connection(find: <node id>) { edges { cursor node { id __typename } ...missing } }`,
    /// re-anchored at the record holding the connection.
    fn find_root(
        &self,
        scope: &ConnectionScope<'_>,
        node: &Selection,
        edges: &Field,
        node_id: &RecordId,
        missing: Vec<Selection>,
    ) -> Result<QueryRoot, UnsupportedRefetch> {
        let config = self.config;

        let node_type = self
            .schema
            .field(&edges.type_name, &config.connection.node)
            .map(|field| field.type_name.as_str())
            .unwrap_or("Node");

        let mut edge_node = Field::new(config.connection.node.as_str(), node_type, FieldKind::Linked);
        edge_node.is_abstract = self.schema.is_abstract(node_type);
        edge_node.selections = vec![
            self.reconstructor.scalar(&config.id_field, "ID"),
            self.reconstructor.scalar(&config.typename_field, "String"),
        ];

        let mut children = vec![
            self.reconstructor.scalar(&config.connection.cursor, "String"),
            Selection::Field(Arc::new(edge_node)),
        ];
        children.extend(missing.into_iter().filter(|selection| !selection.is_generated()));

        let mut find = scope.field.clone();
        find.arguments = with_range_arguments(scope.field, &RangeCalls::Find(node_id.to_string()));
        find.selections = vec![node.with_selections(children)];

        tracing::debug!(
            "Refetching edge of node '{node_id}' in connection `{}` through find",
            scope.field.name
        );

        self.reconstructor.build(scope.path, vec![Selection::Field(Arc::new(find))])
    }
}

/// The arguments of `field` with its pagination replaced by `calls`.
fn with_range_arguments(field: &Field, calls: &RangeCalls) -> Vec<Argument> {
    field
        .arguments
        .iter()
        .filter(|argument| !RANGE_ARGUMENTS.contains(&argument.name.as_str()))
        .cloned()
        .chain(calls.to_arguments())
        .collect()
}
