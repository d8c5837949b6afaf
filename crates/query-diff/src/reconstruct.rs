//! Turns missing subtrees back into standalone queries.
//!
//! A subtree found missing deep inside a query is re-anchored either at the original root field
//! or at the closest record with an identifier, which can be fetched on its own through
//! `node(id: ...)`.

use std::sync::Arc;

use crate::{
    QueryRoot, RecordId, Schema,
    query::{Argument, Field, FieldKind, Fragment, InputValue, Selection},
};

/// Where a missing subtree sits, relative to a refetchable anchor.
#[derive(Debug, Clone)]
pub(crate) struct QueryPath {
    anchor: Anchor,
    /// Singular fields and fragments between the anchor and the subtree. For root anchors the
    /// first step is the root field itself, once pushed.
    steps: Vec<Selection>,
}

#[derive(Debug, Clone)]
enum Anchor {
    Root,
    Node { id: RecordId, type_name: String },
}

/// The missing subtree has no path to a refetchable anchor, it must be folded into its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct UnsupportedRefetch;

impl QueryPath {
    pub fn root() -> Self {
        QueryPath {
            anchor: Anchor::Root,
            steps: Vec::new(),
        }
    }

    pub fn node(id: &RecordId, type_name: &str) -> Self {
        QueryPath {
            anchor: Anchor::Node {
                id: id.clone(),
                type_name: type_name.to_string(),
            },
            steps: Vec::new(),
        }
    }

    pub fn push(&self, step: &Selection) -> Self {
        let mut path = self.clone();
        path.steps.push(step.clone());
        path
    }
}

pub(crate) struct Reconstructor<'a> {
    root: &'a QueryRoot,
    schema: &'a Schema,
}

impl<'a> Reconstructor<'a> {
    pub fn new(root: &'a QueryRoot) -> Self {
        Reconstructor {
            root,
            schema: root.schema(),
        }
    }

    /// A root fetching `selections` at the end of `path`.
    pub fn build(&self, path: Option<&QueryPath>, selections: Vec<Selection>) -> Result<QueryRoot, UnsupportedRefetch> {
        let path = path.ok_or(UnsupportedRefetch)?;

        let mut children = selections;
        for step in path.steps.iter().rev() {
            let mut selections = requisite_fields(step, &children);
            selections.extend(children);
            children = vec![step.with_selections(selections)];
        }

        match &path.anchor {
            Anchor::Node { id, type_name } => Ok(self.node_root(id, type_name, children)),
            Anchor::Root => match (children.pop(), children.is_empty()) {
                (Some(Selection::Field(field)), true) => Ok(self.root.with_field(field)),
                _ => Err(UnsupportedRefetch),
            },
        }
    }

    /// `node(id: ...) { id __typename ... on <type_name> { selections } }`
    pub fn node_root(&self, id: &RecordId, type_name: &str, selections: Vec<Selection>) -> QueryRoot {
        let config = self.schema.config();

        let node_type = self
            .schema
            .field(self.schema.query_type(), &config.node_root_field)
            .map(|field| field.type_name.as_str())
            .unwrap_or("Node");

        let mut node = Field::new(config.node_root_field.as_str(), node_type, FieldKind::Linked);
        node.is_abstract = self.schema.is_abstract(node_type);
        node.arguments = vec![Argument {
            name: config.node_root_argument.clone(),
            value: InputValue::String(id.to_string()),
        }];
        node.selections = vec![
            self.scalar(&config.id_field, "ID"),
            self.scalar(&config.typename_field, "String"),
            Selection::Fragment(Arc::new(Fragment::inline(type_name, selections))),
        ];

        self.root.with_field(Arc::new(node))
    }

    pub fn scalar(&self, name: &str, type_name: &str) -> Selection {
        Selection::Field(Arc::new(Field::generated(name, type_name)))
    }
}

/// Identifier, type discriminator or cursor of a step which the partial copy of the step
/// doesn't carry yet.
fn requisite_fields(step: &Selection, children: &[Selection]) -> Vec<Selection> {
    step.selections()
        .iter()
        .filter(|child| child.is_requisite() && !children.iter().any(|selection| selection.id() == child.id()))
        .cloned()
        .collect()
}
