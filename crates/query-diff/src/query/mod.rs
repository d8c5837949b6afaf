//! An owned, immutable query tree.
//!
//! Nodes are shared through `Arc` so that the trees produced by the differ can reuse the
//! untouched parts of the original query as-is. Every node carries a [`NodeId`] which survives
//! the filtering clones made while diffing, so callers can check where a node of their query
//! ended up.

mod build;
mod print;

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use itertools::Itertools;

use crate::{Schema, range::RANGE_ARGUMENTS};

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    fn next() -> Self {
        NodeId(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A single root field of a query along with everything needed to print it on its own.
#[derive(Clone)]
pub struct QueryRoot {
    name: Option<String>,
    field: Arc<Field>,
    schema: Arc<Schema>,
}

#[derive(Debug, Clone)]
pub enum Selection {
    Field(Arc<Field>),
    Fragment(Arc<Fragment>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Scalar,
    /// A singular link to another record.
    Linked,
    /// A list of links, without pagination.
    Plural,
    Connection {
        findable: bool,
    },
}

#[derive(Debug, Clone)]
pub struct Field {
    id: NodeId,
    pub alias: Option<String>,
    pub name: String,
    pub arguments: Vec<Argument>,
    pub directives: Vec<Directive>,
    pub selections: Vec<Selection>,
    pub kind: FieldKind,
    /// Named return type of the field.
    pub type_name: String,
    pub is_abstract: bool,
    /// Set by `@relay(isConnectionWithoutNodeID: true)`: edges of this connection are expected
    /// to have nodes without identifiers, so missing data under them isn't worth a warning.
    pub connection_without_node_id: bool,
    /// Needed to normalize the response (identifier, type discriminator, edge cursor). Kept in
    /// every partial copy of the parent.
    pub requisite: bool,
    /// Added to the query rather than written by the user. Printed, but never diffed.
    pub generated: bool,
}

#[derive(Debug, Clone)]
pub struct Fragment {
    id: NodeId,
    /// Set for named fragments, `None` for inline ones.
    pub name: Option<String>,
    pub type_condition: Option<String>,
    pub directives: Vec<Directive>,
    pub selections: Vec<Selection>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub name: String,
    pub value: InputValue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    pub name: String,
    pub arguments: Vec<Argument>,
}

/// A literal argument value. Variables are resolved when the query is built.
#[derive(Debug, Clone, PartialEq)]
pub enum InputValue {
    Null,
    Boolean(bool),
    Int(i64),
    Float(f64),
    String(String),
    Enum(String),
    List(Vec<InputValue>),
    Object(Vec<(String, InputValue)>),
}

impl QueryRoot {
    pub(crate) fn new(name: Option<String>, field: Arc<Field>, schema: Arc<Schema>) -> Self {
        QueryRoot { name, field, schema }
    }

    /// A root with the same name and schema but a different field.
    pub(crate) fn with_field(&self, field: Arc<Field>) -> Self {
        QueryRoot {
            name: self.name.clone(),
            field,
            schema: self.schema.clone(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn field(&self) -> &Arc<Field> {
        &self.field
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn storage_key(&self) -> String {
        self.field.storage_key()
    }

    /// The record identifier targeted by a `node(id: ...)` root.
    pub fn identifying_argument(&self) -> Option<&str> {
        let config = self.schema.config();
        if self.field.name != config.node_root_field {
            return None;
        }

        self.field
            .argument(&config.node_root_argument)?
            .as_str()
            .filter(|id| !id.is_empty())
    }

    /// Whether the node with the given id, or a filtered clone of it, appears in this root.
    pub fn contains_node(&self, id: NodeId) -> bool {
        self.field.id == id || contains_node(&self.field.selections, id)
    }
}

fn contains_node(selections: &[Selection], id: NodeId) -> bool {
    selections
        .iter()
        .any(|selection| selection.id() == id || contains_node(selection.selections(), id))
}

impl fmt::Debug for QueryRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryRoot")
            .field("name", &self.name)
            .field("query", &self.to_string())
            .finish_non_exhaustive()
    }
}

impl Selection {
    pub fn id(&self) -> NodeId {
        match self {
            Selection::Field(field) => field.id,
            Selection::Fragment(fragment) => fragment.id,
        }
    }

    pub fn selections(&self) -> &[Selection] {
        match self {
            Selection::Field(field) => &field.selections,
            Selection::Fragment(fragment) => &fragment.selections,
        }
    }

    pub fn is_requisite(&self) -> bool {
        matches!(self, Selection::Field(field) if field.requisite)
    }

    pub fn is_generated(&self) -> bool {
        matches!(self, Selection::Field(field) if field.generated)
    }

    pub fn as_field(&self) -> Option<&Arc<Field>> {
        match self {
            Selection::Field(field) => Some(field),
            Selection::Fragment(_) => None,
        }
    }

    /// Whether both are the very same node rather than a node and a filtered clone of it.
    pub(crate) fn ptr_eq(&self, other: &Selection) -> bool {
        match (self, other) {
            (Selection::Field(left), Selection::Field(right)) => Arc::ptr_eq(left, right),
            (Selection::Fragment(left), Selection::Fragment(right)) => Arc::ptr_eq(left, right),
            _ => false,
        }
    }

    /// A copy of this node, keeping its id, with different children.
    pub(crate) fn with_selections(&self, selections: Vec<Selection>) -> Selection {
        match self {
            Selection::Field(field) => Selection::Field(Arc::new(field.with_selections(selections))),
            Selection::Fragment(fragment) => Selection::Fragment(Arc::new(fragment.with_selections(selections))),
        }
    }
}

impl Field {
    pub(crate) fn new(name: impl Into<String>, type_name: impl Into<String>, kind: FieldKind) -> Self {
        Field {
            id: NodeId::next(),
            alias: None,
            name: name.into(),
            arguments: Vec::new(),
            directives: Vec::new(),
            selections: Vec::new(),
            kind,
            type_name: type_name.into(),
            is_abstract: false,
            connection_without_node_id: false,
            requisite: false,
            generated: false,
        }
    }

    /// A scalar the user didn't select but which the response must carry.
    pub(crate) fn generated(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Field {
            requisite: true,
            generated: true,
            ..Field::new(name, type_name, FieldKind::Scalar)
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Key of this field in the response, its alias if any.
    pub fn response_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    /// Key of this field on a record: its name and its sorted arguments. Pagination
    /// arguments are left out for connections as the range tracks them.
    pub fn storage_key(&self) -> String {
        let mut arguments = self
            .arguments
            .iter()
            .filter(|argument| !(self.is_connection() && RANGE_ARGUMENTS.contains(&argument.name.as_str())))
            .collect::<Vec<_>>();

        if arguments.is_empty() {
            return self.name.clone();
        }

        arguments.sort_by(|left, right| left.name.cmp(&right.name));

        let arguments = arguments
            .into_iter()
            .map(|argument| format!("{}:{}", argument.name, argument.value))
            .join(",");

        format!("{}({arguments})", self.name)
    }

    pub fn argument(&self, name: &str) -> Option<&InputValue> {
        self.arguments
            .iter()
            .find(|argument| argument.name == name)
            .map(|argument| &argument.value)
    }

    pub fn is_connection(&self) -> bool {
        matches!(self.kind, FieldKind::Connection { .. })
    }

    pub fn is_findable(&self) -> bool {
        matches!(self.kind, FieldKind::Connection { findable: true })
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self.kind, FieldKind::Scalar)
    }

    pub(crate) fn with_selections(&self, selections: Vec<Selection>) -> Field {
        Field {
            selections,
            ..self.clone()
        }
    }
}

impl Fragment {
    pub(crate) fn inline(type_condition: impl Into<String>, selections: Vec<Selection>) -> Self {
        Fragment {
            id: NodeId::next(),
            name: None,
            type_condition: Some(type_condition.into()),
            directives: Vec::new(),
            selections,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub(crate) fn with_selections(&self, selections: Vec<Selection>) -> Fragment {
        Fragment {
            selections,
            ..self.clone()
        }
    }
}

impl Directive {
    pub fn argument(&self, name: &str) -> Option<&InputValue> {
        self.arguments
            .iter()
            .find(|argument| argument.name == name)
            .map(|argument| &argument.value)
    }
}

impl InputValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            InputValue::String(value) => Some(value),
            _ => None,
        }
    }

    pub(crate) fn from_json(value: &serde_json::Value, is_enum: bool) -> InputValue {
        match value {
            serde_json::Value::Null => InputValue::Null,
            serde_json::Value::Bool(value) => InputValue::Boolean(*value),
            serde_json::Value::Number(number) => number
                .as_i64()
                .map(InputValue::Int)
                .or_else(|| number.as_f64().map(InputValue::Float))
                .unwrap_or(InputValue::Null),
            serde_json::Value::String(value) if is_enum => InputValue::Enum(value.clone()),
            serde_json::Value::String(value) => InputValue::String(value.clone()),
            serde_json::Value::Array(values) => {
                InputValue::List(values.iter().map(|value| InputValue::from_json(value, is_enum)).collect())
            }
            serde_json::Value::Object(fields) => InputValue::Object(
                fields
                    .iter()
                    .map(|(name, value)| (name.clone(), InputValue::from_json(value, false)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for InputValue {
    fn from(value: &str) -> Self {
        InputValue::String(value.to_string())
    }
}
