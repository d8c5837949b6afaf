use std::{borrow::Cow, sync::Arc};

use cynic_parser::{
    Value,
    common::OperationType,
    executable::{self, FieldSelection, FragmentSpread, Iter},
};
use fxhash::FxHashMap;

use super::{Argument, Directive, Field, FieldKind, Fragment, InputValue, QueryRoot, Selection};
use crate::{Schema, error::QueryError};

type Variables = serde_json::Map<String, serde_json::Value>;

impl QueryRoot {
    /// Builds one root per top level field of the first operation in `source`.
    ///
    /// Variables are substituted by their values, falling back on their default, and selections
    /// excluded by `@skip` or `@include` are dropped.
    pub fn parse(schema: &Arc<Schema>, source: &str, variables: &Variables) -> Result<Vec<QueryRoot>, QueryError> {
        let document =
            cynic_parser::parse_executable_document(source).map_err(|err| QueryError::Parsing(err.to_string()))?;

        let operation = document.operations().next().ok_or(QueryError::NoOperation)?;

        match operation.operation_type() {
            OperationType::Query => {}
            OperationType::Mutation => return Err(QueryError::UnsupportedOperation(Cow::Borrowed("mutation"))),
            OperationType::Subscription => {
                return Err(QueryError::UnsupportedOperation(Cow::Borrowed("subscription")));
            }
        }

        let mut builder = QueryBuilder {
            schema: schema.as_ref(),
            variables,
            default_values: FxHashMap::default(),
            fragments: FxHashMap::default(),
            fragment_stack: Vec::new(),
        };

        for definition in operation.variable_definitions() {
            if let Some(default_value) = definition.default_value() {
                let value = builder.input_value(default_value.into(), false)?;
                builder.default_values.insert(definition.name().to_string(), value);
            }
        }

        let name = operation.name().map(str::to_string);
        let query_type = schema.query_type().to_string();
        let mut roots = Vec::new();

        for selection in operation.selection_set() {
            match selection {
                executable::Selection::Field(field) => {
                    if let Some(field) = builder.field(&query_type, field)? {
                        roots.push(QueryRoot::new(name.clone(), field, schema.clone()));
                    }
                }
                executable::Selection::InlineFragment(_) | executable::Selection::FragmentSpread(_) => {
                    return Err(QueryError::RootFragmentSpread);
                }
            }
        }

        Ok(roots)
    }
}

struct QueryBuilder<'a> {
    schema: &'a Schema,
    variables: &'a Variables,
    default_values: FxHashMap<String, InputValue>,
    fragments: FxHashMap<String, Arc<Fragment>>,
    fragment_stack: Vec<String>,
}

impl QueryBuilder<'_> {
    fn field(&mut self, parent_type: &str, field: FieldSelection<'_>) -> Result<Option<Arc<Field>>, QueryError> {
        if !self.is_included(field.directives())? {
            return Ok(None);
        }

        let config = self.schema.config();
        let name = field.name();

        let mut built = if name == config.typename_field {
            Field::new(name, "String", FieldKind::Scalar)
        } else {
            let definition = self
                .schema
                .field(parent_type, name)
                .ok_or_else(|| QueryError::UnknownField {
                    container: parent_type.to_string(),
                    name: name.to_string(),
                })?;

            let kind = if !self.schema.is_composite(&definition.type_name) {
                FieldKind::Scalar
            } else if let Some(shape) = self.schema.connection_shape(definition) {
                FieldKind::Connection {
                    findable: shape.findable,
                }
            } else if definition.is_list {
                FieldKind::Plural
            } else {
                FieldKind::Linked
            };

            let mut built = Field::new(name, definition.type_name.as_str(), kind);
            built.is_abstract = self.schema.is_abstract(&definition.type_name);

            for argument in field.arguments() {
                let is_enum = definition
                    .argument(argument.name())
                    .is_some_and(|argument| self.schema.is_enum(&argument.type_name));

                built.arguments.push(Argument {
                    name: argument.name().to_string(),
                    value: self.input_value(argument.value(), is_enum)?,
                });
            }

            built
        };

        built.alias = field.alias().map(str::to_string);
        built.directives = self.directives(field.directives())?;
        built.connection_without_node_id = built.directives.iter().any(|directive| {
            directive.name == config.connection.opt_out_directive
                && directive.argument(&config.connection.opt_out_argument) == Some(&InputValue::Boolean(true))
        });

        built.requisite = built.is_scalar()
            && [&config.id_field, &config.typename_field, &config.connection.cursor].contains(&&built.name);

        if !built.is_scalar() {
            let type_name = built.type_name.clone();
            built.selections = self.selections(&type_name, field.selection_set())?;
            self.add_generated_fields(&mut built);
        }

        Ok(Some(Arc::new(built)))
    }

    /// Adds what the response needs to be normalized but the user didn't select: the identifier
    /// when the type has one, the type discriminator on abstract types and the cursor of edges.
    fn add_generated_fields(&self, field: &mut Field) {
        let config = self.schema.config();

        if field.is_connection() {
            for child in &mut field.selections {
                let Selection::Field(edges) = child else {
                    continue;
                };
                if edges.name != config.connection.edges || selects(&edges.selections, &config.connection.cursor) {
                    continue;
                }

                let cursor = Field::generated(config.connection.cursor.as_str(), "String");
                Arc::make_mut(edges)
                    .selections
                    .insert(0, Selection::Field(Arc::new(cursor)));
            }
        }

        let mut generated = Vec::new();

        let missing_id = self
            .schema
            .field(&field.type_name, &config.id_field)
            .filter(|_| !selects(&field.selections, &config.id_field));

        if let Some(id) = missing_id {
            generated.push(Selection::Field(Arc::new(Field::generated(
                config.id_field.as_str(),
                id.type_name.as_str(),
            ))));
        }

        if field.is_abstract && !selects(&field.selections, &config.typename_field) {
            generated.push(Selection::Field(Arc::new(Field::generated(
                config.typename_field.as_str(),
                "String",
            ))));
        }

        generated.append(&mut field.selections);
        field.selections = generated;
    }

    fn selections(
        &mut self,
        parent_type: &str,
        selections: Iter<'_, executable::Selection<'_>>,
    ) -> Result<Vec<Selection>, QueryError> {
        let mut built = Vec::new();

        for selection in selections {
            match selection {
                executable::Selection::Field(field) => {
                    if let Some(field) = self.field(parent_type, field)? {
                        built.push(Selection::Field(field));
                    }
                }
                executable::Selection::InlineFragment(fragment) => {
                    if !self.is_included(fragment.directives())? {
                        continue;
                    }

                    let scope = fragment.type_condition().unwrap_or(parent_type);
                    let selections = self.selections(scope, fragment.selection_set())?;

                    let mut inline = Fragment::inline(scope, selections);
                    inline.type_condition = fragment.type_condition().map(str::to_string);
                    inline.directives = self.directives(fragment.directives())?;

                    built.push(Selection::Fragment(Arc::new(inline)));
                }
                executable::Selection::FragmentSpread(spread) => {
                    if !self.is_included(spread.directives())? {
                        continue;
                    }

                    let fragment = self.named_fragment(spread)?;
                    let directives = self.directives(spread.directives())?;

                    if directives.is_empty() {
                        built.push(Selection::Fragment(fragment));
                    } else {
                        let mut fragment = Fragment::clone(&fragment);
                        fragment.id = super::NodeId::next();
                        fragment.directives.extend(directives);
                        built.push(Selection::Fragment(Arc::new(fragment)));
                    }
                }
            }
        }

        Ok(built)
    }

    /// Named fragments are built once, every spread shares the same nodes.
    fn named_fragment(&mut self, spread: FragmentSpread<'_>) -> Result<Arc<Fragment>, QueryError> {
        let name = spread.fragment_name();

        if let Some(fragment) = self.fragments.get(name) {
            return Ok(fragment.clone());
        }

        if self.fragment_stack.iter().any(|current| current == name) {
            return Err(QueryError::FragmentCycle { name: name.to_string() });
        }

        let definition = spread
            .fragment()
            .ok_or_else(|| QueryError::UnknownFragment { name: name.to_string() })?;

        self.fragment_stack.push(name.to_string());
        let selections = self.selections(definition.type_condition(), definition.selection_set())?;
        self.fragment_stack.pop();

        let mut fragment = Fragment::inline(definition.type_condition(), selections);
        fragment.name = Some(name.to_string());
        fragment.directives = self.directives(definition.directives())?;

        let fragment = Arc::new(fragment);
        self.fragments.insert(name.to_string(), fragment.clone());

        Ok(fragment)
    }

    fn directives<'d>(
        &self,
        directives: impl IntoIterator<Item = executable::Directive<'d>>,
    ) -> Result<Vec<Directive>, QueryError> {
        directives
            .into_iter()
            .filter(|directive| !matches!(directive.name(), "skip" | "include"))
            .map(|directive| {
                let arguments = directive
                    .arguments()
                    .map(|argument| {
                        Ok(Argument {
                            name: argument.name().to_string(),
                            value: self.input_value(argument.value(), false)?,
                        })
                    })
                    .collect::<Result<Vec<_>, QueryError>>()?;

                Ok(Directive {
                    name: directive.name().to_string(),
                    arguments,
                })
            })
            .collect()
    }

    fn is_included<'d>(
        &self,
        directives: impl IntoIterator<Item = executable::Directive<'d>>,
    ) -> Result<bool, QueryError> {
        for directive in directives {
            let included_when = match directive.name() {
                "skip" => false,
                "include" => true,
                _ => continue,
            };

            for argument in directive.arguments() {
                if argument.name() != "if" {
                    continue;
                }

                if let InputValue::Boolean(condition) = self.input_value(argument.value(), false)? {
                    if condition != included_when {
                        return Ok(false);
                    }
                }
            }
        }

        Ok(true)
    }

    fn input_value(&self, value: Value<'_>, is_enum: bool) -> Result<InputValue, QueryError> {
        Ok(match value {
            Value::Variable(variable) => self.variable(variable.name(), is_enum)?,
            Value::Null(_) => InputValue::Null,
            Value::Int(value) => InputValue::Int(value.as_i64()),
            Value::Float(value) => InputValue::Float(value.value()),
            Value::String(value) => InputValue::String(value.as_str().to_string()),
            Value::Boolean(value) => InputValue::Boolean(value.value()),
            Value::Enum(value) => InputValue::Enum(value.name().to_string()),
            Value::List(values) => InputValue::List(
                values
                    .into_iter()
                    .map(|value| self.input_value(value, is_enum))
                    .collect::<Result<_, _>>()?,
            ),
            Value::Object(fields) => InputValue::Object(
                fields
                    .into_iter()
                    .map(|field| Ok((field.name().to_string(), self.input_value(field.value(), false)?)))
                    .collect::<Result<_, QueryError>>()?,
            ),
        })
    }

    fn variable(&self, name: &str, is_enum: bool) -> Result<InputValue, QueryError> {
        if let Some(value) = self.variables.get(name) {
            return Ok(InputValue::from_json(value, is_enum));
        }

        self.default_values
            .get(name)
            .cloned()
            .ok_or_else(|| QueryError::MissingVariable { name: name.to_string() })
    }
}

fn selects(selections: &[Selection], response_key: &str) -> bool {
    selections
        .iter()
        .filter_map(Selection::as_field)
        .any(|field| field.response_key() == response_key)
}
