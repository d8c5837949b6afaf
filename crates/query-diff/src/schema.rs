//! The slice of the schema the differ needs: which fields exist on which types, what they
//! return, and whether they behave like paginated connections.

use cynic_parser::{common::WrappingType, type_system as ast};
use fxhash::FxHashMap;
use indexmap::IndexMap;

use crate::{DiffConfig, error::SchemaError};

const BUILTIN_SCALARS: [&str; 5] = ["String", "Int", "Float", "Boolean", "ID"];

#[derive(Debug)]
pub struct Schema {
    config: DiffConfig,
    types: FxHashMap<String, TypeDefinition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Scalar,
    Enum,
    Object,
    Interface,
    Union,
    InputObject,
}

impl TypeKind {
    pub fn is_composite(self) -> bool {
        matches!(self, TypeKind::Object | TypeKind::Interface | TypeKind::Union)
    }

    pub fn is_abstract(self) -> bool {
        matches!(self, TypeKind::Interface | TypeKind::Union)
    }
}

#[derive(Debug)]
pub struct TypeDefinition {
    pub name: String,
    pub kind: TypeKind,
    pub fields: IndexMap<String, FieldDefinition>,
    /// Interfaces implemented by an object or interface.
    pub implements: Vec<String>,
    /// Members of a union.
    pub members: Vec<String>,
}

#[derive(Debug)]
pub struct FieldDefinition {
    pub name: String,
    /// The named type with all wrappers stripped.
    pub type_name: String,
    pub is_list: bool,
    pub arguments: Vec<ArgumentDefinition>,
}

#[derive(Debug)]
pub struct ArgumentDefinition {
    pub name: String,
    pub type_name: String,
}

impl FieldDefinition {
    pub fn argument(&self, name: &str) -> Option<&ArgumentDefinition> {
        self.arguments.iter().find(|argument| argument.name == name)
    }

    pub fn has_argument(&self, name: &str) -> bool {
        self.argument(name).is_some()
    }
}

/// How a field returning a connection can be paginated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionShape {
    /// Whether the connection accepts `find: <node id>` to re-enter a single edge.
    pub findable: bool,
}

impl Schema {
    pub fn from_sdl(sdl: &str) -> Result<Self, SchemaError> {
        Self::with_config(sdl, DiffConfig::default())
    }

    pub fn with_config(sdl: &str, config: DiffConfig) -> Result<Self, SchemaError> {
        let document =
            cynic_parser::parse_type_system_document(sdl).map_err(|err| SchemaError::Parsing(err.to_string()))?;

        let mut types = FxHashMap::default();

        for definition in document.definitions() {
            let (ast::Definition::Type(ty) | ast::Definition::TypeExtension(ty)) = definition else {
                continue;
            };

            let ingested = ingest_type(&ty);

            match types.get_mut(ingested.name.as_str()) {
                None => {
                    types.insert(ingested.name.clone(), ingested);
                }
                Some(existing) => merge_extension(existing, ingested),
            }
        }

        for name in BUILTIN_SCALARS {
            types.entry(name.to_string()).or_insert_with(|| TypeDefinition {
                name: name.to_string(),
                kind: TypeKind::Scalar,
                fields: IndexMap::new(),
                implements: Vec::new(),
                members: Vec::new(),
            });
        }

        if !types.contains_key(config.query_type.as_str()) {
            return Err(SchemaError::MissingQueryType {
                name: config.query_type.clone(),
            });
        }

        Ok(Schema { config, types })
    }

    pub fn config(&self) -> &DiffConfig {
        &self.config
    }

    pub fn query_type(&self) -> &str {
        &self.config.query_type
    }

    pub fn type_definition(&self, name: &str) -> Option<&TypeDefinition> {
        self.types.get(name)
    }

    pub fn field(&self, type_name: &str, field_name: &str) -> Option<&FieldDefinition> {
        self.types.get(type_name)?.fields.get(field_name)
    }

    pub fn is_abstract(&self, type_name: &str) -> bool {
        self.types.get(type_name).is_some_and(|ty| ty.kind.is_abstract())
    }

    pub fn is_composite(&self, type_name: &str) -> bool {
        self.types.get(type_name).is_some_and(|ty| ty.kind.is_composite())
    }

    pub fn is_enum(&self, type_name: &str) -> bool {
        self.types.get(type_name).is_some_and(|ty| ty.kind == TypeKind::Enum)
    }

    /// Whether a fragment with the given type condition applies to a record of the concrete
    /// type `typename`.
    pub fn type_condition_applies(&self, condition: &str, typename: &str) -> bool {
        if condition == typename {
            return true;
        }

        let Some(condition_type) = self.types.get(condition) else {
            return false;
        };

        match condition_type.kind {
            TypeKind::Interface => self
                .types
                .get(typename)
                .is_some_and(|ty| ty.implements.iter().any(|name| name == condition)),
            TypeKind::Union => condition_type.members.iter().any(|member| member == typename),
            _ => false,
        }
    }

    /// A field is a connection when it takes `first` or `last` and returns a type whose edges
    /// list carries both a node and a cursor.
    pub fn connection_shape(&self, field: &FieldDefinition) -> Option<ConnectionShape> {
        let connection = &self.config.connection;

        if field.is_list || !(field.has_argument("first") || field.has_argument("last")) {
            return None;
        }

        let edges = self.field(&field.type_name, &connection.edges)?;
        if !edges.is_list {
            return None;
        }

        let edge_type = self.types.get(&edges.type_name)?;
        if !edge_type.fields.contains_key(&connection.node) || !edge_type.fields.contains_key(&connection.cursor) {
            return None;
        }

        Some(ConnectionShape {
            findable: field.has_argument("find"),
        })
    }
}

fn ingest_type(ty: &ast::TypeDefinition<'_>) -> TypeDefinition {
    let mut definition = TypeDefinition {
        name: ty.name().to_string(),
        kind: TypeKind::Scalar,
        fields: IndexMap::new(),
        implements: Vec::new(),
        members: Vec::new(),
    };

    match ty {
        ast::TypeDefinition::Scalar(_) => {}
        ast::TypeDefinition::Enum(_) => definition.kind = TypeKind::Enum,
        ast::TypeDefinition::InputObject(_) => definition.kind = TypeKind::InputObject,
        ast::TypeDefinition::Object(object) => {
            definition.kind = TypeKind::Object;
            definition.implements = object.implements_interfaces().map(str::to_string).collect();
            definition.fields = object.fields().map(ingest_field).collect();
        }
        ast::TypeDefinition::Interface(interface) => {
            definition.kind = TypeKind::Interface;
            definition.implements = interface.implements_interfaces().map(str::to_string).collect();
            definition.fields = interface.fields().map(ingest_field).collect();
        }
        ast::TypeDefinition::Union(union) => {
            definition.kind = TypeKind::Union;
            definition.members = union.members().map(|member| member.name().to_string()).collect();
        }
    }

    definition
}

fn ingest_field(field: ast::FieldDefinition<'_>) -> (String, FieldDefinition) {
    let ty = field.ty();
    let definition = FieldDefinition {
        name: field.name().to_string(),
        type_name: ty.name().to_string(),
        is_list: ty.wrappers().any(|wrapper| matches!(wrapper, WrappingType::List)),
        arguments: field
            .arguments()
            .map(|argument| ArgumentDefinition {
                name: argument.name().to_string(),
                type_name: argument.ty().name().to_string(),
            })
            .collect(),
    };

    (definition.name.clone(), definition)
}

fn merge_extension(existing: &mut TypeDefinition, extension: TypeDefinition) {
    existing.fields.extend(extension.fields);
    existing.implements.extend(extension.implements);
    existing.members.extend(extension.members);
}
