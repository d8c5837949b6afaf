/// Names the differ relies on when it recognises connections, identifies records and builds
/// new roots.
///
/// The defaults follow the Relay connection interface, so most schemas never need to
/// provide a configuration at all.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiffConfig {
    /// The field holding a record's globally unique identifier.
    pub id_field: String,
    /// The type discriminator field.
    pub typename_field: String,
    /// The root field used to refetch any record by identifier, `node(id: ...)`.
    pub node_root_field: String,
    /// The argument of `node_root_field` carrying the identifier.
    pub node_root_argument: String,
    /// Name of the query root type in the schema.
    pub query_type: String,
    /// Directives only meaningful to the client. They are kept on the query tree but never
    /// printed into the queries sent to the server.
    pub client_directives: Vec<String>,
    pub connection: ConnectionConfig,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            id_field: String::from("id"),
            typename_field: String::from("__typename"),
            node_root_field: String::from("node"),
            node_root_argument: String::from("id"),
            query_type: String::from("Query"),
            client_directives: vec![String::from("relay")],
            connection: ConnectionConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConnectionConfig {
    pub edges: String,
    pub node: String,
    pub cursor: String,
    pub page_info: String,
    pub has_next_page: String,
    pub has_previous_page: String,
    /// Directive marking a connection as expected to have nodes without identifiers.
    pub opt_out_directive: String,
    /// Boolean argument of `opt_out_directive` enabling the marker.
    pub opt_out_argument: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            edges: String::from("edges"),
            node: String::from("node"),
            cursor: String::from("cursor"),
            page_info: String::from("pageInfo"),
            has_next_page: String::from("hasNextPage"),
            has_previous_page: String::from("hasPreviousPage"),
            opt_out_directive: String::from("relay"),
            opt_out_argument: String::from("isConnectionWithoutNodeID"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid diff configuration: {0}")]
pub struct ConfigError(#[from] toml::de::Error);

impl DiffConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    pub(crate) fn is_client_directive(&self, name: &str) -> bool {
        self.client_directives.iter().any(|directive| directive == name)
    }
}
