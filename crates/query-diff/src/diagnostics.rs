use std::fmt;

/// Non-fatal conditions met while diffing: data is missing but cannot be refetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// Data is missing on the node of an edge, or on the edge itself, and the node has no
    /// identifier to refetch it with.
    ConnectionNodeWithoutId { connection: String },
    /// Edge fields are missing and the connection doesn't accept `find` to refetch a single edge.
    ConnectionNotFindable { connection: String },
}

impl Diagnostic {
    /// The message, with a `%s` placeholder for each of [`Diagnostic::args`].
    pub fn template(&self) -> &'static str {
        match self {
            Diagnostic::ConnectionNodeWithoutId { .. } => {
                "Field `node` on connection `%s` cannot be retrieved if it does not have an `id` field. \
                 If you expect fields to be retrieved on this field, add an `id` field in the schema. \
                 If you choose to ignore this warning, you can silence it by adding \
                 `@relay(isConnectionWithoutNodeID: true)` to the connection field."
            }
            Diagnostic::ConnectionNotFindable { .. } => {
                "connection `edges{*}` fields can only be refetched if the connection supports the `find` call. \
                 Cannot refetch data for field `%s`."
            }
        }
    }

    pub fn args(&self) -> Vec<&str> {
        match self {
            Diagnostic::ConnectionNodeWithoutId { connection } | Diagnostic::ConnectionNotFindable { connection } => {
                vec![connection.as_str()]
            }
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut args = self.args().into_iter();
        let mut parts = self.template().split("%s").peekable();

        while let Some(part) = parts.next() {
            f.write_str(part)?;
            if parts.peek().is_some() {
                f.write_str(args.next().unwrap_or("%s"))?;
            }
        }

        Ok(())
    }
}

/// Receives the diagnostics of a diff.
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

impl DiagnosticSink for Vec<Diagnostic> {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}

/// Logs every diagnostic as a warning.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl DiagnosticSink for TracingDiagnostics {
    fn report(&mut self, diagnostic: Diagnostic) {
        tracing::warn!("{diagnostic}");
    }
}
