use std::fmt;

use super::{Argument, Directive, Field, InputValue, QueryRoot, Selection};
use crate::DiffConfig;

macro_rules! write_indent {
    ($f:expr, $level:expr) => {
        write!($f, "{:indent$}", "", indent = $level * 2)
    };
}

impl fmt::Display for QueryRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "query")?;
        if let Some(name) = &self.name {
            write!(f, " {name}")?;
        }
        writeln!(f, " {{")?;

        let field = PrintedField {
            field: &self.field,
            config: self.schema.config(),
            indent_level: 1,
        };
        writeln!(f, "{field}")?;
        write!(f, "}}")
    }
}

struct PrintedField<'a> {
    field: &'a Field,
    config: &'a DiffConfig,
    indent_level: usize,
}

struct PrintedSelections<'a> {
    selections: &'a [Selection],
    config: &'a DiffConfig,
    indent_level: usize,
}

struct PrintedDirectives<'a> {
    directives: &'a [Directive],
    config: &'a DiffConfig,
}

impl fmt::Display for PrintedField<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let field = self.field;

        write_indent!(f, self.indent_level)?;
        if let Some(alias) = &field.alias {
            write!(f, "{alias}: ")?;
        }

        write!(
            f,
            "{}{}{}",
            field.name,
            PrintedArguments(&field.arguments),
            PrintedDirectives {
                directives: &field.directives,
                config: self.config,
            }
        )?;

        if !field.selections.is_empty() {
            write!(
                f,
                " {}",
                PrintedSelections {
                    selections: &field.selections,
                    config: self.config,
                    indent_level: self.indent_level,
                }
            )?;
        }

        Ok(())
    }
}

impl fmt::Display for PrintedSelections<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{{")?;

        for selection in self.selections {
            match selection {
                Selection::Field(field) => {
                    let field = PrintedField {
                        field,
                        config: self.config,
                        indent_level: self.indent_level + 1,
                    };
                    writeln!(f, "{field}")?;
                }
                Selection::Fragment(fragment) => {
                    write_indent!(f, self.indent_level + 1)?;
                    write!(f, "...")?;

                    if let Some(on_type) = &fragment.type_condition {
                        write!(f, " on {on_type}")?;
                    }

                    writeln!(
                        f,
                        "{} {}",
                        PrintedDirectives {
                            directives: &fragment.directives,
                            config: self.config,
                        },
                        PrintedSelections {
                            selections: &fragment.selections,
                            config: self.config,
                            indent_level: self.indent_level + 1,
                        }
                    )?;
                }
            }
        }

        write_indent!(f, self.indent_level)?;
        write!(f, "}}")
    }
}

impl fmt::Display for PrintedDirectives<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for directive in self.directives {
            if self.config.is_client_directive(&directive.name) {
                continue;
            }

            write!(f, " @{}{}", directive.name, PrintedArguments(&directive.arguments))?;
        }

        Ok(())
    }
}

struct PrintedArguments<'a>(&'a [Argument]);

impl fmt::Display for PrintedArguments<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return Ok(());
        }

        write!(f, "(")?;
        for (index, argument) in self.0.iter().enumerate() {
            let prefix = if index != 0 { ", " } else { "" };
            write!(f, "{prefix}{}: {}", argument.name, argument.value)?;
        }
        write!(f, ")")
    }
}

impl fmt::Display for InputValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputValue::Null => write!(f, "null"),
            InputValue::Boolean(value) => write!(f, "{value}"),
            InputValue::Int(value) => write!(f, "{value}"),
            InputValue::Float(value) => write!(f, "{value:?}"),
            InputValue::String(value) => {
                let quoted = serde_json::to_string(value).map_err(|_| fmt::Error)?;
                f.write_str(&quoted)
            }
            InputValue::Enum(value) => f.write_str(value),
            InputValue::List(values) => {
                write!(f, "[")?;
                for (index, value) in values.iter().enumerate() {
                    let prefix = if index != 0 { ", " } else { "" };
                    write!(f, "{prefix}{value}")?;
                }
                write!(f, "]")
            }
            InputValue::Object(fields) => {
                write!(f, "{{")?;
                for (index, (name, value)) in fields.iter().enumerate() {
                    let prefix = if index != 0 { ", " } else { "" };
                    write!(f, "{prefix}{name}: {value}")?;
                }
                write!(f, "}}")
            }
        }
    }
}
