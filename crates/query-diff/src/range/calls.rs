use crate::query::{Argument, InputValue};

/// Arguments owned by the range rather than by the storage key of a connection.
pub const RANGE_ARGUMENTS: [&str; 5] = ["first", "last", "after", "before", "find"];

/// The window of a connection requested by a field, derived from its pagination arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RangeCalls {
    First { count: usize, after: Option<String> },
    Last { count: usize, before: Option<String> },
    /// A single edge, looked up by the id of its node.
    Find(String),
    /// No pagination argument at all: the whole connection.
    All,
}

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum RangeCallsError {
    #[error("'{first}' and '{second}' cannot be used together on a connection")]
    Conflicting { first: &'static str, second: &'static str },
    #[error("'{argument}' must be a non-negative integer")]
    InvalidCount { argument: &'static str },
    #[error("'{argument}' must be a string")]
    InvalidCursor { argument: &'static str },
    #[error("'{argument}' requires a count")]
    MissingCount { argument: &'static str },
}

#[derive(Default)]
struct PaginationArguments<'a> {
    first: Option<&'a InputValue>,
    last: Option<&'a InputValue>,
    after: Option<&'a InputValue>,
    before: Option<&'a InputValue>,
    find: Option<&'a InputValue>,
}

impl RangeCalls {
    pub fn from_arguments(arguments: &[Argument]) -> Result<Self, RangeCallsError> {
        let mut pagination = PaginationArguments::default();

        for argument in arguments {
            if argument.value == InputValue::Null {
                continue;
            }

            let slot = match argument.name.as_str() {
                "first" => &mut pagination.first,
                "last" => &mut pagination.last,
                "after" => &mut pagination.after,
                "before" => &mut pagination.before,
                "find" => &mut pagination.find,
                _ => continue,
            };
            *slot = Some(&argument.value);
        }

        if let Some(find) = pagination.find {
            let present = [
                ("first", pagination.first),
                ("last", pagination.last),
                ("after", pagination.after),
                ("before", pagination.before),
            ];
            if let Some((other, _)) = present.into_iter().find(|(_, value)| value.is_some()) {
                return Err(RangeCallsError::Conflicting {
                    first: "find",
                    second: other,
                });
            }

            let id = match find {
                InputValue::String(id) => id.clone(),
                InputValue::Int(id) => id.to_string(),
                _ => return Err(RangeCallsError::InvalidCursor { argument: "find" }),
            };
            return Ok(RangeCalls::Find(id));
        }

        match (pagination.first, pagination.last) {
            (Some(_), Some(_)) => Err(RangeCallsError::Conflicting {
                first: "first",
                second: "last",
            }),
            (Some(first), None) => {
                if pagination.before.is_some() {
                    return Err(RangeCallsError::Conflicting {
                        first: "first",
                        second: "before",
                    });
                }
                Ok(RangeCalls::First {
                    count: count(first, "first")?,
                    after: cursor(pagination.after, "after")?,
                })
            }
            (None, Some(last)) => {
                if pagination.after.is_some() {
                    return Err(RangeCallsError::Conflicting {
                        first: "last",
                        second: "after",
                    });
                }
                Ok(RangeCalls::Last {
                    count: count(last, "last")?,
                    before: cursor(pagination.before, "before")?,
                })
            }
            (None, None) => {
                if pagination.after.is_some() {
                    Err(RangeCallsError::MissingCount { argument: "after" })
                } else if pagination.before.is_some() {
                    Err(RangeCallsError::MissingCount { argument: "before" })
                } else {
                    Ok(RangeCalls::All)
                }
            }
        }
    }

    /// Pagination arguments selecting this window, sorted by name.
    pub fn to_arguments(&self) -> Vec<Argument> {
        let argument = |name: &str, value: InputValue| Argument {
            name: name.to_string(),
            value,
        };

        match self {
            RangeCalls::First { count, after } => after
                .iter()
                .map(|after| argument("after", InputValue::String(after.clone())))
                .chain(std::iter::once(argument("first", count_value(*count))))
                .collect(),
            RangeCalls::Last { count, before } => before
                .iter()
                .map(|before| argument("before", InputValue::String(before.clone())))
                .chain(std::iter::once(argument("last", count_value(*count))))
                .collect(),
            RangeCalls::Find(id) => vec![argument("find", InputValue::String(id.clone()))],
            RangeCalls::All => Vec::new(),
        }
    }

    pub fn count(&self) -> Option<usize> {
        match self {
            RangeCalls::First { count, .. } | RangeCalls::Last { count, .. } => Some(*count),
            RangeCalls::Find(_) | RangeCalls::All => None,
        }
    }
}

fn count(value: &InputValue, argument: &'static str) -> Result<usize, RangeCallsError> {
    match value {
        InputValue::Int(count) => usize::try_from(*count).ok(),
        InputValue::String(count) => count.parse::<i64>().ok().and_then(|count| usize::try_from(count).ok()),
        _ => None,
    }
    .ok_or(RangeCallsError::InvalidCount { argument })
}

fn count_value(count: usize) -> InputValue {
    InputValue::Int(i64::try_from(count).unwrap_or(i64::MAX))
}

fn cursor(value: Option<&InputValue>, argument: &'static str) -> Result<Option<String>, RangeCallsError> {
    match value {
        None => Ok(None),
        Some(InputValue::String(cursor)) => Ok(Some(cursor.clone())),
        Some(_) => Err(RangeCallsError::InvalidCursor { argument }),
    }
}
