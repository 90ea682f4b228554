use crate::value::{TextMode, Value};
use derive_more::Display;

///
/// Direction
///

#[derive(Clone, Copy, Debug, Default, Display, Eq, PartialEq)]
pub enum Direction {
    #[default]
    #[display("asc")]
    Asc,
    #[display("desc")]
    Desc,
}

///
/// Filter
///
/// Server-side predicate over storage-convention columns.
///

#[derive(Clone, Debug, PartialEq)]
pub enum Filter {
    Eq { column: String, value: Value },

    /// Case-insensitive substring match on any of the columns.
    AnyContainsCi { columns: Vec<String>, needle: String },
}

impl Filter {
    /// Evaluate against a row; used by in-process backends.
    #[must_use]
    pub fn matches(&self, row: &super::Row) -> bool {
        match self {
            Self::Eq { column, value } => {
                let cell = row.get(column).cloned().map_or(Value::Null, Value::from);
                match (&cell, value) {
                    (Value::Null, Value::Null) => true,
                    (Value::Null, _) | (_, Value::Null) => false,
                    _ => cell.scalar_text() == value.scalar_text(),
                }
            }
            Self::AnyContainsCi { columns, needle } => columns.iter().any(|column| {
                row.get(column)
                    .cloned()
                    .map(Value::from)
                    .is_some_and(|cell| cell.text_contains(needle, TextMode::Ci))
            }),
        }
    }
}

///
/// Order
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Order {
    pub column: String,
    pub direction: Direction,
}

///
/// Select
///
/// Read request: predicates are conjunctive, ordering keys apply in
/// sequence, and ties fall back to ascending id.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Select {
    pub filters: Vec<Filter>,
    pub order: Vec<Order>,
    pub limit: Option<usize>,
}

impl Select {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq {
            column: column.into(),
            value: value.into(),
        });
        self
    }

    #[must_use]
    pub fn any_contains_ci<I, S>(mut self, columns: I, needle: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filters.push(Filter::AnyContainsCi {
            columns: columns.into_iter().map(Into::into).collect(),
            needle: needle.into(),
        });
        self
    }

    #[must_use]
    pub fn order_by(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.order.push(Order {
            column: column.into(),
            direction,
        });
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn matches(&self, row: &super::Row) -> bool {
        self.filters.iter().all(|filter| filter.matches(row))
    }
}
