use crate::{
    codec::camel_to_snake,
    model::EntityKind,
    remote::Select,
    value::Value,
};

///
/// ListOptions
///
/// Server-side predicates for a list read. Field names are in application
/// convention and are encoded when the query is built.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ListOptions {
    pub search: Option<String>,
    pub status: Option<String>,
    pub filters: Vec<(String, Value)>,
    pub limit: Option<usize>,
}

impl ListOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Case-insensitive substring match over the family's search fields.
    #[must_use]
    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search = Some(text.into());
        self
    }

    /// Equality on the family's status field.
    #[must_use]
    pub fn status(mut self, status: impl ToString) -> Self {
        self.status = Some(status.to_string());
        self
    }

    #[must_use]
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push((field.into(), value.into()));
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Build the storage-convention query for `E`.
    ///
    /// Blank search text is ignored, as is a status on a family without a
    /// status field.
    #[must_use]
    pub fn to_select<E: EntityKind>(&self, default_limit: usize) -> Select {
        let mut select = Select::new();

        if let Some(needle) = self.search.as_deref().map(str::trim)
            && !needle.is_empty()
        {
            select = select.any_contains_ci(
                E::SEARCH_FIELDS.iter().map(|field| camel_to_snake(field)),
                needle,
            );
        }

        match (E::STATUS_FIELD, &self.status) {
            (Some(field), Some(status)) => select = select.eq(camel_to_snake(field), status.as_str()),
            (None, Some(status)) => {
                tracing::debug!(table = E::TABLE, %status, "status filter ignored");
            }
            _ => {}
        }

        for (field, value) in &self.filters {
            select = select.eq(camel_to_snake(field), value.clone());
        }

        for key in E::DEFAULT_ORDER {
            select = select.order_by(camel_to_snake(key.field), key.direction);
        }

        select.limit(self.limit.unwrap_or(default_limit))
    }
}
