use derive_new::new;
use serde::{Deserialize, Serialize};
use snafu::ensure;
use surrealdb::sql::Thing;

use super::{InvalidFieldSnafu, Record, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum SortOrder {
    #[serde(rename = "asc")]
    Ascending,
    #[default]
    #[serde(rename = "desc")]
    Descending,
}

impl SortOrder {
    pub fn to_order(self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}

/// A value a [Filter] compares a field against.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FilterValue {
    Record(Thing),
    Text(String),
    Integer(i64),
    Boolean(bool),
}

impl<T> From<Record<T>> for FilterValue {
    fn from(value: Record<T>) -> Self {
        Self::Record(value.into_thing())
    }
}

impl<T> From<&Record<T>> for FilterValue {
    fn from(value: &Record<T>) -> Self {
        Self::Record(value.as_ref().clone())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

/// Equality between a field and a value.
#[derive(Debug, Clone, PartialEq, new)]
pub struct Filter {
    pub field: String,
    pub value: FilterValue,
}

/// Which records of a collection to list, and in which order.
///
/// # Example
///
/// ```ignore
/// let query = ListQuery::new()
///     .filter("video_id", &video)
///     .newest_first()
///     .limit(100);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
    pub filters: Vec<Filter>,
    pub order: Option<(String, SortOrder)>,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.filters.push(Filter::new(field.into(), value.into()));
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.order = Some((field.into(), order));
        self
    }

    /// Orders by `created_at`, most recent first.
    pub fn newest_first(self) -> Self {
        self.order_by("created_at", SortOrder::Descending)
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Renders two statements: the page of records, then the count of every matching record.
    ///
    /// Field names are spliced into the text so they are checked first; values are bound as
    /// `$f0`, `$f1`, ... (see [ListQuery::parameters]) together with `$table`, `$limit` and `$offset`.
    pub(super) fn to_sql(&self) -> Result<String> {
        let mut conditions = Vec::with_capacity(self.filters.len());
        for (index, filter) in self.filters.iter().enumerate() {
            conditions.push(format!("{} = $f{index}", field(&filter.field)?));
        }

        let condition = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };

        let order = match &self.order {
            Some((name, order)) => format!(" ORDER BY {} {}", field(name)?, order.to_order()),
            None => String::new(),
        };

        let limit = match self.limit {
            Some(_) => " LIMIT $limit",
            None => "",
        };

        Ok(format!(
            "SELECT * FROM type::table($table){condition}{order}{limit} START $offset;\
             SELECT count() AS total FROM type::table($table){condition} GROUP ALL;"
        ))
    }

    pub(super) fn parameters(&self) -> impl Iterator<Item = (String, &FilterValue)> + '_ {
        self.filters
            .iter()
            .enumerate()
            .map(|(index, filter)| (format!("f{index}"), &filter.value))
    }
}

/// One page of a listed collection.
#[derive(Debug, Clone, PartialEq, new)]
pub struct Page<T> {
    /// Every record matching the filters, regardless of limit and offset.
    pub total: u64,
    pub records: Vec<T>,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self::new(0, Vec::new())
    }
}

/// Checks that `name` can be spliced into a query as a field.
pub(super) fn field(name: &str) -> Result<&str> {
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    ensure!(valid, InvalidFieldSnafu { field: name });
    Ok(name)
}
