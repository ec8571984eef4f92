//! Search, filter, sort and pagination shared by the module, story and
//! feature tables.
//!
//! Each stage is also exposed on its own ([`filter`], [`search`],
//! [`sort`], [`paginate`]) so views can compose them; [`Query::run`] applies
//! all four in order.

mod fields;

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use fields::*;

use crate::models::EntityKind;

/// Filter value meaning "do not filter on this field".
pub const ALL: &str = "all";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("{entity} has no field named '{field}'")]
    UnknownField { entity: EntityKind, field: String },

    #[error("invalid filter '{0}': expected field=value")]
    InvalidFilter(String),

    #[error("invalid sort '{0}': expected field or field:asc|desc")]
    InvalidSort(String),

    #[error("page size must be at least 1")]
    InvalidPageSize,
}

// ============================================================
// Descriptor
// ============================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FilterValue {
    All,
    Is(String),
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self {
        if s == ALL {
            Self::All
        } else {
            Self::Is(s)
        }
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<FilterValue> for String {
    fn from(v: FilterValue) -> Self {
        match v {
            FilterValue::All => ALL.to_string(),
            FilterValue::Is(s) => s,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub value: FilterValue,
}

impl Filter {
    pub fn new(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}

impl FromStr for Filter {
    type Err = QueryError;

    /// Parses `field=value`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('=') {
            Some((field, value)) if !field.trim().is_empty() => {
                Ok(Self::new(field.trim(), value.trim()))
            }
            _ => Err(QueryError::InvalidFilter(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    pub field: String,
    #[serde(default)]
    pub direction: SortDirection,
}

impl Sort {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

impl FromStr for Sort {
    type Err = QueryError;

    /// Parses `field`, `field:asc` or `field:desc`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (field, direction) = match s.split_once(':') {
            Some((field, "asc")) => (field, SortDirection::Asc),
            Some((field, "desc")) => (field, SortDirection::Desc),
            Some(_) => return Err(QueryError::InvalidSort(s.to_string())),
            None => (s, SortDirection::Asc),
        };
        if field.trim().is_empty() {
            return Err(QueryError::InvalidSort(s.to_string()));
        }
        Ok(Self {
            field: field.trim().to_string(),
            direction,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageSize {
    #[default]
    Unbounded,
    Limited(usize),
}

/// A 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub index: usize,
    pub size: PageSize,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            index: 1,
            size: PageSize::Unbounded,
        }
    }
}

/// Everything a table view asks of the query engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Query {
    pub search: String,
    pub filters: Vec<Filter>,
    pub sort: Option<Sort>,
    pub page: Page,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search = text.into();
        self
    }

    pub fn filter(mut self, field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.filters.push(Filter::new(field, value));
        self
    }

    pub fn sort(mut self, sort: Sort) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn page(mut self, index: usize, size: PageSize) -> Self {
        self.page = Page { index, size };
        self
    }

    /// Filter, search, sort, then slice out the requested page.
    pub fn run<'a, T: Queryable>(&self, items: &'a [T]) -> Result<QueryPage<'a, T>, QueryError> {
        let matched = filter(items, &self.filters)?;
        let matched = search(matched, &self.search);
        let matched = match &self.sort {
            Some(s) => sort(matched, s)?,
            None => matched,
        };

        let total_matches = matched.len();
        let page_count = page_count(total_matches, self.page.size)?;
        let items = paginate(matched, self.page)?;

        Ok(QueryPage {
            items,
            total_matches,
            page_count,
        })
    }
}

/// One page of query results.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPage<'a, T> {
    pub items: Vec<&'a T>,
    /// Matches across all pages.
    pub total_matches: usize,
    pub page_count: usize,
}

// ============================================================
// Stages
// ============================================================

/// Keep items whose field equals every non-`All` filter value exactly.
pub fn filter<'a, T: Queryable>(
    items: impl IntoIterator<Item = &'a T>,
    filters: &[Filter],
) -> Result<Vec<&'a T>, QueryError> {
    let active = filters
        .iter()
        .filter_map(|f| match &f.value {
            FilterValue::All => None,
            FilterValue::Is(value) => Some(resolve::<T>(&f.field).map(|field| (field, value))),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(items
        .into_iter()
        .filter(|item| {
            active
                .iter()
                .all(|(field, value)| item.field(field).as_filter_string() == **value)
        })
        .collect())
}

/// Keep items where the search text occurs, case-insensitively, in one of
/// the entity's search fields. Only empty text keeps everything; whitespace
/// is part of the needle.
pub fn search<'a, T: Queryable>(items: impl IntoIterator<Item = &'a T>, text: &str) -> Vec<&'a T> {
    if text.is_empty() {
        return items.into_iter().collect();
    }
    let needle = text.to_lowercase();
    items
        .into_iter()
        .filter(|item| item.matches_search(&needle))
        .collect()
}

/// Stable sort by one field. `Desc` reverses the comparison, so equal keys
/// keep their input order in both directions.
pub fn sort<'a, T: Queryable>(items: Vec<&'a T>, by: &Sort) -> Result<Vec<&'a T>, QueryError> {
    let field = resolve::<T>(&by.field)?;

    let mut keyed: Vec<(FieldValue, &'a T)> =
        items.into_iter().map(|item| (item.field(field), item)).collect();
    keyed.sort_by(|(a, _), (b, _)| match by.direction {
        SortDirection::Asc => a.compare(b),
        SortDirection::Desc => b.compare(a),
    });

    Ok(keyed.into_iter().map(|(_, item)| item).collect())
}

/// Slice out a 1-based page. Out-of-range pages (including 0) are empty.
pub fn paginate<T>(items: Vec<T>, page: Page) -> Result<Vec<T>, QueryError> {
    match page.size {
        PageSize::Unbounded => Ok(items),
        PageSize::Limited(0) => Err(QueryError::InvalidPageSize),
        PageSize::Limited(size) => {
            if page.index == 0 {
                return Ok(Vec::new());
            }
            let start = (page.index - 1).saturating_mul(size);
            Ok(items.into_iter().skip(start).take(size).collect())
        }
    }
}

fn page_count(total: usize, size: PageSize) -> Result<usize, QueryError> {
    match size {
        PageSize::Unbounded => Ok(usize::from(total > 0)),
        PageSize::Limited(0) => Err(QueryError::InvalidPageSize),
        PageSize::Limited(size) => Ok(total.div_ceil(size)),
    }
}

fn resolve<T: Queryable>(name: &str) -> Result<&'static str, QueryError> {
    canonical_field::<T>(name).ok_or_else(|| QueryError::UnknownField {
        entity: T::KIND,
        field: name.to_string(),
    })
}
