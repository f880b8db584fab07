//! Query Options
//!
//! Projection, filtering and ordering for a single request, rendered as
//! the query string of a Web API call.

use crate::filters::{Filter, FilterSet};
use crate::sorts::{SortCriterion, SortOrder};

/// `$select`, `$filter` and `$orderby` for one request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    select: Vec<String>,
    filters: FilterSet,
    order: SortOrder,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add attributes to the projection
    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Add a filter condition
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.add(filter);
        self
    }

    /// Add a sort criterion
    pub fn order_by(mut self, criterion: SortCriterion) -> Self {
        self.order.add(criterion);
        self
    }

    pub fn filters(&self) -> &FilterSet {
        &self.filters
    }

    pub fn order(&self) -> &SortOrder {
        &self.order
    }

    /// Render as `?$select=...&$filter=...&$orderby=...`
    ///
    /// Empty parts are left out; no options at all renders as "".
    pub fn to_query_string(&self) -> String {
        let mut parts = Vec::new();

        if !self.select.is_empty() {
            parts.push(format!("$select={}", self.select.join(",")));
        }
        if !self.filters.is_empty() {
            parts.push(format!("$filter={}", self.filters.to_odata()));
        }
        if !self.order.is_empty() {
            parts.push(format!("$orderby={}", self.order.to_odata()));
        }

        if parts.is_empty() {
            String::new()
        } else {
            format!("?{}", parts.join("&"))
        }
    }

    /// Keep only the selected attributes of a record
    ///
    /// Instance annotations of a selected attribute (`attr@...`) are kept
    /// with it. Without a projection the record is returned unchanged.
    pub fn project(
        &self,
        record: &serde_json::Map<String, serde_json::Value>,
    ) -> serde_json::Map<String, serde_json::Value> {
        if self.select.is_empty() {
            return record.clone();
        }

        record
            .iter()
            .filter(|(key, _)| {
                let attribute = key.split('@').next().unwrap_or(key);
                self.select.iter().any(|s| s == attribute)
            })
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}
