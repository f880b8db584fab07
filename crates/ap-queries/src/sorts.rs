//! Query Sort Orders
//!
//! Sort orders define how query results should be ordered.

use std::cmp::Ordering;

use chrono::DateTime;
use serde_json::Value;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    /// Ascending order (A-Z, 1-9, oldest first)
    #[default]
    Asc,
    /// Descending order (Z-A, 9-1, newest first)
    Desc,
}

impl SortDirection {
    /// Convert to string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// A single sort criterion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortCriterion {
    /// The attribute to sort by
    pub attribute: String,
    /// The sort direction
    pub direction: SortDirection,
}

impl SortCriterion {
    /// Create a new sort criterion
    pub fn new(attribute: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            attribute: attribute.into(),
            direction,
        }
    }

    /// Create ascending sort
    pub fn asc(attribute: impl Into<String>) -> Self {
        Self::new(attribute, SortDirection::Asc)
    }

    /// Create descending sort
    pub fn desc(attribute: impl Into<String>) -> Self {
        Self::new(attribute, SortDirection::Desc)
    }

    /// Render as an `$orderby` item
    pub fn to_odata(&self) -> String {
        format!("{} {}", self.attribute, self.direction.as_str())
    }
}

/// Collection of sort criteria
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortOrder {
    criteria: Vec<SortCriterion>,
}

impl SortOrder {
    /// Create a new empty sort order
    pub fn new() -> Self {
        Self { criteria: vec![] }
    }

    /// Add a sort criterion
    pub fn add(&mut self, criterion: SortCriterion) -> &mut Self {
        self.criteria.push(criterion);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    pub fn criteria(&self) -> &[SortCriterion] {
        &self.criteria
    }

    /// Render as an `$orderby` expression
    pub fn to_odata(&self) -> String {
        self.criteria
            .iter()
            .map(SortCriterion::to_odata)
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Compare two records by these criteria
    ///
    /// Missing values sort before present ones in ascending order.
    pub fn compare(
        &self,
        a: &serde_json::Map<String, Value>,
        b: &serde_json::Map<String, Value>,
    ) -> Ordering {
        for criterion in &self.criteria {
            let ordering = compare_values(a.get(&criterion.attribute), b.get(&criterion.attribute));
            let ordering = match criterion.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::String(a)), Some(Value::String(b))) => {
            // Timestamps compare as instants whatever their fractional precision
            match (DateTime::parse_from_rfc3339(a), DateTime::parse_from_rfc3339(b)) {
                (Ok(a), Ok(b)) => a.cmp(&b),
                _ => a.cmp(b),
            }
        }
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), Some(_)) => Ordering::Less,
        (Some(_), None | Some(Value::Null)) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}
