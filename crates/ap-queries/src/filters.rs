//! Query Filters
//!
//! Each filter is one condition on a single attribute. A `FilterSet`
//! combines its filters with `and`.

use serde_json::Value;

/// Filter operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    /// Equals (eq)
    Equals,
    /// Not equals (ne)
    NotEquals,
}

impl FilterOperator {
    /// OData keyword
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equals => "eq",
            Self::NotEquals => "ne",
        }
    }
}

/// Filter value types
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// Quoted string literal
    String(String),
    /// Boolean literal
    Bool(bool),
    /// Integer literal
    Integer(i64),
    /// `null`
    Null,
}

impl FilterValue {
    /// Render as an OData literal; single quotes inside strings are doubled
    pub fn to_literal(&self) -> String {
        match self {
            Self::String(s) => format!("'{}'", s.replace('\'', "''")),
            Self::Bool(b) => b.to_string(),
            Self::Integer(i) => i.to_string(),
            Self::Null => "null".to_string(),
        }
    }

    /// Check whether a JSON value equals this literal
    ///
    /// String comparison is case-insensitive, matching how record
    /// identifiers compare on the server.
    pub fn matches(&self, value: Option<&Value>) -> bool {
        match (self, value) {
            (Self::Null, None) | (Self::Null, Some(Value::Null)) => true,
            (Self::String(expected), Some(Value::String(actual))) => {
                expected.eq_ignore_ascii_case(actual)
            }
            (Self::Bool(expected), Some(Value::Bool(actual))) => expected == actual,
            (Self::Integer(expected), Some(Value::Number(actual))) => {
                actual.as_i64() == Some(*expected)
            }
            _ => false,
        }
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<bool> for FilterValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// A single filter condition
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    /// The attribute being filtered (e.g., "_objectid_value")
    pub attribute: String,
    /// The operator to apply
    pub operator: FilterOperator,
    /// The value to compare against
    pub value: FilterValue,
}

impl Filter {
    /// Create a new filter
    pub fn new(attribute: impl Into<String>, operator: FilterOperator, value: FilterValue) -> Self {
        Self {
            attribute: attribute.into(),
            operator,
            value,
        }
    }

    /// Create an equals filter
    pub fn equals(attribute: impl Into<String>, value: FilterValue) -> Self {
        Self::new(attribute, FilterOperator::Equals, value)
    }

    /// Render as an OData condition
    pub fn to_odata(&self) -> String {
        format!(
            "{} {} {}",
            self.attribute,
            self.operator.as_str(),
            self.value.to_literal()
        )
    }

    /// Evaluate against a record
    pub fn matches(&self, record: &serde_json::Map<String, Value>) -> bool {
        let hit = self.value.matches(record.get(&self.attribute));
        match self.operator {
            FilterOperator::Equals => hit,
            FilterOperator::NotEquals => !hit,
        }
    }
}

/// A conjunction of filters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSet {
    filters: Vec<Filter>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a filter
    pub fn add(&mut self, filter: Filter) -> &mut Self {
        self.filters.push(filter);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Render as a `$filter` expression
    pub fn to_odata(&self) -> String {
        self.filters
            .iter()
            .map(Filter::to_odata)
            .collect::<Vec<_>>()
            .join(" and ")
    }

    /// True when every filter matches
    pub fn matches(&self, record: &serde_json::Map<String, Value>) -> bool {
        self.filters.iter().all(|f| f.matches(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> serde_json::Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_literal_rendering() {
        assert_eq!(FilterValue::from("abc").to_literal(), "'abc'");
        assert_eq!(FilterValue::from("O'Brien").to_literal(), "'O''Brien'");
        assert_eq!(FilterValue::Bool(true).to_literal(), "true");
        assert_eq!(FilterValue::Integer(5).to_literal(), "5");
        assert_eq!(FilterValue::Null.to_literal(), "null");
    }

    #[test]
    fn test_filter_set_rendering() {
        let mut set = FilterSet::new();
        set.add(Filter::equals("_objectid_value", "1234".into()))
            .add(Filter::equals("isdocument", true.into()));

        assert_eq!(
            set.to_odata(),
            "_objectid_value eq '1234' and isdocument eq true"
        );
    }

    #[test]
    fn test_filter_matching() {
        let rec = record(json!({
            "_objectid_value": "ABCD-1",
            "isdocument": true,
            "filesize": 10
        }));

        assert!(Filter::equals("_objectid_value", "abcd-1".into()).matches(&rec));
        assert!(Filter::equals("isdocument", true.into()).matches(&rec));
        assert!(Filter::equals("filesize", FilterValue::Integer(10)).matches(&rec));
        assert!(Filter::equals("subject", FilterValue::Null).matches(&rec));
        assert!(!Filter::equals("isdocument", false.into()).matches(&rec));
        assert!(Filter::new("isdocument", FilterOperator::NotEquals, false.into()).matches(&rec));
    }

    #[test]
    fn test_empty_set_matches_everything() {
        let set = FilterSet::new();
        assert!(set.is_empty());
        assert!(set.matches(&record(json!({}))));
    }
}
