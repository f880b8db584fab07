//! # ap-queries
//!
//! Query options for the record-storage Web API.
//!
//! ## Structure
//!
//! - `filters` - `$filter` conditions and their operators
//! - `sorts` - `$orderby` criteria and directions
//! - `options` - projection, filters and sorts rendered as a query string
//!
//! ## Example
//!
//! ```
//! use ap_queries::{Filter, FilterValue, QueryOptions, SortCriterion};
//!
//! let query = QueryOptions::new()
//!     .select(["annotationid", "filename"])
//!     .filter(Filter::equals("isdocument", FilterValue::Bool(true)))
//!     .order_by(SortCriterion::desc("createdon"));
//!
//! assert_eq!(
//!     query.to_query_string(),
//!     "?$select=annotationid,filename&$filter=isdocument eq true&$orderby=createdon desc"
//! );
//! ```

pub mod filters;
pub mod options;
pub mod sorts;

pub use filters::{Filter, FilterOperator, FilterSet, FilterValue};
pub use options::QueryOptions;
pub use sorts::{SortCriterion, SortDirection, SortOrder};
