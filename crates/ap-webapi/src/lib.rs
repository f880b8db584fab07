//! # ap-webapi
//!
//! Access to the remote record-storage Web API.
//!
//! ## Features
//!
//! - `WebApi` trait: query, create, point lookup and delete by entity name
//! - `HttpWebApi`: OData v4 client over HTTPS
//! - `MemoryWebApi`: in-process backend with failure injection, for tests
//!   and offline hosts
//!
//! ## Example
//!
//! ```rust,ignore
//! use ap_queries::QueryOptions;
//! use ap_webapi::{HttpWebApi, WebApi};
//!
//! let api = HttpWebApi::new("https://org.crm.dynamics.com/api/data/v9.2")?
//!     .with_access_token(token);
//! let notes = api
//!     .retrieve_multiple("annotation", &QueryOptions::new().select(["subject"]))
//!     .await?;
//! ```

pub mod client;
pub mod error;
pub mod memory;

use async_trait::async_trait;
use ap_queries::QueryOptions;
use serde::{Deserialize, Serialize};

pub use client::HttpWebApi;
pub use error::{WebApiError, WebApiResult};
pub use memory::{MemoryWebApi, Operation};

/// A raw record as returned by the Web API
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Annotation suffix carrying a display-formatted value
pub const FORMATTED_VALUE_SUFFIX: &str = "@OData.Community.Display.V1.FormattedValue";

/// Reference to a newly created record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityReference {
    pub entity_name: String,
    pub id: String,
}

/// Entity set name for an entity logical name
pub fn entity_set_name(entity_name: &str) -> String {
    format!("{}s", entity_name)
}

/// Record-storage API - unified interface for Web API backends
#[async_trait]
pub trait WebApi: Send + Sync {
    /// Query records of an entity type
    async fn retrieve_multiple(
        &self,
        entity_name: &str,
        query: &QueryOptions,
    ) -> WebApiResult<Vec<Record>>;

    /// Create a record and return its identifier
    async fn create(&self, entity_name: &str, fields: Record) -> WebApiResult<EntityReference>;

    /// Fetch one record by identifier
    async fn retrieve(
        &self,
        entity_name: &str,
        id: &str,
        query: &QueryOptions,
    ) -> WebApiResult<Record>;

    /// Delete one record by identifier
    async fn delete(&self, entity_name: &str, id: &str) -> WebApiResult<()>;

    /// Backend name for logging
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_set_name() {
        assert_eq!(entity_set_name("annotation"), "annotations");
        assert_eq!(entity_set_name("account"), "accounts");
    }
}
