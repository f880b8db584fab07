//! In-memory Web API
//!
//! Keeps records per entity in process and assigns the server-side fields a
//! real backend would (`<entity>id`, `createdon`, `_createdby_value`,
//! `filesize`, owner lookups from `@odata.bind`). Individual calls can be
//! made to fail for exercising error paths.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use ap_queries::QueryOptions;
use base64::Engine;
use chrono::{DateTime, Duration, SecondsFormat, SubsecRound, Utc};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::{EntityReference, Record, WebApi, WebApiError, WebApiResult, FORMATTED_VALUE_SUFFIX};

const BIND_SUFFIX: &str = "@odata.bind";

/// Web API operations, for call counting and failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    RetrieveMultiple,
    Create,
    Retrieve,
    Delete,
}

/// In-memory Web API for testing
pub struct MemoryWebApi {
    tables: RwLock<HashMap<String, Vec<Record>>>,
    calls: Mutex<HashMap<Operation, usize>>,
    failures: Mutex<HashSet<(Operation, usize)>>,
    last_created_on: Mutex<Option<DateTime<Utc>>>,
    current_user: String,
}

impl Default for MemoryWebApi {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryWebApi {
    pub fn new() -> Self {
        Self::with_user("System Administrator")
    }

    /// Create a backend whose records are attributed to `user`
    pub fn with_user(user: impl Into<String>) -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
            failures: Mutex::new(HashSet::new()),
            last_created_on: Mutex::new(None),
            current_user: user.into(),
        }
    }

    /// Insert a raw record as-is, bypassing server-side defaults
    pub async fn seed(&self, entity_name: &str, record: Record) {
        let mut tables = self.tables.write().await;
        tables.entry(entity_name.to_string()).or_default().push(record);
    }

    /// Snapshot of all records of an entity
    pub async fn records(&self, entity_name: &str) -> Vec<Record> {
        let tables = self.tables.read().await;
        tables.get(entity_name).cloned().unwrap_or_default()
    }

    /// Make the `call_number`-th call (1-based) of `operation` fail
    pub fn fail_on_call(&self, operation: Operation, call_number: usize) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.insert((operation, call_number));
        }
    }

    /// Make the next call of `operation` fail
    pub fn fail_next(&self, operation: Operation) {
        let next = self.call_count(operation) + 1;
        self.fail_on_call(operation, next);
    }

    /// Number of calls made so far for an operation
    pub fn call_count(&self, operation: Operation) -> usize {
        self.calls
            .lock()
            .map(|calls| calls.get(&operation).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Total number of calls across all operations
    pub fn total_calls(&self) -> usize {
        self.calls
            .lock()
            .map(|calls| calls.values().sum())
            .unwrap_or(0)
    }

    /// Count the call and fail it if a failure was injected for it
    fn record_call(&self, operation: Operation) -> WebApiResult<()> {
        let call_number = match self.calls.lock() {
            Ok(mut calls) => {
                let count = calls.entry(operation).or_insert(0);
                *count += 1;
                *count
            }
            Err(_) => return Err(WebApiError::Transport("call counter poisoned".to_string())),
        };

        let injected = self
            .failures
            .lock()
            .map(|mut failures| failures.remove(&(operation, call_number)))
            .unwrap_or(false);

        if injected {
            debug!(?operation, call_number, "Injected failure");
            return Err(WebApiError::Status {
                status: 503,
                message: format!("injected failure on {:?} call {}", operation, call_number),
            });
        }
        Ok(())
    }

    /// Next creation timestamp; strictly increasing at the stored
    /// millisecond precision so ordering is total
    fn next_created_on(&self) -> DateTime<Utc> {
        let now = Utc::now().trunc_subsecs(3);
        match self.last_created_on.lock() {
            Ok(mut last) => {
                let stamp = match *last {
                    Some(prev) if now <= prev => prev + Duration::milliseconds(1),
                    _ => now,
                };
                *last = Some(stamp);
                stamp
            }
            Err(_) => now,
        }
    }

    fn primary_key(entity_name: &str) -> String {
        format!("{}id", entity_name)
    }

    fn not_found(entity_name: &str, id: &str) -> WebApiError {
        WebApiError::NotFound {
            entity: entity_name.to_string(),
            id: id.to_string(),
        }
    }
}

/// Resolve `<lookup>_<entity>@odata.bind: /<set>(<id>)` into the lookup's
/// `_<lookup>_value` column and the owner's entity name in the matching
/// type code column (`objectid` -> `objecttypecode`)
fn resolve_binds(record: &mut Record) {
    let binds: Vec<(String, String)> = record
        .iter()
        .filter_map(|(key, value)| {
            let navigation = key.strip_suffix(BIND_SUFFIX)?;
            Some((navigation.to_string(), value.as_str()?.to_string()))
        })
        .collect();

    for (navigation, path) in binds {
        record.remove(&format!("{}{}", navigation, BIND_SUFFIX));

        let Some((lookup, owner_entity)) = navigation.split_once('_') else {
            continue;
        };
        let Some(owner_id) = path
            .rsplit_once('(')
            .and_then(|(_, rest)| rest.strip_suffix(')'))
        else {
            continue;
        };

        record.insert(format!("_{}_value", lookup), Value::from(owner_id));
        // `objectid` pairs with `objecttypecode`
        let type_field = lookup.strip_suffix("id").unwrap_or(lookup);
        record.insert(format!("{}typecode", type_field), Value::from(owner_entity));
    }
}

/// Decoded length of a base64 document body
fn document_size(record: &Record) -> Option<u64> {
    let body = record.get("documentbody")?.as_str()?;
    base64::engine::general_purpose::STANDARD
        .decode(body)
        .ok()
        .map(|bytes| bytes.len() as u64)
}

#[async_trait]
impl WebApi for MemoryWebApi {
    async fn retrieve_multiple(
        &self,
        entity_name: &str,
        query: &QueryOptions,
    ) -> WebApiResult<Vec<Record>> {
        self.record_call(Operation::RetrieveMultiple)?;

        let tables = self.tables.read().await;
        let mut matched: Vec<&Record> = tables
            .get(entity_name)
            .map(|records| records.iter().filter(|r| query.filters().matches(r)).collect())
            .unwrap_or_default();
        matched.sort_by(|a, b| query.order().compare(a, b));

        Ok(matched.into_iter().map(|r| query.project(r)).collect())
    }

    async fn create(&self, entity_name: &str, record: Record) -> WebApiResult<EntityReference> {
        self.record_call(Operation::Create)?;

        let id = Uuid::new_v4().to_string();
        let mut record = record;
        resolve_binds(&mut record);

        record.insert(Self::primary_key(entity_name), Value::from(id.clone()));
        record.insert(
            "createdon".to_string(),
            Value::from(
                self.next_created_on()
                    .to_rfc3339_opts(SecondsFormat::Millis, true),
            ),
        );
        record.insert(
            "_createdby_value".to_string(),
            Value::from(Uuid::new_v4().to_string()),
        );
        record.insert(
            format!("_createdby_value{}", FORMATTED_VALUE_SUFFIX),
            Value::from(self.current_user.clone()),
        );
        if let Some(size) = document_size(&record) {
            record.insert("filesize".to_string(), Value::from(size));
        }

        let mut tables = self.tables.write().await;
        tables.entry(entity_name.to_string()).or_default().push(record);

        debug!(entity = entity_name, id = %id, "Record created");
        Ok(EntityReference {
            entity_name: entity_name.to_string(),
            id,
        })
    }

    async fn retrieve(
        &self,
        entity_name: &str,
        id: &str,
        query: &QueryOptions,
    ) -> WebApiResult<Record> {
        self.record_call(Operation::Retrieve)?;

        let key = Self::primary_key(entity_name);
        let tables = self.tables.read().await;
        tables
            .get(entity_name)
            .and_then(|records| {
                records
                    .iter()
                    .find(|r| r.get(&key).and_then(Value::as_str) == Some(id))
            })
            .map(|r| query.project(r))
            .ok_or_else(|| Self::not_found(entity_name, id))
    }

    async fn delete(&self, entity_name: &str, id: &str) -> WebApiResult<()> {
        self.record_call(Operation::Delete)?;

        let key = Self::primary_key(entity_name);
        let mut tables = self.tables.write().await;
        let records = tables
            .get_mut(entity_name)
            .ok_or_else(|| Self::not_found(entity_name, id))?;

        let before = records.len();
        records.retain(|r| r.get(&key).and_then(Value::as_str) != Some(id));
        if records.len() == before {
            return Err(Self::not_found(entity_name, id));
        }

        debug!(entity = entity_name, id = %id, "Record deleted");
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ap_queries::{Filter, FilterValue, SortCriterion};
    use serde_json::json;

    fn fields(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_create_assigns_server_fields() {
        let api = MemoryWebApi::with_user("Fox Mulder");

        let created = api
            .create(
                "annotation",
                fields(json!({
                    "filename": "a.txt",
                    "documentbody": "aGVsbG8=",
                    "objectid_account@odata.bind": "/accounts(acc-1)"
                })),
            )
            .await
            .unwrap();

        let record = api
            .retrieve("annotation", &created.id, &QueryOptions::new())
            .await
            .unwrap();

        assert_eq!(record["annotationid"], created.id.as_str());
        assert_eq!(record["_objectid_value"], "acc-1");
        assert_eq!(record["objecttypecode"], "account");
        assert_eq!(record["filesize"], 5);
        assert_eq!(
            record[&format!("_createdby_value{}", FORMATTED_VALUE_SUFFIX)],
            "Fox Mulder"
        );
        assert!(record.get("objectid_account@odata.bind").is_none());
        assert!(record["createdon"].as_str().unwrap().ends_with('Z'));
    }

    #[tokio::test]
    async fn test_created_on_strictly_increases() {
        let api = MemoryWebApi::new();
        for _ in 0..5 {
            api.create("annotation", Record::new()).await.unwrap();
        }

        let stamps: Vec<String> = api
            .records("annotation")
            .await
            .iter()
            .map(|r| r["createdon"].as_str().unwrap().to_string())
            .collect();

        for pair in stamps.windows(2) {
            assert!(pair[0] < pair[1], "{} !< {}", pair[0], pair[1]);
        }
    }

    #[tokio::test]
    async fn test_back_to_back_creates_list_newest_first() {
        let api = MemoryWebApi::new();
        let first = api.create("annotation", Record::new()).await.unwrap();
        let second = api.create("annotation", Record::new()).await.unwrap();

        let query = QueryOptions::new()
            .select(["annotationid", "createdon"])
            .order_by(SortCriterion::desc("createdon"));
        let records = api.retrieve_multiple("annotation", &query).await.unwrap();

        assert_ne!(records[0]["createdon"], records[1]["createdon"]);
        let ids: Vec<&str> = records
            .iter()
            .map(|r| r["annotationid"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec![second.id.as_str(), first.id.as_str()]);
    }

    #[tokio::test]
    async fn test_retrieve_multiple_filters_sorts_and_projects() {
        let api = MemoryWebApi::new();
        api.seed(
            "annotation",
            fields(json!({ "annotationid": "1", "_objectid_value": "r1", "isdocument": true, "createdon": "2024-01-01T00:00:00.000Z", "notetext": "x" })),
        )
        .await;
        api.seed(
            "annotation",
            fields(json!({ "annotationid": "2", "_objectid_value": "r1", "isdocument": true, "createdon": "2024-03-01T00:00:00.000Z" })),
        )
        .await;
        api.seed(
            "annotation",
            fields(json!({ "annotationid": "3", "_objectid_value": "r1", "isdocument": false, "createdon": "2024-04-01T00:00:00.000Z" })),
        )
        .await;
        api.seed(
            "annotation",
            fields(json!({ "annotationid": "4", "_objectid_value": "r2", "isdocument": true, "createdon": "2024-05-01T00:00:00.000Z" })),
        )
        .await;

        let query = QueryOptions::new()
            .select(["annotationid"])
            .filter(Filter::equals("_objectid_value", FilterValue::from("r1")))
            .filter(Filter::equals("isdocument", FilterValue::Bool(true)))
            .order_by(SortCriterion::desc("createdon"));

        let records = api.retrieve_multiple("annotation", &query).await.unwrap();

        let ids: Vec<&str> = records
            .iter()
            .map(|r| r["annotationid"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["2", "1"]);
        assert!(records.iter().all(|r| r.len() == 1));
    }

    #[tokio::test]
    async fn test_unknown_entity_is_empty() {
        let api = MemoryWebApi::new();
        let records = api
            .retrieve_multiple("annotation", &QueryOptions::new())
            .await
            .unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_delete_and_not_found() {
        let api = MemoryWebApi::new();
        let created = api.create("annotation", Record::new()).await.unwrap();

        api.delete("annotation", &created.id).await.unwrap();
        assert!(api.records("annotation").await.is_empty());

        assert!(matches!(
            api.delete("annotation", &created.id).await,
            Err(WebApiError::NotFound { .. })
        ));
        assert!(matches!(
            api.retrieve("annotation", &created.id, &QueryOptions::new()).await,
            Err(WebApiError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let api = MemoryWebApi::new();
        api.fail_on_call(Operation::Create, 2);

        assert!(api.create("annotation", Record::new()).await.is_ok());
        assert!(matches!(
            api.create("annotation", Record::new()).await,
            Err(WebApiError::Status { status: 503, .. })
        ));
        assert!(api.create("annotation", Record::new()).await.is_ok());

        assert_eq!(api.call_count(Operation::Create), 3);
        assert_eq!(api.records("annotation").await.len(), 2);

        api.fail_next(Operation::RetrieveMultiple);
        assert!(api
            .retrieve_multiple("annotation", &QueryOptions::new())
            .await
            .is_err());
        assert_eq!(api.total_calls(), 4);
    }
}
