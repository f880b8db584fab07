//! HTTP Web API client
//!
//! Speaks OData v4 against a service root such as
//! `https://org.crm.dynamics.com/api/data/v9.2`.

use async_trait::async_trait;
use ap_queries::QueryOptions;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::{entity_set_name, EntityReference, Record, WebApi, WebApiError, WebApiResult};

/// Header carrying the URL of a record created with `204 No Content`
const ENTITY_ID_HEADER: &str = "OData-EntityId";

/// Ask the server to include display-formatted values
const PREFER_FORMATTED_VALUES: &str =
    "odata.include-annotations=\"OData.Community.Display.V1.FormattedValue\"";

#[derive(Debug, Deserialize)]
struct CollectionResponse {
    value: Vec<Record>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Async HTTP implementation of `WebApi`
pub struct HttpWebApi {
    base_url: String,
    client: Client,
    access_token: Option<String>,
}

impl HttpWebApi {
    pub fn new(base_url: &str) -> WebApiResult<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();
        Url::parse(&base_url)
            .map_err(|e| WebApiError::InvalidBaseUrl(format!("{base_url}: {e}")))?;

        Ok(Self {
            base_url,
            client: Client::new(),
            access_token: None,
        })
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn with_headers(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = builder
            .header("Accept", "application/json")
            .header("OData-MaxVersion", "4.0")
            .header("OData-Version", "4.0")
            .header("Prefer", PREFER_FORMATTED_VALUES);
        match &self.access_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn collection_url(&self, entity_name: &str) -> String {
        format!("{}/{}", self.base_url, entity_set_name(entity_name))
    }

    fn record_url(&self, entity_name: &str, id: &str) -> String {
        format!("{}/{}({})", self.base_url, entity_set_name(entity_name), id)
    }

    async fn send(&self, builder: RequestBuilder) -> WebApiResult<Response> {
        let resp = self
            .with_headers(builder)
            .send()
            .await
            .map_err(|e| WebApiError::Transport(e.to_string()))?;

        if resp.status().is_success() {
            Ok(resp)
        } else {
            Err(parse_error(resp).await)
        }
    }
}

#[async_trait]
impl WebApi for HttpWebApi {
    #[instrument(skip(self, query), fields(webapi = "http"))]
    async fn retrieve_multiple(
        &self,
        entity_name: &str,
        query: &QueryOptions,
    ) -> WebApiResult<Vec<Record>> {
        let url = format!(
            "{}{}",
            self.collection_url(entity_name),
            query.to_query_string()
        );
        let resp = self.send(self.client.get(url)).await?;
        let body: CollectionResponse = resp
            .json()
            .await
            .map_err(|e| WebApiError::InvalidResponse(e.to_string()))?;

        debug!(count = body.value.len(), "Records retrieved");
        Ok(body.value)
    }

    #[instrument(skip(self, record), fields(webapi = "http"))]
    async fn create(&self, entity_name: &str, record: Record) -> WebApiResult<EntityReference> {
        let resp = self
            .send(self.client.post(self.collection_url(entity_name)).json(&record))
            .await?;

        let from_header = resp
            .headers()
            .get(ENTITY_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(id_from_entity_url);

        let id = match from_header {
            Some(id) => id,
            None => {
                // Servers honouring `return=representation` send the record instead
                let body = resp
                    .text()
                    .await
                    .map_err(|e| WebApiError::InvalidResponse(e.to_string()))?;
                id_from_body(entity_name, &body).ok_or(WebApiError::MissingEntityId)?
            }
        };

        debug!(id = %id, "Record created");
        Ok(EntityReference {
            entity_name: entity_name.to_string(),
            id,
        })
    }

    #[instrument(skip(self, query), fields(webapi = "http"))]
    async fn retrieve(
        &self,
        entity_name: &str,
        id: &str,
        query: &QueryOptions,
    ) -> WebApiResult<Record> {
        let url = format!(
            "{}{}",
            self.record_url(entity_name, id),
            query.to_query_string()
        );
        let resp = match self.send(self.client.get(url)).await {
            Ok(resp) => resp,
            Err(WebApiError::Status { status: 404, .. }) => {
                return Err(WebApiError::NotFound {
                    entity: entity_name.to_string(),
                    id: id.to_string(),
                })
            }
            Err(e) => return Err(e),
        };

        resp.json()
            .await
            .map_err(|e| WebApiError::InvalidResponse(e.to_string()))
    }

    #[instrument(skip(self), fields(webapi = "http"))]
    async fn delete(&self, entity_name: &str, id: &str) -> WebApiResult<()> {
        self.send(self.client.delete(self.record_url(entity_name, id)))
            .await?;
        debug!(id = %id, "Record deleted");
        Ok(())
    }

    fn name(&self) -> &str {
        "http"
    }
}

async fn parse_error(resp: Response) -> WebApiError {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();

    let message = match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(envelope) => envelope.error.message,
        Err(_) if body.trim().is_empty() => status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string(),
        Err(_) => body,
    };

    WebApiError::Status {
        status: status.as_u16(),
        message,
    }
}

/// Extract `id` from `.../entityset(id)`
fn id_from_entity_url(url: &str) -> Option<String> {
    let start = url.rfind('(')?;
    let end = start + url[start..].find(')')?;
    let id = &url[start + 1..end];
    (!id.is_empty()).then(|| id.to_string())
}

/// Extract the primary key (`<entity>id`) from a returned representation
fn id_from_body(entity_name: &str, body: &str) -> Option<String> {
    let record: Record = serde_json::from_str(body).ok()?;
    record
        .get(&format!("{}id", entity_name))
        .and_then(|v| v.as_str())
        .map(str::to_string)
}
