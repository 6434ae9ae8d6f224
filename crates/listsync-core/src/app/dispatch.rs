//! ListClient - list store への単発リクエストと batch 送信
//!
//! # フロー（send）
//! 1. WriteOp → HttpRequest（URL, Accept, IF-MATCH, X-HTTP-Method）
//! 2. RetryPolicy で transient な失敗だけ再試行
//! 3. update の 412 は conflict resolver へ
//! 4. それ以外は WriteOutcome → ListStoreError に変換

use std::sync::Arc;

use crate::codec::{self, odata};
use crate::domain::{
    BatchResult, ETag, ErrorCategory, ListStoreError, OperationKind, TransportError, WriteOp,
    WriteOutcome, WriteSuccess,
};
use crate::ports::{HttpMethod, HttpRequest, HttpResponse, IdGenerator, Transport};

use super::conflict;
use super::retry::RetryPolicy;

const ODATA_JSON: &str = "application/json;odata=nometadata";

/// URL and header conventions of the remote list store.
#[derive(Debug, Clone, PartialEq)]
pub struct ListEndpoint {
    base_url: String,
    bearer_token: Option<String>,
}

impl ListEndpoint {
    pub fn new(base_url: impl Into<String>, bearer_token: Option<String>) -> Self {
        let base_url = base_url.into().trim().trim_end_matches('/').to_string();
        Self {
            base_url,
            bearer_token,
        }
    }

    fn list_url(&self, list: &str) -> String {
        // Titles are quoted OData string literals: a single quote is doubled.
        format!(
            "{}/_api/web/lists/getbytitle('{}')",
            self.base_url,
            list.replace('\'', "''")
        )
    }

    pub fn items_url(&self, list: &str) -> String {
        format!("{}/items", self.list_url(list))
    }

    pub fn item_url(&self, list: &str, item_id: u64) -> String {
        format!("{}/items({item_id})", self.list_url(list))
    }

    pub fn batch_url(&self) -> String {
        format!("{}/_api/$batch", self.base_url)
    }

    /// Request for one operation, without credentials.
    pub fn build(&self, op: &WriteOp) -> Result<HttpRequest, ListStoreError> {
        let item_url = |op: &WriteOp| {
            op.item_id
                .map(|id| self.item_url(&op.list, id))
                .ok_or_else(|| {
                    ListStoreError::InvalidRequest(format!(
                        "{:?} on list '{}' needs an item id",
                        op.kind, op.list
                    ))
                })
        };
        let payload = || {
            op.payload
                .as_ref()
                .map(|p| p.to_string())
                .unwrap_or_else(|| "{}".to_string())
        };
        let if_match = || {
            op.etag
                .as_ref()
                .map(ETag::as_header_value)
                .unwrap_or("*")
                .to_string()
        };

        let method_override = op.kind.method_override().unwrap_or_default();
        let request = match op.kind {
            OperationKind::Read => {
                let mut url = item_url(op)?;
                if !op.select.is_empty() {
                    url.push_str("?$select=");
                    url.push_str(&op.select.join(","));
                }
                HttpRequest::new(HttpMethod::Get, url).header("Accept", ODATA_JSON)
            }
            OperationKind::Create => {
                HttpRequest::new(HttpMethod::Post, self.items_url(&op.list))
                    .header("Accept", ODATA_JSON)
                    .header("Content-Type", ODATA_JSON)
                    .body(payload())
            }
            OperationKind::Update => HttpRequest::new(HttpMethod::Post, item_url(op)?)
                .header("Accept", ODATA_JSON)
                .header("Content-Type", ODATA_JSON)
                .header("X-HTTP-Method", method_override)
                .header("IF-MATCH", if_match())
                .body(payload()),
            OperationKind::Delete => HttpRequest::new(HttpMethod::Post, item_url(op)?)
                .header("Accept", ODATA_JSON)
                .header("X-HTTP-Method", method_override)
                .header("IF-MATCH", if_match()),
        };
        Ok(request)
    }

    pub fn authorize(&self, request: HttpRequest) -> HttpRequest {
        match &self.bearer_token {
            Some(token) => request.header("Authorization", format!("Bearer {token}")),
            None => request,
        }
    }
}

/// Client for one list store site.
#[derive(Clone)]
pub struct ListClient {
    endpoint: ListEndpoint,
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
    ids: Arc<dyn IdGenerator>,
}

impl ListClient {
    pub fn new(
        endpoint: ListEndpoint,
        transport: Arc<dyn Transport>,
        policy: RetryPolicy,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            endpoint,
            transport,
            policy,
            ids,
        }
    }

    pub fn endpoint(&self) -> &ListEndpoint {
        &self.endpoint
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Exactly one network call, no retry, no conflict recovery.
    pub async fn dispatch(&self, op: &WriteOp) -> Result<WriteOutcome, ListStoreError> {
        let request = self.endpoint.authorize(self.endpoint.build(op)?);
        self.dispatch_request(request)
            .await
            .map_err(|source| ListStoreError::Network {
                attempts: 1,
                source,
            })
    }

    async fn dispatch_request(&self, request: HttpRequest) -> Result<WriteOutcome, TransportError> {
        let method = request.method.as_str();
        let url = request.url.clone();
        let response = self.transport.send(request).await?;
        tracing::debug!(method, %url, status = response.status, "list store responded");
        Ok(interpret(response))
    }

    /// `dispatch` under the retry policy. Returns the final outcome and the
    /// number of attempts it took.
    pub(crate) async fn execute(&self, op: &WriteOp) -> Result<(WriteOutcome, u32), ListStoreError> {
        let request = self.endpoint.authorize(self.endpoint.build(op)?);
        let label = format!("{:?} {}", op.kind, op.list);
        let attempted = self
            .policy
            .run(&label, |_| self.dispatch_request(request.clone()))
            .await;
        match attempted.result {
            Ok(outcome) => Ok((outcome, attempted.attempts)),
            Err(source) => Err(ListStoreError::Network {
                attempts: attempted.attempts,
                source,
            }),
        }
    }

    /// Retry transient failures, recover a stale token on update once, and
    /// surface everything else as a typed error.
    pub async fn send(&self, op: &WriteOp) -> Result<WriteSuccess, ListStoreError> {
        let (outcome, attempts) = self.execute(op).await?;
        if op.kind == OperationKind::Update && outcome.is_stale_token() {
            return conflict::resolve_stale_token(self, op).await;
        }
        outcome.into_result(&op.list, op.item_id, attempts)
    }

    pub async fn create(
        &self,
        list: &str,
        payload: serde_json::Value,
    ) -> Result<WriteSuccess, ListStoreError> {
        self.send(&WriteOp::create(list, payload)).await
    }

    pub async fn get_item(&self, list: &str, item_id: u64) -> Result<WriteSuccess, ListStoreError> {
        self.send(&WriteOp::read(list, item_id)).await
    }

    pub async fn update(
        &self,
        list: &str,
        item_id: u64,
        payload: serde_json::Value,
        etag: Option<ETag>,
    ) -> Result<WriteSuccess, ListStoreError> {
        self.send(&WriteOp::update(list, item_id, payload, etag)).await
    }

    pub async fn delete(
        &self,
        list: &str,
        item_id: u64,
        etag: Option<ETag>,
    ) -> Result<WriteSuccess, ListStoreError> {
        self.send(&WriteOp::delete(list, item_id, etag)).await
    }

    /// Submit writes as one `$batch` and classify every item.
    ///
    /// Never fails as a whole: transport errors, non-2xx batch statuses and
    /// unparseable responses mark every item failed.
    pub async fn submit_batch(&self, ops: &[WriteOp]) -> BatchResult {
        let total = ops.len();
        if total == 0 {
            return BatchResult::empty();
        }

        let encoded = ops
            .iter()
            .map(|op| {
                if op.kind.is_write() {
                    self.endpoint.build(op)
                } else {
                    Err(ListStoreError::InvalidRequest(format!(
                        "read of list '{}' cannot be batched",
                        op.list
                    )))
                }
            })
            .collect::<Result<Vec<_>, _>>()
            .and_then(|requests| codec::encode_batch(self.ids.generate_batch_id(), &requests));
        let encoded = match encoded {
            Ok(encoded) => encoded,
            Err(error) => {
                tracing::error!(%error, total, "cannot encode batch");
                return BatchResult::all_failed(total, ErrorCategory::Hard, None, &error.to_string());
            }
        };

        let request = self.endpoint.authorize(
            HttpRequest::new(HttpMethod::Post, self.endpoint.batch_url())
                .header("Content-Type", encoded.content_type())
                .header("Accept", "multipart/mixed")
                .body(encoded.body),
        );
        tracing::debug!(boundary = %encoded.boundary, total, "submitting batch");

        let attempted = self
            .policy
            .run("batch", |_| self.transport.send(request.clone()))
            .await;

        match attempted.result {
            Err(error) => {
                tracing::warn!(%error, attempts = attempted.attempts, total, "batch transport failed");
                BatchResult::all_failed(total, ErrorCategory::Network, None, &error.to_string())
            }
            Ok(response) if !response.is_success() => {
                tracing::warn!(status = response.status, total, "batch rejected");
                BatchResult::all_failed(
                    total,
                    ErrorCategory::of_status(response.status),
                    Some(response.status),
                    &response.status_text,
                )
            }
            Ok(response) => match codec::decode_batch_response(&response.body, total) {
                Ok(items) => BatchResult::from_items(total, &items),
                Err(error) => {
                    tracing::error!(%error, total, "batch response unreadable, failing every item");
                    BatchResult::all_failed(
                        total,
                        ErrorCategory::Malformed,
                        Some(response.status),
                        &error.to_string(),
                    )
                }
            },
        }
    }
}

/// Turn a raw response into the outcome of one dispatch.
fn interpret(response: HttpResponse) -> WriteOutcome {
    let status = response.status;
    let data = if response.is_success() && !response.body.trim().is_empty() {
        match serde_json::from_str::<serde_json::Value>(&response.body) {
            Ok(value) => Some(value),
            Err(error) => {
                tracing::warn!(status, %error, "success body is not JSON");
                None
            }
        }
    } else {
        None
    };

    let etag = response
        .header_value("ETag")
        .and_then(ETag::parse)
        .or_else(|| data.as_ref().and_then(odata::etag_from_body));

    let body = (!response.body.is_empty()).then(|| response.body.clone());
    let message = || {
        odata::error_message(&response.body)
            .or_else(|| {
                let raw = response.body.trim();
                (!raw.is_empty()).then(|| raw.chars().take(200).collect())
            })
            .or_else(|| (!response.status_text.is_empty()).then(|| response.status_text.clone()))
            .unwrap_or_else(|| format!("HTTP {status}"))
    };

    WriteOutcome::from_status(status, data, etag, message, body)
}
