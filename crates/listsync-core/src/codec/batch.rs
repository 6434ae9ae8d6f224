//! `$batch` encoding and decoding.
//!
//! All writes of one batch travel in a single changeset. Each write is one
//! `application/http` part tagged `Content-ID: k`, where `k` (1-based) is its
//! position in the input. Responses are correlated back by that id, falling
//! back to part order when the store omits it.

use crate::domain::{BatchId, BatchItemResult, ItemDisposition, ListStoreError};
use crate::ports::transport::reason_phrase;
use crate::ports::{HttpMethod, HttpRequest, HttpResponse};

use super::multipart::{self, parse_http_parts, parse_request_line, parse_status_line};
use super::odata;

const CRLF: &str = "\r\n";

/// A ready-to-send batch body.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedBatch {
    pub boundary: String,
    pub body: String,
    pub count: usize,
}

impl EncodedBatch {
    pub fn content_type(&self) -> String {
        format!("multipart/mixed; boundary={}", self.boundary)
    }
}

/// Pack write requests into one multipart body.
///
/// Reads cannot be part of a changeset and are rejected.
pub fn encode_batch(batch_id: BatchId, requests: &[HttpRequest]) -> Result<EncodedBatch, ListStoreError> {
    if let Some(index) = requests.iter().position(|r| r.method == HttpMethod::Get) {
        return Err(ListStoreError::InvalidRequest(format!(
            "request {} is a read; only writes can be batched",
            index + 1
        )));
    }

    let boundary = batch_id.to_string();
    let changeset = format!("changeset_{}", batch_id.as_ulid());
    let mut body = String::new();

    body.push_str(&format!("--{boundary}{CRLF}"));
    body.push_str(&format!(
        "Content-Type: multipart/mixed; boundary=\"{changeset}\"{CRLF}{CRLF}"
    ));

    for (index, request) in requests.iter().enumerate() {
        body.push_str(&format!("--{changeset}{CRLF}"));
        body.push_str(&format!("Content-Type: application/http{CRLF}"));
        body.push_str(&format!("Content-Transfer-Encoding: binary{CRLF}"));
        body.push_str(&format!("Content-ID: {}{CRLF}{CRLF}", index + 1));

        body.push_str(&format!(
            "{} {} HTTP/1.1{CRLF}",
            request.method.as_str(),
            request.url
        ));
        for (name, value) in &request.headers {
            body.push_str(&format!("{name}: {value}{CRLF}"));
        }
        body.push_str(CRLF);
        if let Some(payload) = &request.body {
            body.push_str(payload);
            body.push_str(CRLF);
        }
        body.push_str(CRLF);
    }

    body.push_str(&format!("--{changeset}--{CRLF}{CRLF}"));
    body.push_str(&format!("--{boundary}--{CRLF}"));

    Ok(EncodedBatch {
        boundary,
        body,
        count: requests.len(),
    })
}

/// Unpack a batch response into per-item results for `expected` requests.
///
/// Items whose content id falls outside `1..=expected`, or repeats an earlier
/// one, are dropped with a warning. Ids with no item at all are left to the
/// caller (see [`crate::domain::BatchResult::from_items`]).
pub fn decode_batch_response(
    body: &str,
    expected: usize,
) -> Result<Vec<BatchItemResult>, ListStoreError> {
    let parts = parse_http_parts(body);
    if parts.is_empty() {
        return Err(ListStoreError::MalformedBatchResponse(
            "no application/http parts in response".to_string(),
        ));
    }

    let mut items: Vec<BatchItemResult> = Vec::with_capacity(parts.len());
    for (index, part) in parts.iter().enumerate() {
        let (status, text) = parse_status_line(&part.start_line).ok_or_else(|| {
            ListStoreError::MalformedBatchResponse(format!(
                "part {} has no status line: {:?}",
                index + 1,
                part.start_line
            ))
        })?;

        let content_id = part.content_id.unwrap_or(index + 1);
        if content_id == 0 || content_id > expected {
            tracing::warn!(content_id, expected, "batch response item out of range");
            continue;
        }
        if items.iter().any(|item| item.content_id == content_id) {
            tracing::warn!(content_id, "batch response item repeated");
            continue;
        }

        let disposition = ItemDisposition::of_status(status);
        let mut status_text = if text.is_empty() {
            reason_phrase(status).to_string()
        } else {
            text
        };
        if disposition.is_failure()
            && let Some(message) = odata::error_message(&part.body)
        {
            status_text = format!("{status_text}: {message}");
        }

        items.push(BatchItemResult {
            content_id,
            status,
            status_text,
            disposition,
        });
    }
    Ok(items)
}

/// Inverse of [`encode_batch`]: the requests of a batch body with their content ids.
pub fn parse_batch_request(body: &str) -> Result<Vec<(usize, HttpRequest)>, ListStoreError> {
    let parts = parse_http_parts(body);
    if parts.is_empty() {
        return Err(ListStoreError::InvalidRequest(
            "batch request has no application/http parts".to_string(),
        ));
    }

    parts
        .into_iter()
        .enumerate()
        .map(|(index, part)| {
            let (method, url) = parse_request_line(&part.start_line).ok_or_else(|| {
                ListStoreError::InvalidRequest(format!(
                    "part {} has no request line: {:?}",
                    index + 1,
                    part.start_line
                ))
            })?;
            let method = match method.to_ascii_uppercase().as_str() {
                "GET" => HttpMethod::Get,
                "POST" => HttpMethod::Post,
                other => {
                    return Err(ListStoreError::InvalidRequest(format!(
                        "unsupported method {other}"
                    )));
                }
            };
            let request = HttpRequest {
                method,
                url,
                headers: part.headers,
                body: (!part.body.is_empty()).then_some(part.body),
            };
            Ok((part.content_id.unwrap_or(index + 1), request))
        })
        .collect()
}

/// Builds multipart batch responses (fake list store, tests).
#[derive(Debug, Clone)]
pub struct BatchResponseBuilder {
    boundary: String,
    changeset: String,
    parts: Vec<(usize, HttpResponse)>,
}

impl BatchResponseBuilder {
    pub fn new(tag: &str) -> Self {
        Self {
            boundary: format!("batchresponse_{tag}"),
            changeset: format!("changesetresponse_{tag}"),
            parts: Vec::new(),
        }
    }

    pub fn part(mut self, content_id: usize, response: HttpResponse) -> Self {
        self.parts.push((content_id, response));
        self
    }

    /// One bare part per status, content ids 1..=N.
    pub fn statuses(self, statuses: &[u16]) -> Self {
        statuses
            .iter()
            .enumerate()
            .fold(self, |builder, (i, status)| {
                builder.part(i + 1, HttpResponse::new(*status))
            })
    }

    pub fn build(&self) -> HttpResponse {
        let mut body = String::new();
        body.push_str(&format!("--{}{CRLF}", self.boundary));
        body.push_str(&format!(
            "Content-Type: multipart/mixed; boundary={}{CRLF}{CRLF}",
            self.changeset
        ));
        for (content_id, response) in &self.parts {
            body.push_str(&format!("--{}{CRLF}", self.changeset));
            body.push_str(&format!("Content-Type: application/http{CRLF}"));
            body.push_str(&format!("Content-Transfer-Encoding: binary{CRLF}"));
            body.push_str(&format!("Content-ID: {content_id}{CRLF}{CRLF}"));
            body.push_str(&format!(
                "HTTP/1.1 {} {}{CRLF}",
                response.status, response.status_text
            ));
            for (name, value) in &response.headers {
                body.push_str(&format!("{name}: {value}{CRLF}"));
            }
            body.push_str(CRLF);
            if !response.body.is_empty() {
                body.push_str(&response.body);
                body.push_str(CRLF);
            }
        }
        body.push_str(&format!("--{}--{CRLF}", self.changeset));
        body.push_str(&format!("--{}--{CRLF}", self.boundary));

        HttpResponse::new(200)
            .header(
                "Content-Type",
                format!("multipart/mixed; boundary={}", self.boundary),
            )
            .body(body)
    }
}

/// Boundary announced by a batch content type.
pub fn batch_boundary(content_type: &str) -> Option<&str> {
    multipart::boundary_of(content_type)
}
