//! Reading OData JSON bodies: error messages and body-carried ETags.

use serde_json::Value;

use crate::domain::ETag;

/// Error message from an OData error body.
///
/// Accepts the verbose (`error.message.value`), minimal
/// (`odata.error.message.value`) and JSON-light (`error.message`) shapes.
pub fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let error = value.get("error").or_else(|| value.get("odata.error"))?;
    let message = error.get("message")?;
    match message {
        Value::String(s) => Some(s.clone()),
        Value::Object(_) => message.get("value")?.as_str().map(str::to_string),
        _ => None,
    }
}

/// ETag carried in a JSON body when the response header is absent.
pub fn etag_from_body(data: &Value) -> Option<ETag> {
    let raw = data
        .get("odata.etag")
        .or_else(|| data.get("@odata.etag"))
        .or_else(|| data.get("__metadata").and_then(|m| m.get("etag")))
        .or_else(|| data.get("d").and_then(|d| d.get("__metadata")).and_then(|m| m.get("etag")))?
        .as_str()?;
    ETag::parse(raw)
}
