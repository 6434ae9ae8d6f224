//! MemoryListStore - テスト用のインメモリ list store
//!
//! 本物の list store と同じ URL / ヘッダ規約を話す `Transport` 実装です。
//!
//! # 振る舞い
//! - item ごとに version を持ち、ETag は `"<version>"`
//! - MERGE / DELETE は IF-MATCH 必須（無ければ 428、古ければ 412、`*` は常に通る）
//! - unique field（既定 `EntryId`）が重複する create は 409
//! - `$batch` は part ごとに独立して処理する

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::{Map, Value, json};

use crate::codec::{BatchResponseBuilder, parse_batch_request};
use crate::domain::{ETag, TransportError};
use crate::ports::{HttpMethod, HttpRequest, HttpResponse, Transport};

const LIST_PREFIX: &str = "/_api/web/lists/getbytitle('";

#[derive(Debug, Default)]
struct Item {
    fields: Map<String, Value>,
    version: u64,
}

impl Item {
    fn etag(&self) -> String {
        format!("\"{}\"", self.version)
    }

    fn to_json(&self, id: u64) -> Value {
        let mut body = self.fields.clone();
        body.insert("Id".to_string(), json!(id));
        body.insert("odata.etag".to_string(), json!(self.etag()));
        Value::Object(body)
    }
}

#[derive(Debug, Default)]
struct List {
    next_id: u64,
    items: BTreeMap<u64, Item>,
}

#[derive(Debug, Default)]
struct StoreState {
    lists: HashMap<String, List>,
    requests: Vec<HttpRequest>,
    batches: usize,
}

/// Target of a list URL.
#[derive(Debug, PartialEq)]
enum Target {
    Batch,
    Items { list: String },
    Item { list: String, id: u64 },
}

fn parse_target(url: &str) -> Option<Target> {
    let path = url.split('?').next().unwrap_or(url);
    if path.ends_with("/_api/$batch") {
        return Some(Target::Batch);
    }

    let start = path.find(LIST_PREFIX)? + LIST_PREFIX.len();
    let mut list = String::new();
    let mut chars = path[start..].char_indices().peekable();
    let rest = loop {
        let (i, c) = chars.next()?;
        if c != '\'' {
            list.push(c);
            continue;
        }
        match chars.peek() {
            Some((_, '\'')) => {
                list.push('\'');
                chars.next();
            }
            Some((_, ')')) => break &path[start + i + 2..],
            _ => return None,
        }
    };

    match rest {
        "/items" => Some(Target::Items { list }),
        _ => {
            let id = rest.strip_prefix("/items(")?.strip_suffix(')')?.parse().ok()?;
            Some(Target::Item { list, id })
        }
    }
}

fn odata_error(status: u16, message: &str) -> HttpResponse {
    HttpResponse::new(status).json(&json!({
        "odata.error": {"code": "-1", "message": {"lang": "en-US", "value": message}}
    }))
}

/// Fake list store answering over the `Transport` port.
pub struct MemoryListStore {
    state: Mutex<StoreState>,
    unique_field: Option<String>,
}

impl MemoryListStore {
    pub fn new() -> Self {
        Self::with_unique_field(Some("EntryId"))
    }

    pub fn with_unique_field(field: Option<&str>) -> Self {
        Self {
            state: Mutex::default(),
            unique_field: field.map(str::to_string),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Simulate a concurrent edit by somebody else.
    pub fn bump_version(&self, list: &str, id: u64) {
        if let Some(item) = self
            .lock()
            .lists
            .get_mut(list)
            .and_then(|l| l.items.get_mut(&id))
        {
            item.version += 1;
        }
    }

    pub fn item(&self, list: &str, id: u64) -> Option<Value> {
        let state = self.lock();
        let item = state.lists.get(list)?.items.get(&id)?;
        Some(item.to_json(id))
    }

    /// Items of a list, by id.
    pub fn items(&self, list: &str) -> Vec<Value> {
        self.lock()
            .lists
            .get(list)
            .map(|l| l.items.iter().map(|(id, item)| item.to_json(*id)).collect())
            .unwrap_or_default()
    }

    pub fn len(&self, list: &str) -> usize {
        self.lock().lists.get(list).map_or(0, |l| l.items.len())
    }

    pub fn is_empty(&self, list: &str) -> bool {
        self.len(list) == 0
    }

    /// Top-level requests received, batches counted once.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.lock().requests.clone()
    }

    pub fn batches(&self) -> usize {
        self.lock().batches
    }

    fn handle(&self, state: &mut StoreState, request: &HttpRequest) -> HttpResponse {
        let Some(target) = parse_target(&request.url) else {
            return odata_error(404, "Unknown resource");
        };
        let method_override = request
            .header_value("X-HTTP-Method")
            .map(str::to_ascii_uppercase);

        match (target, request.method, method_override.as_deref()) {
            (Target::Batch, HttpMethod::Post, None) => self.handle_batch(state, request),
            (Target::Items { list }, HttpMethod::Post, None) => {
                self.create(state, &list, request)
            }
            (Target::Item { list, id }, HttpMethod::Get, None) => {
                match state.lists.get(&list).and_then(|l| l.items.get(&id)) {
                    Some(item) => HttpResponse::new(200)
                        .header("ETag", item.etag())
                        .json(&item.to_json(id)),
                    None => odata_error(404, "Item does not exist"),
                }
            }
            (Target::Item { list, id }, HttpMethod::Post, Some(op @ ("MERGE" | "DELETE"))) => {
                let Some(items) = state.lists.get_mut(&list).map(|l| &mut l.items) else {
                    return odata_error(404, "List does not exist");
                };
                let Some(item) = items.get_mut(&id) else {
                    return odata_error(404, "Item does not exist");
                };
                match request.header_value("IF-MATCH") {
                    None => return odata_error(428, "IF-MATCH header is required"),
                    Some("*") => {}
                    Some(raw) => {
                        let current = ETag::parse(&item.etag());
                        let fresh = ETag::parse(raw)
                            .zip(current)
                            .is_some_and(|(sent, current)| sent.matches(&current));
                        if !fresh {
                            return odata_error(412, "The version of the item is out of date");
                        }
                    }
                }

                if op == "DELETE" {
                    items.remove(&id);
                    return HttpResponse::new(200);
                }
                match request.body.as_deref().map(serde_json::from_str::<Value>) {
                    Some(Ok(Value::Object(fields))) => {
                        item.fields.extend(fields);
                        item.version += 1;
                        HttpResponse::new(204).header("ETag", item.etag())
                    }
                    _ => odata_error(400, "Invalid JSON body"),
                }
            }
            _ => odata_error(400, "Unsupported request"),
        }
    }

    fn create(&self, state: &mut StoreState, list: &str, request: &HttpRequest) -> HttpResponse {
        let fields = match request.body.as_deref().map(serde_json::from_str::<Value>) {
            Some(Ok(Value::Object(fields))) => fields,
            _ => return odata_error(400, "Invalid JSON body"),
        };
        let list = state.lists.entry(list.to_string()).or_default();

        if let Some(field) = &self.unique_field
            && let Some(value) = fields.get(field)
            && list.items.values().any(|item| item.fields.get(field) == Some(value))
        {
            return odata_error(
                409,
                &format!("The list item could not be added or updated because duplicate values were found in the following field(s): {field}"),
            );
        }

        list.next_id += 1;
        let id = list.next_id;
        let item = Item { fields, version: 1 };
        let response = HttpResponse::new(201)
            .header("ETag", item.etag())
            .json(&item.to_json(id));
        list.items.insert(id, item);
        response
    }

    fn handle_batch(&self, state: &mut StoreState, request: &HttpRequest) -> HttpResponse {
        let parts = match parse_batch_request(request.body.as_deref().unwrap_or("")) {
            Ok(parts) => parts,
            Err(e) => return odata_error(400, &e.to_string()),
        };
        state.batches += 1;
        let tag = format!("memory{}", state.batches);
        parts
            .iter()
            .fold(BatchResponseBuilder::new(&tag), |builder, (content_id, part)| {
                let response = self.handle(state, part);
                builder.part(*content_id, response)
            })
            .build()
    }
}

impl Default for MemoryListStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MemoryListStore {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut state = self.lock();
        state.requests.push(request.clone());
        Ok(self.handle(&mut state, &request))
    }
}
