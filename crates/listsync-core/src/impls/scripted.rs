//! ScriptedTransport - 決められた応答を順に返すテスト用 transport
//!
//! # 学習ポイント
//! - 応答キューが空になったら responder（あれば）にフォールバック
//! - 送られたリクエストを全部記録し、テストから検証できる

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::domain::TransportError;
use crate::ports::{HttpRequest, HttpResponse, Transport};

type Reply = Result<HttpResponse, TransportError>;
type Responder = Box<dyn Fn(&HttpRequest) -> Reply + Send + Sync>;

#[derive(Default)]
struct ScriptState {
    script: VecDeque<Reply>,
    requests: Vec<HttpRequest>,
}

/// Transport answering from a script.
///
/// # 使用例
/// ```ignore
/// let transport = ScriptedTransport::new();
/// transport.push_response(HttpResponse::new(503));
/// transport.push_response(HttpResponse::new(201));
/// ```
#[derive(Default)]
pub struct ScriptedTransport {
    state: Mutex<ScriptState>,
    responder: Option<Responder>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every request not covered by the script with `responder`.
    pub fn with_responder<F>(responder: F) -> Self
    where
        F: Fn(&HttpRequest) -> Reply + Send + Sync + 'static,
    {
        Self {
            state: Mutex::default(),
            responder: Some(Box::new(responder)),
        }
    }

    /// Every request fails with `error`.
    pub fn failing(error: TransportError) -> Self {
        Self::with_responder(move |_| Err(error.clone()))
    }

    pub fn push_response(&self, response: HttpResponse) {
        self.lock().script.push_back(Ok(response));
    }

    pub fn push_error(&self, error: TransportError) {
        self.lock().script.push_back(Err(error));
    }

    /// Requests seen so far, in order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.lock().requests.clone()
    }

    pub fn calls(&self) -> usize {
        self.lock().requests.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let scripted = {
            let mut state = self.lock();
            state.requests.push(request.clone());
            state.script.pop_front()
        };
        match (scripted, &self.responder) {
            (Some(reply), _) => reply,
            (None, Some(responder)) => responder(&request),
            (None, None) => Err(TransportError::Request(format!(
                "no scripted reply for {} {}",
                request.method.as_str(),
                request.url
            ))),
        }
    }
}
