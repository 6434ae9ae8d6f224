//! ReqwestTransport - 本番用の HTTP transport

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::domain::TransportError;
use crate::ports::{HttpMethod, HttpRequest, HttpResponse, Transport};

/// `Transport` over a shared `reqwest::Client`.
///
/// Any status the server answers with, 4xx and 5xx included, is `Ok`.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Request(format!("cannot build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

fn classify(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout
    } else if error.is_connect() {
        TransportError::Connect(error.to_string())
    } else {
        TransportError::Request(error.to_string())
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(classify)?;
        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.text().await.map_err(classify)?;

        Ok(HttpResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("").to_string(),
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// One-shot HTTP server: reads the request head, answers with `reply`,
    /// and hands back what it received.
    async fn serve_once(reply: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/_api/web", listener.local_addr().unwrap());
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            let mut buf = [0u8; 1024];
            while !received.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                received.extend_from_slice(&buf[..n]);
            }
            socket.write_all(reply.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
            String::from_utf8_lossy(&received).into_owned()
        });
        (url, server)
    }

    #[tokio::test]
    async fn error_status_is_a_response_not_an_error() {
        let (url, server) = serve_once(
            "HTTP/1.1 503 Service Unavailable\r\nContent-Length: 4\r\nRetry-After: 2\r\nConnection: close\r\n\r\nbusy",
        )
        .await;
        let transport = ReqwestTransport::new(Duration::from_secs(5)).unwrap();

        let response = transport
            .send(HttpRequest::new(HttpMethod::Get, url).header("Accept", "application/json"))
            .await
            .unwrap();

        assert_eq!(response.status, 503);
        assert_eq!(response.status_text, "Service Unavailable");
        assert_eq!(response.body, "busy");
        assert_eq!(response.header_value("retry-after"), Some("2"));

        let received = server.await.unwrap();
        assert!(received.starts_with("GET /_api/web HTTP/1.1"));
        assert!(received.to_ascii_lowercase().contains("accept: application/json"));
    }

    #[tokio::test]
    async fn refused_port_is_a_connect_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let transport = ReqwestTransport::new(Duration::from_secs(5)).unwrap();

        let result = transport
            .send(HttpRequest::new(HttpMethod::Get, format!("http://{addr}/")))
            .await;

        assert!(matches!(result, Err(TransportError::Connect(_))), "{result:?}");
    }

    #[tokio::test]
    async fn silent_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _held = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(socket);
        });
        let transport = ReqwestTransport::new(Duration::from_millis(100)).unwrap();

        let result = transport
            .send(HttpRequest::new(HttpMethod::Get, format!("http://{addr}/")))
            .await;

        assert!(matches!(result, Err(TransportError::Timeout)), "{result:?}");
    }
}
