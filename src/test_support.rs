//! Shared fakes for unit tests: a scripted LLM and a loopback HTTP stub.

use crate::error::{MaestroError, Result};
use crate::llm::{LlmClient, TextStream};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Scripted LLM: fixed embedding, echoing generation, queued structured
/// responses.
pub struct FakeLlm {
    embedding: Vec<f32>,
    structured: Mutex<VecDeque<serde_json::Value>>,
}

impl FakeLlm {
    pub fn new(embedding: Vec<f32>) -> Self {
        Self {
            embedding,
            structured: Mutex::new(VecDeque::new()),
        }
    }

    /// Queue a structured response; each `generate_structured` call pops one.
    pub fn with_structured(self, value: serde_json::Value) -> Self {
        self.structured.lock().unwrap().push_back(value);
        self
    }
}

#[async_trait]
impl LlmClient for FakeLlm {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(self.embedding.clone())
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|_| self.embedding.clone()).collect())
    }

    /// Echoes the prompt so tests can assert on what was narrated.
    async fn generate(&self, prompt: &str) -> Result<String> {
        Ok(prompt.to_string())
    }

    async fn generate_structured(
        &self,
        _prompt: &str,
        _schema_name: &str,
        _schema: &serde_json::Value,
    ) -> Result<serde_json::Value> {
        self.structured
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| MaestroError::Llm("no scripted structured response".to_string()))
    }

    async fn generate_stream(&self, prompt: &str) -> Result<TextStream> {
        let midpoint = prompt.len() / 2;
        let fragments = vec![
            Ok(prompt[..midpoint].to_string()),
            Ok(prompt[midpoint..].to_string()),
        ];
        Ok(Box::pin(futures::stream::iter(fragments)))
    }

    fn dimensions(&self) -> usize {
        self.embedding.len()
    }
}

/// A request observed by the stub server.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    /// Request target, including any query string.
    pub target: String,
    pub body: String,
}

/// Minimal loopback HTTP/1.1 server serving scripted responses in order.
pub struct StubServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl StubServer {
    /// Bind to an ephemeral port and serve `(status, body)` responses, one
    /// per request, in order. Requests past the script get a 500.
    pub async fn start(responses: Vec<(u16, String)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let responses = Arc::new(Mutex::new(VecDeque::from(responses)));

        let recorded = requests.clone();
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                let recorded = recorded.clone();
                let responses = responses.clone();
                tokio::spawn(async move {
                    handle_connection(stream, recorded, responses).await;
                });
            }
        });

        Self { addr, requests }
    }

    /// Absolute URL for a path on this server.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// All requests observed so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    responses: Arc<Mutex<VecDeque<(u16, String)>>>,
) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    let header_end = loop {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
        if let Some(pos) = find_blank_line(&buf) {
            break pos + 4;
        }
        if buf.len() > 64 * 1024 {
            return;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.lines();
    let request_line = lines.next().unwrap_or_default();
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let target = parts.next().unwrap_or_default().to_string();

    let mut content_length = 0usize;
    for line in lines {
        if let Some(value) = line.to_ascii_lowercase().strip_prefix("content-length:") {
            content_length = value.trim().parse().unwrap_or(0);
        }
    }

    let mut body = buf[header_end..].to_vec();
    while body.len() < content_length {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => body.extend_from_slice(&chunk[..n]),
        }
    }

    requests.lock().unwrap().push(RecordedRequest {
        method,
        target,
        body: String::from_utf8_lossy(&body).to_string(),
    });

    let (status, body) = responses
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or((500, "no scripted response".to_string()));

    let response = format!(
        "HTTP/1.1 {} Stub\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.shutdown().await;
}

fn find_blank_line(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|window| window == b"\r\n\r\n")
}
