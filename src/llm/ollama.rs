//! Ollama chat client
//!
//! Talks to `/api/chat`. Streaming replies arrive as newline-delimited JSON
//! objects, each carrying one `message.content` increment, the last one
//! flagged `done: true`.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{ChatMessage, LanguageModel, LlmError, LlmResult, TextStream};

#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaClient {
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> LlmResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn payload(&self, messages: &[ChatMessage], stream: bool) -> Value {
        json!({
            "model": self.model,
            "messages": messages,
            "stream": stream,
        })
    }

    fn map_send_error(&self, e: reqwest::Error) -> LlmError {
        if e.is_connect() {
            LlmError::ConnectionRefused(self.base_url.clone())
        } else if e.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Network(e.to_string())
        }
    }

    async fn post_chat(&self, payload: &Value) -> LlmResult<reqwest::Response> {
        let url = format!("{}/api/chat", self.base_url);
        debug!(model = %self.model, "Sending request to Ollama API");

        let response = self
            .client
            .post(&url)
            .json(payload)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Provider(format!(
                "Ollama API error {status}: {body}"
            )));
        }
        Ok(response)
    }

    /// Check the server is reachable and has at least one model pulled.
    pub async fn health_check(&self) -> LlmResult<()> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if !response.status().is_success() {
            return Err(LlmError::Provider(format!(
                "Ollama health check failed: {}",
                response.status()
            )));
        }

        let tags: Value = response
            .json()
            .await
            .map_err(|e| LlmError::Serialisation(e.to_string()))?;
        let names: Vec<&str> = tags["models"]
            .as_array()
            .map(|models| models.iter().filter_map(|m| m["name"].as_str()).collect())
            .unwrap_or_default();

        if names.is_empty() {
            warn!("Ollama is running but no models are available");
            return Err(LlmError::Provider("no models available in Ollama".into()));
        }
        let tagged = format!("{}:", self.model);
        if !names.iter().any(|n| *n == self.model || n.starts_with(&tagged)) {
            warn!(model = %self.model, available = ?names, "Configured model not pulled");
        }
        info!("Ollama connected with {} models available", names.len());
        Ok(())
    }
}

/// Pull complete lines out of `buffer`, returning the content increments
/// they carry and whether the final object has been seen.
fn drain_lines(buffer: &mut Vec<u8>) -> LlmResult<(Vec<String>, bool)> {
    let mut out = Vec::new();
    let mut done = false;

    while let Some(line_end) = buffer.iter().position(|b| *b == b'\n') {
        let raw: Vec<u8> = buffer.drain(..=line_end).collect();
        let line = String::from_utf8_lossy(&raw);
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let parsed: Value = serde_json::from_str(line)
            .map_err(|e| LlmError::Serialisation(format!("bad stream line: {e}")))?;
        if let Some(err) = parsed["error"].as_str() {
            return Err(LlmError::Provider(err.to_string()));
        }
        if let Some(content) = parsed["message"]["content"].as_str() {
            if !content.is_empty() {
                out.push(content.to_string());
            }
        }
        if parsed["done"].as_bool().unwrap_or(false) {
            done = true;
            break;
        }
    }

    Ok((out, done))
}

#[async_trait]
impl LanguageModel for OllamaClient {
    async fn chat(&self, messages: &[ChatMessage]) -> LlmResult<String> {
        let response = self.post_chat(&self.payload(messages, false)).await?;
        let data: Value = response
            .json()
            .await
            .map_err(|e| LlmError::Serialisation(format!("failed to parse JSON response: {e}")))?;

        data["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| LlmError::Provider("no message content in Ollama response".into()))
    }

    async fn chat_stream(&self, messages: &[ChatMessage]) -> LlmResult<TextStream> {
        let response = self.post_chat(&self.payload(messages, true)).await?;
        let bytes = response.bytes_stream().boxed();

        let stream = futures::stream::unfold(
            (bytes, Vec::<u8>::new(), Vec::<String>::new(), false),
            |(mut bytes, mut buffer, mut pending, mut done)| async move {
                loop {
                    if !pending.is_empty() {
                        let chunk = pending.remove(0);
                        return Some((Ok(chunk), (bytes, buffer, pending, done)));
                    }
                    if done {
                        return None;
                    }
                    match bytes.next().await {
                        Some(Ok(raw)) => {
                            buffer.extend_from_slice(&raw);
                            match drain_lines(&mut buffer) {
                                Ok((chunks, finished)) => {
                                    pending = chunks;
                                    done = finished;
                                }
                                Err(e) => return Some((Err(e), (bytes, buffer, pending, true))),
                            }
                        }
                        Some(Err(e)) => {
                            let err = LlmError::Network(format!("stream interrupted: {e}"));
                            return Some((Err(err), (bytes, buffer, pending, true)));
                        }
                        None => {
                            // Server closed without a trailing newline
                            buffer.push(b'\n');
                            match drain_lines(&mut buffer) {
                                Ok((chunks, _)) => {
                                    pending = chunks;
                                    done = true;
                                }
                                Err(e) => return Some((Err(e), (bytes, buffer, pending, true))),
                            }
                        }
                    }
                }
            },
        );

        Ok(stream.boxed())
    }
}
