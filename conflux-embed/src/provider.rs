//! Embedding provider implementations
//!
//! Two HTTP-backed providers are available, selected by
//! [`EmbedConfig::provider`]: [`GoogleAiProvider`] for the Google Generative
//! Language API and [`OpenAiCompatProvider`] for anything speaking the OpenAI
//! `/embeddings` wire format. Both hang behind the [`EmbeddingProvider`]
//! trait so the retrieval core never branches on provider identity.
//!
//! Document and query embeddings must land in the same vector space for
//! distances to be comparable. [`EmbeddingTask`] carries that intent: Google
//! distinguishes the two via its `taskType` field while OpenAI-compatible
//! services ignore it, but both map to one model and one space.

use crate::config::{EmbedConfig, ProviderKind};
use crate::error::{EmbedError, Result};
use crate::retry::send_with_retry;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

/// Distinguishes indexing a chunk from embedding a query.
///
/// Both tasks map into the same vector space; providers that care (Google)
/// translate this to their task-type string, providers that do not ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingTask {
    /// Embedding a document chunk for storage in the index.
    Document,
    /// Embedding a user query for similarity search.
    Query,
}

impl EmbeddingTask {
    fn google_task_type(self) -> &'static str {
        match self {
            Self::Document => "RETRIEVAL_DOCUMENT",
            Self::Query => "RETRIEVAL_QUERY",
        }
    }
}

/// Trait for embedding providers that can generate embeddings from text
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str, task: EmbeddingTask) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts, in matching order.
    ///
    /// All-or-nothing: a failure anywhere in the batch fails the whole batch.
    async fn embed_batch(&self, texts: &[String], task: EmbeddingTask) -> Result<Vec<Vec<f32>>>;

    /// Get the name/identifier of this provider
    fn provider_name(&self) -> &str;
}

/// Build the provider selected by the configuration.
///
/// This is the single branch point on provider identity; everything
/// downstream works through the [`EmbeddingProvider`] trait object.
///
/// # Errors
///
/// Returns [`EmbedError::InvalidInput`] if the configuration names no model.
/// Missing credentials are deliberately not rejected here: they surface as
/// [`EmbedError::Unavailable`] at request time so the retrieval layer can
/// degrade to keyword search instead of refusing to start.
pub fn provider_from_config(config: &EmbedConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    if config.model.is_empty() {
        return Err(EmbedError::invalid_input("model name must not be empty"));
    }
    Ok(match config.provider {
        ProviderKind::GoogleAi => Arc::new(GoogleAiProvider::new(config.clone())),
        ProviderKind::OpenAiCompat => Arc::new(OpenAiCompatProvider::new(config.clone())),
    })
}

const GOOGLE_AI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

#[derive(Debug, Deserialize)]
struct GoogleEmbedding {
    values: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct GoogleEmbedResponse {
    embedding: GoogleEmbedding,
}

#[derive(Debug, Deserialize)]
struct GoogleBatchEmbedResponse {
    embeddings: Vec<GoogleEmbedding>,
}

/// Provider for the Google Generative Language embedding API.
///
/// Uses `embedContent` for single texts and `batchEmbedContents` for
/// batches, forwarding [`EmbeddingTask`] as the API's `taskType`.
#[derive(Debug, Clone)]
pub struct GoogleAiProvider {
    config: EmbedConfig,
    client: reqwest::Client,
}

impl GoogleAiProvider {
    /// Create a provider from configuration. No network calls are made until
    /// the first embedding request.
    pub fn new(config: EmbedConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .unwrap_or_default();
        Self { config, client }
    }

    fn api_key(&self) -> Result<&str> {
        match self.config.api_key.as_deref() {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(EmbedError::unavailable(
                "Google AI provider has no API key configured",
            )),
        }
    }

    fn endpoint(&self, method: &str, api_key: &str) -> String {
        let base = self
            .config
            .base_url
            .as_deref()
            .unwrap_or(GOOGLE_AI_BASE_URL)
            .trim_end_matches('/');
        format!(
            "{base}/v1beta/models/{model}:{method}?key={api_key}",
            model = self.config.model
        )
    }

    fn content_request(&self, text: &str, task: EmbeddingTask) -> serde_json::Value {
        serde_json::json!({
            "model": format!("models/{}", self.config.model),
            "content": { "parts": [ { "text": text } ] },
            "taskType": task.google_task_type(),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for GoogleAiProvider {
    async fn embed(&self, text: &str, task: EmbeddingTask) -> Result<Vec<f32>> {
        let api_key = self.api_key()?;
        let url = self.endpoint("embedContent", api_key);
        let body = self.content_request(text, task);

        let response = send_with_retry(self.provider_name(), self.config.max_retries, || {
            self.client.post(&url).json(&body).send()
        })
        .await?;
        let response = check_status(self.provider_name(), response).await?;

        let parsed: GoogleEmbedResponse = response
            .json()
            .await
            .map_err(|e| EmbedError::malformed(e.to_string()))?;
        Ok(parsed.embedding.values)
    }

    async fn embed_batch(&self, texts: &[String], task: EmbeddingTask) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let api_key = self.api_key()?;
        let url = self.endpoint("batchEmbedContents", api_key);
        let requests: Vec<serde_json::Value> = texts
            .iter()
            .map(|text| self.content_request(text, task))
            .collect();
        let body = serde_json::json!({ "requests": requests });

        tracing::debug!("Generating embeddings for {} texts", texts.len());

        let response = send_with_retry(self.provider_name(), self.config.max_retries, || {
            self.client.post(&url).json(&body).send()
        })
        .await?;
        let response = check_status(self.provider_name(), response).await?;

        let parsed: GoogleBatchEmbedResponse = response
            .json()
            .await
            .map_err(|e| EmbedError::malformed(e.to_string()))?;

        if parsed.embeddings.len() != texts.len() {
            return Err(EmbedError::malformed(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                parsed.embeddings.len()
            )));
        }

        Ok(parsed.embeddings.into_iter().map(|e| e.values).collect())
    }

    fn provider_name(&self) -> &str {
        "google-ai"
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbedResponse {
    data: Vec<OpenAiEmbeddingData>,
}

/// Provider for OpenAI-compatible `/embeddings` endpoints.
///
/// The wire format has no task-type concept, so [`EmbeddingTask`] is ignored:
/// documents and queries already share one vector space.
#[derive(Debug, Clone)]
pub struct OpenAiCompatProvider {
    config: EmbedConfig,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a provider from configuration. No network calls are made until
    /// the first embedding request.
    pub fn new(config: EmbedConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .unwrap_or_default();
        Self { config, client }
    }

    fn endpoint(&self) -> Result<String> {
        match self.config.base_url.as_deref() {
            Some(base) if !base.is_empty() => {
                Ok(format!("{}/embeddings", base.trim_end_matches('/')))
            }
            _ => Err(EmbedError::unavailable(
                "OpenAI-compatible provider has no base URL configured",
            )),
        }
    }

    fn request(&self, url: &str, body: &serde_json::Value) -> reqwest::RequestBuilder {
        let mut builder = self.client.post(url).json(body);
        if let Some(key) = self.config.api_key.as_deref()
            && !key.is_empty()
        {
            builder = builder.bearer_auth(key);
        }
        builder
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiCompatProvider {
    async fn embed(&self, text: &str, task: EmbeddingTask) -> Result<Vec<f32>> {
        let texts = vec![text.to_string()];
        self.embed_batch(&texts, task)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| EmbedError::malformed("no embedding returned for text"))
    }

    async fn embed_batch(&self, texts: &[String], _task: EmbeddingTask) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = self.endpoint()?;
        let body = serde_json::json!({
            "model": self.config.model,
            "input": texts,
        });

        tracing::debug!("Generating embeddings for {} texts", texts.len());

        let response = send_with_retry(self.provider_name(), self.config.max_retries, || {
            self.request(&url, &body).send()
        })
        .await?;
        let response = check_status(self.provider_name(), response).await?;

        let parsed: OpenAiEmbedResponse = response
            .json()
            .await
            .map_err(|e| EmbedError::malformed(e.to_string()))?;

        if parsed.data.len() != texts.len() {
            return Err(EmbedError::malformed(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                parsed.data.len()
            )));
        }

        // The API may return rows out of order; the index field is
        // authoritative.
        let mut data = parsed.data;
        data.sort_by_key(|d| d.index);
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }

    fn provider_name(&self) -> &str {
        "openai-compat"
    }
}

/// Classify a non-retryable HTTP status into the error taxonomy.
///
/// Credential rejections count as the provider being unavailable (the caller
/// can still fall back to keyword search); other client errors mean the
/// request itself was bad and falling back would only mask the bug.
async fn check_status(provider_name: &str, response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Err(EmbedError::unavailable(format!(
            "{provider_name} rejected credentials ({status})"
        )));
    }
    Err(EmbedError::invalid_input(format!(
        "{provider_name} returned {status}: {body}"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Spawn a minimal HTTP server that returns a fixed response for each
    /// connection. Returns (port, join_handle).
    async fn spawn_mock_server(responses: Vec<String>) -> (u16, tokio::task::JoinHandle<()>) {
        use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let handle = tokio::spawn(async move {
            for resp in responses {
                let Ok((mut stream, _)) = listener.accept().await else {
                    break;
                };
                tokio::spawn(async move {
                    let (reader, mut writer) = stream.split();
                    let mut buf_reader = BufReader::new(reader);
                    // Drain headers, tracking the body length so the request
                    // is fully consumed before responding.
                    let mut line = String::new();
                    let mut content_length = 0usize;
                    loop {
                        line.clear();
                        buf_reader.read_line(&mut line).await.unwrap_or(0);
                        if let Some(rest) = line
                            .to_ascii_lowercase()
                            .strip_prefix("content-length:")
                            .map(str::trim)
                        {
                            content_length = rest.parse().unwrap_or(0);
                        }
                        if line == "\r\n" || line == "\n" || line.is_empty() {
                            break;
                        }
                    }
                    if content_length > 0 {
                        use tokio::io::AsyncReadExt;
                        let mut body = vec![0u8; content_length];
                        buf_reader.read_exact(&mut body).await.ok();
                    }
                    writer.write_all(resp.as_bytes()).await.ok();
                });
            }
        });

        (port, handle)
    }

    fn http_response(status: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
    }

    fn openai_config(port: u16) -> EmbedConfig {
        EmbedConfig::openai_compat("test-model", format!("http://127.0.0.1:{port}/v1"))
            .with_max_retries(1)
    }

    #[tokio::test]
    async fn test_openai_compat_batch_preserves_order() {
        // Rows deliberately out of order; the index field decides placement.
        let body = r#"{"data":[
            {"index":1,"embedding":[0.4,0.5]},
            {"index":0,"embedding":[0.1,0.2]}
        ]}"#;
        let (port, _handle) = spawn_mock_server(vec![http_response("200 OK", body)]).await;

        let provider = OpenAiCompatProvider::new(openai_config(port));
        let texts = vec!["first".to_string(), "second".to_string()];
        let embeddings = provider
            .embed_batch(&texts, EmbeddingTask::Document)
            .await
            .unwrap();

        assert_eq!(embeddings, vec![vec![0.1, 0.2], vec![0.4, 0.5]]);
    }

    #[tokio::test]
    async fn test_openai_compat_retries_on_rate_limit() {
        let ok_body = r#"{"data":[{"index":0,"embedding":[1.0,0.0]}]}"#;
        let (port, _handle) = spawn_mock_server(vec![
            http_response("429 Too Many Requests", "{}"),
            http_response("200 OK", ok_body),
        ])
        .await;

        let provider = OpenAiCompatProvider::new(openai_config(port));
        let embedding = provider
            .embed("retry me", EmbeddingTask::Query)
            .await
            .unwrap();

        assert_eq!(embedding, vec![1.0, 0.0]);
    }

    #[tokio::test]
    async fn test_openai_compat_server_error_is_unavailable() {
        let (port, _handle) = spawn_mock_server(vec![
            http_response("500 Internal Server Error", "{}"),
            http_response("500 Internal Server Error", "{}"),
        ])
        .await;

        let provider = OpenAiCompatProvider::new(openai_config(port));
        let err = provider
            .embed("doomed", EmbeddingTask::Query)
            .await
            .unwrap_err();

        assert!(err.is_unavailable(), "got: {err}");
    }

    #[tokio::test]
    async fn test_openai_compat_bad_request_is_invalid_input() {
        let (port, _handle) =
            spawn_mock_server(vec![http_response("400 Bad Request", r#"{"error":"nope"}"#)]).await;

        let provider = OpenAiCompatProvider::new(openai_config(port));
        let err = provider
            .embed("rejected", EmbeddingTask::Query)
            .await
            .unwrap_err();

        assert!(matches!(err, EmbedError::InvalidInput { .. }), "got: {err}");
    }

    #[tokio::test]
    async fn test_openai_compat_malformed_body() {
        let (port, _handle) =
            spawn_mock_server(vec![http_response("200 OK", "not json at all")]).await;

        let provider = OpenAiCompatProvider::new(openai_config(port));
        let err = provider
            .embed("garbled", EmbeddingTask::Query)
            .await
            .unwrap_err();

        assert!(matches!(err, EmbedError::MalformedResponse { .. }), "got: {err}");
    }

    #[tokio::test]
    async fn test_openai_compat_count_mismatch() {
        let body = r#"{"data":[{"index":0,"embedding":[0.1]}]}"#;
        let (port, _handle) = spawn_mock_server(vec![http_response("200 OK", body)]).await;

        let provider = OpenAiCompatProvider::new(openai_config(port));
        let texts = vec!["one".to_string(), "two".to_string()];
        let err = provider
            .embed_batch(&texts, EmbeddingTask::Document)
            .await
            .unwrap_err();

        assert!(matches!(err, EmbedError::MalformedResponse { .. }), "got: {err}");
    }

    #[tokio::test]
    async fn test_google_missing_key_fails_without_network() {
        let config = EmbedConfig::google_ai("text-embedding-004", None);
        let provider = GoogleAiProvider::new(config);

        let err = provider
            .embed("anything", EmbeddingTask::Query)
            .await
            .unwrap_err();
        assert!(err.is_unavailable());
    }

    #[tokio::test]
    async fn test_google_batch_against_mock() {
        let body = r#"{"embeddings":[{"values":[0.1,0.2]},{"values":[0.3,0.4]}]}"#;
        let (port, _handle) = spawn_mock_server(vec![http_response("200 OK", body)]).await;

        let config = EmbedConfig::google_ai("test-model", Some("key".into()))
            .with_base_url(format!("http://127.0.0.1:{port}"));
        let provider = GoogleAiProvider::new(config);

        let texts = vec!["alpha".to_string(), "beta".to_string()];
        let embeddings = provider
            .embed_batch(&texts, EmbeddingTask::Document)
            .await
            .unwrap();

        assert_eq!(embeddings, vec![vec![0.1, 0.2], vec![0.3, 0.4]]);
    }

    #[tokio::test]
    async fn test_empty_batch_is_a_no_op() {
        let config = EmbedConfig::google_ai("test-model", Some("key".into()));
        let provider = GoogleAiProvider::new(config);

        let embeddings = provider
            .embed_batch(&[], EmbeddingTask::Document)
            .await
            .unwrap();
        assert!(embeddings.is_empty());
    }

    #[test]
    fn test_provider_from_config_dispatch() {
        let google = provider_from_config(&EmbedConfig::google_ai("m", Some("k".into()))).unwrap();
        assert_eq!(google.provider_name(), "google-ai");

        let openai =
            provider_from_config(&EmbedConfig::openai_compat("m", "http://localhost")).unwrap();
        assert_eq!(openai.provider_name(), "openai-compat");

        let err = provider_from_config(&EmbedConfig::google_ai("", None))
            .err()
            .unwrap();
        assert!(matches!(err, EmbedError::InvalidInput { .. }));
    }

    #[test]
    fn test_task_type_mapping() {
        assert_eq!(
            EmbeddingTask::Document.google_task_type(),
            "RETRIEVAL_DOCUMENT"
        );
        assert_eq!(EmbeddingTask::Query.google_task_type(), "RETRIEVAL_QUERY");
    }
}
