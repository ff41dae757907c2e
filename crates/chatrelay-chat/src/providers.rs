//! Hosted provider seams and the OpenAI implementation.
//!
//! `ModelService` streams a model response as decoded events;
//! `FileService` covers the file store and vector store endpoints.
//! `OpenAiClient` implements both over one shared `reqwest::Client`.

use std::fmt::Display;
use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::json;
use tokio_stream::StreamExt;
use tracing::debug;

use chatrelay_core::{Error, RelayConfig, Result};

use crate::sse::{parse_event, SseDecoder};
use crate::types::{FileUpload, RemoteFile, ResponseEvent, ResponseRequest, VectorStore, VectorStoreList};

/// Boxed stream of upstream events. An `Err` item ends the stream.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<ResponseEvent>> + Send>>;

/// Purpose tag for files that are searchable by the model.
pub const FILE_PURPOSE: &str = "assistants";

/// Page size used when listing vector stores.
pub const VECTOR_STORE_PAGE_SIZE: u32 = 100;

/// Streaming model completion.
#[async_trait]
pub trait ModelService: Send + Sync {
    /// Open a streaming response.
    ///
    /// Errors returned here happen before any event was produced; errors
    /// after that arrive as items of the returned stream.
    async fn stream_response(&self, request: ResponseRequest) -> Result<EventStream>;
}

/// Provider file store and named vector stores.
#[async_trait]
pub trait FileService: Send + Sync {
    /// One page of vector stores, starting after the given cursor.
    async fn list_vector_stores(&self, after: Option<&str>) -> Result<VectorStoreList>;

    async fn create_vector_store(&self, name: &str) -> Result<VectorStore>;

    /// Store a file for retrieval use.
    async fn upload_file(&self, upload: FileUpload) -> Result<RemoteFile>;

    /// Register an uploaded file with a vector store.
    async fn attach_file(&self, vector_store_id: &str, file_id: &str) -> Result<()>;
}

/// Client for the OpenAI Responses, Files and Vector Stores APIs.
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl OpenAiClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| Error::Http(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    pub fn from_config(config: &RelayConfig) -> Result<Self> {
        Self::new(&config.base_url, &config.api_key)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header("Authorization", format!("Bearer {}", self.api_key))
    }

    /// Send a request and return the response if the status is a success.
    async fn send(&self, builder: RequestBuilder) -> Result<reqwest::Response> {
        let response = self
            .authorized(builder)
            .send()
            .await
            .map_err(|e| Error::Http(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Upstream { status, body });
        }

        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = self.send(builder).await?;
        let text = response
            .text()
            .await
            .map_err(|e| Error::Http(format!("Failed to read response: {}", e)))?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl ModelService for OpenAiClient {
    async fn stream_response(&self, request: ResponseRequest) -> Result<EventStream> {
        debug!(
            "Streaming response from {} with model {} ({} input messages)",
            self.base_url,
            request.model,
            request.input.len()
        );

        let response = self
            .send(
                self.client
                    .post(self.url("/responses"))
                    .header("Accept", "text/event-stream")
                    .json(&request),
            )
            .await?;

        Ok(Box::pin(decode_events(response.bytes_stream())))
    }
}

#[async_trait]
impl FileService for OpenAiClient {
    async fn list_vector_stores(&self, after: Option<&str>) -> Result<VectorStoreList> {
        let mut query = vec![("limit", VECTOR_STORE_PAGE_SIZE.to_string())];
        if let Some(cursor) = after {
            query.push(("after", cursor.to_string()));
        }
        self.send_json(self.client.get(self.url("/vector_stores")).query(&query))
            .await
    }

    async fn create_vector_store(&self, name: &str) -> Result<VectorStore> {
        self.send_json(
            self.client
                .post(self.url("/vector_stores"))
                .json(&json!({ "name": name })),
        )
        .await
    }

    async fn upload_file(&self, upload: FileUpload) -> Result<RemoteFile> {
        let mime = if upload.content_type.is_empty() {
            "application/octet-stream"
        } else {
            upload.content_type.as_str()
        };

        let part = Part::bytes(upload.bytes.to_vec())
            .file_name(upload.filename.clone())
            .mime_str(mime)
            .map_err(|e| Error::InvalidUpload(format!("{}: bad content type: {}", upload.filename, e)))?;

        let form = Form::new()
            .text("purpose", FILE_PURPOSE)
            .part("file", part);

        debug!("Uploading {} ({} bytes)", upload.filename, upload.bytes.len());
        self.send_json(self.client.post(self.url("/files")).multipart(form))
            .await
    }

    async fn attach_file(&self, vector_store_id: &str, file_id: &str) -> Result<()> {
        self.send(
            self.client
                .post(self.url(&format!("/vector_stores/{}/files", vector_store_id)))
                .json(&json!({ "file_id": file_id })),
        )
        .await?;
        Ok(())
    }
}

/// Decode a raw SSE byte stream into response events.
///
/// Stops after the first error, at `[DONE]`, or when the byte stream ends.
pub fn decode_events<S, B, E>(bytes: S) -> impl Stream<Item = Result<ResponseEvent>> + Send + 'static
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    async_stream::stream! {
        tokio::pin!(bytes);
        let mut decoder = SseDecoder::new();

        while let Some(chunk) = bytes.next().await {
            let chunk = match chunk {
                Ok(c) => c,
                Err(e) => {
                    yield Err(Error::Stream(format!("Stream read error: {}", e)));
                    return;
                }
            };

            for payload in decoder.push(chunk.as_ref()) {
                match parse_event(&payload) {
                    Ok(Some(event)) => yield Ok(event),
                    Ok(None) => return,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
        }

        if let Some(payload) = decoder.finish() {
            match parse_event(&payload) {
                Ok(Some(event)) => yield Ok(event),
                Ok(None) => {}
                Err(e) => yield Err(e),
            }
        }
    }
}
