//! Scripted provider fakes and a router wired to them.

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use parking_lot::Mutex;
use tokio::sync::Notify;

use chatrelay_chat::{
    EventStream, FileService, FileUpload, ModelService, RemoteFile, ResponseEvent, ResponseRequest,
    VectorStore, VectorStoreList,
};
use chatrelay_core::{Error, RelayConfig, Result};

use crate::routes::build_router;
use crate::state::AppState;

/// One step of a scripted upstream response.
#[derive(Clone)]
pub enum Step {
    Delta(&'static str),
    Other(&'static str),
    Completed,
    /// Upstream failure after streaming started.
    Fail(&'static str),
    /// Block until the test releases the gate.
    Wait(Arc<Notify>),
    Panic,
}

pub struct FakeModel {
    script: Vec<Step>,
    /// Scripts keyed on the first input message; `script` is the fallback.
    by_prompt: Vec<(&'static str, Vec<Step>)>,
    fail_before_stream: bool,
    pub requests: Mutex<Vec<ResponseRequest>>,
}

impl FakeModel {
    pub fn new(script: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            script,
            by_prompt: Vec::new(),
            fail_before_stream: false,
            requests: Mutex::new(Vec::new()),
        })
    }

    /// A model that answers each prompt with its own script.
    pub fn by_prompt(scripts: Vec<(&'static str, Vec<Step>)>) -> Arc<Self> {
        Arc::new(Self {
            script: Vec::new(),
            by_prompt: scripts,
            fail_before_stream: false,
            requests: Mutex::new(Vec::new()),
        })
    }

    /// A model whose call fails before any event is produced.
    pub fn unavailable() -> Arc<Self> {
        Arc::new(Self {
            script: Vec::new(),
            by_prompt: Vec::new(),
            fail_before_stream: true,
            requests: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl ModelService for FakeModel {
    async fn stream_response(&self, request: ResponseRequest) -> Result<EventStream> {
        let prompt = request.input.first().map(|m| m.content.clone());
        self.requests.lock().push(request);
        if self.fail_before_stream {
            return Err(Error::Upstream {
                status: 503,
                body: "upstream unavailable".into(),
            });
        }

        let script = self
            .by_prompt
            .iter()
            .find(|(key, _)| prompt.as_deref() == Some(*key))
            .map(|(_, steps)| steps.clone())
            .unwrap_or_else(|| self.script.clone());
        Ok(Box::pin(async_stream::stream! {
            for step in script {
                match step {
                    Step::Delta(text) => yield Ok(ResponseEvent::OutputTextDelta { delta: text.to_string() }),
                    Step::Other(kind) => yield Ok(ResponseEvent::Other { kind: kind.to_string() }),
                    Step::Completed => yield Ok(ResponseEvent::Completed),
                    Step::Fail(message) => {
                        yield Err(Error::Stream(message.to_string()));
                        return;
                    }
                    Step::Wait(gate) => gate.notified().await,
                    Step::Panic => panic!("scripted upstream panic"),
                }
            }
        }))
    }
}

#[derive(Default)]
pub struct FakeFilesState {
    pub stores: Vec<VectorStore>,
    pub uploads: Vec<(String, String, usize)>,
    pub attached: Vec<(String, String)>,
    pub list_calls: usize,
    pub create_calls: usize,
    pub fail_upload_for: Option<String>,
}

pub struct FakeFiles {
    pub state: Mutex<FakeFilesState>,
}

impl FakeFiles {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(FakeFilesState::default()),
        })
    }

    pub fn failing_on(filename: &str) -> Arc<Self> {
        let files = Self::new();
        files.state.lock().fail_upload_for = Some(filename.to_string());
        files
    }
}

#[async_trait]
impl FileService for FakeFiles {
    async fn list_vector_stores(&self, _after: Option<&str>) -> Result<VectorStoreList> {
        let mut state = self.state.lock();
        state.list_calls += 1;
        Ok(VectorStoreList {
            data: state.stores.clone(),
            has_more: false,
            last_id: state.stores.last().map(|s| s.id.clone()),
        })
    }

    async fn create_vector_store(&self, name: &str) -> Result<VectorStore> {
        let mut state = self.state.lock();
        state.create_calls += 1;
        let store = VectorStore {
            id: format!("vs_{}", state.create_calls),
            name: Some(name.to_string()),
        };
        state.stores.push(store.clone());
        Ok(store)
    }

    async fn upload_file(&self, upload: FileUpload) -> Result<RemoteFile> {
        let mut state = self.state.lock();
        if state.fail_upload_for.as_deref() == Some(upload.filename.as_str()) {
            return Err(Error::Upstream {
                status: 500,
                body: "upload failed".into(),
            });
        }
        state
            .uploads
            .push((upload.filename.clone(), upload.content_type.clone(), upload.bytes.len()));
        Ok(RemoteFile {
            id: format!("file-{}", state.uploads.len()),
            filename: Some(upload.filename),
            bytes: Some(upload.bytes.len() as u64),
        })
    }

    async fn attach_file(&self, vector_store_id: &str, file_id: &str) -> Result<()> {
        self.state
            .lock()
            .attached
            .push((vector_store_id.to_string(), file_id.to_string()));
        Ok(())
    }
}

pub fn test_config() -> RelayConfig {
    RelayConfig {
        host: "127.0.0.1".into(),
        port: 0,
        api_key: "sk-test".into(),
        base_url: "http://127.0.0.1:0/v1".into(),
        model: "gpt-4o".into(),
        vector_store_name: "test-store".into(),
        max_upload_bytes: 1024 * 1024,
    }
}

/// Router backed by the given fakes. The fakes are returned for inspection.
pub fn test_router(
    model: Arc<FakeModel>,
    files: Arc<FakeFiles>,
) -> (Router, Arc<FakeModel>, Arc<FakeFiles>) {
    let state = Arc::new(AppState::new(test_config(), model.clone(), files.clone()));
    (build_router(state), model, files)
}
