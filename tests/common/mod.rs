#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use env_logger::{Builder, Env};
use newscheck::{ModelError, Transport};

// Initialize test logger
pub fn init() {
    let _ = Builder::from_env(Env::default().default_filter_or("warn"))
        .is_test(true)
        .try_init();
}

/// Builds the JSON body Ollama returns for a non-streaming completion.
pub fn completion_body(text: &str) -> Vec<u8> {
    serde_json::json!({
        "model": "llama3:8b",
        "created_at": "2024-05-01T10:00:00Z",
        "response": text,
        "done": true,
        "total_duration": 1_250_000_000u64,
        "eval_count": 42,
    })
    .to_string()
    .into_bytes()
}

pub fn connection_refused() -> ModelError {
    ModelError::Connection {
        endpoint: "http://localhost:11434".into(),
        reason: "connection refused".into(),
    }
}

/// Transport that replays a script of outcomes, then repeats `fallback`.
#[derive(Debug)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<Vec<u8>, ModelError>>>,
    fallback: Result<Vec<u8>, ModelError>,
    posts: AtomicU32,
    gets: AtomicU32,
    last_body: Mutex<Option<serde_json::Value>>,
}

impl ScriptedTransport {
    pub fn new(
        script: Vec<Result<Vec<u8>, ModelError>>,
        fallback: Result<Vec<u8>, ModelError>,
    ) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            posts: AtomicU32::new(0),
            gets: AtomicU32::new(0),
            last_body: Mutex::new(None),
        }
    }

    pub fn always(outcome: Result<Vec<u8>, ModelError>) -> Self {
        Self::new(Vec::new(), outcome)
    }

    pub fn posts(&self) -> u32 {
        self.posts.load(Ordering::SeqCst)
    }

    pub fn gets(&self) -> u32 {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn last_body(&self) -> Option<serde_json::Value> {
        self.last_body.lock().unwrap().clone()
    }

    fn next(&self) -> Result<Vec<u8>, ModelError> {
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

impl Transport for ScriptedTransport {
    async fn post_json(
        &self,
        _path: &str,
        body: &serde_json::Value,
    ) -> Result<Vec<u8>, ModelError> {
        self.posts.fetch_add(1, Ordering::SeqCst);
        *self.last_body.lock().unwrap() = Some(body.clone());
        self.next()
    }

    async fn get(&self, _path: &str) -> Result<Vec<u8>, ModelError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.next()
    }
}
