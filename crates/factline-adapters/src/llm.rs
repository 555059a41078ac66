//! Embedding and chat completion contracts
//!
//! Both backends are external model services. The fakes here are
//! deterministic so pipeline tests can assert on exact outputs.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::{AdapterError, Result};

/// Batched text embedding contract.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Embed a batch of texts; one vector per input, in order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Vector dimension this backend produces.
    fn dimension(&self) -> usize;
}

/// Chat completion contract.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;
}

/// Deterministic embedding fake: folds character codes into a fixed-size
/// vector so similar texts land near each other without a model.
pub struct HashEmbeddingClient {
    dimension: usize,
}

impl HashEmbeddingClient {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

#[async_trait]
impl EmbeddingClient for HashEmbeddingClient {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| {
                let mut vector = vec![0.0f32; self.dimension];
                for (i, byte) in text.bytes().enumerate() {
                    vector[i % self.dimension] += byte as f32 / 255.0;
                }
                vector
            })
            .collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Chat fake that reflects the prompts back; dev-mode default.
#[derive(Default)]
pub struct EchoChatClient;

impl EchoChatClient {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ChatClient for EchoChatClient {
    async fn complete(&self, _system_prompt: &str, user_prompt: &str) -> Result<String> {
        Ok(format!("Echo: {}", user_prompt))
    }
}

/// Chat fake that replays scripted responses in order; used by tests that
/// need a model answer carrying a citation manifest.
pub struct ScriptedChatClient {
    responses: Arc<Mutex<VecDeque<String>>>,
}

impl ScriptedChatClient {
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses.into())),
        }
    }
}

#[async_trait]
impl ChatClient for ScriptedChatClient {
    async fn complete(&self, _system_prompt: &str, _user_prompt: &str) -> Result<String> {
        self.responses
            .lock()
            .await
            .pop_front()
            .ok_or_else(|| AdapterError::Chat("No scripted response left".to_string()))
    }
}
