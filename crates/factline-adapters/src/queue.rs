//! Queue transport contract
//!
//! The pipelines only ever send; consumption happens in the triggering
//! runtime. The memory implementation exposes a receive side so the server
//! binary's worker loops can stand in for that runtime, with at-least-once
//! semantics approximated by requeue-on-request.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::Result;

/// Narrow send-only contract over the queue transport.
#[async_trait]
pub trait QueueClient: Send + Sync {
    async fn send(&self, queue: &str, payload: Vec<u8>) -> Result<()>;
}

/// In-memory queue for tests and dev mode.
#[derive(Clone, Default)]
pub struct MemoryQueue {
    queues: Arc<RwLock<HashMap<String, VecDeque<Vec<u8>>>>>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pop the next message, if any; used by the server worker loops.
    pub async fn pop(&self, queue: &str) -> Option<Vec<u8>> {
        self.queues.write().await.get_mut(queue)?.pop_front()
    }

    /// Redeliver a message after an infrastructure failure.
    pub async fn requeue(&self, queue: &str, payload: Vec<u8>) {
        self.queues
            .write()
            .await
            .entry(queue.to_string())
            .or_default()
            .push_back(payload);
    }

    pub async fn len(&self, queue: &str) -> usize {
        self.queues
            .read()
            .await
            .get(queue)
            .map(|q| q.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl QueueClient for MemoryQueue {
    async fn send(&self, queue: &str, payload: Vec<u8>) -> Result<()> {
        debug!(queue = %queue, bytes = payload.len(), "Enqueueing message");
        self.queues
            .write()
            .await
            .entry(queue.to_string())
            .or_default()
            .push_back(payload);
        Ok(())
    }
}
