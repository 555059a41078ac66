//! Queue worker loops
//!
//! Stand-in for the triggering runtime's message delivery: each loop
//! drains one queue and invokes the matching processing stage. Failures
//! are logged and the loop continues; the memory queue carries no
//! delivery count, so failed messages are not redelivered here.

use std::time::Duration;
use tracing::{error, info, warn};

use factline_core::{AnswerMessage, IngestionMessage};

use crate::app::AppState;

const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct Workers {
    state: AppState,
}

impl Workers {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    pub fn spawn(self) {
        let ingestion_state = self.state.clone();
        tokio::spawn(async move {
            info!("Ingestion worker started");
            run_ingestion_loop(ingestion_state).await;
        });

        let answer_state = self.state;
        tokio::spawn(async move {
            info!("Answer worker started");
            run_answer_loop(answer_state).await;
        });
    }
}

async fn run_ingestion_loop(state: AppState) {
    let queue_name = state.config.queues.ingestion_queue.clone();

    loop {
        let Some(payload) = state.queue.pop(&queue_name).await else {
            tokio::time::sleep(IDLE_POLL_INTERVAL).await;
            continue;
        };

        let message: IngestionMessage = match serde_json::from_slice(&payload) {
            Ok(message) => message,
            Err(e) => {
                warn!(queue = %queue_name, error = %e, "Discarding undecodable message");
                continue;
            }
        };

        if let Err(e) = state.ingestion.process(&message).await {
            error!(
                document_id = %message.document_id,
                error = %e,
                "Ingestion processing failed"
            );
        }
    }
}

async fn run_answer_loop(state: AppState) {
    let queue_name = state.config.queues.answer_queue.clone();

    loop {
        let Some(payload) = state.queue.pop(&queue_name).await else {
            tokio::time::sleep(IDLE_POLL_INTERVAL).await;
            continue;
        };

        let message: AnswerMessage = match serde_json::from_slice(&payload) {
            Ok(message) => message,
            Err(e) => {
                warn!(queue = %queue_name, error = %e, "Discarding undecodable message");
                continue;
            }
        };

        if let Err(e) = state.answer.process(&message).await {
            error!(
                transaction_id = %message.transaction_id,
                error = %e,
                "Answer processing failed"
            );
        }
    }
}
