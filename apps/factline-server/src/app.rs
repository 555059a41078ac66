//! Application state and initialization

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use factline_adapters::{ClientRegistry, MemoryQueue};
use factline_answer::AnswerService;
use factline_core::FactlineConfig;
use factline_ingestion::IngestionService;
use factline_ledger::{MemoryLedger, StatusLedger};

use crate::cli::Args;
use crate::server::Server;
use crate::worker::Workers;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: FactlineConfig,
    pub ledger: StatusLedger,
    pub clients: ClientRegistry,
    pub queue: Arc<MemoryQueue>,
    pub ingestion: Arc<IngestionService>,
    pub answer: Arc<AnswerService>,
}

impl AppState {
    /// Create a new application state with all dependencies
    pub fn new(config: FactlineConfig) -> Result<Self> {
        info!("Initializing application components");

        // Memory adapters back the default deployment; production swaps
        // real clients into the registry here
        let queue = Arc::new(MemoryQueue::new());
        let clients = ClientRegistry::in_memory(queue.clone(), config.embedding.dimension);
        let ledger = StatusLedger::new(Arc::new(MemoryLedger::new()));

        let ingestion = Arc::new(
            IngestionService::new(ledger.clone(), clients.clone(), config.clone())
                .map_err(|e| anyhow::anyhow!("Failed to create ingestion service: {}", e))?,
        );
        let answer = Arc::new(AnswerService::new(
            ledger.clone(),
            clients.clone(),
            config.clone(),
        ));

        Ok(Self {
            config,
            ledger,
            clients,
            queue,
            ingestion,
            answer,
        })
    }
}

/// Main application
pub struct App {
    args: Args,
    state: AppState,
}

impl App {
    /// Build the application with all dependencies
    pub async fn build(args: Args) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => FactlineConfig::load_from_file(&path.to_string_lossy())
                .context("Failed to load configuration file")?,
            None => FactlineConfig::load().context("Failed to load configuration")?,
        };

        if let Some(port) = args.port {
            config.server.port = port;
        }

        let state = AppState::new(config)?;

        Ok(Self { args, state })
    }

    /// Run the application
    pub async fn run(self) -> Result<()> {
        info!("Starting server");
        info!("HTTP port: {}", self.state.config.server.port);

        // Queue worker loops stand in for the triggering runtime's
        // at-least-once message delivery
        let workers = Workers::new(self.state.clone());
        workers.spawn();

        let server = Server::new(self.args, self.state)?;
        server.run().await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_state_creation() {
        let result = AppState::new(FactlineConfig::default());
        assert!(result.is_ok());
    }
}
