//! HTTP Server implementation

use anyhow::{Context, Result};
use axum::Router;
use std::net::SocketAddr;
use tracing::info;

use factline_api::{create_router, AppState as ApiAppState};

use crate::app::AppState;
use crate::cli::Args;

pub struct Server {
    state: AppState,
}

impl Server {
    pub fn new(_args: Args, state: AppState) -> Result<Self> {
        Ok(Self { state })
    }

    pub async fn run(self) -> Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.state.config.server.port));

        let app = self.build_http_router();

        info!("HTTP server listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .context("Failed to bind HTTP server")?;

        axum::serve(listener, app.into_make_service())
            .await
            .context("HTTP server error")?;

        Ok(())
    }

    fn build_http_router(&self) -> Router {
        let api_state = ApiAppState::new(
            self.state.ingestion.clone(),
            self.state.answer.clone(),
            self.state.ledger.clone(),
        );

        create_router(api_state)
    }
}
