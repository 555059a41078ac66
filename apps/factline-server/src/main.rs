mod app;
mod cli;
mod server;
mod telemetry;
mod worker;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use crate::app::App;
use crate::cli::Args;
use crate::telemetry::init_telemetry;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    let _guards = init_telemetry(&args)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %args.env,
        "Starting Factline server"
    );

    let result = App::build(args).await?.run().await;
    if let Err(ref e) = result {
        error!("Server exited with error: {:#}", e);
    }
    info!("Server shutdown complete");

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Args::command().debug_assert()
    }
}
