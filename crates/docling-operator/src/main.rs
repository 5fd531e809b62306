//! docling-operator binary

use anyhow::Context as _;
use clap::Parser;
use kube::{Client, CustomResourceExt};

use docling_common::crd::DoclingServ;
use docling_common::telemetry::init_telemetry;
use docling_operator::config::{Cli, Commands, OperatorConfig};
use docling_operator::controller_runner::{build_status_controller, ensure_crd_installed};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.crd {
        let crd = serde_yaml::to_string(&DoclingServ::crd())
            .map_err(|e| anyhow::anyhow!("Failed to serialize CRD: {}", e))?;
        println!("{crd}");
        return Ok(());
    }

    init_telemetry(cli.config.telemetry())?;

    match cli.command {
        Some(Commands::Controller) | None => run_controller(cli.config).await,
    }
}

async fn run_controller(config: OperatorConfig) -> anyhow::Result<()> {
    let client = Client::try_default()
        .await
        .context("failed to create Kubernetes client")?;

    if config.install_crd {
        ensure_crd_installed(&client)
            .await
            .context("failed to install DoclingServ CRD")?;
    }

    tracing::info!("Starting docling-operator controllers...");
    build_status_controller(client, &config).await;
    tracing::info!("docling-operator shutting down");
    Ok(())
}
