// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::Result;
use kube::Client;
use tracing::info;
use tracing_subscriber::EnvFilter;

use runtime_operator::config::Config;
use runtime_operator::kubernetes::wait_for_crds;
use runtime_operator::reconcilers::RuntimeController;
use runtime_operator::shutdown::Shutdown;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting Runtime operator");

    // Load configuration
    let config = Config::from_env()?;
    info!(
        "Configuration loaded: watch_namespace={:?}, default_image_tag={}, data_index={}",
        config.watch_namespace, config.default_image_tag, config.data_index_name
    );

    // Create Kubernetes client
    let client = Client::try_default().await?;
    info!("Connected to Kubernetes cluster");

    // Wait for the Runtime and Infra CRDs before starting the controller
    info!("Waiting for Runtime and Infra CRDs to become available...");
    wait_for_crds(&client).await?;

    let (trigger, shutdown) = Shutdown::new();
    tokio::spawn(trigger.trigger_on_signal());

    info!("Starting Runtime controller...");
    RuntimeController::new(client, config, shutdown).run().await?;

    info!("Runtime operator stopped");
    Ok(())
}
