// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! CRD availability checking utilities

use crate::constants::crd::{POLL_INTERVAL_SECS, POLL_MAX_INTERVAL_SECS};
use crate::constants::API_GROUP;
use crate::error::Result;
use crate::types::{Infra, Runtime};
use kube::{discovery::Discovery, Client, Resource};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

/// Next polling interval, doubling up to the cap
pub fn next_interval(interval: u64) -> u64 {
    interval.saturating_mul(2).min(POLL_MAX_INTERVAL_SECS)
}

/// Wait for the Runtime and Infra CRDs to become available in the cluster.
/// This uses exponential backoff starting at POLL_INTERVAL_SECS seconds.
pub async fn wait_for_crds(client: &Client) -> Result<()> {
    let mut interval = POLL_INTERVAL_SECS;

    loop {
        match missing_kinds(client).await {
            Ok(missing) if missing.is_empty() => {
                info!("Runtime and Infra CRDs ({}) are available", API_GROUP);
                return Ok(());
            }
            Ok(missing) => {
                info!(
                    "CRDs {:?} ({}) not yet available, waiting {} seconds...",
                    missing, API_GROUP, interval
                );
            }
            Err(e) => {
                warn!(
                    "Error checking for CRDs: {}, retrying in {} seconds...",
                    e, interval
                );
            }
        }

        sleep(Duration::from_secs(interval)).await;
        interval = next_interval(interval);
    }
}

/// Kinds of the operator's API group not yet served by the cluster
async fn missing_kinds(client: &Client) -> Result<Vec<String>> {
    let discovery = Discovery::new(client.clone())
        .filter(&[API_GROUP])
        .run()
        .await?;

    let wanted = [
        (Runtime::kind(&()).to_string(), Runtime::version(&()).to_string()),
        (Infra::kind(&()).to_string(), Infra::version(&()).to_string()),
    ];

    let served: Vec<(String, String)> = discovery
        .groups()
        .filter(|g| g.name() == API_GROUP)
        .flat_map(|g| g.recommended_resources())
        .map(|(ar, _)| (ar.kind, ar.version))
        .collect();

    Ok(wanted
        .into_iter()
        .filter(|w| !served.contains(w))
        .map(|(kind, _)| kind)
        .collect())
}
