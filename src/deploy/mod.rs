// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Convergence of the workload objects behind a Runtime.
//!
//! The reconcile pass hands a [`ServiceDefinition`] to a [`Deployer`] once per
//! pass. The deployer reports how long to wait before the next pass, zero once
//! everything it manages has converged.

pub mod definition;
pub mod hooks;
pub mod service;

pub use definition::{HealthCheckProbe, ServiceDefinition};
pub use hooks::RuntimeHooks;
pub use service::KubeServiceDeployer;

use crate::error::Result;
use crate::types::Runtime;
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::ConfigMap;
use std::time::Duration;

/// Drives the objects described by a service definition towards convergence
#[async_trait]
pub trait Deployer: Send + Sync {
    /// Returns the delay after which the Runtime should be reconciled again,
    /// `Duration::ZERO` when converged.
    async fn deploy(&self, definition: &ServiceDefinition, instance: &Runtime) -> Result<Duration>;
}

/// Strategies the controller injects into the deployer
pub trait ServiceHooks: Send + Sync {
    /// Adjust the Deployment built for the Runtime before it is applied
    fn on_deployment_create(&self, deployment: &mut Deployment, instance: &Runtime) -> Result<()>;

    /// Additional ConfigMaps to apply alongside the Deployment
    fn on_objects_create(&self, instance: &Runtime) -> Result<Vec<ConfigMap>>;

    /// How the deployer decides whether a live object already matches
    fn comparators(&self) -> Comparators {
        Comparators::default()
    }
}

/// Equality checks between a live object (first) and its desired state (second)
#[derive(Clone, Copy)]
pub struct Comparators {
    pub deployment: fn(&Deployment, &Deployment) -> bool,
    pub config_map: fn(&ConfigMap, &ConfigMap) -> bool,
}

impl Default for Comparators {
    fn default() -> Self {
        Self {
            deployment: |live, desired| live.spec == desired.spec,
            config_map: |live, desired| live.data == desired.data,
        }
    }
}
