// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Runtime reconciler - a single reconcile pass for one Runtime key.
//!
//! A pass fetches the Runtime, bootstraps the service viewer access-control
//! objects, mounts its configuration on the data-index service and hands the
//! rest to the deployer. Every step is idempotent, so a pass can be repeated
//! any number of times; all retrying is left to the controller's scheduler.

use crate::config::Config;
use crate::deploy::{HealthCheckProbe, RuntimeHooks, ServiceDefinition, ServiceHooks};
use crate::error::Result;
use crate::kubernetes::service_viewer_objects;
use crate::reconcilers::backends::Backends;
use crate::reconcilers::backoff::ErrorBackoff;
use crate::shutdown::Shutdown;
use crate::types::{ReconcileRequest, Runtime};
use kube::runtime::controller::Action;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument};

pub struct RuntimeReconciler {
    backends: Backends,
    hooks: Arc<dyn ServiceHooks>,
    default_image_tag: String,
    shutdown: Shutdown,
    pub(crate) backoff: ErrorBackoff,
}

impl RuntimeReconciler {
    pub fn new(backends: Backends, config: &Config, shutdown: Shutdown) -> Self {
        Self {
            backends,
            hooks: Arc::new(RuntimeHooks::new(config.data_index_name.clone())),
            default_image_tag: config.default_image_tag.clone(),
            shutdown,
            backoff: ErrorBackoff::new(),
        }
    }

    /// Run one reconcile pass for the given key
    #[instrument(skip(self), fields(request = %request))]
    pub async fn reconcile(&self, request: &ReconcileRequest) -> Result<Action> {
        info!("Reconciling Runtime {}", request);

        let Some(instance) = self
            .backends
            .fetcher
            .fetch(&request.name, &request.namespace)
            .await?
        else {
            debug!("Runtime {} not found", request);
            return Ok(Action::await_change());
        };

        if self.stopping(request) {
            return Ok(Action::await_change());
        }
        self.setup_rbac(&request.namespace).await?;

        if self.stopping(request) {
            return Ok(Action::await_change());
        }
        if let Err(e) = self.backends.mounter.mount_config(&instance).await {
            error!(
                "Failed to mount protobuf ConfigMaps of Runtime {} on data index: {}",
                request, e
            );
            return Err(e);
        }

        if self.stopping(request) {
            return Ok(Action::await_change());
        }
        let definition = self.service_definition(request, &instance);
        let requeue_after = self
            .backends
            .deployer
            .deploy(&definition, &instance)
            .await?;

        if requeue_after > Duration::ZERO {
            info!(
                "Waiting for all resources of {} to be created, scheduling for {:?} from now",
                request, requeue_after
            );
            return Ok(Action::requeue(requeue_after));
        }
        Ok(Action::await_change())
    }

    /// Ensure the service viewer role, service account and role binding exist,
    /// in that order. Already existing objects are left untouched.
    async fn setup_rbac(&self, namespace: &str) -> Result<()> {
        for object in service_viewer_objects(namespace) {
            let description = object.to_string();
            match self.backends.creator.create_if_not_exists(object).await {
                Ok(true) => debug!("Created {}", description),
                Ok(false) => {}
                Err(e) => {
                    error!("Failed to create {} for service viewer: {}", description, e);
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// Service definition handed to the deployer for this Runtime
    pub fn service_definition(&self, request: &ReconcileRequest, instance: &Runtime) -> ServiceDefinition {
        ServiceDefinition {
            request: request.clone(),
            default_image_tag: self.default_image_tag.clone(),
            single_replica: false,
            hooks: self.hooks.clone(),
            custom_service: true,
            health_check_probe: HealthCheckProbe::for_runtime(instance.runtime_type()),
        }
    }

    fn stopping(&self, request: &ReconcileRequest) -> bool {
        let stopping = self.shutdown.is_triggered();
        if stopping {
            info!("Shutting down, leaving Runtime {} for the next start", request);
        }
        stopping
    }
}
