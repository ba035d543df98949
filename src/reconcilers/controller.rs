// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Runtime controller - wires watches, event admission and the reconciler
//! into a kube-runtime `Controller`.

use crate::config::Config;
use crate::error::{OperatorError, Result};
use crate::reconcilers::backends::Backends;
use crate::reconcilers::runtime::RuntimeReconciler;
use crate::shutdown::Shutdown;
use crate::types::{Infra, ReconcileRequest, Runtime};
use crate::watch::{admitted, runtime_owners};
use futures::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, Service};
use kube::{
    runtime::{
        controller::Action,
        reflector::{self, ObjectRef, Store},
        watcher, Controller, WatchStreamExt,
    },
    Api, Client, ResourceExt,
};
use kube_runtime::watcher::Config as WatcherConfig;
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub struct RuntimeController {
    client: Client,
    config: Config,
    reconciler: RuntimeReconciler,
}

struct Context {
    reconciler: RuntimeReconciler,
    store: Store<Runtime>,
}

impl Context {
    /// Forget backoff state of Runtimes that left the cache. Deleted objects
    /// are never reconciled again, so their counts would otherwise stay.
    fn prune_backoff(&self) {
        self.reconciler.backoff.retain(|request| {
            self.store
                .get(&ObjectRef::<Runtime>::new(&request.name).within(&request.namespace))
                .is_some()
        });
    }
}

impl RuntimeController {
    pub fn new(client: Client, config: Config, shutdown: Shutdown) -> Self {
        let backends = Backends::kube(client.clone(), &config);
        let reconciler = RuntimeReconciler::new(backends, &config, shutdown);
        Self {
            client,
            config,
            reconciler,
        }
    }

    fn api<K>(&self) -> Api<K>
    where
        K: kube::Resource<Scope = k8s_openapi::NamespaceResourceScope>
            + Clone
            + DeserializeOwned
            + Debug,
        K::DynamicType: Default,
    {
        match &self.config.watch_namespace {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::all(self.client.clone()),
        }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let runtimes: Api<Runtime> = self.api();
        let infras: Api<Infra> = self.api();
        let deployments: Api<Deployment> = self.api();
        let services: Api<Service> = self.api();
        let config_maps: Api<ConfigMap> = self.api();

        info!(
            "Watching Runtimes in {}",
            self.config
                .watch_namespace
                .as_deref()
                .unwrap_or("all namespaces")
        );

        let (reader, writer) = reflector::store();
        let triggers = admitted(
            watcher(runtimes, WatcherConfig::default())
                .default_backoff()
                .reflect(writer),
        );

        let context = Arc::new(Context {
            reconciler: self.reconciler,
            store: reader.clone(),
        });

        Controller::for_stream(triggers, reader)
            .owns(deployments, WatcherConfig::default())
            .owns(services, WatcherConfig::default())
            .owns(config_maps, WatcherConfig::default())
            .watches(infras, WatcherConfig::default(), |infra| runtime_owners(&infra))
            .shutdown_on_signal()
            .run(reconcile, error_policy, context)
            .for_each(|res| async move {
                match res {
                    Ok(o) => debug!("Reconciled runtime: {:?}", o),
                    Err(e) => warn!("Reconciliation error: {:?}", e),
                }
            })
            .await;

        info!("Runtime controller stopped");
        Ok(())
    }
}

fn request_for(runtime: &Runtime) -> ReconcileRequest {
    ReconcileRequest::new(runtime.name_any(), runtime.namespace().unwrap_or_default())
}

async fn reconcile(runtime: Arc<Runtime>, ctx: Arc<Context>) -> Result<Action> {
    let request = request_for(&runtime);
    let action = ctx.reconciler.reconcile(&request).await?;
    ctx.reconciler.backoff.reset(&request);
    ctx.prune_backoff();
    Ok(action)
}

fn error_policy(
    runtime: Arc<Runtime>,
    error: &OperatorError,
    ctx: Arc<Context>,
) -> Action {
    ctx.prune_backoff();
    let request = request_for(&runtime);
    let delay = ctx.reconciler.backoff.next_delay(&request);
    error!(
        "Reconciliation of {} failed: {}, retrying in {:?}",
        request, error, delay
    );
    Action::requeue(delay)
}
