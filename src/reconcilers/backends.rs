// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Cluster-facing collaborators of the Runtime reconcile pass.
//!
//! The pass only depends on these traits. The kube-backed implementations live
//! in [`crate::kubernetes`] and [`crate::deploy`]; tests plug in fakes.

use crate::config::Config;
use crate::deploy::{Deployer, KubeServiceDeployer};
use crate::error::Result;
use crate::kubernetes::{AccessControlObject, KubeInstanceFetcher, KubeObjectCreator, ProtoBufMounter};
use crate::types::Runtime;
use async_trait::async_trait;
use kube::Client;
use std::sync::Arc;

/// Loads the current state of a Runtime
#[async_trait]
pub trait InstanceFetcher: Send + Sync {
    /// `Ok(None)` when the Runtime no longer exists
    async fn fetch(&self, name: &str, namespace: &str) -> Result<Option<Runtime>>;
}

/// Creates objects unless they already exist
#[async_trait]
pub trait ObjectCreator: Send + Sync {
    /// Returns whether the object was created. An existing object is not an error.
    async fn create_if_not_exists(&self, object: AccessControlObject) -> Result<bool>;
}

/// Pushes configuration implied by a Runtime into a dependent service
#[async_trait]
pub trait MountPropagator: Send + Sync {
    async fn mount_config(&self, instance: &Runtime) -> Result<()>;
}

/// The set of collaborators a reconciler works against
#[derive(Clone)]
pub struct Backends {
    pub fetcher: Arc<dyn InstanceFetcher>,
    pub creator: Arc<dyn ObjectCreator>,
    pub mounter: Arc<dyn MountPropagator>,
    pub deployer: Arc<dyn Deployer>,
}

impl Backends {
    /// Collaborators talking to the cluster through the given client
    pub fn kube(client: Client, config: &Config) -> Self {
        Self {
            fetcher: Arc::new(KubeInstanceFetcher::new(client.clone())),
            creator: Arc::new(KubeObjectCreator::new(client.clone())),
            mounter: Arc::new(ProtoBufMounter::new(
                client.clone(),
                config.data_index_name.clone(),
            )),
            deployer: Arc::new(KubeServiceDeployer::new(
                client,
                config.default_image_registry.clone(),
            )),
        }
    }
}
