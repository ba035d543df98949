// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Instance fetching and idempotent object creation

use crate::error::Result;
use crate::kubernetes::rbac::AccessControlObject;
use crate::reconcilers::backends::{InstanceFetcher, ObjectCreator};
use crate::types::Runtime;
use async_trait::async_trait;
use k8s_openapi::NamespaceResourceScope;
use kube::{api::PostParams, Api, Client, Resource, ResourceExt};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;
use tracing::{debug, info, instrument};

/// Create a namespaced object unless one with the same name already exists.
/// Returns whether the object was created.
pub async fn create_if_not_exists<K>(client: &Client, object: &K) -> Result<bool>
where
    K: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Serialize + Debug,
    K::DynamicType: Default,
{
    let name = object.name_any();
    let namespace = object.namespace().unwrap_or_default();
    let kind = K::kind(&Default::default()).to_string();
    let api: Api<K> = Api::namespaced(client.clone(), &namespace);

    if api.get_opt(&name).await?.is_some() {
        debug!("{} {}/{} already exists", kind, namespace, name);
        return Ok(false);
    }

    match api.create(&PostParams::default(), object).await {
        Ok(_) => {
            info!("{} {}/{} created", kind, namespace, name);
            Ok(true)
        }
        // Lost a race with another writer, the object exists now
        Err(kube::Error::Api(err)) if err.code == 409 => {
            debug!("{} {}/{} was created concurrently", kind, namespace, name);
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

/// [`ObjectCreator`] backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeObjectCreator {
    client: Client,
}

impl KubeObjectCreator {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectCreator for KubeObjectCreator {
    #[instrument(skip(self, object), fields(object = %object))]
    async fn create_if_not_exists(&self, object: AccessControlObject) -> Result<bool> {
        match &object {
            AccessControlObject::Role(role) => create_if_not_exists(&self.client, role).await,
            AccessControlObject::ServiceAccount(account) => {
                create_if_not_exists(&self.client, account).await
            }
            AccessControlObject::RoleBinding(binding) => {
                create_if_not_exists(&self.client, binding).await
            }
        }
    }
}

/// [`InstanceFetcher`] backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeInstanceFetcher {
    client: Client,
}

impl KubeInstanceFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl InstanceFetcher for KubeInstanceFetcher {
    #[instrument(skip(self))]
    async fn fetch(&self, name: &str, namespace: &str) -> Result<Option<Runtime>> {
        let runtimes: Api<Runtime> = Api::namespaced(self.client.clone(), namespace);
        Ok(runtimes.get_opt(name).await?)
    }
}
