// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Mounts the protobuf ConfigMaps published by a Runtime on the data-index
//! Deployment of its namespace.

use crate::constants::{labels, PROTOBUF_MOUNT_ROOT};
use crate::error::{OperatorError, Result};
use crate::reconcilers::backends::MountPropagator;
use crate::types::Runtime;
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, ConfigMapVolumeSource, Volume, VolumeMount};
use kube::{
    api::{ListParams, Patch, PatchParams},
    Api, Client, ResourceExt,
};
use serde_json::{json, Value};
use tracing::{debug, info, instrument};

/// Label selector matching the protobuf ConfigMaps of a Runtime
pub fn protobuf_selector(runtime_name: &str) -> String {
    format!("{}=true,{}={}", labels::PROTOBUF, labels::APP, runtime_name)
}

/// Volume and mount for a protobuf ConfigMap, both named after the ConfigMap
pub fn protobuf_volume(config_map: &str) -> (Volume, VolumeMount) {
    let volume = Volume {
        name: config_map.to_string(),
        config_map: Some(ConfigMapVolumeSource {
            name: config_map.to_string(),
            ..Default::default()
        }),
        ..Default::default()
    };
    let mount = VolumeMount {
        name: config_map.to_string(),
        mount_path: format!("{}/{}", PROTOBUF_MOUNT_ROOT, config_map),
        read_only: Some(true),
        ..Default::default()
    };
    (volume, mount)
}

/// Strategic merge patch adding the volumes and mounts the data-index
/// Deployment lacks for the given ConfigMaps. `None` when nothing is missing.
pub fn protobuf_mount_patch(
    data_index: &Deployment,
    config_maps: &[ConfigMap],
) -> Result<Option<Value>> {
    let pod_spec = data_index
        .spec
        .as_ref()
        .and_then(|s| s.template.spec.as_ref());
    let Some(container) = pod_spec.and_then(|p| p.containers.first()) else {
        return Err(OperatorError::MountError(format!(
            "Deployment {} has no containers",
            data_index.name_any()
        )));
    };

    let existing_volumes: Vec<&str> = pod_spec
        .and_then(|p| p.volumes.as_ref())
        .map(|v| v.iter().map(|v| v.name.as_str()).collect())
        .unwrap_or_default();
    let existing_mounts: Vec<&str> = container
        .volume_mounts
        .as_ref()
        .map(|m| m.iter().map(|m| m.name.as_str()).collect())
        .unwrap_or_default();

    let mut volumes = Vec::new();
    let mut mounts = Vec::new();
    for config_map in config_maps {
        let name = config_map.name_any();
        let (volume, mount) = protobuf_volume(&name);
        if !existing_volumes.contains(&name.as_str()) {
            volumes.push(volume);
        }
        if !existing_mounts.contains(&name.as_str()) {
            mounts.push(mount);
        }
    }

    if volumes.is_empty() && mounts.is_empty() {
        return Ok(None);
    }

    Ok(Some(json!({
        "spec": {
            "template": {
                "spec": {
                    "volumes": volumes,
                    "containers": [{
                        "name": container.name,
                        "volumeMounts": mounts,
                    }]
                }
            }
        }
    })))
}

/// [`MountPropagator`] wiring Runtime protobuf descriptors into data-index
#[derive(Clone)]
pub struct ProtoBufMounter {
    client: Client,
    data_index_name: String,
}

impl ProtoBufMounter {
    pub fn new(client: Client, data_index_name: String) -> Self {
        Self {
            client,
            data_index_name,
        }
    }
}

#[async_trait]
impl MountPropagator for ProtoBufMounter {
    #[instrument(skip(self, instance), fields(runtime = %instance.name_any()))]
    async fn mount_config(&self, instance: &Runtime) -> Result<()> {
        let Some(namespace) = instance.namespace() else {
            return Err(OperatorError::InvalidResource(format!(
                "Runtime {} has no namespace",
                instance.name_any()
            )));
        };

        let deployments: Api<Deployment> = Api::namespaced(self.client.clone(), &namespace);
        let Some(data_index) = deployments.get_opt(&self.data_index_name).await? else {
            debug!(
                "Data index {}/{} not deployed, nothing to mount",
                namespace, self.data_index_name
            );
            return Ok(());
        };

        let config_maps: Api<ConfigMap> = Api::namespaced(self.client.clone(), &namespace);
        let selector = protobuf_selector(&instance.name_any());
        let protobufs = config_maps
            .list(&ListParams::default().labels(&selector))
            .await?;

        if protobufs.items.is_empty() {
            debug!("No protobuf ConfigMaps found for selector {}", selector);
            return Ok(());
        }

        let Some(patch) = protobuf_mount_patch(&data_index, &protobufs.items)? else {
            debug!("Protobuf ConfigMaps already mounted on data index");
            return Ok(());
        };

        info!(
            "Mounting {} protobuf ConfigMap(s) on data index {}/{}",
            protobufs.items.len(),
            namespace,
            self.data_index_name
        );
        deployments
            .patch(
                &self.data_index_name,
                &PatchParams::default(),
                &Patch::Strategic(&patch),
            )
            .await?;

        Ok(())
    }
}
