// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Deployer hooks used by the Runtime controller.

use crate::constants::{labels, service, OPERATOR_NAME};
use crate::deploy::{Comparators, ServiceHooks};
use crate::error::{OperatorError, Result};
use crate::types::Runtime;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{
    ConfigMap, ConfigMapVolumeSource, Container, EnvVar, PodSpec, Volume, VolumeMount,
};
use kube::api::ObjectMeta;
use kube::ResourceExt;
use std::collections::BTreeMap;

const PROPERTIES_VOLUME: &str = "app-config";

/// Hooks wiring a Runtime to the data-index service and its properties ConfigMap
#[derive(Debug, Clone)]
pub struct RuntimeHooks {
    data_index_name: String,
}

impl RuntimeHooks {
    pub fn new(data_index_name: impl Into<String>) -> Self {
        Self {
            data_index_name: data_index_name.into(),
        }
    }

    fn data_index_url(&self, instance: &Runtime) -> String {
        match instance.namespace() {
            Some(ns) => format!("http://{}.{}", self.data_index_name, ns),
            None => format!("http://{}", self.data_index_name),
        }
    }
}

fn set_env(container: &mut Container, name: &str, value: String) {
    let env = container.env.get_or_insert_with(Vec::new);
    env.retain(|e| e.name != name);
    env.push(EnvVar {
        name: name.to_string(),
        value: Some(value),
        ..Default::default()
    });
}

impl ServiceHooks for RuntimeHooks {
    fn on_deployment_create(&self, deployment: &mut Deployment, instance: &Runtime) -> Result<()> {
        let pod_spec: &mut PodSpec = deployment
            .spec
            .as_mut()
            .and_then(|s| s.template.spec.as_mut())
            .ok_or_else(|| {
                OperatorError::DeployError(format!(
                    "Deployment for {} has no pod template",
                    instance.name_any()
                ))
            })?;

        let has_properties = instance.rendered_properties().is_some();
        if has_properties {
            let volumes = pod_spec.volumes.get_or_insert_with(Vec::new);
            volumes.retain(|v| v.name != PROPERTIES_VOLUME);
            volumes.push(Volume {
                name: PROPERTIES_VOLUME.to_string(),
                config_map: Some(ConfigMapVolumeSource {
                    name: instance.properties_config_map_name(),
                    ..Default::default()
                }),
                ..Default::default()
            });
        }

        let Some(container) = pod_spec.containers.first_mut() else {
            return Err(OperatorError::DeployError(format!(
                "Deployment for {} has no containers",
                instance.name_any()
            )));
        };

        set_env(container, "DATA_INDEX_URL", self.data_index_url(instance));
        if has_properties {
            let mounts = container.volume_mounts.get_or_insert_with(Vec::new);
            mounts.retain(|m| m.name != PROPERTIES_VOLUME);
            mounts.push(VolumeMount {
                name: PROPERTIES_VOLUME.to_string(),
                mount_path: service::CONFIG_MOUNT_PATH.to_string(),
                read_only: Some(true),
                ..Default::default()
            });
        }

        Ok(())
    }

    fn on_objects_create(&self, instance: &Runtime) -> Result<Vec<ConfigMap>> {
        let Some(properties) = instance.rendered_properties() else {
            return Ok(Vec::new());
        };

        Ok(vec![ConfigMap {
            metadata: ObjectMeta {
                name: Some(instance.properties_config_map_name()),
                namespace: instance.namespace(),
                labels: Some(BTreeMap::from([
                    (labels::APP.to_string(), instance.name_any()),
                    (labels::MANAGED_BY.to_string(), OPERATOR_NAME.to_string()),
                ])),
                ..Default::default()
            },
            data: Some(BTreeMap::from([(
                service::PROPERTIES_FILE.to_string(),
                properties,
            )])),
            ..Default::default()
        }])
    }

    fn comparators(&self) -> Comparators {
        Comparators {
            deployment: deployment_matches,
            ..Comparators::default()
        }
    }
}

/// Compares the fields the operator sets, ignoring server-side defaults
fn deployment_matches(live: &Deployment, desired: &Deployment) -> bool {
    let replicas = |d: &Deployment| d.spec.as_ref().and_then(|s| s.replicas);
    let pod = |d: &Deployment| d.spec.as_ref().and_then(|s| s.template.spec.clone());
    let volumes = |p: &Option<PodSpec>| {
        let mut names: Vec<String> = p
            .as_ref()
            .and_then(|p| p.volumes.as_ref())
            .map(|v| v.iter().map(|v| v.name.clone()).collect())
            .unwrap_or_default();
        names.sort();
        names
    };
    let container = |p: &Option<PodSpec>| {
        p.as_ref().and_then(|p| p.containers.first()).map(|c| {
            let mut env: Vec<(String, Option<String>)> = c
                .env
                .iter()
                .flatten()
                .map(|e| (e.name.clone(), e.value.clone()))
                .collect();
            env.sort();
            let mut mounts: Vec<(String, String)> = c
                .volume_mounts
                .iter()
                .flatten()
                .map(|m| (m.name.clone(), m.mount_path.clone()))
                .collect();
            mounts.sort();
            (c.image.clone(), env, mounts)
        })
    };

    let (live_pod, desired_pod) = (pod(live), pod(desired));
    replicas(live) == replicas(desired)
        && volumes(&live_pod) == volumes(&desired_pod)
        && container(&live_pod) == container(&desired_pod)
}
