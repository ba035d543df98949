// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use kube::{CustomResource, ResourceExt};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[kube(group = "runtime.operator.io", version = "v1", kind = "Runtime")]
#[kube(namespaced)]
#[kube(shortname = "rt")]
#[kube(printcolumn = r#"{"name":"Runtime", "type":"string", "jsonPath":".spec.runtime"}"#)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeSpec {
    #[serde(default)]
    pub runtime: RuntimeType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env: Option<BTreeMap<String, String>>,
    /// Application properties, rendered into the `<name>-properties` ConfigMap
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<BTreeMap<String, String>>,
}

/// Framework the runtime service is built with
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeType {
    #[default]
    Quarkus,
    #[serde(rename = "springboot")]
    SpringBoot,
}

impl Runtime {
    pub fn runtime_type(&self) -> RuntimeType {
        self.spec.runtime
    }

    /// Name of the ConfigMap holding the rendered application properties
    pub fn properties_config_map_name(&self) -> String {
        format!("{}-properties", self.name_any())
    }

    /// Application properties in `key=value` form, sorted by key
    pub fn rendered_properties(&self) -> Option<String> {
        self.spec
            .config
            .as_ref()
            .filter(|c| !c.is_empty())
            .map(|config| {
                config
                    .iter()
                    .map(|(k, v)| format!("{}={}\n", k, v))
                    .collect()
            })
    }
}
