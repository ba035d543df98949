// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use kube::CustomResource;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Infrastructure a Runtime depends on. Runtimes using it are listed as
/// (non-controller) owner references so changes fan out to them.
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq, schemars::JsonSchema)]
#[kube(group = "runtime.operator.io", version = "v1", kind = "Infra")]
#[kube(namespaced)]
#[serde(rename_all = "camelCase")]
pub struct InfraSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<InfraResource>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}

/// Reference to the object providing the infrastructure
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InfraResource {
    pub api_version: String,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}
