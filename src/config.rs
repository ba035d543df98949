// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::service::LATEST_TAG;
use anyhow::{Context, Result};
use std::env;

/// Operator configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Namespace to watch; all namespaces when unset
    pub watch_namespace: Option<String>,
    /// Image tag used when a Runtime doesn't pin one
    pub default_image_tag: String,
    /// Registry prefixed to the Runtime name when it declares no image
    pub default_image_registry: String,
    /// Name of the data-index Deployment that receives protobuf mounts
    pub data_index_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            watch_namespace: None,
            default_image_tag: LATEST_TAG.to_string(),
            default_image_registry: "quay.io/kiegroup".to_string(),
            data_index_name: "data-index".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Config::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let default_image_tag = non_empty("DEFAULT_IMAGE_TAG").unwrap_or(defaults.default_image_tag);
        if default_image_tag.contains(':') || default_image_tag.contains('/') {
            return Err(anyhow::anyhow!("invalid image tag '{}'", default_image_tag))
                .context("DEFAULT_IMAGE_TAG must be a bare tag");
        }

        Ok(Config {
            watch_namespace: non_empty("WATCH_NAMESPACE"),
            default_image_tag,
            default_image_registry: non_empty("DEFAULT_IMAGE_REGISTRY")
                .map(|r| r.trim_end_matches('/').to_string())
                .unwrap_or(defaults.default_image_registry),
            data_index_name: non_empty("DATA_INDEX_NAME").unwrap_or(defaults.data_index_name),
        })
    }
}
