// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OperatorError {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Mounting configuration on dependent service failed: {0}")]
    MountError(String),

    #[error("Service deployment failed: {0}")]
    DeployError(String),

    #[error("Invalid resource: {0}")]
    InvalidResource(String),
}

pub type Result<T> = std::result::Result<T, OperatorError>;
