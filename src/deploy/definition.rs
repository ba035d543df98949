// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::service::{HTTP_PORT, QUARKUS_LIVENESS_PATH, QUARKUS_READINESS_PATH};
use crate::deploy::ServiceHooks;
use crate::types::{ReconcileRequest, RuntimeType};
use k8s_openapi::api::core::v1::{HTTPGetAction, Probe, TCPSocketAction};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use std::fmt;
use std::sync::Arc;

/// Health check probing strategy for the runtime container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthCheckProbe {
    /// Plain TCP connect on the HTTP port
    Tcp,
    /// Quarkus SmallRye Health endpoints
    QuarkusHealth,
}

impl HealthCheckProbe {
    pub fn for_runtime(runtime: RuntimeType) -> Self {
        match runtime {
            RuntimeType::Quarkus => HealthCheckProbe::QuarkusHealth,
            RuntimeType::SpringBoot => HealthCheckProbe::Tcp,
        }
    }

    pub fn liveness(&self) -> Probe {
        self.probe(QUARKUS_LIVENESS_PATH)
    }

    pub fn readiness(&self) -> Probe {
        self.probe(QUARKUS_READINESS_PATH)
    }

    fn probe(&self, health_path: &str) -> Probe {
        let port = IntOrString::Int(HTTP_PORT);
        let base = Probe {
            initial_delay_seconds: Some(10),
            period_seconds: Some(10),
            timeout_seconds: Some(10),
            failure_threshold: Some(3),
            ..Default::default()
        };
        match self {
            HealthCheckProbe::Tcp => Probe {
                tcp_socket: Some(TCPSocketAction {
                    port,
                    ..Default::default()
                }),
                ..base
            },
            HealthCheckProbe::QuarkusHealth => Probe {
                http_get: Some(HTTPGetAction {
                    path: Some(health_path.to_string()),
                    port,
                    scheme: Some("HTTP".to_string()),
                    ..Default::default()
                }),
                ..base
            },
        }
    }
}

/// Everything the deployer needs to converge one Runtime
#[derive(Clone)]
pub struct ServiceDefinition {
    pub request: ReconcileRequest,
    /// Tag used when the Runtime image doesn't pin one
    pub default_image_tag: String,
    /// Forces a single replica regardless of the Runtime spec
    pub single_replica: bool,
    pub hooks: Arc<dyn ServiceHooks>,
    /// The Runtime gets its own Service in front of the Deployment
    pub custom_service: bool,
    pub health_check_probe: HealthCheckProbe,
}

impl fmt::Debug for ServiceDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceDefinition")
            .field("request", &self.request)
            .field("default_image_tag", &self.default_image_tag)
            .field("single_replica", &self.single_replica)
            .field("custom_service", &self.custom_service)
            .field("health_check_probe", &self.health_check_probe)
            .finish_non_exhaustive()
    }
}
