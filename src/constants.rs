// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

/// API group shared by the Runtime and Infra custom resources
pub const API_GROUP: &str = "runtime.operator.io";

/// The operator name used for server-side apply
pub const OPERATOR_NAME: &str = "runtime-operator";

/// Kubernetes label keys used by the operator
pub mod labels {
    /// Name of the Runtime an object belongs to
    pub const APP: &str = "app";
    /// Marks a ConfigMap holding protobuf descriptors published by a Runtime
    pub const PROTOBUF: &str = "runtime.operator.io/protobuf";
    /// Set on every object the operator applies
    pub const MANAGED_BY: &str = "app.kubernetes.io/managed-by";
}

/// Names of the per-namespace service viewer access-control objects
pub mod rbac {
    pub const SERVICE_VIEWER_ROLE: &str = "runtime-service-viewer";
    pub const SERVICE_VIEWER_ACCOUNT: &str = "runtime-service-viewer";
    pub const SERVICE_VIEWER_BINDING: &str = "runtime-service-viewer";
}

/// Runtime container defaults
pub mod service {
    /// Image tag used when a Runtime doesn't pin one
    pub const LATEST_TAG: &str = "latest";
    /// Port the runtime container serves HTTP on
    pub const HTTP_PORT: i32 = 8080;
    pub const HTTP_PORT_NAME: &str = "http";
    /// Where the `<name>-properties` ConfigMap is mounted in the runtime container
    pub const CONFIG_MOUNT_PATH: &str = "/deployments/config";
    pub const PROPERTIES_FILE: &str = "application.properties";
    pub const QUARKUS_LIVENESS_PATH: &str = "/q/health/live";
    pub const QUARKUS_READINESS_PATH: &str = "/q/health/ready";
}

/// Where protobuf ConfigMaps are mounted inside the data-index container
pub const PROTOBUF_MOUNT_ROOT: &str = "/home/runtime/data/protobufs";

/// Delay used while waiting for applied resources to materialize
pub const REQUEUE_WAIT_FOR_RESOURCES: Duration = Duration::from_secs(30);

/// Error backoff applied by the controller's error policy
pub mod backoff {
    pub const INITIAL_SECS: u64 = 5;
    pub const MAX_SECS: u64 = 300;
}

/// CRD polling configuration
pub mod crd {
    /// Initial polling interval in seconds when waiting for CRD
    pub const POLL_INTERVAL_SECS: u64 = 10;
    /// Maximum polling interval in seconds (exponential backoff cap)
    pub const POLL_MAX_INTERVAL_SECS: u64 = 60;
}
