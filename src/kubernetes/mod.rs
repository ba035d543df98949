// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes utilities for CRD discovery, idempotent creation, access control
//! objects and dependent-service mounts.

pub mod crd;
pub mod objects;
pub mod protobuf;
pub mod rbac;

pub use crd::wait_for_crds;
pub use objects::{create_if_not_exists, KubeInstanceFetcher, KubeObjectCreator};
pub use protobuf::ProtoBufMounter;
pub use rbac::{service_viewer_objects, AccessControlObject};
