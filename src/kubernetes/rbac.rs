// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Service viewer access-control objects created in every Runtime namespace.

use crate::constants::{labels, rbac, OPERATOR_NAME};
use k8s_openapi::api::core::v1::ServiceAccount;
use k8s_openapi::api::rbac::v1::{PolicyRule, Role, RoleBinding, RoleRef, Subject};
use kube::api::ObjectMeta;
use kube::ResourceExt;
use std::collections::BTreeMap;
use std::fmt;

/// One of the objects making up the service viewer access-control triple
#[derive(Debug, Clone, PartialEq)]
pub enum AccessControlObject {
    Role(Role),
    ServiceAccount(ServiceAccount),
    RoleBinding(RoleBinding),
}

impl AccessControlObject {
    pub fn name(&self) -> String {
        match self {
            AccessControlObject::Role(o) => o.name_any(),
            AccessControlObject::ServiceAccount(o) => o.name_any(),
            AccessControlObject::RoleBinding(o) => o.name_any(),
        }
    }

    pub fn namespace(&self) -> Option<String> {
        match self {
            AccessControlObject::Role(o) => o.namespace(),
            AccessControlObject::ServiceAccount(o) => o.namespace(),
            AccessControlObject::RoleBinding(o) => o.namespace(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AccessControlObject::Role(_) => "Role",
            AccessControlObject::ServiceAccount(_) => "ServiceAccount",
            AccessControlObject::RoleBinding(_) => "RoleBinding",
        }
    }
}

impl fmt::Display for AccessControlObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}/{}",
            self.kind(),
            self.namespace().unwrap_or_default(),
            self.name()
        )
    }
}

fn metadata(name: &str, namespace: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(namespace.to_string()),
        labels: Some(BTreeMap::from([(
            labels::MANAGED_BY.to_string(),
            OPERATOR_NAME.to_string(),
        )])),
        ..Default::default()
    }
}

/// Role allowing runtime services to discover other services in the namespace
pub fn service_viewer_role(namespace: &str) -> Role {
    Role {
        metadata: metadata(rbac::SERVICE_VIEWER_ROLE, namespace),
        rules: Some(vec![PolicyRule {
            api_groups: Some(vec!["".to_string()]),
            resources: Some(vec!["services".to_string(), "endpoints".to_string()]),
            verbs: vec!["get".to_string(), "list".to_string(), "watch".to_string()],
            ..Default::default()
        }]),
    }
}

pub fn service_viewer_service_account(namespace: &str) -> ServiceAccount {
    ServiceAccount {
        metadata: metadata(rbac::SERVICE_VIEWER_ACCOUNT, namespace),
        ..Default::default()
    }
}

/// Binds the service viewer role to the service viewer account
pub fn service_viewer_role_binding(namespace: &str) -> RoleBinding {
    RoleBinding {
        metadata: metadata(rbac::SERVICE_VIEWER_BINDING, namespace),
        role_ref: RoleRef {
            api_group: "rbac.authorization.k8s.io".to_string(),
            kind: "Role".to_string(),
            name: rbac::SERVICE_VIEWER_ROLE.to_string(),
        },
        subjects: Some(vec![Subject {
            kind: "ServiceAccount".to_string(),
            name: rbac::SERVICE_VIEWER_ACCOUNT.to_string(),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        }]),
    }
}

/// The access-control triple in creation order. The binding comes last since
/// it refers to both the role and the service account.
pub fn service_viewer_objects(namespace: &str) -> [AccessControlObject; 3] {
    [
        AccessControlObject::Role(service_viewer_role(namespace)),
        AccessControlObject::ServiceAccount(service_viewer_service_account(namespace)),
        AccessControlObject::RoleBinding(service_viewer_role_binding(namespace)),
    ]
}
