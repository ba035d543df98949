// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Test utilities for mocking Kubernetes API responses and the reconcile
//! collaborators.

use crate::deploy::{Deployer, ServiceDefinition};
use crate::error::{OperatorError, Result};
use crate::kubernetes::AccessControlObject;
use crate::reconcilers::backends::{Backends, InstanceFetcher, MountPropagator, ObjectCreator};
use crate::shutdown::ShutdownTrigger;
use crate::types::Runtime;
use async_trait::async_trait;
use http::{Request, Response};
use kube::client::Body;
use kube::{Client, ResourceExt};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;
use tower::Service;

/// A mock HTTP service that returns predefined responses based on request
/// method and path, recording every request it sees.
#[derive(Clone)]
pub struct MockService {
    responses: Arc<Mutex<HashMap<(String, String), (u16, String)>>>,
    requests: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockService {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn on(self, method: &str, path: &str, status: u16, body: &str) -> Self {
        self.responses.lock().unwrap().insert(
            (method.to_string(), path.to_string()),
            (status, body.to_string()),
        );
        self
    }

    /// Add a response for GET requests matching the exact path
    pub fn on_get(self, path: &str, status: u16, body: &str) -> Self {
        self.on("GET", path, status, body)
    }

    /// Add a response for POST requests matching the exact path
    pub fn on_post(self, path: &str, status: u16, body: &str) -> Self {
        self.on("POST", path, status, body)
    }

    /// Add a response for PATCH requests matching the exact path
    pub fn on_patch(self, path: &str, status: u16, body: &str) -> Self {
        self.on("PATCH", path, status, body)
    }

    /// Number of requests received with the given method
    pub fn requests_with_method(&self, method: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _)| m == method)
            .count()
    }

    /// Build a kube Client from this mock service
    pub fn into_client(self) -> Client {
        Client::new(self, "default")
    }

    fn find_response(&self, method: &str, path: &str) -> Option<(u16, String)> {
        self.responses
            .lock()
            .unwrap()
            .get(&(method.to_string(), path.to_string()))
            .cloned()
    }
}

impl Default for MockService {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<Request<Body>> for MockService {
    type Response = Response<Body>;
    type Error = tower::BoxError;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = std::result::Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let method = req.method().to_string();
        let path = req.uri().path().to_string();

        self.requests
            .lock()
            .unwrap()
            .push((method.clone(), path.clone()));
        let response = self.find_response(&method, &path);

        Box::pin(async move {
            let (status, body) = response.unwrap_or_else(|| (404, not_found_json("object", &path)));
            Ok(Response::builder()
                .status(status)
                .header("content-type", "application/json")
                .body(Body::from(body.into_bytes()))
                .unwrap())
        })
    }
}

/// Create a Status response body
pub fn status_json(code: u16, reason: &str, message: &str) -> String {
    serde_json::json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "message": message,
        "reason": reason,
        "code": code
    })
    .to_string()
}

/// Create a 404 not found response
pub fn not_found_json(resource: &str, name: &str) -> String {
    status_json(
        404,
        "NotFound",
        &format!("{} \"{}\" not found", resource, name),
    )
}

fn api_error(code: u16, reason: &str) -> OperatorError {
    OperatorError::KubeError(kube::Error::Api(kube::core::ErrorResponse {
        status: "Failure".to_string(),
        message: reason.to_string(),
        reason: reason.to_string(),
        code,
    }))
}

/// Shared in-memory cluster used by the fake collaborators. Every call is
/// appended to `calls` so tests can assert ordering.
#[derive(Default)]
pub struct FakeCluster {
    pub runtimes: Mutex<HashMap<(String, String), Runtime>>,
    pub objects: Mutex<HashSet<String>>,
    pub mounted: Mutex<HashSet<String>>,
    pub calls: Mutex<Vec<String>>,
    /// Object kinds whose creation fails with 403
    pub forbidden_kinds: Mutex<HashSet<String>>,
    pub fail_fetch: Mutex<bool>,
    pub fail_mount: Mutex<bool>,
    pub fail_deploy: Mutex<bool>,
    pub requeue_after: Mutex<Duration>,
    pub deploy_definitions: Mutex<Vec<ServiceDefinition>>,
    /// Fired while the mount step runs
    pub shutdown_during_mount: Mutex<Option<ShutdownTrigger>>,
}

impl FakeCluster {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_runtime(self: Arc<Self>, runtime: Runtime) -> Arc<Self> {
        let key = (runtime.namespace().unwrap_or_default(), runtime.name_any());
        self.runtimes.lock().unwrap().insert(key, runtime);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn backends(self: &Arc<Self>) -> Backends {
        Backends {
            fetcher: self.clone(),
            creator: self.clone(),
            mounter: self.clone(),
            deployer: self.clone(),
        }
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl InstanceFetcher for FakeCluster {
    async fn fetch(&self, name: &str, namespace: &str) -> Result<Option<Runtime>> {
        self.record(format!("fetch {}/{}", namespace, name));
        if *self.fail_fetch.lock().unwrap() {
            return Err(api_error(500, "InternalError"));
        }
        Ok(self
            .runtimes
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }
}

#[async_trait]
impl ObjectCreator for FakeCluster {
    async fn create_if_not_exists(&self, object: AccessControlObject) -> Result<bool> {
        self.record(format!("create {}", object.kind()));
        if self.forbidden_kinds.lock().unwrap().contains(object.kind()) {
            return Err(api_error(403, "Forbidden"));
        }
        Ok(self.objects.lock().unwrap().insert(object.to_string()))
    }
}

#[async_trait]
impl MountPropagator for FakeCluster {
    async fn mount_config(&self, instance: &Runtime) -> Result<()> {
        self.record(format!("mount {}", instance.name_any()));
        if *self.fail_mount.lock().unwrap() {
            return Err(OperatorError::MountError("data index unreachable".to_string()));
        }
        self.mounted.lock().unwrap().insert(instance.name_any());
        if let Some(trigger) = self.shutdown_during_mount.lock().unwrap().take() {
            trigger.trigger();
        }
        Ok(())
    }
}

#[async_trait]
impl Deployer for FakeCluster {
    async fn deploy(&self, definition: &ServiceDefinition, instance: &Runtime) -> Result<Duration> {
        self.record(format!("deploy {}", instance.name_any()));
        self.deploy_definitions
            .lock()
            .unwrap()
            .push(definition.clone());
        if *self.fail_deploy.lock().unwrap() {
            return Err(api_error(500, "InternalError"));
        }
        Ok(*self.requeue_after.lock().unwrap())
    }
}
