// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Deployer applying the Deployment, Service and ConfigMaps of a Runtime.

use crate::constants::{labels, rbac, service, OPERATOR_NAME, REQUEUE_WAIT_FOR_RESOURCES};
use crate::deploy::{Deployer, ServiceDefinition};
use crate::error::{OperatorError, Result};
use crate::types::Runtime;
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    ConfigMap, Container, ContainerPort, EnvVar, PodSpec, PodTemplateSpec, Service, ServicePort,
    ServiceSpec,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, OwnerReference};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use k8s_openapi::NamespaceResourceScope;
use kube::{
    api::{ObjectMeta, Patch, PatchParams},
    Api, Client, Resource, ResourceExt,
};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Image reference for a Runtime. Untagged images get the default tag, a
/// missing image is derived from the registry and the Runtime name.
pub fn resolve_image(image: Option<&str>, name: &str, registry: &str, default_tag: &str) -> String {
    match image.map(str::trim).filter(|i| !i.is_empty()) {
        None => format!("{}/{}:{}", registry, name, default_tag),
        Some(image) => {
            let last_segment = image.rsplit('/').next().unwrap_or(image);
            if image.contains('@') || last_segment.contains(':') {
                image.to_string()
            } else {
                format!("{}:{}", image, default_tag)
            }
        }
    }
}

fn selector_labels(name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([(labels::APP.to_string(), name.to_string())])
}

fn object_labels(name: &str) -> BTreeMap<String, String> {
    let mut all = selector_labels(name);
    all.insert(labels::MANAGED_BY.to_string(), OPERATOR_NAME.to_string());
    all
}

/// Desired Deployment for a Runtime, before hooks run
pub fn build_deployment(
    definition: &ServiceDefinition,
    instance: &Runtime,
    registry: &str,
) -> Deployment {
    let name = instance.name_any();
    let replicas = if definition.single_replica {
        1
    } else {
        instance.spec.replicas.unwrap_or(1).max(0)
    };
    let image = resolve_image(
        instance.spec.image.as_deref(),
        &name,
        registry,
        &definition.default_image_tag,
    );
    let env: Vec<EnvVar> = instance
        .spec
        .env
        .iter()
        .flatten()
        .map(|(k, v)| EnvVar {
            name: k.clone(),
            value: Some(v.clone()),
            ..Default::default()
        })
        .collect();

    Deployment {
        metadata: ObjectMeta {
            name: Some(name.clone()),
            namespace: instance.namespace(),
            labels: Some(object_labels(&name)),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(replicas),
            selector: LabelSelector {
                match_labels: Some(selector_labels(&name)),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(object_labels(&name)),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    service_account_name: Some(rbac::SERVICE_VIEWER_ACCOUNT.to_string()),
                    containers: vec![Container {
                        name: name.clone(),
                        image: Some(image),
                        ports: Some(vec![ContainerPort {
                            name: Some(service::HTTP_PORT_NAME.to_string()),
                            container_port: service::HTTP_PORT,
                            protocol: Some("TCP".to_string()),
                            ..Default::default()
                        }]),
                        env: (!env.is_empty()).then_some(env),
                        liveness_probe: Some(definition.health_check_probe.liveness()),
                        readiness_probe: Some(definition.health_check_probe.readiness()),
                        ..Default::default()
                    }],
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// ClusterIP Service in front of the Runtime's pods
pub fn build_service(instance: &Runtime) -> Service {
    let name = instance.name_any();
    Service {
        metadata: ObjectMeta {
            name: Some(name.clone()),
            namespace: instance.namespace(),
            labels: Some(object_labels(&name)),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            selector: Some(selector_labels(&name)),
            ports: Some(vec![ServicePort {
                name: Some(service::HTTP_PORT_NAME.to_string()),
                port: 80,
                target_port: Some(IntOrString::Int(service::HTTP_PORT)),
                protocol: Some("TCP".to_string()),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn is_available(deployment: &Deployment) -> bool {
    let desired = deployment
        .spec
        .as_ref()
        .and_then(|s| s.replicas)
        .unwrap_or(1);
    let available = deployment
        .status
        .as_ref()
        .and_then(|s| s.available_replicas)
        .unwrap_or(0);
    available >= desired
}

/// [`Deployer`] using server-side apply against the Kubernetes API
#[derive(Clone)]
pub struct KubeServiceDeployer {
    client: Client,
    image_registry: String,
}

impl KubeServiceDeployer {
    pub fn new(client: Client, image_registry: String) -> Self {
        Self {
            client,
            image_registry,
        }
    }

    async fn apply<K>(&self, namespace: &str, object: &K) -> Result<K>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Serialize + Debug,
        K::DynamicType: Default,
    {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        let name = object.name_any();
        info!(
            "Applying {} {}/{}",
            K::kind(&Default::default()),
            namespace,
            name
        );
        let params = PatchParams::apply(OPERATOR_NAME).force();
        Ok(api.patch(&name, &params, &Patch::Apply(object)).await?)
    }

    async fn get<K>(&self, namespace: &str, name: &str) -> Result<Option<K>>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Debug,
        K::DynamicType: Default,
    {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }
}

#[async_trait]
impl Deployer for KubeServiceDeployer {
    #[instrument(skip(self, definition, instance), fields(request = %definition.request))]
    async fn deploy(&self, definition: &ServiceDefinition, instance: &Runtime) -> Result<Duration> {
        let name = instance.name_any();
        let Some(namespace) = instance.namespace() else {
            return Err(OperatorError::InvalidResource(format!(
                "Runtime {} has no namespace",
                name
            )));
        };
        let owner: OwnerReference = instance.controller_owner_ref(&()).ok_or_else(|| {
            OperatorError::InvalidResource(format!("Runtime {}/{} has no uid", namespace, name))
        })?;
        let comparators = definition.hooks.comparators();

        let mut deployment = build_deployment(definition, instance, &self.image_registry);
        definition
            .hooks
            .on_deployment_create(&mut deployment, instance)?;
        deployment.metadata.owner_references = Some(vec![owner.clone()]);

        let (deployment, applied) = match self.get::<Deployment>(&namespace, &name).await? {
            Some(live) if (comparators.deployment)(&live, &deployment) => {
                debug!("Deployment {}/{} is up to date", namespace, name);
                (live, false)
            }
            _ => (self.apply(&namespace, &deployment).await?, true),
        };

        if definition.custom_service && self.get::<Service>(&namespace, &name).await?.is_none() {
            let mut svc = build_service(instance);
            svc.metadata.owner_references = Some(vec![owner.clone()]);
            self.apply(&namespace, &svc).await?;
        }

        for mut config_map in definition.hooks.on_objects_create(instance)? {
            config_map.metadata.owner_references = Some(vec![owner.clone()]);
            let live = self
                .get::<ConfigMap>(&namespace, &config_map.name_any())
                .await?;
            if !live.is_some_and(|live| (comparators.config_map)(&live, &config_map)) {
                self.apply(&namespace, &config_map).await?;
            }
        }

        if applied || !is_available(&deployment) {
            debug!("Deployment {}/{} not available yet", namespace, name);
            return Ok(REQUEUE_WAIT_FOR_RESOURCES);
        }
        Ok(Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deploy::{HealthCheckProbe, RuntimeHooks};
    use crate::test_utils::MockService;
    use crate::types::{ReconcileRequest, RuntimeSpec};
    use k8s_openapi::api::apps::v1::DeploymentStatus;
    use std::sync::Arc;

    const DEPLOYMENT_PATH: &str = "/apis/apps/v1/namespaces/ns1/deployments/orders";
    const SERVICE_PATH: &str = "/api/v1/namespaces/ns1/services/orders";

    fn make_runtime(spec: RuntimeSpec) -> Runtime {
        let mut runtime = Runtime::new("orders", spec);
        runtime.metadata.namespace = Some("ns1".to_string());
        runtime.metadata.uid = Some("uid-orders".to_string());
        runtime
    }

    fn make_definition(single_replica: bool) -> ServiceDefinition {
        ServiceDefinition {
            request: ReconcileRequest::new("orders", "ns1"),
            default_image_tag: "latest".to_string(),
            single_replica,
            hooks: Arc::new(RuntimeHooks::new("data-index")),
            custom_service: true,
            health_check_probe: HealthCheckProbe::QuarkusHealth,
        }
    }

    fn desired_deployment(runtime: &Runtime, available: i32) -> Deployment {
        let definition = make_definition(false);
        let mut deployment = build_deployment(&definition, runtime, "quay.io/kiegroup");
        definition
            .hooks
            .on_deployment_create(&mut deployment, runtime)
            .unwrap();
        deployment.status = Some(DeploymentStatus {
            available_replicas: Some(available),
            ..Default::default()
        });
        deployment
    }

    #[test]
    fn test_resolve_image_from_registry() {
        assert_eq!(
            resolve_image(None, "orders", "quay.io/kiegroup", "latest"),
            "quay.io/kiegroup/orders:latest"
        );
    }

    #[test]
    fn test_resolve_image_keeps_pinned_tag() {
        assert_eq!(
            resolve_image(Some("registry:5000/team/orders:1.2"), "orders", "r", "latest"),
            "registry:5000/team/orders:1.2"
        );
        assert_eq!(
            resolve_image(Some("orders@sha256:abc"), "orders", "r", "latest"),
            "orders@sha256:abc"
        );
    }

    #[test]
    fn test_resolve_image_appends_default_tag() {
        assert_eq!(
            resolve_image(Some("registry:5000/team/orders"), "orders", "r", "2.0"),
            "registry:5000/team/orders:2.0"
        );
    }

    #[test]
    fn test_build_deployment_allows_multiple_replicas() {
        let runtime = make_runtime(RuntimeSpec {
            replicas: Some(3),
            ..Default::default()
        });
        let deployment = build_deployment(&make_definition(false), &runtime, "quay.io/kiegroup");
        assert_eq!(deployment.spec.unwrap().replicas, Some(3));
    }

    #[test]
    fn test_build_deployment_single_replica() {
        let runtime = make_runtime(RuntimeSpec {
            replicas: Some(3),
            ..Default::default()
        });
        let deployment = build_deployment(&make_definition(true), &runtime, "quay.io/kiegroup");
        assert_eq!(deployment.spec.unwrap().replicas, Some(1));
    }

    #[test]
    fn test_build_deployment_uses_probe_and_service_account() {
        let runtime = make_runtime(RuntimeSpec::default());
        let deployment = build_deployment(&make_definition(false), &runtime, "quay.io/kiegroup");
        let pod = deployment.spec.unwrap().template.spec.unwrap();

        assert_eq!(pod.service_account_name.as_deref(), Some("runtime-service-viewer"));
        let container = &pod.containers[0];
        assert_eq!(container.image.as_deref(), Some("quay.io/kiegroup/orders:latest"));
        assert!(container.liveness_probe.as_ref().unwrap().http_get.is_some());
    }

    #[test]
    fn test_build_service_selects_runtime_pods() {
        let service = build_service(&make_runtime(RuntimeSpec::default()));
        let spec = service.spec.unwrap();
        assert_eq!(spec.selector.unwrap().get("app").unwrap(), "orders");
        assert_eq!(spec.ports.unwrap()[0].port, 80);
    }

    #[tokio::test]
    async fn test_first_deploy_applies_and_requeues() {
        let runtime = make_runtime(RuntimeSpec::default());
        let applied = serde_json::to_string(&desired_deployment(&runtime, 0)).unwrap();
        let mock = MockService::new()
            .on_patch(DEPLOYMENT_PATH, 201, &applied)
            .on_patch(SERVICE_PATH, 201, &serde_json::to_string(&build_service(&runtime)).unwrap());
        let deployer = KubeServiceDeployer::new(mock.clone().into_client(), "quay.io/kiegroup".into());

        let requeue = deployer.deploy(&make_definition(false), &runtime).await.unwrap();

        assert_eq!(requeue, Duration::from_secs(30));
        assert_eq!(mock.requests_with_method("PATCH"), 2);
    }

    #[tokio::test]
    async fn test_converged_deploy_is_a_noop() {
        let runtime = make_runtime(RuntimeSpec::default());
        let live = serde_json::to_string(&desired_deployment(&runtime, 1)).unwrap();
        let mock = MockService::new()
            .on_get(DEPLOYMENT_PATH, 200, &live)
            .on_get(SERVICE_PATH, 200, &serde_json::to_string(&build_service(&runtime)).unwrap());
        let deployer = KubeServiceDeployer::new(mock.clone().into_client(), "quay.io/kiegroup".into());

        let requeue = deployer.deploy(&make_definition(false), &runtime).await.unwrap();

        assert_eq!(requeue, Duration::ZERO);
        assert_eq!(mock.requests_with_method("PATCH"), 0);
    }

    #[tokio::test]
    async fn test_unavailable_deployment_requeues_without_applying() {
        let runtime = make_runtime(RuntimeSpec::default());
        let live = serde_json::to_string(&desired_deployment(&runtime, 0)).unwrap();
        let mock = MockService::new()
            .on_get(DEPLOYMENT_PATH, 200, &live)
            .on_get(SERVICE_PATH, 200, &serde_json::to_string(&build_service(&runtime)).unwrap());
        let deployer = KubeServiceDeployer::new(mock.clone().into_client(), "quay.io/kiegroup".into());

        let requeue = deployer.deploy(&make_definition(false), &runtime).await.unwrap();

        assert_eq!(requeue, Duration::from_secs(30));
        assert_eq!(mock.requests_with_method("PATCH"), 0);
    }

    #[tokio::test]
    async fn test_runtime_without_uid_is_rejected() {
        let mut runtime = make_runtime(RuntimeSpec::default());
        runtime.metadata.uid = None;
        let deployer =
            KubeServiceDeployer::new(MockService::new().into_client(), "quay.io/kiegroup".into());

        assert!(deployer.deploy(&make_definition(false), &runtime).await.is_err());
    }
}
