// Copyright (c) 2026 the authgate authors
// SPDX-License-Identifier: MIT

//! Pure builders for the managed resource set.
//!
//! Every function here takes an [`Authorizator`](crate::crd::Authorizator) (or
//! pieces of one) and returns a fully formed Kubernetes object, with no API
//! calls. The reconciler decides what to do with the objects; keeping the
//! builders pure makes the shapes unit-testable without a cluster.

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{
    Deployment, DeploymentSpec, DeploymentStrategy, RollingUpdateDeployment,
};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, EnvVar, PodSpec, PodTemplateSpec, Service, ServiceAccount,
    ServicePort, ServiceSpec,
};
use k8s_openapi::api::rbac::v1::{PolicyRule, Role, RoleBinding, RoleRef, Subject};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

use crate::constants::{
    ANNOTATION_AUTHORIZATOR, ANNOTATION_INGRESS, ANNOTATION_NAMESPACE, API_GROUP, LISTENER_IMAGE,
    MANAGEMENT_PORT, PLURAL_AUTHORIZATORS, VALIDATE_PORT,
};
use crate::crd::AuthorizatorSpec;
use crate::naming;

/// Labels shared by the Deployment's pod template, its selector and the
/// Service selector. The selector is immutable on Deployments, so this set
/// must stay stable across Modify.
#[must_use]
pub fn workload_labels(name: &str) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert("app".to_string(), naming::app_label(name));
    labels
}

/// Labels stamped on every managed object's metadata.
#[must_use]
pub fn managed_labels(name: &str) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert("app".to_string(), naming::app_label(name));
    labels.insert(
        "app.kubernetes.io/managed-by".to_string(),
        "authgate".to_string(),
    );
    labels
}

/// Environment for the listener container.
///
/// `rulesets` and `validators` are JSON-encoded verbatim; the listener owns
/// their interpretation.
#[must_use]
pub fn build_listener_env(namespace: &str, name: &str, spec: &AuthorizatorSpec) -> Vec<EnvVar> {
    let env = |n: &str, v: String| EnvVar {
        name: n.to_string(),
        value: Some(v),
        ..Default::default()
    };

    vec![
        env("AUTHGATE_NAME", name.to_string()),
        env("AUTHGATE_NAMESPACE", namespace.to_string()),
        env("AUTHGATE_RULESETS", spec.rulesets.to_string()),
        env("AUTHGATE_VALIDATORS", spec.validators.to_string()),
        env("AUTHGATE_API", spec.config.api.to_string()),
        env("AUTHGATE_PROMETHEUS", spec.config.prometheus.to_string()),
        env("AUTHGATE_LOG_LEVEL", spec.config.log_level.to_string()),
    ]
}

/// Build the managed Deployment for an authorizator.
///
/// The pod template carries back-reference annotations
/// (`authgate.dev/ingress` among them) that the delete workflow reads to find
/// the ingress to clean up, so the Deployment is the single source of truth
/// for what was attached.
#[must_use]
pub fn build_deployment(namespace: &str, name: &str, spec: &AuthorizatorSpec) -> Deployment {
    let mut pod_annotations = BTreeMap::new();
    pod_annotations.insert(ANNOTATION_INGRESS.to_string(), spec.ingress.name.clone());
    pod_annotations.insert(ANNOTATION_AUTHORIZATOR.to_string(), name.to_string());
    pod_annotations.insert(ANNOTATION_NAMESPACE.to_string(), namespace.to_string());

    Deployment {
        metadata: ObjectMeta {
            name: Some(naming::deployment_name(name)),
            namespace: Some(namespace.to_string()),
            labels: Some(managed_labels(name)),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(spec.config.replicas),
            selector: LabelSelector {
                match_labels: Some(workload_labels(name)),
                ..Default::default()
            },
            // Keep one spare pod during rollouts and never dip below the
            // desired count; the workload sits on the ingress auth path.
            strategy: Some(DeploymentStrategy {
                type_: Some("RollingUpdate".to_string()),
                rolling_update: Some(RollingUpdateDeployment {
                    max_surge: Some(IntOrString::Int(1)),
                    max_unavailable: Some(IntOrString::Int(0)),
                }),
            }),
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(workload_labels(name)),
                    annotations: Some(pod_annotations),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    service_account_name: Some(naming::service_account_name(name)),
                    containers: vec![Container {
                        name: "listener".to_string(),
                        image: Some(LISTENER_IMAGE.to_string()),
                        image_pull_policy: Some("Always".to_string()),
                        ports: Some(vec![
                            ContainerPort {
                                name: Some("validate".to_string()),
                                container_port: VALIDATE_PORT,
                                ..Default::default()
                            },
                            ContainerPort {
                                name: Some("mgmt".to_string()),
                                container_port: MANAGEMENT_PORT,
                                ..Default::default()
                            },
                        ]),
                        env: Some(build_listener_env(namespace, name, spec)),
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

/// Build the managed ClusterIP Service.
///
/// Declares both listener ports: edge proxies hit `validate`, the management
/// proxy hits `mgmt`.
#[must_use]
pub fn build_service(namespace: &str, name: &str) -> Service {
    Service {
        metadata: ObjectMeta {
            name: Some(naming::service_name(name)),
            namespace: Some(namespace.to_string()),
            labels: Some(managed_labels(name)),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            type_: Some("ClusterIP".to_string()),
            selector: Some(workload_labels(name)),
            ports: Some(vec![
                ServicePort {
                    name: Some("validate".to_string()),
                    port: VALIDATE_PORT,
                    target_port: Some(IntOrString::Int(VALIDATE_PORT)),
                    ..Default::default()
                },
                ServicePort {
                    name: Some("mgmt".to_string()),
                    port: MANAGEMENT_PORT,
                    target_port: Some(IntOrString::Int(MANAGEMENT_PORT)),
                    ..Default::default()
                },
            ]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Build the managed ServiceAccount the listener pods run as.
#[must_use]
pub fn build_service_account(namespace: &str, name: &str) -> ServiceAccount {
    ServiceAccount {
        metadata: ObjectMeta {
            name: Some(naming::service_account_name(name)),
            namespace: Some(namespace.to_string()),
            labels: Some(managed_labels(name)),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Build the managed Role: the listener may read authorizators in its own
/// namespace so it can pick up ruleset changes.
#[must_use]
pub fn build_role(namespace: &str, name: &str) -> Role {
    Role {
        metadata: ObjectMeta {
            name: Some(naming::role_name(name)),
            namespace: Some(namespace.to_string()),
            labels: Some(managed_labels(name)),
            ..Default::default()
        },
        rules: Some(vec![PolicyRule {
            api_groups: Some(vec![API_GROUP.to_string()]),
            resources: Some(vec![PLURAL_AUTHORIZATORS.to_string()]),
            verbs: vec![
                "get".to_string(),
                "list".to_string(),
                "watch".to_string(),
            ],
            ..Default::default()
        }]),
    }
}

/// Build the managed RoleBinding tying the Role to the ServiceAccount.
#[must_use]
pub fn build_role_binding(namespace: &str, name: &str) -> RoleBinding {
    RoleBinding {
        metadata: ObjectMeta {
            name: Some(naming::role_binding_name(name)),
            namespace: Some(namespace.to_string()),
            labels: Some(managed_labels(name)),
            ..Default::default()
        },
        role_ref: RoleRef {
            api_group: "rbac.authorization.k8s.io".to_string(),
            kind: "Role".to_string(),
            name: naming::role_name(name),
        },
        subjects: Some(vec![Subject {
            kind: "ServiceAccount".to_string(),
            name: naming::service_account_name(name),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        }]),
    }
}

/// Read the back-reference ingress annotation off a managed Deployment's pod
/// template, if present.
#[must_use]
pub fn ingress_back_reference(deployment: &Deployment) -> Option<String> {
    deployment
        .spec
        .as_ref()?
        .template
        .metadata
        .as_ref()?
        .annotations
        .as_ref()?
        .get(ANNOTATION_INGRESS)
        .cloned()
}
