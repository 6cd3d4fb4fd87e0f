// Copyright (c) 2026 the authgate authors
// SPDX-License-Identifier: MIT

//! Ingress annotation strategies, one per supported controller flavor.
//!
//! Each strategy knows how to wire one ingress controller to the workload's
//! validation endpoint (`attach`) and how to unwire it (`detach`). Detach
//! removes exactly the keys attach added. The reconciler performs the single
//! ingress read-modify-write around these calls; strategies only mutate the
//! in-memory object, except Traefik, which also owns a Middleware object in
//! the cluster.

use std::collections::BTreeMap;

use async_trait::async_trait;
use k8s_openapi::api::networking::v1::Ingress;
use kube::api::DynamicObject;
use serde_json::json;
use tracing::{error, warn};

use crate::adapter::ResourceAdapter;
use crate::constants::{
    NGINX_INGRESS_AUTH_METHOD, NGINX_INGRESS_AUTH_RESPONSE_HEADERS, NGINX_INGRESS_AUTH_URL,
    NGINX_ORG_LOCATION_SNIPPETS, NGINX_ORG_SERVER_SNIPPETS, TRAEFIK_ROUTER_MIDDLEWARES,
};
use crate::crd::IngressProvider;
use crate::naming;

/// Everything a strategy needs to compute URLs and reach the cluster.
pub struct StrategyContext<'a> {
    pub adapter: &'a ResourceAdapter,
    pub namespace: &'a str,
    pub name: &'a str,
    pub cluster_domain: &'a str,
}

impl StrategyContext<'_> {
    fn validate_url(&self) -> String {
        naming::validate_url(self.namespace, self.name, self.cluster_domain)
    }
}

/// Capability interface over the closed provider set.
#[async_trait]
pub trait AnnotationStrategy: Send + Sync {
    /// Wire the ingress to the validation endpoint. Mutates `ingress` in
    /// memory; the caller persists it.
    async fn attach(&self, ctx: &StrategyContext<'_>, ingress: &mut Ingress)
        -> anyhow::Result<()>;

    /// Remove everything `attach` added.
    async fn detach(&self, ctx: &StrategyContext<'_>, ingress: &mut Ingress)
        -> anyhow::Result<()>;
}

/// Strategy for a provider tag.
#[must_use]
pub fn strategy_for(provider: IngressProvider) -> Box<dyn AnnotationStrategy> {
    match provider {
        IngressProvider::IngressNginx => Box::new(IngressNginxStrategy),
        IngressProvider::NginxIngress => Box::new(NginxOrgStrategy),
        IngressProvider::Traefik => Box::new(TraefikStrategy),
        IngressProvider::Haproxy => Box::new(UnsupportedStrategy { tag: "haproxy" }),
        IngressProvider::Invalid => Box::new(InvalidStrategy),
    }
}

fn annotations_mut(ingress: &mut Ingress) -> &mut BTreeMap<String, String> {
    ingress.metadata.annotations.get_or_insert_with(BTreeMap::new)
}

fn remove_keys(ingress: &mut Ingress, keys: &[&str]) {
    if let Some(annotations) = ingress.metadata.annotations.as_mut() {
        for key in keys {
            annotations.remove(*key);
        }
    }
}

// ----------------------------------------------------------------------
// ingress-nginx (kubernetes/ingress-nginx)
// ----------------------------------------------------------------------

/// External-auth annotations understood by the community nginx controller.
#[must_use]
pub fn ingress_nginx_annotations(validate_url: &str) -> BTreeMap<String, String> {
    let mut a = BTreeMap::new();
    a.insert(NGINX_INGRESS_AUTH_URL.to_string(), validate_url.to_string());
    a.insert(NGINX_INGRESS_AUTH_METHOD.to_string(), "GET".to_string());
    a.insert(
        NGINX_INGRESS_AUTH_RESPONSE_HEADERS.to_string(),
        "WWW-Authenticate".to_string(),
    );
    a
}

struct IngressNginxStrategy;

#[async_trait]
impl AnnotationStrategy for IngressNginxStrategy {
    async fn attach(
        &self,
        ctx: &StrategyContext<'_>,
        ingress: &mut Ingress,
    ) -> anyhow::Result<()> {
        annotations_mut(ingress).extend(ingress_nginx_annotations(&ctx.validate_url()));
        Ok(())
    }

    async fn detach(
        &self,
        _ctx: &StrategyContext<'_>,
        ingress: &mut Ingress,
    ) -> anyhow::Result<()> {
        remove_keys(
            ingress,
            &[
                NGINX_INGRESS_AUTH_URL,
                NGINX_INGRESS_AUTH_METHOD,
                NGINX_INGRESS_AUTH_RESPONSE_HEADERS,
            ],
        );
        Ok(())
    }
}

// ----------------------------------------------------------------------
// nginx-ingress (nginx.org)
// ----------------------------------------------------------------------

/// Snippet annotations for the nginx.org controller, which has no external
/// auth primitive; routing goes through an internal auth_request location.
#[must_use]
pub fn nginx_org_annotations(validate_url: &str) -> BTreeMap<String, String> {
    let mut a = BTreeMap::new();
    a.insert(
        NGINX_ORG_LOCATION_SNIPPETS.to_string(),
        "auth_request /authgate-auth;".to_string(),
    );
    a.insert(
        NGINX_ORG_SERVER_SNIPPETS.to_string(),
        format!(
            "location = /authgate-auth {{ internal; proxy_pass {validate_url}; \
             proxy_pass_request_body off; proxy_set_header Content-Length \"\"; \
             proxy_set_header X-Original-URI $request_uri; }}"
        ),
    );
    a
}

struct NginxOrgStrategy;

#[async_trait]
impl AnnotationStrategy for NginxOrgStrategy {
    async fn attach(
        &self,
        ctx: &StrategyContext<'_>,
        ingress: &mut Ingress,
    ) -> anyhow::Result<()> {
        annotations_mut(ingress).extend(nginx_org_annotations(&ctx.validate_url()));
        Ok(())
    }

    async fn detach(
        &self,
        _ctx: &StrategyContext<'_>,
        ingress: &mut Ingress,
    ) -> anyhow::Result<()> {
        remove_keys(
            ingress,
            &[NGINX_ORG_LOCATION_SNIPPETS, NGINX_ORG_SERVER_SNIPPETS],
        );
        Ok(())
    }
}

// ----------------------------------------------------------------------
// traefik
// ----------------------------------------------------------------------

/// The router.middlewares reference Traefik expects:
/// `{namespace}-{middleware}@kubernetescrd`.
#[must_use]
pub fn traefik_middleware_reference(namespace: &str, name: &str) -> String {
    format!(
        "{namespace}-{middleware}@kubernetescrd",
        middleware = naming::middleware_name(name)
    )
}

/// Build the forwardAuth Middleware object for an authorizator.
///
/// Built as a `DynamicObject` because the Middleware CRD belongs to Traefik;
/// we do not carry typed bindings for it.
pub fn build_middleware(
    namespace: &str,
    name: &str,
    cluster_domain: &str,
) -> anyhow::Result<DynamicObject> {
    let object = json!({
        "apiVersion": "traefik.io/v1alpha1",
        "kind": "Middleware",
        "metadata": {
            "name": naming::middleware_name(name),
            "namespace": namespace,
            "labels": {
                "app": naming::app_label(name),
                "app.kubernetes.io/managed-by": "authgate",
            },
        },
        "spec": {
            "forwardAuth": {
                "address": naming::validate_url(namespace, name, cluster_domain),
            },
        },
    });
    Ok(serde_json::from_value(object)?)
}

struct TraefikStrategy;

#[async_trait]
impl AnnotationStrategy for TraefikStrategy {
    async fn attach(
        &self,
        ctx: &StrategyContext<'_>,
        ingress: &mut Ingress,
    ) -> anyhow::Result<()> {
        let middleware = build_middleware(ctx.namespace, ctx.name, ctx.cluster_domain)?;
        match ctx.adapter.create_middleware(ctx.namespace, &middleware).await {
            Ok(_) => {}
            Err(e) if crate::errors::is_conflict(&e) => {
                // Left over from an earlier attach; the shape is deterministic
                // so the existing object is already correct.
                warn!(
                    namespace = ctx.namespace,
                    name = ctx.name,
                    "Middleware already exists, reusing it"
                );
            }
            Err(e) => return Err(e.into()),
        }

        annotations_mut(ingress).insert(
            TRAEFIK_ROUTER_MIDDLEWARES.to_string(),
            traefik_middleware_reference(ctx.namespace, ctx.name),
        );
        Ok(())
    }

    async fn detach(
        &self,
        ctx: &StrategyContext<'_>,
        ingress: &mut Ingress,
    ) -> anyhow::Result<()> {
        remove_keys(ingress, &[TRAEFIK_ROUTER_MIDDLEWARES]);

        let middleware = naming::middleware_name(ctx.name);
        match ctx.adapter.delete_middleware(ctx.namespace, &middleware).await {
            Ok(()) => Ok(()),
            Err(e) if crate::errors::is_not_found(&e) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// ----------------------------------------------------------------------
// unsupported / invalid
// ----------------------------------------------------------------------

struct UnsupportedStrategy {
    tag: &'static str,
}

#[async_trait]
impl AnnotationStrategy for UnsupportedStrategy {
    async fn attach(
        &self,
        ctx: &StrategyContext<'_>,
        _ingress: &mut Ingress,
    ) -> anyhow::Result<()> {
        warn!(
            namespace = ctx.namespace,
            name = ctx.name,
            provider = self.tag,
            "Provider is recognized but not supported; ingress left untouched"
        );
        Ok(())
    }

    async fn detach(
        &self,
        _ctx: &StrategyContext<'_>,
        _ingress: &mut Ingress,
    ) -> anyhow::Result<()> {
        Ok(())
    }
}

struct InvalidStrategy;

#[async_trait]
impl AnnotationStrategy for InvalidStrategy {
    async fn attach(
        &self,
        ctx: &StrategyContext<'_>,
        _ingress: &mut Ingress,
    ) -> anyhow::Result<()> {
        error!(
            namespace = ctx.namespace,
            name = ctx.name,
            "Unknown ingress provider; ingress left untouched"
        );
        Ok(())
    }

    async fn detach(
        &self,
        _ctx: &StrategyContext<'_>,
        _ingress: &mut Ingress,
    ) -> anyhow::Result<()> {
        Ok(())
    }
}
