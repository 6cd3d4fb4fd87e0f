// Copyright (c) 2026 the authgate authors
// SPDX-License-Identifier: MIT

//! Thin typed wrappers over the Kubernetes API.
//!
//! The reconciler talks to the cluster exclusively through [`ResourceAdapter`]
//! so workflows stay readable and the API surface the operator depends on is
//! visible in one place. Errors are returned raw (`kube::Error`); the caller
//! decides which ones are benign.

use k8s_openapi::api::core::v1::{Namespace, Pod, Service};
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::NamespaceResourceScope;
use kube::api::{ApiResource, DeleteParams, DynamicObject, GroupVersionKind, ListParams, PostParams};
use kube::{Api, Client, Resource};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::constants::{
    FIELD_MANAGER, TRAEFIK_API_GROUP, TRAEFIK_API_VERSION, TRAEFIK_KIND_MIDDLEWARE,
    TRAEFIK_PLURAL_MIDDLEWARES,
};

fn post_params() -> PostParams {
    PostParams {
        field_manager: Some(FIELD_MANAGER.to_string()),
        ..PostParams::default()
    }
}

/// Typed access to everything the operator reads or writes in the cluster.
#[derive(Clone)]
pub struct ResourceAdapter {
    client: Client,
}

impl ResourceAdapter {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// The underlying client, for callers that need their own `Api` handles.
    #[must_use]
    pub fn client(&self) -> &Client {
        &self.client
    }

    fn api<T>(&self, namespace: &str) -> Api<T>
    where
        T: Resource<Scope = NamespaceResourceScope>,
        T::DynamicType: Default,
    {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn middleware_api(&self, namespace: &str) -> Api<DynamicObject> {
        let gvk = GroupVersionKind::gvk(
            TRAEFIK_API_GROUP,
            TRAEFIK_API_VERSION,
            TRAEFIK_KIND_MIDDLEWARE,
        );
        let ar = ApiResource::from_gvk_with_plural(&gvk, TRAEFIK_PLURAL_MIDDLEWARES);
        Api::namespaced_with(self.client.clone(), namespace, &ar)
    }

    /// Create a namespaced object.
    pub async fn create<T>(&self, namespace: &str, object: &T) -> kube::Result<T>
    where
        T: Resource<Scope = NamespaceResourceScope>
            + Clone
            + DeserializeOwned
            + Serialize
            + std::fmt::Debug,
        T::DynamicType: Default,
    {
        self.api::<T>(namespace).create(&post_params(), object).await
    }

    /// Replace a namespaced object by name. The caller must carry over the
    /// current `resourceVersion` on the object or the API server rejects it;
    /// for managed objects we fetch-then-replace in the reconciler.
    pub async fn replace<T>(&self, namespace: &str, name: &str, object: &T) -> kube::Result<T>
    where
        T: Resource<Scope = NamespaceResourceScope>
            + Clone
            + DeserializeOwned
            + Serialize
            + std::fmt::Debug,
        T::DynamicType: Default,
    {
        self.api::<T>(namespace)
            .replace(name, &post_params(), object)
            .await
    }

    /// Fetch a namespaced object by name.
    pub async fn get<T>(&self, namespace: &str, name: &str) -> kube::Result<T>
    where
        T: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + std::fmt::Debug,
        T::DynamicType: Default,
    {
        self.api::<T>(namespace).get(name).await
    }

    /// Delete a namespaced object by name.
    pub async fn delete<T>(&self, namespace: &str, name: &str) -> kube::Result<()>
    where
        T: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + std::fmt::Debug,
        T::DynamicType: Default,
    {
        self.api::<T>(namespace)
            .delete(name, &DeleteParams::default())
            .await
            .map(|_| ())
    }

    // ------------------------------------------------------------------
    // Ingress
    // ------------------------------------------------------------------

    /// Fetch the Ingress an authorizator references.
    pub async fn get_ingress(&self, namespace: &str, name: &str) -> kube::Result<Ingress> {
        self.get::<Ingress>(namespace, name).await
    }

    /// Persist a mutated Ingress back. Exactly one write per attach/detach;
    /// conflicts are surfaced, not retried.
    pub async fn replace_ingress(&self, namespace: &str, ingress: &Ingress) -> kube::Result<Ingress> {
        let name = ingress.metadata.name.clone().unwrap_or_default();
        self.replace::<Ingress>(namespace, &name, ingress).await
    }

    // ------------------------------------------------------------------
    // Traefik Middleware (foreign CRD, handled dynamically)
    // ------------------------------------------------------------------

    /// Create a Traefik Middleware object.
    pub async fn create_middleware(
        &self,
        namespace: &str,
        middleware: &DynamicObject,
    ) -> kube::Result<DynamicObject> {
        self.middleware_api(namespace)
            .create(&post_params(), middleware)
            .await
    }

    /// Delete a Traefik Middleware object by name.
    pub async fn delete_middleware(&self, namespace: &str, name: &str) -> kube::Result<()> {
        self.middleware_api(namespace)
            .delete(name, &DeleteParams::default())
            .await
            .map(|_| ())
    }

    // ------------------------------------------------------------------
    // Replica directory support
    // ------------------------------------------------------------------

    /// Fetch a Service by name.
    pub async fn get_service(&self, namespace: &str, name: &str) -> kube::Result<Service> {
        self.get::<Service>(namespace, name).await
    }

    /// List pods matching a label selector string (`k=v,k2=v2`).
    pub async fn list_pods(&self, namespace: &str, selector: &str) -> kube::Result<Vec<Pod>> {
        let params = ListParams::default().labels(selector);
        let list = self.api::<Pod>(namespace).list(&params).await?;
        Ok(list.items)
    }

    // ------------------------------------------------------------------
    // Startup probe
    // ------------------------------------------------------------------

    /// One namespace list at boot to verify the service account can see the
    /// cluster at all. Failures are fatal to startup.
    pub async fn probe_access(&self) -> kube::Result<usize> {
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        let list = namespaces.list(&ListParams::default().limit(10)).await?;
        Ok(list.items.len())
    }
}
