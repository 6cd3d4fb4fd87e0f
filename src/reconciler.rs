// Copyright (c) 2026 the authgate authors
// SPDX-License-Identifier: MIT

//! Event workflows: Add, Modify, Delete.
//!
//! Workflows are best-effort sequences. Validation failures reject the whole
//! event before anything is touched; after that, each step logs its failure
//! and the workflow moves on, so one broken object never strands the rest of
//! the managed set. Delete is the recovery path for a half-built set.
//!
//! Events for the same authorizator run in dispatch order through a
//! per-identity queue drained by a single worker task; distinct authorizators
//! reconcile concurrently. The watch transport never waits on a workflow.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Instant;

use futures::future::BoxFuture;
use tokio::sync::mpsc;

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Service, ServiceAccount};
use k8s_openapi::api::rbac::v1::{Role, RoleBinding};
use kube::ResourceExt;
use tracing::{error, info, warn};

use crate::context::Context;
use crate::crd::Authorizator;
use crate::errors::{is_not_found, AuthgateError};
use crate::metrics;
use crate::naming;
use crate::providers::{strategy_for, StrategyContext};
use crate::resources;

/// A watch event translated into reconciler vocabulary.
#[derive(Debug, Clone)]
pub enum AuthorizatorEvent {
    Added(Box<Authorizator>),
    Modified(Box<Authorizator>),
    Deleted(Box<Authorizator>),
}

impl AuthorizatorEvent {
    fn label(&self) -> &'static str {
        match self {
            Self::Added(_) => "added",
            Self::Modified(_) => "modified",
            Self::Deleted(_) => "deleted",
        }
    }

    fn object(&self) -> &Authorizator {
        match self {
            Self::Added(a) | Self::Modified(a) | Self::Deleted(a) => a,
        }
    }
}

/// Workflow outcome, for metrics.
enum Outcome {
    Success,
    Rejected,
}

/// The worker body run for each queued event. Returns `true` when the event
/// ends the identity's lifecycle, letting the worker retire its queue.
type QueueHandler<E> = Arc<dyn Fn(E) -> BoxFuture<'static, bool> + Send + Sync>;

/// One FIFO queue and one worker task per (namespace, name).
///
/// Events are sent into the channel while the map lock is held, so channel
/// order is dispatch order, and the single worker drains the channel in that
/// order. Distinct identities drain concurrently. After a lifecycle-ending
/// event the worker drops its queue entry once the channel is empty; the map
/// does not grow with dead identities.
pub(crate) struct IdentityQueues<E: Send + 'static> {
    queues: Mutex<HashMap<(String, String), mpsc::UnboundedSender<E>>>,
    handler: QueueHandler<E>,
}

impl<E: Send + 'static> IdentityQueues<E> {
    pub(crate) fn new(handler: QueueHandler<E>) -> Arc<Self> {
        Arc::new(Self {
            queues: Mutex::new(HashMap::new()),
            handler,
        })
    }

    fn map(&self) -> MutexGuard<'_, HashMap<(String, String), mpsc::UnboundedSender<E>>> {
        match self.queues.lock() {
            Ok(map) => map,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Queue an event for its identity. Returns immediately.
    pub(crate) fn dispatch(self: &Arc<Self>, key: (String, String), event: E) {
        let undelivered = {
            let mut map = self.map();
            let sender = map
                .entry(key.clone())
                .or_insert_with(|| self.spawn_worker(key.clone()));
            sender.send(event).err()
        };

        // A closed channel means the worker died mid-event (a handler panic).
        // Drop the dead entry and queue against a fresh worker.
        if let Some(mpsc::error::SendError(event)) = undelivered {
            warn!(namespace = %key.0, name = %key.1, "Identity worker gone, restarting it");
            self.map().remove(&key);
            self.dispatch(key, event);
        }
    }

    fn spawn_worker(self: &Arc<Self>, key: (String, String)) -> mpsc::UnboundedSender<E> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let this = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let retire = (this.handler)(event).await;
                if retire {
                    // Sends happen under the map lock, so an empty channel
                    // here means nothing can arrive through this entry before
                    // it is gone. Dropping the sender ends the stream.
                    let mut map = this.map();
                    if rx.is_empty() {
                        map.remove(&key);
                    }
                }
            }
        });
        tx
    }

    #[cfg(test)]
    pub(crate) fn active_identities(&self) -> usize {
        self.map().len()
    }
}

/// Serializes events per authorizator and runs the workflows.
pub struct Reconciler {
    ctx: Arc<Context>,
    queues: Arc<IdentityQueues<AuthorizatorEvent>>,
}

impl Reconciler {
    #[must_use]
    pub fn new(ctx: Arc<Context>) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<Self>| {
            let weak = weak.clone();
            let handler: QueueHandler<AuthorizatorEvent> =
                Arc::new(move |event: AuthorizatorEvent| {
                    let weak = weak.clone();
                    let fut: BoxFuture<'static, bool> = Box::pin(async move {
                        let retire = matches!(event, AuthorizatorEvent::Deleted(_));
                        if let Some(this) = weak.upgrade() {
                            this.process(event).await;
                        }
                        retire
                    });
                    fut
                });
            Self {
                ctx,
                queues: IdentityQueues::new(handler),
            }
        })
    }

    /// Hand an event to its identity's queue. Returns immediately; the
    /// identity's worker runs the workflow.
    pub fn dispatch(&self, event: AuthorizatorEvent) {
        let object = event.object();
        let key = (object.namespace_or_default(), object.name_any());
        self.queues.dispatch(key, event);
    }

    async fn process(&self, event: AuthorizatorEvent) {
        let label = event.label();
        let started = Instant::now();

        let outcome = match &event {
            AuthorizatorEvent::Added(a) => self.process_add(a).await,
            AuthorizatorEvent::Modified(a) => self.process_modify(a).await,
            AuthorizatorEvent::Deleted(a) => self.process_delete(a).await,
        };

        match outcome {
            Ok(Outcome::Success) => metrics::record_event(label, "success", started.elapsed()),
            Ok(Outcome::Rejected) => metrics::record_event(label, "rejected", started.elapsed()),
            Err(e) => {
                error!(event = label, error = %e, "Event workflow failed");
                metrics::record_event(label, "error", started.elapsed());
            }
        }
    }

    /// Validate that the referenced Ingress exists, returning it for the
    /// attach step. 404 rejects the event; other lookup failures too, but
    /// logged as infrastructure trouble rather than user error.
    async fn validate_ingress(
        &self,
        namespace: &str,
        name: &str,
        ingress_name: &str,
    ) -> Option<k8s_openapi::api::networking::v1::Ingress> {
        match self.ctx.adapter.get_ingress(namespace, ingress_name).await {
            Ok(ingress) => Some(ingress),
            Err(e) if is_not_found(&e) => {
                error!(
                    namespace,
                    name,
                    error = %AuthgateError::IngressNotFound {
                        ingress: ingress_name.to_string(),
                        namespace: namespace.to_string(),
                    },
                    "Rejecting event"
                );
                None
            }
            Err(e) => {
                error!(
                    namespace,
                    name,
                    ingress = ingress_name,
                    error = %AuthgateError::ValidationFailed {
                        namespace: namespace.to_string(),
                        name: name.to_string(),
                        source: e,
                    },
                    "Ingress validation failed, rejecting event"
                );
                None
            }
        }
    }

    async fn process_add(&self, az: &Authorizator) -> anyhow::Result<Outcome> {
        let namespace = az.namespace_or_default();
        let name = az.name_any();
        info!(namespace, name, "Adding authorizator");

        let Some(mut ingress) = self
            .validate_ingress(&namespace, &name, &az.spec.ingress.name)
            .await
        else {
            return Ok(Outcome::Rejected);
        };

        // From here on every step is best-effort.
        let deployment = resources::build_deployment(&namespace, &name, &az.spec);
        self.create_step("Deployment", &namespace, &deployment).await;

        let service = resources::build_service(&namespace, &name);
        self.create_step("Service", &namespace, &service).await;

        // One read-modify-write on the ingress. The read happened during
        // validation; a concurrent editor loses to us or we to them.
        let strategy = strategy_for(az.spec.ingress.provider);
        let sctx = StrategyContext {
            adapter: &self.ctx.adapter,
            namespace: &namespace,
            name: &name,
            cluster_domain: &self.ctx.settings.cluster_domain,
        };
        match strategy.attach(&sctx, &mut ingress).await {
            Ok(()) => {
                if let Err(e) = self.ctx.adapter.replace_ingress(&namespace, &ingress).await {
                    warn!(namespace, name, error = %e, "Failed to persist ingress annotations");
                    metrics::record_managed_op("Ingress", "replace", false);
                } else {
                    metrics::record_managed_op("Ingress", "replace", true);
                }
            }
            Err(e) => {
                warn!(namespace, name, error = %e, "Ingress attach failed");
            }
        }

        let sa = resources::build_service_account(&namespace, &name);
        self.create_step("ServiceAccount", &namespace, &sa).await;

        let role = resources::build_role(&namespace, &name);
        self.create_step("Role", &namespace, &role).await;

        let binding = resources::build_role_binding(&namespace, &name);
        self.create_step("RoleBinding", &namespace, &binding).await;

        info!(namespace, name, "Authorizator added");
        Ok(Outcome::Success)
    }

    async fn process_modify(&self, az: &Authorizator) -> anyhow::Result<Outcome> {
        let namespace = az.namespace_or_default();
        let name = az.name_any();
        info!(namespace, name, "Modifying authorizator");

        if self
            .validate_ingress(&namespace, &name, &az.spec.ingress.name)
            .await
            .is_none()
        {
            return Ok(Outcome::Rejected);
        }

        // Only the Deployment reflects the new spec; Service, RBAC bundle and
        // ingress annotations are spec-independent or immutable-by-design.
        let deployment_name = naming::deployment_name(&name);
        match self
            .ctx
            .adapter
            .get::<Deployment>(&namespace, &deployment_name)
            .await
        {
            Ok(existing) => {
                let mut deployment = resources::build_deployment(&namespace, &name, &az.spec);
                // replace() demands the live resourceVersion.
                deployment.metadata.resource_version = existing.metadata.resource_version;
                match self
                    .ctx
                    .adapter
                    .replace(&namespace, &deployment_name, &deployment)
                    .await
                {
                    Ok(_) => metrics::record_managed_op("Deployment", "replace", true),
                    Err(e) => {
                        warn!(namespace, name, error = %e, "Failed to replace deployment");
                        metrics::record_managed_op("Deployment", "replace", false);
                    }
                }
            }
            Err(e) => {
                warn!(
                    namespace,
                    name,
                    error = %e,
                    "Deployment not readable during modify; leaving workload as-is"
                );
            }
        }

        info!(namespace, name, "Authorizator modified");
        Ok(Outcome::Success)
    }

    async fn process_delete(&self, az: &Authorizator) -> anyhow::Result<Outcome> {
        let namespace = az.namespace_or_default();
        let name = az.name_any();
        info!(namespace, name, "Deleting authorizator");

        // The deployment carries the ingress back-reference; without it there
        // is nothing to clean up (double delete, or add never ran).
        let deployment_name = naming::deployment_name(&name);
        let deployment = match self
            .ctx
            .adapter
            .get::<Deployment>(&namespace, &deployment_name)
            .await
        {
            Ok(d) => d,
            Err(e) if is_not_found(&e) => {
                warn!(
                    namespace,
                    name, "Managed deployment already gone, nothing to delete"
                );
                return Ok(Outcome::Success);
            }
            Err(e) => return Err(e.into()),
        };

        let annotated_ingress = resources::ingress_back_reference(&deployment);

        self.delete_step::<Deployment>("Deployment", &namespace, &deployment_name)
            .await;
        self.delete_step::<Service>("Service", &namespace, &naming::service_name(&name))
            .await;

        // Detach: one ingress read-modify-write, best-effort.
        if let Some(ingress_name) = annotated_ingress {
            match self.ctx.adapter.get_ingress(&namespace, &ingress_name).await {
                Ok(mut ingress) => {
                    let strategy = strategy_for(az.spec.ingress.provider);
                    let sctx = StrategyContext {
                        adapter: &self.ctx.adapter,
                        namespace: &namespace,
                        name: &name,
                        cluster_domain: &self.ctx.settings.cluster_domain,
                    };
                    match strategy.detach(&sctx, &mut ingress).await {
                        Ok(()) => {
                            if let Err(e) =
                                self.ctx.adapter.replace_ingress(&namespace, &ingress).await
                            {
                                warn!(namespace, name, error = %e, "Failed to persist ingress cleanup");
                                metrics::record_managed_op("Ingress", "replace", false);
                            } else {
                                metrics::record_managed_op("Ingress", "replace", true);
                            }
                        }
                        Err(e) => {
                            warn!(namespace, name, error = %e, "Ingress detach failed");
                        }
                    }
                }
                Err(e) if is_not_found(&e) => {
                    warn!(
                        namespace,
                        name,
                        ingress = ingress_name,
                        "Annotated ingress already gone, skipping detach"
                    );
                }
                Err(e) => {
                    warn!(namespace, name, error = %e, "Could not read ingress for detach");
                }
            }
        } else {
            warn!(
                namespace,
                name, "Deployment carried no ingress back-reference, skipping detach"
            );
        }

        self.delete_step::<ServiceAccount>(
            "ServiceAccount",
            &namespace,
            &naming::service_account_name(&name),
        )
        .await;
        self.delete_step::<Role>("Role", &namespace, &naming::role_name(&name))
            .await;
        self.delete_step::<RoleBinding>(
            "RoleBinding",
            &namespace,
            &naming::role_binding_name(&name),
        )
        .await;

        info!(namespace, name, "Authorizator deleted");
        Ok(Outcome::Success)
    }

    /// Best-effort create of one managed object.
    async fn create_step<T>(&self, kind: &str, namespace: &str, object: &T)
    where
        T: kube::Resource<Scope = k8s_openapi::NamespaceResourceScope>
            + Clone
            + serde::de::DeserializeOwned
            + serde::Serialize
            + std::fmt::Debug,
        T::DynamicType: Default,
    {
        match self.ctx.adapter.create(namespace, object).await {
            Ok(_) => metrics::record_managed_op(kind, "create", true),
            Err(e) => {
                warn!(namespace, kind, error = %e, "Failed to create managed object");
                metrics::record_managed_op(kind, "create", false);
            }
        }
    }

    /// Best-effort delete of one managed object; 404 counts as done.
    async fn delete_step<T>(&self, kind: &str, namespace: &str, name: &str)
    where
        T: kube::Resource<Scope = k8s_openapi::NamespaceResourceScope>
            + Clone
            + serde::de::DeserializeOwned
            + std::fmt::Debug,
        T::DynamicType: Default,
    {
        match self.ctx.adapter.delete::<T>(namespace, name).await {
            Ok(()) => metrics::record_managed_op(kind, "delete", true),
            Err(e) if is_not_found(&e) => metrics::record_managed_op(kind, "delete", true),
            Err(e) => {
                warn!(namespace, kind, name, error = %e, "Failed to delete managed object");
                metrics::record_managed_op(kind, "delete", false);
            }
        }
    }
}
