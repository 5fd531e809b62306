//! Status convergence pass for a single DoclingServ
//!
//! A pass snapshots the owner's status, runs every [`StatusStep`] in order
//! against freshly read dependents, commits whatever it managed to derive,
//! and reports whether the status moved.
//!
//! The commit happens on every exit path: after all steps succeed, after the
//! first step fails, and after a step panics (the panic resumes once the
//! commit has been attempted).

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use k8s_openapi::api::apps::v1::Deployment;
use kube::ResourceExt;
use tracing::{debug, error, info, instrument};

use docling_common::conditions::{is_status_condition_true, set_status_condition_at};
use docling_common::crd::{Condition, DoclingServ, DoclingServStatus};
use docling_common::{Error, DEFAULT_WORKLOAD_NAME, ROUTE_NAME_SUFFIX, SERVICE_NAME_SUFFIX};

use crate::client::StatusKubeClient;
use crate::observe;

// =============================================================================
// Configuration and outcome
// =============================================================================

/// Settings for the status reconciler
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusConfig {
    /// Name of the docling-serve Deployment in each owner's namespace
    pub workload_name: String,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            workload_name: DEFAULT_WORKLOAD_NAME.to_string(),
        }
    }
}

/// Result of a successful status pass
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusOutcome {
    /// Status already matched the dependents; nothing to do until they change
    Converged,
    /// Status moved during this pass; run again to confirm it settled
    Requeue,
}

impl StatusOutcome {
    /// Whether another pass should be scheduled soon
    pub fn requeue(&self) -> bool {
        matches!(self, Self::Requeue)
    }
}

// =============================================================================
// Steps
// =============================================================================

/// One slice of the status, derived from one dependent
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusStep {
    /// `servImage` from the workload's first container
    ImageReference,
    /// `uiEnabled` from the workload's first container
    UiEnabled,
    /// `Available` and the workload's last condition
    DeploymentConditions,
    /// `ServiceCreated`, `LoadBalancerAssigned` and the Service's last condition
    ServiceConditions,
    /// `RouteCreated` and the first router's last condition
    RouteConditions,
    /// `readyReplicas` from the workload status
    ReadyReplicas,
}

impl StatusStep {
    /// Order in which a pass runs the steps
    pub const ORDER: [StatusStep; 6] = [
        StatusStep::ImageReference,
        StatusStep::UiEnabled,
        StatusStep::DeploymentConditions,
        StatusStep::ServiceConditions,
        StatusStep::RouteConditions,
        StatusStep::ReadyReplicas,
    ];

    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::ImageReference => "image-reference",
            Self::UiEnabled => "ui-enabled",
            Self::DeploymentConditions => "deployment-conditions",
            Self::ServiceConditions => "service-conditions",
            Self::RouteConditions => "route-conditions",
            Self::ReadyReplicas => "ready-replicas",
        }
    }
}

/// Names of the dependents backing one owner
struct Dependents {
    namespace: String,
    workload: String,
    service: String,
    route: String,
}

impl Dependents {
    fn for_owner(serv: &DoclingServ, config: &StatusConfig) -> Result<Self, Error> {
        let name = serv.name_any();
        let namespace = serv
            .namespace()
            .ok_or_else(|| Error::missing_field("DoclingServ", &name, "metadata.namespace"))?;
        Ok(Self {
            namespace,
            workload: config.workload_name.clone(),
            service: format!("{}{}", name, SERVICE_NAME_SUFFIX),
            route: format!("{}{}", name, ROUTE_NAME_SUFFIX),
        })
    }
}

// =============================================================================
// Reconciler
// =============================================================================

/// Derives and commits `DoclingServ.status`
pub struct StatusReconciler {
    kube: Arc<dyn StatusKubeClient>,
    config: StatusConfig,
}

impl StatusReconciler {
    /// Create a reconciler over the given client
    pub fn new(kube: Arc<dyn StatusKubeClient>, config: StatusConfig) -> Self {
        Self { kube, config }
    }

    /// Settings this reconciler was built with
    pub fn config(&self) -> &StatusConfig {
        &self.config
    }

    /// Fetch the owner by key and run a pass on it.
    ///
    /// A deleted owner has no status to converge and yields `Converged`.
    pub async fn reconcile_key(&self, namespace: &str, name: &str) -> Result<StatusOutcome, Error> {
        let Some(mut serv) = self.kube.get_docling_serv(name, namespace).await? else {
            debug!(serv = %name, namespace = %namespace, "DoclingServ not found, nothing to reconcile");
            return Ok(StatusOutcome::Converged);
        };
        self.reconcile(&mut serv).await
    }

    /// Run one pass on `serv`, stamping condition transitions with the current time
    pub async fn reconcile(&self, serv: &mut DoclingServ) -> Result<StatusOutcome, Error> {
        self.reconcile_at(serv, Utc::now()).await
    }

    /// Run one pass on `serv`, stamping condition transitions with `now`.
    ///
    /// On return `serv.status` holds what was committed (or attempted).
    #[instrument(skip(self, serv, now), fields(serv = %serv.name_any(), generation = tracing::field::Empty))]
    pub async fn reconcile_at(
        &self,
        serv: &mut DoclingServ,
        now: DateTime<Utc>,
    ) -> Result<StatusOutcome, Error> {
        let before = serv.status.clone();

        let generation = serv.metadata.generation.unwrap_or_default();
        tracing::Span::current().record("generation", generation);
        serv.status.get_or_insert_with(Default::default).observed_generation = generation;

        let pass = AssertUnwindSafe(self.run_steps(serv, now))
            .catch_unwind()
            .await;

        self.commit_status(serv).await;

        let result = match pass {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        };
        result?;

        let outcome = if serv.status == before {
            StatusOutcome::Converged
        } else {
            StatusOutcome::Requeue
        };

        let status = serv.status.as_ref();
        debug!(
            ?outcome,
            available = status.is_some_and(|s| is_status_condition_true(&s.conditions, observe::AVAILABLE)),
            ready_replicas = status.map(|s| s.ready_replicas).unwrap_or_default(),
            "status pass complete"
        );
        Ok(outcome)
    }

    /// Run the steps in order, stopping at the first failure
    async fn run_steps(&self, serv: &mut DoclingServ, now: DateTime<Utc>) -> Result<(), Error> {
        let dependents = Dependents::for_owner(serv, &self.config)?;
        let status = serv.status.get_or_insert_with(Default::default);

        for step in StatusStep::ORDER {
            if let Err(e) = self.run_step(step, &dependents, status, now).await {
                debug!(step = step.name(), error = %e, "status step failed, skipping the rest");
                return Err(e);
            }
        }
        Ok(())
    }

    async fn run_step(
        &self,
        step: StatusStep,
        dependents: &Dependents,
        status: &mut DoclingServStatus,
        now: DateTime<Utc>,
    ) -> Result<(), Error> {
        match step {
            StatusStep::ImageReference => {
                let deployment = self.workload(dependents).await?;
                status.serv_image = observe::image_reference(&deployment)?;
            }
            StatusStep::UiEnabled => {
                let deployment = self.workload(dependents).await?;
                status.ui_enabled = observe::ui_enabled(&deployment)?;
            }
            StatusStep::DeploymentConditions => {
                let deployment = self.workload(dependents).await?;
                upsert_all(&mut status.conditions, observe::deployment_conditions(&deployment), now);
            }
            StatusStep::ServiceConditions => {
                let service = self
                    .kube
                    .get_service(&dependents.service, &dependents.namespace)
                    .await?
                    .ok_or_else(|| {
                        Error::not_found("Service", &dependents.namespace, &dependents.service)
                    })?;
                upsert_all(&mut status.conditions, observe::service_conditions(&service), now);
            }
            StatusStep::RouteConditions => {
                let route = self
                    .kube
                    .get_route(&dependents.route, &dependents.namespace)
                    .await?
                    .ok_or_else(|| {
                        Error::not_found("Route", &dependents.namespace, &dependents.route)
                    })?;
                upsert_all(&mut status.conditions, observe::route_conditions(&route), now);
            }
            StatusStep::ReadyReplicas => {
                let deployment = self.workload(dependents).await?;
                status.ready_replicas = observe::ready_replicas(&deployment);
            }
        }
        Ok(())
    }

    async fn workload(&self, dependents: &Dependents) -> Result<Deployment, Error> {
        self.kube
            .get_deployment(&dependents.workload, &dependents.namespace)
            .await?
            .ok_or_else(|| {
                Error::not_found("Deployment", &dependents.namespace, &dependents.workload)
            })
    }

    /// Persist the status. Failures are logged and never change the pass result.
    async fn commit_status(&self, serv: &DoclingServ) {
        let name = serv.name_any();
        match self.kube.patch_status(serv).await {
            Ok(()) => info!(serv = %name, "DoclingServ status committed"),
            Err(e) if e.is_conflict() => {
                info!(serv = %name, error = %e, "DoclingServ changed since read, status left for the next pass")
            }
            Err(e) => error!(serv = %name, error = %e, "failed to commit DoclingServ status"),
        }
    }
}

fn upsert_all(conditions: &mut Vec<Condition>, upserts: Vec<Condition>, now: DateTime<Utc>) {
    for condition in upserts {
        set_status_condition_at(conditions, condition, now);
    }
}
