//! kube-runtime glue for the status reconciler

use std::sync::Arc;
use std::time::Duration;

use kube::runtime::controller::Action;
use kube::{Client, ResourceExt};
use tracing::{error, warn};

use docling_common::crd::DoclingServ;
use docling_common::Error;

use crate::client::{StatusKubeClient, StatusKubeClientImpl};
use crate::reconciler::{StatusConfig, StatusReconciler};

/// How long to wait before the next pass, per outcome
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatusIntervals {
    /// After a pass that changed the status
    pub requeue: Duration,
    /// After a pass that found nothing to change
    pub resync: Duration,
    /// After a retryable error
    pub error_backoff: Duration,
}

impl Default for StatusIntervals {
    fn default() -> Self {
        Self {
            requeue: Duration::from_secs(5),
            resync: Duration::from_secs(300),
            error_backoff: Duration::from_secs(30),
        }
    }
}

/// Shared context for the status controller
pub struct StatusContext {
    /// Reconciler run for each triggered object
    pub reconciler: StatusReconciler,
    /// Requeue timings
    pub intervals: StatusIntervals,
}

impl StatusContext {
    /// Create a context backed by a real Kubernetes client
    pub fn new(client: Client, config: StatusConfig, intervals: StatusIntervals) -> Self {
        Self::with_kube(Arc::new(StatusKubeClientImpl::new(client)), config, intervals)
    }

    /// Create a context over any client implementation
    pub fn with_kube(
        kube: Arc<dyn StatusKubeClient>,
        config: StatusConfig,
        intervals: StatusIntervals,
    ) -> Self {
        Self {
            reconciler: StatusReconciler::new(kube, config),
            intervals,
        }
    }

    /// Create a context for unit tests with default settings
    #[cfg(test)]
    pub fn for_testing(kube: Arc<dyn StatusKubeClient>) -> Self {
        Self::with_kube(kube, StatusConfig::default(), StatusIntervals::default())
    }
}

/// Reconcile the status of a DoclingServ
///
/// Works on a private copy of the cached object; the cache is refreshed by the
/// watch once the commit lands.
pub async fn reconcile(serv: Arc<DoclingServ>, ctx: Arc<StatusContext>) -> Result<Action, Error> {
    let mut serv = (*serv).clone();
    let outcome = ctx.reconciler.reconcile(&mut serv).await?;

    if outcome.requeue() {
        Ok(Action::requeue(ctx.intervals.requeue))
    } else {
        Ok(Action::requeue(ctx.intervals.resync))
    }
}

/// Decide what to do after a failed reconcile
///
/// Every failure is retried after the error backoff. Granting RBAC or
/// repairing a dependent does not always produce a watch event.
pub fn error_policy(serv: Arc<DoclingServ>, error: &Error, ctx: Arc<StatusContext>) -> Action {
    let backoff_secs = ctx.intervals.error_backoff.as_secs();
    if error.is_transient() {
        warn!(
            %error,
            serv = %serv.name_any(),
            backoff_secs,
            "status reconciliation failed, retrying"
        );
    } else {
        error!(
            ?error,
            serv = %serv.name_any(),
            backoff_secs,
            "status reconciliation failed and needs attention, retrying"
        );
    }
    Action::requeue(ctx.intervals.error_backoff)
}
