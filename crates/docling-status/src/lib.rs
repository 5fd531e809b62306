//! DoclingServ status controller
//!
//! Derives `DoclingServ.status` from the Deployment, Service and Route backing
//! each instance:
//! - [`observe`] holds the pure derivations, one per status slice
//! - [`reconciler`] runs them in a fixed, fail-fast order and commits the result
//! - [`controller`] adapts the reconciler to `kube::runtime::Controller`
//! - [`client`] is the narrow Kubernetes API surface the reconciler depends on

#![deny(missing_docs)]

pub mod client;
pub mod controller;
pub mod observe;
pub mod reconciler;

pub use client::{StatusKubeClient, StatusKubeClientImpl};
pub use controller::{error_policy, reconcile, StatusContext, StatusIntervals};
pub use reconciler::{StatusConfig, StatusOutcome, StatusReconciler, StatusStep};
