//! Controller runner - builds the status controller future
//!
//! Construction is kept apart from `main` so the binary only wires the
//! client, the configuration and the shutdown path.

use std::fmt::Debug;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use k8s_openapi::NamespaceResourceScope;
use kube::api::{Patch, PatchParams};
use kube::runtime::watcher::Config as WatcherConfig;
use kube::runtime::Controller;
use kube::{Api, Client, CustomResourceExt, Resource};

use docling_common::crd::{DoclingServ, Route};
use docling_common::FIELD_MANAGER;
use docling_status::{error_policy, reconcile, StatusContext};

use crate::config::OperatorConfig;

fn scoped_api<K>(client: Client, namespace: Option<&str>) -> Api<K>
where
    K: Resource<Scope = NamespaceResourceScope>,
    <K as Resource>::DynamicType: Default,
{
    match namespace {
        Some(ns) => Api::namespaced(client, ns),
        None => Api::all(client),
    }
}

/// Install or update the DoclingServ CRD with server-side apply
pub async fn ensure_crd_installed(client: &Client) -> Result<(), kube::Error> {
    let crds: Api<CustomResourceDefinition> = Api::all(client.clone());
    let params = PatchParams::apply(FIELD_MANAGER).force();
    let crd = DoclingServ::crd();
    let name = DoclingServ::crd_name();

    tracing::info!(crd = %name, "installing DoclingServ CRD");
    crds.patch(name, &params, &Patch::Apply(&crd)).await?;
    Ok(())
}

/// Build the DoclingServ status controller future
///
/// The controller re-triggers an owner whenever one of its owned Deployments,
/// Services or Routes changes, and stops on SIGINT/SIGTERM.
pub fn build_status_controller(
    client: Client,
    config: &OperatorConfig,
) -> Pin<Box<dyn Future<Output = ()> + Send>> {
    let ctx = Arc::new(StatusContext::new(
        client.clone(),
        config.status_config(),
        config.intervals(),
    ));
    let namespace = config.namespace.as_deref();
    let watcher = || WatcherConfig::default().timeout(config.watch_timeout_secs);

    let servs: Api<DoclingServ> = scoped_api(client.clone(), namespace);
    let deployments: Api<Deployment> = scoped_api(client.clone(), namespace);
    let services: Api<Service> = scoped_api(client.clone(), namespace);
    let routes: Api<Route> = scoped_api(client, namespace);

    tracing::info!(
        namespace = namespace.unwrap_or("<all>"),
        workload = %config.workload_name,
        "- DoclingServ status controller"
    );

    Box::pin(
        Controller::new(servs, watcher())
            .owns(deployments, watcher())
            .owns(services, watcher())
            .owns(routes, watcher())
            .shutdown_on_signal()
            .run(reconcile, error_policy, ctx)
            .for_each(log_reconcile_result("DoclingServ status")),
    )
}

/// Sink for the controller's result stream.
///
/// Successful runs only show up at debug level with the object and its next
/// action. Failures have already gone through `error_policy`, which decides
/// the requeue, and are echoed here at error level.
fn log_reconcile_result<T: Debug, E: Debug>(
    controller: &'static str,
) -> impl Fn(Result<T, E>) -> std::future::Ready<()> {
    move |result| {
        match result {
            Ok(scheduled) => tracing::debug!(?scheduled, "{controller} pass finished"),
            Err(e) => tracing::error!(error = ?e, "{controller} pass failed"),
        }
        std::future::ready(())
    }
}
