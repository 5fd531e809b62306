//! Kubernetes API surface used by the status reconciler
//!
//! The reconciler only needs point reads of its dependents and a single
//! status write. Keeping that behind a trait lets the reconciler be tested
//! with `mockall` instead of a live API server.

use std::fmt::Debug;

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::NamespaceResourceScope;
use kube::api::{Api, Patch, PatchParams};
use kube::{Client, Resource};
use serde::de::DeserializeOwned;
use tracing::debug;

#[cfg(test)]
use mockall::automock;

use docling_common::crd::{DoclingServ, Route};
use docling_common::{Error, FIELD_MANAGER};

/// Trait abstracting Kubernetes client operations for the status reconciler
///
/// Reads return `Ok(None)` when the object does not exist. `patch_status`
/// returns [`Error::Conflict`] when the owner changed since it was read.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait StatusKubeClient: Send + Sync {
    /// Get a DoclingServ by name and namespace
    async fn get_docling_serv(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<Option<DoclingServ>, Error>;

    /// Get a Deployment by name and namespace
    async fn get_deployment(&self, name: &str, namespace: &str)
        -> Result<Option<Deployment>, Error>;

    /// Get a Service by name and namespace
    async fn get_service(&self, name: &str, namespace: &str) -> Result<Option<Service>, Error>;

    /// Get an OpenShift Route by name and namespace
    async fn get_route(&self, name: &str, namespace: &str) -> Result<Option<Route>, Error>;

    /// Write the status subresource, conditioned on the object's resourceVersion
    async fn patch_status(&self, serv: &DoclingServ) -> Result<(), Error>;
}

/// Real Kubernetes client implementation
pub struct StatusKubeClientImpl {
    client: Client,
}

impl StatusKubeClientImpl {
    /// Create a new StatusKubeClientImpl wrapping the given client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn get_namespaced<K>(&self, name: &str, namespace: &str) -> Result<Option<K>, Error>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Debug,
        <K as Resource>::DynamicType: Default,
    {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }
}

#[async_trait]
impl StatusKubeClient for StatusKubeClientImpl {
    async fn get_docling_serv(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<Option<DoclingServ>, Error> {
        self.get_namespaced(name, namespace).await
    }

    async fn get_deployment(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<Option<Deployment>, Error> {
        self.get_namespaced(name, namespace).await
    }

    async fn get_service(&self, name: &str, namespace: &str) -> Result<Option<Service>, Error> {
        self.get_namespaced(name, namespace).await
    }

    async fn get_route(&self, name: &str, namespace: &str) -> Result<Option<Route>, Error> {
        self.get_namespaced(name, namespace).await
    }

    async fn patch_status(&self, serv: &DoclingServ) -> Result<(), Error> {
        let name = serv
            .metadata
            .name
            .as_deref()
            .ok_or_else(|| Error::missing_field("DoclingServ", "<unnamed>", "metadata.name"))?;
        let namespace = serv
            .metadata
            .namespace
            .as_deref()
            .ok_or_else(|| Error::missing_field("DoclingServ", name, "metadata.namespace"))?;

        let patch = status_patch(serv)?;
        let params = PatchParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..Default::default()
        };

        let api: Api<DoclingServ> = Api::namespaced(self.client.clone(), namespace);
        match api.patch_status(name, &params, &Patch::Merge(&patch)).await {
            Ok(_) => {
                debug!(serv = %name, namespace = %namespace, "patched DoclingServ status");
                Ok(())
            }
            Err(kube::Error::Api(ae)) if ae.code == 409 => {
                Err(Error::conflict("DoclingServ", name))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Build the JSON merge patch for a status write.
///
/// Including `metadata.resourceVersion` turns the patch into a
/// compare-and-swap: the API server answers 409 if the object moved on.
fn status_patch(serv: &DoclingServ) -> Result<serde_json::Value, Error> {
    let status = serde_json::to_value(&serv.status)?;
    let mut patch = serde_json::json!({ "status": status });
    if let Some(rv) = &serv.metadata.resource_version {
        patch["metadata"] = serde_json::json!({ "resourceVersion": rv });
    }
    Ok(patch)
}
