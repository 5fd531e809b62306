//! DoclingServ CRD types
//!
//! Defines `DoclingServ`, a docling-serve instance. The spec is acted on by the
//! deployment controllers; the status is owned by the status controller and
//! summarizes the Deployment, Service and Route that back the instance.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::{Condition, ConditionStatus};

fn default_replicas() -> i32 {
    1
}

// =============================================================================
// CRD
// =============================================================================

/// A docling-serve document conversion server
#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "docling.github.io",
    version = "v1alpha1",
    kind = "DoclingServ",
    plural = "doclingservs",
    shortname = "ds",
    namespaced,
    status = "DoclingServStatus",
    printcolumn = r#"{"name":"Image","type":"string","jsonPath":".status.servImage"}"#,
    printcolumn = r#"{"name":"UI","type":"string","jsonPath":".status.uiEnabled"}"#,
    printcolumn = r#"{"name":"Ready","type":"integer","jsonPath":".status.readyReplicas"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct DoclingServSpec {
    /// Container image for docling-serve
    pub image_reference: String,

    /// Serve the Gradio UI alongside the API
    #[serde(default)]
    pub enable_ui: bool,

    /// Desired number of docling-serve replicas
    #[serde(default = "default_replicas")]
    pub replicas: i32,

    /// Expose the service through an OpenShift Route
    #[serde(default)]
    pub route: bool,
}

impl Default for DoclingServSpec {
    fn default() -> Self {
        Self {
            image_reference: String::new(),
            enable_ui: false,
            replicas: default_replicas(),
            route: false,
        }
    }
}

/// Observed state of a DoclingServ
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DoclingServStatus {
    /// Generation of the spec most recently observed by the status controller
    #[serde(default)]
    pub observed_generation: i64,

    /// Image the docling-serve Deployment is running
    #[serde(default)]
    pub serv_image: String,

    /// Whether the UI is enabled on the running Deployment
    #[serde(default)]
    pub ui_enabled: ConditionStatus,

    /// Number of ready docling-serve pods
    #[serde(default)]
    pub ready_replicas: i32,

    /// Conditions summarizing the dependent resources, unique by type
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}
