//! Status derivations from observed dependents
//!
//! Each function reads one dependent object and produces the value (or the
//! ordered list of condition upserts) for one slice of `DoclingServStatus`.
//! They are pure; fetching and merging happen in [`crate::reconciler`].
//!
//! Several derivations mirror "the last condition" a dependent reports,
//! whatever its type. When a dependent reorders its conditions the mirrored
//! type changes with it, and the previously mirrored type stays behind in the
//! owner's list with its old value.

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Container, Service, ServiceStatus};

use docling_common::crd::{Condition, ConditionStatus, Route, RouteStatus};
use docling_common::Error;

/// Command-line flag that turns on the docling-serve UI
pub const UI_FLAG: &str = "--enable-ui";

/// Environment variable that turns on the docling-serve UI when set to "true"
pub const UI_ENV_VAR: &str = "DOCLING_SERVE_ENABLE_UI";

/// Deployment condition type mirrored onto the owner
pub const AVAILABLE: &str = "Available";

/// Condition set once the Service reports any status
pub const SERVICE_CREATED: &str = "ServiceCreated";

/// Condition set once the Service has an external address
pub const LOAD_BALANCER_ASSIGNED: &str = "LoadBalancerAssigned";

/// Condition set once the Route reports any status
pub const ROUTE_CREATED: &str = "RouteCreated";

const CONTAINER_PATH: &str = "spec.template.spec.containers[0]";

fn deployment_name(deployment: &Deployment) -> &str {
    deployment.metadata.name.as_deref().unwrap_or_default()
}

fn first_container(deployment: &Deployment) -> Result<&Container, Error> {
    deployment
        .spec
        .as_ref()
        .and_then(|spec| spec.template.spec.as_ref())
        .and_then(|pod| pod.containers.first())
        .ok_or_else(|| Error::missing_field("Deployment", deployment_name(deployment), CONTAINER_PATH))
}

// =============================================================================
// Deployment
// =============================================================================

/// Image of the Deployment's first container
pub fn image_reference(deployment: &Deployment) -> Result<String, Error> {
    first_container(deployment)?.image.clone().ok_or_else(|| {
        Error::missing_field(
            "Deployment",
            deployment_name(deployment),
            format!("{}.image", CONTAINER_PATH),
        )
    })
}

/// Whether the Deployment's first container runs with the UI enabled.
///
/// True if any command or argument contains [`UI_FLAG`], or if [`UI_ENV_VAR`]
/// is set to exactly `"true"`. Either signal alone is enough.
pub fn ui_enabled(deployment: &Deployment) -> Result<ConditionStatus, Error> {
    let container = first_container(deployment)?;

    let flag_set = container
        .command
        .iter()
        .chain(container.args.iter())
        .flatten()
        .any(|arg| arg.contains(UI_FLAG));

    let env_set = container
        .env
        .iter()
        .flatten()
        .any(|var| var.name == UI_ENV_VAR && var.value.as_deref() == Some("true"));

    Ok(ConditionStatus::from(flag_set || env_set))
}

/// Condition upserts derived from the Deployment, in the order they apply.
///
/// 1. The `Available` condition, if the Deployment reports one.
/// 2. The Deployment's last condition, whatever its type.
pub fn deployment_conditions(deployment: &Deployment) -> Vec<Condition> {
    let generation = deployment.metadata.generation.unwrap_or_default();
    let conditions = deployment
        .status
        .as_ref()
        .and_then(|s| s.conditions.as_deref())
        .unwrap_or_default();

    let mirror = |type_: &str, c: &k8s_openapi::api::apps::v1::DeploymentCondition| {
        Condition::new(
            type_,
            ConditionStatus::from_k8s(&c.status),
            c.reason.clone().unwrap_or_default(),
            c.message.clone().unwrap_or_default(),
        )
        .with_observed_generation(generation)
    };

    let mut upserts = Vec::with_capacity(2);
    if let Some(available) = conditions.iter().find(|c| c.type_ == AVAILABLE) {
        upserts.push(mirror(AVAILABLE, available));
    }
    if let Some(last) = conditions.last() {
        upserts.push(mirror(&last.type_, last));
    }
    upserts
}

/// Ready replicas reported by the Deployment (0 when absent)
pub fn ready_replicas(deployment: &Deployment) -> i32 {
    deployment
        .status
        .as_ref()
        .and_then(|s| s.ready_replicas)
        .unwrap_or_default()
}

// =============================================================================
// Service
// =============================================================================

/// Condition upserts derived from the Service, in the order they apply.
///
/// 1. `ServiceCreated` once the Service has a populated status block.
/// 2. `LoadBalancerAssigned` once it has at least one ingress address.
/// 3. The Service's last native condition, verbatim.
pub fn service_conditions(service: &Service) -> Vec<Condition> {
    let generation = service.metadata.generation.unwrap_or_default();
    let mut upserts = Vec::with_capacity(3);

    let Some(status) = service.status.as_ref() else {
        return upserts;
    };

    if *status != ServiceStatus::default() {
        upserts.push(
            Condition::new(
                SERVICE_CREATED,
                ConditionStatus::True,
                SERVICE_CREATED,
                "The docling service was created successfully",
            )
            .with_observed_generation(generation),
        );
    }

    let has_ingress = status
        .load_balancer
        .as_ref()
        .and_then(|lb| lb.ingress.as_ref())
        .is_some_and(|ingress| !ingress.is_empty());
    if has_ingress {
        upserts.push(
            Condition::new(
                LOAD_BALANCER_ASSIGNED,
                ConditionStatus::True,
                LOAD_BALANCER_ASSIGNED,
                "A LoadBalancer has been assigned to the docling service",
            )
            .with_observed_generation(generation),
        );
    }

    if let Some(last) = status.conditions.as_deref().and_then(<[_]>::last) {
        upserts.push(
            Condition::new(
                last.type_.clone(),
                ConditionStatus::from_k8s(&last.status),
                last.reason.clone(),
                last.message.clone(),
            )
            .with_observed_generation(generation),
        );
    }

    upserts
}

// =============================================================================
// Route
// =============================================================================

/// Condition upserts derived from the Route, in the order they apply.
///
/// 1. `RouteCreated` once the Route has a populated status block.
/// 2. The last condition of the first router ingress entry, verbatim.
pub fn route_conditions(route: &Route) -> Vec<Condition> {
    let generation = route.metadata.generation.unwrap_or_default();
    let mut upserts = Vec::with_capacity(2);

    let Some(status) = route.status.as_ref() else {
        return upserts;
    };

    if *status != RouteStatus::default() {
        upserts.push(
            Condition::new(
                ROUTE_CREATED,
                ConditionStatus::True,
                ROUTE_CREATED,
                "A docling route was created successfully",
            )
            .with_observed_generation(generation),
        );
    }

    if let Some(last) = status.ingress.first().and_then(|i| i.conditions.last()) {
        upserts.push(
            Condition::new(
                last.type_.clone(),
                ConditionStatus::from_k8s(&last.status),
                last.reason.clone().unwrap_or_default(),
                last.message.clone().unwrap_or_default(),
            )
            .with_observed_generation(generation),
        );
    }

    upserts
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use docling_common::conditions::set_status_condition;

    // =========================================================================
    // Deployment
    // =========================================================================

    /// Story: The image and UI flag reflect a plain docling-serve Deployment
    #[test]
    fn story_plain_deployment_reports_image_and_disabled_ui() {
        let deployment = deployment("registry/x:v1");

        assert_eq!(image_reference(&deployment).unwrap(), "registry/x:v1");
        assert_eq!(ui_enabled(&deployment).unwrap(), ConditionStatus::False);
    }

    /// Story: Setting the UI env var turns the UI flag on
    #[test]
    fn story_ui_env_var_enables_ui() {
        let mut c = container("registry/x:v1");
        c.env = Some(vec![env("OTHER", "x"), env(UI_ENV_VAR, "true")]);

        assert_eq!(ui_enabled(&deployment_with(c)).unwrap(), ConditionStatus::True);
    }

    #[test]
    fn ui_env_var_must_be_exactly_true() {
        for value in ["True", "1", "yes", ""] {
            let mut c = container("registry/x:v1");
            c.env = Some(vec![env(UI_ENV_VAR, value)]);
            assert_eq!(
                ui_enabled(&deployment_with(c)).unwrap(),
                ConditionStatus::False,
                "value {:?}",
                value
            );
        }
    }

    #[test]
    fn ui_flag_in_command_or_args_enables_ui() {
        let mut c = container("registry/x:v1");
        c.command = Some(vec!["docling-serve".to_string(), "run".to_string(), "--enable-ui".to_string()]);
        assert_eq!(ui_enabled(&deployment_with(c)).unwrap(), ConditionStatus::True);

        let mut c = container("registry/x:v1");
        c.args = Some(vec!["--host=0.0.0.0".to_string(), "--enable-ui=true".to_string()]);
        assert_eq!(ui_enabled(&deployment_with(c)).unwrap(), ConditionStatus::True);
    }

    /// Story: The two UI signals combine as a logical OR, regardless of order
    #[test]
    fn story_ui_signals_are_or_combined() {
        let mut c = container("registry/x:v1");
        c.command = Some(vec!["--enable-ui".to_string()]);
        c.env = Some(vec![env(UI_ENV_VAR, "false")]);
        assert_eq!(ui_enabled(&deployment_with(c)).unwrap(), ConditionStatus::True);
    }

    #[test]
    fn missing_container_is_an_error() {
        let mut deployment = deployment("registry/x:v1");
        if let Some(spec) = deployment.spec.as_mut() {
            spec.template.spec = None;
        }

        let err = image_reference(&deployment).unwrap_err();
        assert!(err.to_string().contains("containers[0]"));
        assert!(ui_enabled(&deployment).is_err());
    }

    #[test]
    fn missing_image_is_an_error() {
        let mut c = container("unused");
        c.image = None;
        let err = image_reference(&deployment_with(c)).unwrap_err();
        assert!(err.to_string().contains("containers[0].image"));
    }

    /// Story: A Deployment whose only condition is Available yields one entry
    #[test]
    fn story_only_available_condition_collapses_to_one_entry() {
        let deployment = with_conditions(
            deployment("registry/x:v1"),
            vec![deployment_condition("Available", "True", "MinimumReplicasAvailable")],
        );

        let upserts = deployment_conditions(&deployment);
        assert_eq!(upserts.len(), 2);
        assert!(upserts.iter().all(|c| c.type_ == AVAILABLE));

        let mut merged = Vec::new();
        for c in upserts {
            set_status_condition(&mut merged, c);
        }
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].type_, "Available");
        assert_eq!(merged[0].status, ConditionStatus::True);
        assert_eq!(merged[0].observed_generation, 3);
        assert_eq!(merged[0].reason, "MinimumReplicasAvailable");
    }

    #[test]
    fn available_and_last_condition_are_both_mirrored() {
        let deployment = with_conditions(
            deployment("registry/x:v1"),
            vec![
                deployment_condition("Available", "False", "MinimumReplicasUnavailable"),
                deployment_condition("Progressing", "True", "ReplicaSetUpdated"),
            ],
        );

        let upserts = deployment_conditions(&deployment);
        let summary: Vec<_> = upserts.iter().map(|c| (c.type_.as_str(), c.status)).collect();
        assert_eq!(
            summary,
            [("Available", ConditionStatus::False), ("Progressing", ConditionStatus::True)]
        );
    }

    /// Known sharp edge: only the last condition is mirrored, so when the
    /// Deployment reorders its conditions a different type gets refreshed and
    /// the one mirrored before keeps its stale value.
    #[test]
    fn last_condition_mirroring_follows_dependent_ordering() {
        let first = with_conditions(
            deployment("registry/x:v1"),
            vec![
                deployment_condition("ReplicaFailure", "True", "FailedCreate"),
                deployment_condition("Progressing", "True", "ReplicaSetUpdated"),
            ],
        );
        let reordered = with_conditions(
            deployment("registry/x:v1"),
            vec![
                deployment_condition("Progressing", "True", "ReplicaSetUpdated"),
                deployment_condition("ReplicaFailure", "False", "Recovered"),
            ],
        );

        let mut merged = Vec::new();
        for c in deployment_conditions(&first) {
            set_status_condition(&mut merged, c);
        }
        for c in deployment_conditions(&reordered) {
            set_status_condition(&mut merged, c);
        }

        let types: Vec<_> = merged.iter().map(|c| c.type_.as_str()).collect();
        assert_eq!(types, ["Progressing", "ReplicaFailure"]);
        assert_eq!(merged[1].status, ConditionStatus::False);

        let stale_first = with_conditions(
            deployment("registry/x:v1"),
            vec![deployment_condition("Progressing", "False", "ProgressDeadlineExceeded")],
        );
        let mut merged = Vec::new();
        for c in deployment_conditions(&stale_first) {
            set_status_condition(&mut merged, c);
        }
        for c in deployment_conditions(&reordered) {
            set_status_condition(&mut merged, c);
        }
        // Progressing is no longer last, so its False value is never refreshed
        assert_eq!(merged[0].type_, "Progressing");
        assert_eq!(merged[0].status, ConditionStatus::False);
    }

    #[test]
    fn deployment_without_conditions_yields_no_upserts() {
        assert!(deployment_conditions(&deployment("registry/x:v1")).is_empty());
    }

    #[test]
    fn ready_replicas_defaults_to_zero() {
        assert_eq!(ready_replicas(&deployment("registry/x:v1")), 0);
        assert_eq!(ready_replicas(&with_ready_replicas(deployment("registry/x:v1"), 2)), 2);
    }

    // =========================================================================
    // Service
    // =========================================================================

    #[test]
    fn cluster_ip_service_is_created_but_not_load_balanced() {
        let upserts = service_conditions(&service(Some(cluster_ip_status())));
        let types: Vec<_> = upserts.iter().map(|c| c.type_.as_str()).collect();
        assert_eq!(types, [SERVICE_CREATED]);
        assert_eq!(upserts[0].status, ConditionStatus::True);
        assert_eq!(upserts[0].reason, SERVICE_CREATED);
        assert_eq!(upserts[0].observed_generation, 1);
    }

    /// Story: An assigned external address shows up as LoadBalancerAssigned
    #[test]
    fn story_load_balancer_address_is_reported() {
        let upserts = service_conditions(&service(Some(load_balancer_status("203.0.113.7"))));
        let types: Vec<_> = upserts.iter().map(|c| c.type_.as_str()).collect();
        assert_eq!(types, [SERVICE_CREATED, LOAD_BALANCER_ASSIGNED]);
        assert_eq!(
            upserts[1].message,
            "A LoadBalancer has been assigned to the docling service"
        );
    }

    #[test]
    fn last_native_service_condition_is_copied_verbatim() {
        let mut status = cluster_ip_status();
        status.conditions = Some(vec![
            meta_condition("First", "True", "One"),
            meta_condition("PortsReady", "False", "Pending"),
        ]);

        let upserts = service_conditions(&service(Some(status)));
        let last = upserts.last().unwrap();
        assert_eq!(last.type_, "PortsReady");
        assert_eq!(last.status, ConditionStatus::False);
        assert_eq!(last.reason, "Pending");
        assert_eq!(last.message, "Pending message");
    }

    #[test]
    fn service_without_status_yields_no_upserts() {
        assert!(service_conditions(&service(None)).is_empty());
        assert!(service_conditions(&service(Some(ServiceStatus::default()))).is_empty());
    }

    // =========================================================================
    // Route
    // =========================================================================

    #[test]
    fn admitted_route_reports_created_and_router_condition() {
        let upserts = route_conditions(&route(vec![router(vec![("Admitted", "True")])]));
        let summary: Vec<_> = upserts.iter().map(|c| (c.type_.as_str(), c.status)).collect();
        assert_eq!(
            summary,
            [(ROUTE_CREATED, ConditionStatus::True), ("Admitted", ConditionStatus::True)]
        );
        assert!(upserts.iter().all(|c| c.observed_generation == 2));
    }

    #[test]
    fn only_first_router_is_consulted() {
        let upserts = route_conditions(&route(vec![
            router(vec![]),
            router(vec![("Admitted", "False")]),
        ]));
        let types: Vec<_> = upserts.iter().map(|c| c.type_.as_str()).collect();
        assert_eq!(types, [ROUTE_CREATED]);
    }

    #[test]
    fn route_without_ingress_yields_no_upserts() {
        assert!(route_conditions(&route(vec![])).is_empty());

        let mut bare = route(vec![]);
        bare.status = None;
        assert!(route_conditions(&bare).is_empty());
    }
}
