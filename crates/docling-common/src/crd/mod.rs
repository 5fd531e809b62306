//! Custom Resource Definitions used by the docling operator
//!
//! `DoclingServ` is owned by this operator. `Route` is an OpenShift type that
//! the status controller only reads.

mod docling_serv;
mod route;
mod types;

pub use docling_serv::{DoclingServ, DoclingServSpec, DoclingServStatus};
pub use route::{
    Route, RouteIngress, RouteIngressCondition, RouteSpec, RouteStatus, RouteTargetReference,
};
pub use types::{Condition, ConditionStatus};
