//! Common types for the docling operator: CRDs, conditions, errors, and telemetry

#![deny(missing_docs)]

pub mod conditions;
pub mod crd;
pub mod error;
pub mod telemetry;

pub use error::Error;

/// Default name of the docling-serve Deployment in the owner's namespace
pub const DEFAULT_WORKLOAD_NAME: &str = "docling-serv";

/// Suffix appended to the DoclingServ name to form its Service name
pub const SERVICE_NAME_SUFFIX: &str = "-service";

/// Suffix appended to the DoclingServ name to form its Route name
pub const ROUTE_NAME_SUFFIX: &str = "-route";

/// Field manager used for status writes
pub const FIELD_MANAGER: &str = "docling-status-controller";
