//! docling-operator: keeps `DoclingServ` status in step with the Deployment,
//! Service and Route that back each instance

#![deny(missing_docs)]

pub mod config;
pub mod controller_runner;
