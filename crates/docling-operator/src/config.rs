//! Command-line and environment configuration

use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use docling_common::telemetry::{LogFormat, TelemetryConfig};
use docling_common::DEFAULT_WORKLOAD_NAME;
use docling_status::{StatusConfig, StatusIntervals};

/// docling-operator - keeps DoclingServ status in step with its dependents
#[derive(Parser, Debug)]
#[command(name = "docling-operator", version, about, long_about = None)]
pub struct Cli {
    /// Print the DoclingServ CRD manifest and exit
    #[arg(long)]
    pub crd: bool,

    /// Operator settings
    #[command(flatten)]
    pub config: OperatorConfig,

    /// Mode to run in
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Operator modes
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run the status controller (default mode)
    ///
    /// Watches DoclingServ objects and re-derives their status whenever an
    /// owned Deployment, Service or Route changes.
    Controller,
}

/// Settings shared by every mode
#[derive(Args, Debug, Clone)]
pub struct OperatorConfig {
    /// Name of the docling-serve Deployment in each DoclingServ namespace
    #[arg(long, env = "DOCLING_WORKLOAD_NAME", default_value = DEFAULT_WORKLOAD_NAME)]
    pub workload_name: String,

    /// Only watch this namespace (all namespaces when unset)
    #[arg(long, env = "DOCLING_WATCH_NAMESPACE")]
    pub namespace: Option<String>,

    /// Seconds before re-checking a status that just changed
    #[arg(long, env = "DOCLING_REQUEUE_SECS", default_value_t = 5,
          value_parser = clap::value_parser!(u64).range(1..))]
    pub requeue_secs: u64,

    /// Seconds between resyncs of a settled status
    #[arg(long, env = "DOCLING_RESYNC_SECS", default_value_t = 300,
          value_parser = clap::value_parser!(u64).range(1..))]
    pub resync_secs: u64,

    /// Seconds to back off after a retryable error
    #[arg(long, env = "DOCLING_ERROR_BACKOFF_SECS", default_value_t = 30,
          value_parser = clap::value_parser!(u64).range(1..))]
    pub error_backoff_secs: u64,

    /// Server-side watch timeout; must stay below the client read timeout (30s)
    #[arg(long, env = "DOCLING_WATCH_TIMEOUT_SECS", default_value_t = 25,
          value_parser = clap::value_parser!(u32).range(1..30))]
    pub watch_timeout_secs: u32,

    /// Install or update the DoclingServ CRD on startup
    #[arg(long, env = "DOCLING_INSTALL_CRD")]
    pub install_crd: bool,

    /// Log output format: text or json
    #[arg(long, env = "DOCLING_LOG_FORMAT", default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl OperatorConfig {
    /// Reconciler settings
    pub fn status_config(&self) -> StatusConfig {
        StatusConfig {
            workload_name: self.workload_name.clone(),
        }
    }

    /// Requeue timings for the controller
    pub fn intervals(&self) -> StatusIntervals {
        StatusIntervals {
            requeue: Duration::from_secs(self.requeue_secs),
            resync: Duration::from_secs(self.resync_secs),
            error_backoff: Duration::from_secs(self.error_backoff_secs),
        }
    }

    /// Logging settings
    pub fn telemetry(&self) -> TelemetryConfig {
        TelemetryConfig {
            service_name: "docling-operator".to_string(),
            log_format: self.log_format,
        }
    }
}
