use std::net::SocketAddr;
use std::num::{NonZeroU64, NonZeroUsize};
use std::time::Duration;

use clap::{Parser, Subcommand};
use node_taint_controller::policy::{
    DEFAULT_LABEL_KEY, DEFAULT_LABEL_VALUE, DEFAULT_TAINT_KEY, DEFAULT_TAINT_VALUE,
};
use node_taint_controller::{Settings, TaintEffect, TaintPolicy, TriggerMode};

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Subcommand, Debug)]
pub enum Commands {
    Controller(ControllerArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct ControllerArgs {
    /// Node label key that selects nodes for tainting
    #[arg(long, env = "LABEL_KEY", default_value = DEFAULT_LABEL_KEY)]
    pub label_key: String,

    /// Node label value that selects nodes for tainting
    #[arg(long, env = "LABEL_VALUE", default_value = DEFAULT_LABEL_VALUE)]
    pub label_value: String,

    /// Key of the managed taint
    #[arg(long, env = "TAINT_KEY", default_value = DEFAULT_TAINT_KEY)]
    pub taint_key: String,

    /// Value of the managed taint
    #[arg(long, env = "TAINT_VALUE", default_value = DEFAULT_TAINT_VALUE)]
    pub taint_value: String,

    /// Effect of the managed taint
    #[arg(long, env = "TAINT_EFFECT", value_enum, default_value_t = TaintEffect::NoSchedule)]
    pub taint_effect: TaintEffect,

    /// When nodes are reconciled
    #[arg(long, env = "TRIGGER", value_enum, default_value_t = TriggerMode::Both)]
    pub trigger: TriggerMode,

    /// Seconds between full scans of every node
    #[arg(long, env = "POLL_INTERVAL_SECS", default_value = "30")]
    pub poll_interval_secs: NonZeroU64,

    /// Timeout in seconds for each read or patch against the API server
    #[arg(long, env = "API_TIMEOUT_SECS", default_value = "10")]
    pub api_timeout_secs: NonZeroU64,

    /// Upper bound on concurrent reconciliations per trigger
    #[arg(long, env = "WORKERS", default_value = "16")]
    pub workers: NonZeroUsize,

    /// Metrics and readiness listener
    #[arg(long, default_value = "0.0.0.0:9090")]
    pub metrics_address: SocketAddr,

    /// Instance name attached to recorded Kubernetes Events
    #[arg(long, env = "POD_NAME")]
    pub reporter_instance: Option<String>,

    /// Only log taint changes instead of also recording Kubernetes Events
    #[arg(long)]
    pub no_events: bool,
}

impl ControllerArgs {
    pub fn policy(&self) -> TaintPolicy {
        TaintPolicy {
            label_key: self.label_key.clone(),
            label_value: self.label_value.clone(),
            taint_key: self.taint_key.clone(),
            taint_value: self.taint_value.clone(),
            effect: self.taint_effect,
        }
    }

    pub fn settings(&self) -> Settings {
        Settings {
            policy: self.policy(),
            trigger: self.trigger,
            poll_interval: Duration::from_secs(self.poll_interval_secs.get()),
            api_timeout: Duration::from_secs(self.api_timeout_secs.get()),
            workers: self.workers,
            record_events: !self.no_events,
            reporter_instance: self.reporter_instance.clone(),
        }
    }
}
