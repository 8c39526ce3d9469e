use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use kube::Client;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{
    Error, Result,
    context::Context,
    metrics::ControllerMetrics,
    notify::{EventNotifier, LogNotifier, Notify},
    policy::TaintPolicy,
    store::KubeNodeStore,
    trigger::{EventTrigger, IntervalTrigger, NodeObserver, TriggerMode, TriggerSource},
};

const CONTROLLER_NAME: &str = "node-taint";

#[derive(Debug, Clone)]
pub struct Settings {
    pub policy: TaintPolicy,
    pub trigger: TriggerMode,
    pub poll_interval: Duration,
    pub api_timeout: Duration,
    pub workers: NonZeroUsize,
    pub record_events: bool,
    pub reporter_instance: Option<String>,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        self.policy.validate()?;
        if self.trigger.polls() && self.poll_interval.is_zero() {
            return Err(Error::InvalidSettings("poll interval must be greater than zero".into()));
        }
        if self.api_timeout.is_zero() {
            return Err(Error::InvalidSettings("api timeout must be greater than zero".into()));
        }
        Ok(())
    }
}

pub async fn start_taint_controller(
    client: Client,
    settings: Settings,
    ready: CancellationToken,
    cancel: CancellationToken,
) -> Result<()> {
    settings.validate()?;

    let store = KubeNodeStore::new(client.clone(), settings.api_timeout);
    let notifier: Box<dyn Notify> = if settings.record_events {
        Box::new(EventNotifier::new(client.clone(), settings.reporter_instance))
    } else {
        Box::new(LogNotifier)
    };

    let mut sources: Vec<Box<dyn TriggerSource>> = Vec::new();
    if settings.trigger.watches() {
        sources.push(Box::new(EventTrigger::new(client, settings.workers)));
    }
    if settings.trigger.polls() {
        sources.push(Box::new(IntervalTrigger::new(
            store.clone(),
            settings.poll_interval,
            settings.workers,
        )));
    }

    info!(
        label = %format!("{}={}", settings.policy.label_key, settings.policy.label_value),
        taint = %format!(
            "{}={}:{}",
            settings.policy.taint_key, settings.policy.taint_value, settings.policy.effect
        ),
        "starting node taint controller"
    );
    let context = Arc::new(Context {
        store,
        policy: settings.policy,
        notifier,
        metrics: ControllerMetrics::new(CONTROLLER_NAME),
    });

    ready.cancel();
    run_sources(sources, context, cancel).await
}

/// Runs every source until one of them stops, then cancels the rest.
pub(crate) async fn run_sources(
    sources: Vec<Box<dyn TriggerSource>>,
    observer: Arc<dyn NodeObserver>,
    cancel: CancellationToken,
) -> Result<()> {
    if sources.is_empty() {
        return Err(Error::Adapter("no trigger sources configured".into()));
    }
    let runs = sources.iter().map(|source| {
        info!("starting {} trigger", source.name());
        source.run(observer.clone(), cancel.clone())
    });
    let (res, idx, rest) = futures::future::select_all(runs).await;
    let stopped = sources.get(idx).map(|s| s.name()).unwrap_or_default();
    info!("{} trigger stopped", stopped);

    cancel.cancel();
    futures::future::join_all(rest).await;
    res
}
