use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use kube::ResourceExt;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{Error, Result};
use crate::store::NodeStore;
use crate::trigger::{NodeObserver, TriggerSource};

const TRIGGER: &str = "interval";

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Observes every node in the cluster once per period.
pub struct IntervalTrigger<S: NodeStore> {
    store: S,
    period: Duration,
    workers: NonZeroUsize,
}

impl<S: NodeStore> IntervalTrigger<S> {
    pub fn new(store: S, period: Duration, workers: NonZeroUsize) -> Self {
        Self {
            store,
            period,
            workers,
        }
    }

    /// One full pass over the nodes listed right now. Returns how many were observed.
    pub(crate) async fn scan(&self, observer: &dyn NodeObserver) -> Result<usize> {
        let names: Vec<String> = self
            .store
            .list_nodes()
            .await?
            .iter()
            .map(|n| n.name_any())
            .collect();
        let count = names.len();

        futures::stream::iter(names)
            .for_each_concurrent(self.workers.get(), |name| async move {
                observer.on_node_observed(&name, TRIGGER).await
            })
            .await;
        Ok(count)
    }
}

#[async_trait]
impl<S: NodeStore> TriggerSource for IntervalTrigger<S> {
    fn name(&self) -> &'static str {
        TRIGGER
    }

    async fn run(&self, observer: Arc<dyn NodeObserver>, cancel: CancellationToken) -> Result<()> {
        if self.period.is_zero() {
            return Err(Error::InvalidSettings("poll interval must be greater than zero".into()));
        }
        let mut ticker = tokio::time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("started node polling every {:?}", self.period);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                _ = ticker.tick() => {}
            }
            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                res = self.scan(observer.as_ref()) => match res {
                    Ok(count) => debug!("scanned {} nodes", count),
                    Err(e) => warn!(%e, "failed to list nodes, retrying next tick"),
                },
            }
        }
    }
}
