use std::num::NonZeroUsize;
use std::sync::Arc;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use k8s_openapi::api::core::v1::Node;
use kube::runtime::{WatchStreamExt, watcher};
use kube::{Api, Client, ResourceExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::trigger::{NodeObserver, TriggerSource};
use crate::{Error, Result};

const TRIGGER: &str = "watch";

/// Observes a node for every added or modified watch event.
pub struct EventTrigger {
    api: Api<Node>,
    workers: NonZeroUsize,
}

impl EventTrigger {
    pub fn new(client: Client, workers: NonZeroUsize) -> Self {
        Self {
            api: Api::all(client),
            workers,
        }
    }
}

#[async_trait]
impl TriggerSource for EventTrigger {
    fn name(&self) -> &'static str {
        TRIGGER
    }

    async fn run(&self, observer: Arc<dyn NodeObserver>, cancel: CancellationToken) -> Result<()> {
        let stream = watcher(self.api.clone(), watcher::Config::default()).default_backoff();

        info!("started node watch");
        tokio::select! {
            _ = cancel.cancelled() => Ok(()),
            _ = drive(stream, observer.as_ref(), self.workers) => {
                Err(Error::Adapter("node watch stream ended".into()))
            }
        }
    }
}

pub(crate) async fn drive<St>(stream: St, observer: &dyn NodeObserver, workers: NonZeroUsize)
where
    St: Stream<Item = std::result::Result<watcher::Event<Node>, watcher::Error>>,
{
    stream
        .filter_map(|res| async move {
            match res {
                Ok(ev) => observed_name(ev),
                Err(e) => {
                    warn!(%e, "unexpected error with node watch stream");
                    None
                }
            }
        })
        .for_each_concurrent(workers.get(), |name| async move {
            observer.on_node_observed(&name, TRIGGER).await
        })
        .await
}

/// ADDED and MODIFIED notifications name a node to reconcile, everything else is ignored.
fn observed_name(ev: watcher::Event<Node>) -> Option<String> {
    match ev {
        watcher::Event::Apply(node) | watcher::Event::InitApply(node) => Some(node.name_any()),
        watcher::Event::Delete(node) => {
            debug!("ignoring deletion of Node {}", node.name_any());
            None
        }
        watcher::Event::Init | watcher::Event::InitDone => None,
    }
}
