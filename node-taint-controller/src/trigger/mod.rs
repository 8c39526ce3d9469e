mod event;
mod interval;

use std::sync::Arc;

use async_trait::async_trait;
use clap::ValueEnum;
use tokio_util::sync::CancellationToken;

pub use event::EventTrigger;
pub use interval::IntervalTrigger;

use crate::Result;

/// Something that wants to hear about a node that may need reconciling.
#[async_trait]
pub trait NodeObserver: Send + Sync {
    async fn on_node_observed(&self, name: &str, trigger: &'static str);
}

/// Decides when nodes are observed.
#[async_trait]
pub trait TriggerSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Runs until `cancel` fires. Per-node failures never end the run.
    async fn run(&self, observer: Arc<dyn NodeObserver>, cancel: CancellationToken) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TriggerMode {
    /// React to node watch events
    Watch,
    /// Re-evaluate every node on a fixed period
    Interval,
    /// Both of the above
    #[default]
    Both,
}

impl TriggerMode {
    pub fn watches(&self) -> bool {
        matches!(self, TriggerMode::Watch | TriggerMode::Both)
    }

    pub fn polls(&self) -> bool {
        matches!(self, TriggerMode::Interval | TriggerMode::Both)
    }
}
