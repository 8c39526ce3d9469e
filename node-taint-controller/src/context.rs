use crate::metrics::ControllerMetrics;
use crate::notify::Notify;
use crate::policy::TaintPolicy;
use crate::store::NodeStore;

pub struct Context<S: NodeStore> {
    pub store: S,
    pub policy: TaintPolicy,
    /// Told about every node whose taints were changed
    pub notifier: Box<dyn Notify>,
    pub metrics: ControllerMetrics,
}
