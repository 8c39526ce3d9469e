use async_trait::async_trait;
use k8s_openapi::api::core::v1::Node;
use kube::runtime::events::{Event, EventType, Recorder, Reporter};
use kube::{Client, Resource, ResourceExt};
use tracing::{info, warn};

use crate::controller::Outcome;

pub const REPORTER_NAME: &str = "node-taint-controller";

/// Receives one notice per node whose taints were changed.
#[async_trait]
pub trait Notify: Send + Sync {
    async fn notify(&self, node: &Node, outcome: &Outcome);
}

/// Reason and message attached to a notice, `None` for outcomes that wrote nothing.
pub fn notice(node_name: &str, outcome: &Outcome) -> Option<(&'static str, String)> {
    match outcome {
        Outcome::Tainted => Some(("Tainting", format!("Tainting node {node_name}"))),
        Outcome::Untainted => Some((
            "RemovingTaint",
            format!("Removing taint from node {node_name}"),
        )),
        Outcome::NoOp | Outcome::Skipped(_) => None,
    }
}

pub struct LogNotifier;

#[async_trait]
impl Notify for LogNotifier {
    async fn notify(&self, node: &Node, outcome: &Outcome) {
        let name = node.name_any();
        if let Some((reason, message)) = notice(&name, outcome) {
            info!(node = %name, reason, "{}", message);
        }
    }
}

/// Publishes notices as Kubernetes Events on the node.
pub struct EventNotifier {
    recorder: Recorder,
}

impl EventNotifier {
    pub fn new(client: Client, instance: Option<String>) -> Self {
        let reporter = Reporter {
            controller: REPORTER_NAME.into(),
            instance,
        };
        Self {
            recorder: Recorder::new(client, reporter),
        }
    }
}

#[async_trait]
impl Notify for EventNotifier {
    async fn notify(&self, node: &Node, outcome: &Outcome) {
        let name = node.name_any();
        let Some((reason, message)) = notice(&name, outcome) else {
            return;
        };
        info!(node = %name, reason, "{}", message);

        let action = match outcome {
            Outcome::Tainted => "AddTaint",
            _ => "RemoveTaint",
        };
        let event = Event {
            type_: EventType::Normal,
            reason: reason.into(),
            note: Some(message),
            action: action.into(),
            secondary: None,
        };
        if let Err(e) = self.recorder.publish(&event, &node.object_ref(&())).await {
            warn!(%e, node = %name, "failed to publish event");
        }
    }
}
