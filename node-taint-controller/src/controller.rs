use async_trait::async_trait;
use kube::ResourceExt;
use tracing::{debug, error, warn};

use crate::store::NodeStore;
use crate::taint::node_taints;
use crate::trigger::NodeObserver;
use crate::{Error, Result, context::Context};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    NoOp,
    Tainted,
    Untainted,
    Skipped(SkipReason),
}

impl Outcome {
    pub fn metric_label(&self) -> &'static str {
        match self {
            Outcome::NoOp => "noop",
            Outcome::Tainted => "tainted",
            Outcome::Untainted => "untainted",
            Outcome::Skipped(_) => "skipped",
        }
    }
}

/// Converge one node's managed taint to its labels.
///
/// Always starts from a fresh read, so it is safe to call again after any
/// failure, including [`Error::Conflict`].
#[tracing::instrument(skip(ctx))]
pub async fn reconcile<S: NodeStore>(name: &str, ctx: &Context<S>) -> Result<Outcome> {
    let node = match ctx.store.read_node(name).await {
        Ok(node) => node,
        Err(Error::NotFound(_)) => {
            warn!("Node {} no longer exists, skipping", name);
            return Ok(Outcome::Skipped(SkipReason::NotFound));
        }
        Err(e) => return Err(e),
    };

    let taints = node_taints(&node);
    let desired = ctx.policy.should_have_taint(node.labels());
    let current = ctx.policy.has_managed_taint(taints);

    let (outcome, new_taints) = match (desired, current) {
        (true, false) => (Outcome::Tainted, ctx.policy.with_managed_taint_added(taints)),
        (false, true) => (
            Outcome::Untainted,
            ctx.policy.with_managed_taint_removed(taints),
        ),
        _ => {
            debug!("Node {} already converged", name);
            return Ok(Outcome::NoOp);
        }
    };

    ctx.store
        .patch_node_taints(
            name,
            node.metadata.resource_version.as_deref(),
            &new_taints,
        )
        .await?;
    ctx.notifier.notify(&node, &outcome).await;

    Ok(outcome)
}

/// Runs [`reconcile`] and records the result. Errors stop here so one node
/// never affects another; the next trigger firing retries.
pub async fn observe<S: NodeStore>(
    name: &str,
    ctx: &Context<S>,
    trigger: &str,
) -> Option<Outcome> {
    let _measure = ctx.metrics.count_and_measure(trigger);
    match reconcile(name, ctx).await {
        Ok(outcome) => {
            ctx.metrics.count_outcome(&outcome);
            Some(outcome)
        }
        Err(e) => {
            error_policy(name, &e, ctx);
            None
        }
    }
}

pub(crate) fn error_policy<S: NodeStore>(name: &str, error: &Error, ctx: &Context<S>) {
    ctx.metrics.count_failure(error);
    error!(
        ?error,
        retryable = error.is_retryable(),
        "reconcile error for Node {}, retrying on next trigger",
        name
    );
}

#[async_trait]
impl<S: NodeStore> NodeObserver for Context<S> {
    async fn on_node_observed(&self, name: &str, trigger: &'static str) {
        observe(name, self, trigger).await;
    }
}
