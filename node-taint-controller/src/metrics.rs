use std::borrow::Cow;
use std::sync::{LazyLock, RwLock};

use prometheus_client::{
    encoding::EncodeLabelSet,
    metrics::{counter::Counter, family::Family, histogram::Histogram},
    registry::{Registry, Unit},
};
use tokio::time::Instant;

use crate::Error;
use crate::controller::Outcome;

pub static REGISTRY: LazyLock<RwLock<Registry>> =
    LazyLock::new(|| RwLock::new(Registry::with_prefix("node_taint")));

#[derive(Clone)]
pub struct ControllerMetrics {
    pub runs: Family<TriggerLabels, Counter>,
    pub outcomes: Family<OutcomeLabels, Counter>,
    pub failures: Family<ErrorLabels, Counter>,
    pub duration: Histogram,
}

impl ControllerMetrics {
    /// Register controller metrics in the global registry.
    pub fn new(controller_name: &str) -> Self {
        let mut guard = match REGISTRY.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let registry = guard.sub_registry_with_label((
            Cow::Borrowed("controller_name"),
            Cow::Owned(controller_name.into()),
        ));
        let metrics = Self::unregistered();

        registry.register_with_unit(
            "reconcile_duration",
            "reconcile duration",
            Unit::Seconds,
            metrics.duration.clone(),
        );
        registry.register(
            "reconcile_failures",
            "Number of reconciliation errors",
            metrics.failures.clone(),
        );
        registry.register(
            "reconcile_outcomes",
            "Number of completed reconciliations by outcome",
            metrics.outcomes.clone(),
        );
        registry.register(
            "reconcile_runs",
            "Number of reconciliations",
            metrics.runs.clone(),
        );
        metrics
    }

    pub(crate) fn unregistered() -> Self {
        Self {
            runs: Family::default(),
            outcomes: Family::default(),
            failures: Family::default(),
            duration: Histogram::new([0.01, 0.1, 0.25, 0.5, 1.0, 5.0, 15.0, 60.0].into_iter()),
        }
    }

    pub fn count_outcome(&self, outcome: &Outcome) {
        self.outcomes
            .get_or_create(&OutcomeLabels {
                outcome: outcome.metric_label().into(),
            })
            .inc();
    }

    pub fn count_failure(&self, e: &Error) {
        self.failures
            .get_or_create(&ErrorLabels {
                error: e.metric_label(),
            })
            .inc();
    }

    pub fn count_and_measure(&self, trigger: &str) -> ReconcileMeasurer {
        self.runs
            .get_or_create(&TriggerLabels {
                trigger: trigger.into(),
            })
            .inc();
        ReconcileMeasurer {
            start: Instant::now(),
            metric: self.duration.clone(),
        }
    }
}

pub struct ReconcileMeasurer {
    start: Instant,
    metric: Histogram,
}

impl Drop for ReconcileMeasurer {
    fn drop(&mut self) {
        #[allow(clippy::cast_precision_loss)]
        let duration = self.start.elapsed().as_millis() as f64 / 1000.0;
        self.metric.observe(duration);
    }
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct TriggerLabels {
    pub trigger: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct OutcomeLabels {
    pub outcome: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ErrorLabels {
    pub error: String,
}

/// Text exposition of everything in [`REGISTRY`].
pub fn encode() -> String {
    let mut buffer = String::new();
    let guard = match REGISTRY.read() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    match prometheus_client::encoding::text::encode(&mut buffer, &guard) {
        Ok(_) => buffer,
        Err(_) => "".into(),
    }
}
