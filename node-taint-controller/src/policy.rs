use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;

use crate::{Error, Result};

pub const DEFAULT_LABEL_KEY: &str = "dedicated";
pub const DEFAULT_LABEL_VALUE: &str = "ci";
pub const DEFAULT_TAINT_KEY: &str = "dedicated";
pub const DEFAULT_TAINT_VALUE: &str = "ci";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum)]
pub enum TaintEffect {
    #[default]
    #[value(name = "NoSchedule")]
    NoSchedule,
    #[value(name = "PreferNoSchedule")]
    PreferNoSchedule,
    #[value(name = "NoExecute")]
    NoExecute,
}

impl TaintEffect {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaintEffect::NoSchedule => "NoSchedule",
            TaintEffect::PreferNoSchedule => "PreferNoSchedule",
            TaintEffect::NoExecute => "NoExecute",
        }
    }
}

impl fmt::Display for TaintEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaintEffect {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "NoSchedule" => Ok(TaintEffect::NoSchedule),
            "PreferNoSchedule" => Ok(TaintEffect::PreferNoSchedule),
            "NoExecute" => Ok(TaintEffect::NoExecute),
            other => Err(Error::InvalidPolicy(format!("unknown taint effect {other}"))),
        }
    }
}

/// The label that selects nodes and the taint those nodes must carry.
///
/// Built once at startup and shared read-only by every reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaintPolicy {
    pub label_key: String,
    pub label_value: String,
    pub taint_key: String,
    pub taint_value: String,
    pub effect: TaintEffect,
}

impl Default for TaintPolicy {
    fn default() -> Self {
        Self {
            label_key: DEFAULT_LABEL_KEY.into(),
            label_value: DEFAULT_LABEL_VALUE.into(),
            taint_key: DEFAULT_TAINT_KEY.into(),
            taint_value: DEFAULT_TAINT_VALUE.into(),
            effect: TaintEffect::NoSchedule,
        }
    }
}

impl TaintPolicy {
    pub fn validate(&self) -> Result<()> {
        if self.label_key.is_empty() {
            return Err(Error::InvalidPolicy("label key must not be empty".into()));
        }
        if self.taint_key.is_empty() {
            return Err(Error::InvalidPolicy("taint key must not be empty".into()));
        }
        Ok(())
    }

    /// Whether a node with these labels must carry the managed taint.
    pub fn should_have_taint(&self, labels: &BTreeMap<String, String>) -> bool {
        labels.get(&self.label_key) == Some(&self.label_value)
    }
}
