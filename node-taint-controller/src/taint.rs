use k8s_openapi::api::core::v1::{Node, Taint};

use crate::policy::TaintPolicy;

impl TaintPolicy {
    /// The taint this policy manages. `timeAdded` is left for the API server.
    ///
    /// An empty value is sent as absent, the way the API server stores it.
    pub fn managed_taint(&self) -> Taint {
        Taint {
            key: self.taint_key.clone(),
            value: (!self.taint_value.is_empty()).then(|| self.taint_value.clone()),
            effect: self.effect.as_str().into(),
            time_added: None,
        }
    }

    /// Matches on key, value and effect. A taint sharing only the key is not ours.
    /// A missing value equals the empty value.
    pub fn is_managed(&self, taint: &Taint) -> bool {
        taint.key == self.taint_key
            && taint.value.as_deref().unwrap_or_default() == self.taint_value
            && taint.effect == self.effect.as_str()
    }

    pub fn has_managed_taint(&self, taints: &[Taint]) -> bool {
        taints.iter().any(|t| self.is_managed(t))
    }

    pub fn with_managed_taint_added(&self, taints: &[Taint]) -> Vec<Taint> {
        let mut out = taints.to_vec();
        if !self.has_managed_taint(taints) {
            out.push(self.managed_taint());
        }
        out
    }

    pub fn with_managed_taint_removed(&self, taints: &[Taint]) -> Vec<Taint> {
        taints
            .iter()
            .filter(|t| !self.is_managed(t))
            .cloned()
            .collect()
    }
}

pub fn node_taints(node: &Node) -> &[Taint] {
    node.spec
        .as_ref()
        .and_then(|s| s.taints.as_deref())
        .unwrap_or_default()
}
