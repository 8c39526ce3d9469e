use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Node, NodeSpec, Taint};
use kube::ResourceExt;
use kube::api::ObjectMeta;

use crate::context::Context;
use crate::controller::Outcome;
use crate::metrics::ControllerMetrics;
use crate::notify::Notify;
use crate::policy::TaintPolicy;
use crate::store::NodeStore;
use crate::{Error, Result};

type PatchHook = Box<dyn FnOnce(&mut Node) + Send>;

/// In-memory node store with resource versions and conflict detection.
#[derive(Default)]
pub(crate) struct FakeNodeStore {
    nodes: Mutex<BTreeMap<String, Node>>,
    hooks: Mutex<BTreeMap<String, PatchHook>>,
    failing_reads: Mutex<HashSet<String>>,
    failing_patches: Mutex<HashSet<String>>,
    failing_list: AtomicBool,
    patches: AtomicUsize,
}

impl FakeNodeStore {
    pub fn with_nodes(nodes: impl IntoIterator<Item = Node>) -> Self {
        let store = Self::default();
        {
            let mut map = store.nodes.lock().unwrap();
            for mut node in nodes {
                node.metadata.resource_version = Some("1".into());
                map.insert(node.name_any(), node);
            }
        }
        store
    }

    pub fn taints(&self, name: &str) -> Vec<Taint> {
        self.nodes
            .lock()
            .unwrap()
            .get(name)
            .and_then(|n| n.spec.as_ref())
            .and_then(|s| s.taints.clone())
            .unwrap_or_default()
    }

    pub fn labels(&self, name: &str) -> BTreeMap<String, String> {
        self.nodes
            .lock()
            .unwrap()
            .get(name)
            .map(|n| n.labels().clone())
            .unwrap_or_default()
    }

    pub fn set_labels(&self, name: &str, labels: &[(&str, &str)]) {
        let mut nodes = self.nodes.lock().unwrap();
        let node = nodes.get_mut(name).unwrap();
        node.metadata.labels = Some(label_map(labels));
        bump(node);
    }

    pub fn patch_count(&self) -> usize {
        self.patches.load(Ordering::SeqCst)
    }

    /// Simulates a concurrent writer landing just before the next patch of `name`.
    pub fn before_next_patch(&self, name: &str, hook: impl FnOnce(&mut Node) + Send + 'static) {
        self.hooks
            .lock()
            .unwrap()
            .insert(name.into(), Box::new(hook));
    }

    pub fn fail_reads(&self, name: &str) {
        self.failing_reads.lock().unwrap().insert(name.into());
    }

    pub fn fail_patches(&self, name: &str) {
        self.failing_patches.lock().unwrap().insert(name.into());
    }

    pub fn fail_list(&self) {
        self.failing_list.store(true, Ordering::SeqCst);
    }
}

fn bump(node: &mut Node) {
    let rv: u64 = node
        .metadata
        .resource_version
        .as_deref()
        .and_then(|v| v.parse().ok())
        .unwrap_or_default();
    node.metadata.resource_version = Some((rv + 1).to_string());
}

#[async_trait]
impl NodeStore for FakeNodeStore {
    async fn read_node(&self, name: &str) -> Result<Node> {
        if self.failing_reads.lock().unwrap().contains(name) {
            return Err(Error::TransientRead {
                node: name.into(),
                reason: "injected".into(),
            });
        }
        self.nodes
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::NotFound(name.into()))
    }

    async fn list_nodes(&self) -> Result<Vec<Node>> {
        if self.failing_list.load(Ordering::SeqCst) {
            return Err(Error::TransientRead {
                node: "*".into(),
                reason: "injected".into(),
            });
        }
        Ok(self.nodes.lock().unwrap().values().cloned().collect())
    }

    async fn patch_node_taints(
        &self,
        name: &str,
        resource_version: Option<&str>,
        taints: &[Taint],
    ) -> Result<()> {
        if self.failing_patches.lock().unwrap().contains(name) {
            return Err(Error::Patch {
                node: name.into(),
                reason: "injected".into(),
            });
        }
        let hook = self.hooks.lock().unwrap().remove(name);
        let mut nodes = self.nodes.lock().unwrap();
        let node = nodes.get_mut(name).ok_or_else(|| Error::Patch {
            node: name.into(),
            reason: "not found".into(),
        })?;
        if let Some(hook) = hook {
            hook(&mut *node);
            bump(node);
        }
        if resource_version.is_some()
            && resource_version != node.metadata.resource_version.as_deref()
        {
            return Err(Error::Conflict(name.into()));
        }
        node.spec.get_or_insert_with(NodeSpec::default).taints = Some(taints.to_vec());
        bump(node);
        self.patches.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Clone, Default)]
pub(crate) struct RecordingNotifier {
    notes: Arc<Mutex<Vec<(String, Outcome)>>>,
}

impl RecordingNotifier {
    pub fn recorded(&self) -> Vec<(String, Outcome)> {
        self.notes.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notify for RecordingNotifier {
    async fn notify(&self, node: &Node, outcome: &Outcome) {
        self.notes.lock().unwrap().push((node.name_any(), *outcome));
    }
}

pub(crate) fn make_context(store: FakeNodeStore) -> (Context<FakeNodeStore>, RecordingNotifier) {
    let notes = RecordingNotifier::default();
    let ctx = Context {
        store,
        policy: TaintPolicy::default(),
        notifier: Box::new(notes.clone()),
        metrics: ControllerMetrics::unregistered(),
    };
    (ctx, notes)
}

fn label_map(labels: &[(&str, &str)]) -> BTreeMap<String, String> {
    labels
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub(crate) fn make_node(name: &str, labels: &[(&str, &str)], taints: Vec<Taint>) -> Node {
    Node {
        metadata: ObjectMeta {
            name: Some(name.into()),
            labels: Some(label_map(labels)),
            ..Default::default()
        },
        spec: Some(NodeSpec {
            taints: Some(taints),
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub(crate) fn taint(key: &str, value: &str, effect: &str) -> Taint {
    Taint {
        key: key.into(),
        value: Some(value.into()),
        effect: effect.into(),
        time_added: None,
    }
}
