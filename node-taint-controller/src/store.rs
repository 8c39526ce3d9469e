use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Node, Taint};
use kube::api::{ListParams, Patch, PatchParams};
use kube::{Api, Client};
use serde_json::json;
use tracing::trace;

use crate::{Error, Result};

const LIST_PAGE_SIZE: u32 = 500;

/// Read and write access to cluster nodes.
///
/// `read_node` fails with [`Error::NotFound`] or [`Error::TransientRead`],
/// `list_nodes` with [`Error::TransientRead`], and `patch_node_taints` with
/// [`Error::Conflict`] or [`Error::Patch`].
#[async_trait]
pub trait NodeStore: Send + Sync {
    async fn read_node(&self, name: &str) -> Result<Node>;

    async fn list_nodes(&self) -> Result<Vec<Node>>;

    /// Replaces `spec.taints`. When `resource_version` is set the write is
    /// rejected with [`Error::Conflict`] if the node changed since that version.
    async fn patch_node_taints(
        &self,
        name: &str,
        resource_version: Option<&str>,
        taints: &[Taint],
    ) -> Result<()>;
}

#[derive(Clone)]
pub struct KubeNodeStore {
    api: Api<Node>,
    timeout: Duration,
}

impl KubeNodeStore {
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self {
            api: Api::all(client),
            timeout,
        }
    }

    async fn bounded<T, F>(&self, fut: F) -> std::result::Result<T, String>
    where
        F: Future<Output = std::result::Result<T, kube::Error>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(res) => res.map_err(|e| e.to_string()),
            Err(_) => Err(format!("timed out after {:?}", self.timeout)),
        }
    }
}

#[async_trait]
impl NodeStore for KubeNodeStore {
    async fn read_node(&self, name: &str) -> Result<Node> {
        match tokio::time::timeout(self.timeout, self.api.get(name)).await {
            Ok(res) => res.map_err(|e| read_error(name, e)),
            Err(_) => Err(Error::TransientRead {
                node: name.into(),
                reason: format!("timed out after {:?}", self.timeout),
            }),
        }
    }

    async fn list_nodes(&self) -> Result<Vec<Node>> {
        let mut nodes = Vec::new();
        let mut params = ListParams::default().limit(LIST_PAGE_SIZE);
        loop {
            let page = self
                .bounded(self.api.list(&params))
                .await
                .map_err(|reason| Error::TransientRead {
                    node: "*".into(),
                    reason,
                })?;
            nodes.extend(page.items);
            match page.metadata.continue_ {
                Some(token) if !token.is_empty() => {
                    params = ListParams::default()
                        .limit(LIST_PAGE_SIZE)
                        .continue_token(&token);
                }
                _ => break,
            }
        }
        trace!("listed {} nodes", nodes.len());
        Ok(nodes)
    }

    async fn patch_node_taints(
        &self,
        name: &str,
        resource_version: Option<&str>,
        taints: &[Taint],
    ) -> Result<()> {
        let body = taints_patch(resource_version, taints);
        match tokio::time::timeout(
            self.timeout,
            self.api
                .patch(name, &PatchParams::default(), &Patch::Merge(&body)),
        )
        .await
        {
            Ok(res) => res.map(|_| ()).map_err(|e| patch_error(name, e)),
            Err(_) => Err(Error::Patch {
                node: name.into(),
                reason: format!("timed out after {:?}", self.timeout),
            }),
        }
    }
}

/// JSON merge patch replacing the taint list. Carrying `resourceVersion`
/// makes the API server reject the write with 409 on a stale read.
fn taints_patch(resource_version: Option<&str>, taints: &[Taint]) -> serde_json::Value {
    match resource_version {
        Some(rv) => json!({
            "metadata": { "resourceVersion": rv },
            "spec": { "taints": taints },
        }),
        None => json!({
            "spec": { "taints": taints },
        }),
    }
}

fn read_error(node: &str, err: kube::Error) -> Error {
    match err {
        kube::Error::Api(ae) if ae.code == 404 => Error::NotFound(node.into()),
        e => Error::TransientRead {
            node: node.into(),
            reason: e.to_string(),
        },
    }
}

fn patch_error(node: &str, err: kube::Error) -> Error {
    match err {
        kube::Error::Api(ae) if ae.code == 409 => Error::Conflict(node.into()),
        e => Error::Patch {
            node: node.into(),
            reason: e.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use kube::client::Body;
    use kube::core::ErrorResponse;

    use super::*;

    /// A store whose API server accepts requests and never answers.
    fn unresponsive_store(timeout: Duration) -> KubeNodeStore {
        let service = tower::service_fn(|_req: http::Request<Body>| {
            std::future::pending::<std::result::Result<http::Response<Body>, Infallible>>()
        });
        KubeNodeStore::new(Client::new(service, "default"), timeout)
    }

    fn api_error(code: u16, reason: &str) -> kube::Error {
        kube::Error::Api(ErrorResponse {
            status: "Failure".into(),
            message: format!("{reason} from test"),
            reason: reason.into(),
            code,
        })
    }

    #[test]
    fn test_read_error_classification() {
        assert!(matches!(
            read_error("node-a", api_error(404, "NotFound")),
            Error::NotFound(n) if n == "node-a"
        ));
        assert!(matches!(
            read_error("node-a", api_error(429, "TooManyRequests")),
            Error::TransientRead { .. }
        ));
        assert!(matches!(
            read_error("node-a", api_error(500, "InternalError")),
            Error::TransientRead { .. }
        ));
    }

    #[test]
    fn test_patch_error_classification() {
        assert!(matches!(
            patch_error("node-a", api_error(409, "Conflict")),
            Error::Conflict(n) if n == "node-a"
        ));
        assert!(matches!(
            patch_error("node-a", api_error(403, "Forbidden")),
            Error::Patch { .. }
        ));
        assert!(matches!(
            patch_error("node-a", api_error(422, "Invalid")),
            Error::Patch { .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_timeout_is_transient() {
        let store = unresponsive_store(Duration::from_secs(1));

        assert!(matches!(
            store.read_node("node-a").await,
            Err(Error::TransientRead { node, .. }) if node == "node-a"
        ));
        assert!(matches!(
            store.list_nodes().await,
            Err(Error::TransientRead { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_patch_timeout_is_patch_error() {
        let store = unresponsive_store(Duration::from_secs(1));

        let res = store.patch_node_taints("node-a", Some("7"), &[]).await;
        assert!(matches!(
            res,
            Err(Error::Patch { node, reason }) if node == "node-a" && reason.contains("timed out")
        ));
    }

    #[test]
    fn test_taints_patch_carries_resource_version() {
        let taints = vec![Taint {
            key: "dedicated".into(),
            value: Some("ci".into()),
            effect: "NoSchedule".into(),
            time_added: None,
        }];
        let body = taints_patch(Some("42"), &taints);
        assert_eq!(body["metadata"]["resourceVersion"], "42");
        assert_eq!(
            body["spec"]["taints"],
            json!([{ "key": "dedicated", "value": "ci", "effect": "NoSchedule" }])
        );

        let body = taints_patch(None, &[]);
        assert!(body.get("metadata").is_none());
        assert_eq!(body["spec"]["taints"], json!([]));
    }
}
