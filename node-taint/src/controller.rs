use kube::Client;
use node_taint_controller::start_taint_controller;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::ControllerArgs;
use crate::{Error, Result};

/// Connects to the cluster and runs the taint controller until `cancel` fires.
pub async fn start(
    args: ControllerArgs,
    ready: CancellationToken,
    cancel: CancellationToken,
) -> Result<()> {
    let settings = args.settings();
    let client = Client::try_default()
        .await
        .map_err(|e| Error::Bootstrap(e.to_string()))?;
    info!("connected to cluster API");

    start_taint_controller(client, settings, ready, cancel).await?;
    Ok(())
}
