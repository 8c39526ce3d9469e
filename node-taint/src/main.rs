use clap::Parser;
use node_taint::{Result, config::Cli, controller, http};
use tokio::task::JoinError;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_subscriber();
    let cancel = tokio_util::sync::CancellationToken::new();
    let ready = tokio_util::sync::CancellationToken::new();
    match cli.command {
        node_taint::config::Commands::Controller(controller_args) => {
            let mut metrics_handle = tokio::spawn(http::serve(
                controller_args.metrics_address,
                ready.child_token(),
                cancel.child_token(),
            ));
            let mut controller_handle = tokio::spawn(controller::start(
                controller_args,
                ready,
                cancel.child_token(),
            ));
            let mut shutdown_handle = tokio::spawn(async move { shutdown_signal().await });
            // watch for shutdown and errors
            let failed = tokio::select! {
                h = &mut metrics_handle => exit("metrics", h),
                h = &mut controller_handle => exit("controller", h),
                _ = &mut shutdown_handle => {
                        cancel.cancel();
                        let (metrics, controller) = tokio::join!(metrics_handle, controller_handle);
                        // shutdown was requested, so task failures are only reported
                        exit("metrics", metrics);
                        exit("controller", controller);
                        None
                    },
            };
            cancel.cancel();
            info!("Exiting...");
            if let Some(e) = failed {
                return Err(e);
            }
        }
    }
    Ok(())
}

fn setup_subscriber() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "node_taint=info,node_taint_controller=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(%e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(%e, "failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };
    tokio::select! {
        _ = ctrl_c => {
          info!("captured ctrl_c signal");
        },
        _ = terminate => {
          info!("captured terminate signal");
        },
    }
}

/// Logs how a task ended. Returns the error that should end the process, if any.
fn exit(task: &str, out: Result<Result<()>, JoinError>) -> Option<node_taint::Error> {
    match out {
        Ok(Ok(_)) => {
            info!("{task} exited");
            None
        }
        Ok(Err(e)) => {
            error!("{task} failed with error: {e}");
            Some(e)
        }
        Err(e) => {
            error!("{task} task failed to complete: {e}");
            Some(node_taint::Error::Other(e.to_string()))
        }
    }
}
