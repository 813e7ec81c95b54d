/*!

This [controller] runs in a Kubernetes cluster and adds a logging sidecar to the workloads that
`LoggingTrait` objects point at. When a `LoggingTrait` is deleted, the sidecar is taken out again.

[controller]: https://kubernetes.io/docs/concepts/architecture/controller/

!*/

#![deny(
    clippy::expect_used,
    clippy::get_unwrap,
    clippy::panic,
    clippy::panic_in_result_fn,
    clippy::panicking_unwrap,
    clippy::unwrap_in_result,
    clippy::unwrap_used
)]

use crate::config::ControllerConfig;
use crate::trait_controller::run_trait_controller;
use env_logger::Builder;
use kube::Client;
use log::{error, info, LevelFilter};

mod config;
mod constants;
mod error;
mod trait_controller;

#[tokio::main]
async fn main() {
    init_logger();
    info!("Starting");

    let config = match ControllerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Unable to read the controller configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize the k8s client from in-cluster variables or KUBECONFIG.
    let client = match Client::try_default().await {
        Ok(client) => client,
        Err(e) => {
            error!("Unable to create k8s client: {}", e);
            std::process::exit(1);
        }
    };

    run_trait_controller(client, config).await;
}

/// The log level used when the `RUST_LOG` environment variable does not exist.
const DEFAULT_LEVEL_FILTER: LevelFilter = LevelFilter::Debug;

/// Extract the value of `RUST_LOG` if it exists, otherwise log this crate and the injector at
/// `DEFAULT_LEVEL_FILTER`.
fn init_logger() {
    match std::env::var(env_logger::DEFAULT_FILTER_ENV).ok() {
        Some(_) => {
            // RUST_LOG exists; env_logger will use it.
            Builder::from_default_env().init();
        }
        None => {
            // RUST_LOG does not exist; use default log level for our crates only.
            Builder::new()
                .filter(Some(env!("CARGO_CRATE_NAME")), DEFAULT_LEVEL_FILTER)
                .filter(Some("logsidecar_injector"), DEFAULT_LEVEL_FILTER)
                .filter(Some("logsidecar_model"), DEFAULT_LEVEL_FILTER)
                .init();
        }
    }
}
