mod action;
mod context;
mod navigation;
mod status;

use crate::config::ControllerConfig;
use crate::constants::{no_requeue, requeue, requeue_slow};
use crate::error::{self, Error, Result};
use crate::trait_controller::action::{action, Action};
use crate::trait_controller::context::{new_context, Context, TraitInterface};
use crate::trait_controller::navigation::resolve_targets;
use crate::trait_controller::status::{applied_status, removed_status};
use futures::StreamExt;
use kube::api::ListParams;
use kube::{Api, Client};
use kube_runtime::controller::Action as RequeueAction;
use kube_runtime::{controller, Controller};
use log::{debug, error, info, trace, warn};
use logsidecar_model::constants::FINALIZER_SIDECAR_CLEANUP;
use logsidecar_model::{CrdExt, LoggingTrait};
use snafu::{ensure, ResultExt};
use std::ops::Deref;
use std::sync::Arc;

pub(crate) async fn run_trait_controller(client: Client, config: ControllerConfig) {
    let context = new_context(client.clone(), config);
    Controller::new(Api::<LoggingTrait>::all(client), ListParams::default())
        .run(reconcile, handle_reconciliation_error, context)
        .for_each(|reconciliation_result| async move {
            if let Err(reconciliation_err) = reconciliation_result {
                match &reconciliation_err {
                    controller::Error::ObjectNotFound { .. } => {
                        debug!("Object is gone: {}", reconciliation_err)
                    }
                    _ => error!("Error during reconciliation: {}", reconciliation_err),
                }
            }
        })
        .await;
}

pub(super) async fn reconcile(t: Arc<LoggingTrait>, context: Context) -> Result<RequeueAction> {
    let t = TraitInterface::new(t.deref().clone(), context);
    let action = action(t.logging_trait());
    trace!("Action for logging trait '{}': {:?}", t.name(), action);
    match action {
        Action::Ignore => {
            debug!(
                "Ignoring logging trait '{}' in namespace '{}'",
                t.name(),
                t.logging_trait().object_namespace()
            );
            Ok(no_requeue())
        }
        Action::AddFinalizer => {
            t.trait_client()
                .add_finalizer(FINALIZER_SIDECAR_CLEANUP, t.logging_trait())
                .await
                .context(error::AddFinalizerSnafu {
                    trait_name: t.name(),
                    finalizer: FINALIZER_SIDECAR_CLEANUP,
                })?;
            Ok(requeue())
        }
        Action::Inject => inject(&t).await,
        Action::Remove => remove(&t).await,
        Action::Done => Ok(no_requeue()),
    }
}

async fn inject(t: &TraitInterface) -> Result<RequeueAction> {
    let targets = resolve_targets(t.store(), t.logging_trait()).await?;
    if targets.is_empty() {
        debug!("Logging trait '{}' is waiting for its workload", t.name());
        return Ok(requeue_slow());
    }

    let report = match t.injector().apply(t.logging_trait(), targets).await {
        Ok(report) => report,
        Err(e) if e.is_not_applicable() => {
            info!(
                "Deleting logging trait '{}' since its workload cannot carry a logging sidecar",
                t.name()
            );
            t.trait_client()
                .delete(t.logging_trait())
                .await
                .context(error::DeleteTraitSnafu {
                    trait_name: t.name(),
                })?;
            return Ok(no_requeue());
        }
        Err(e) => {
            return Err(e).context(error::InjectSnafu {
                trait_name: t.name(),
            })
        }
    };

    for conflict in &report.conflicts {
        warn!("Logging trait '{}': {}", t.name(), conflict);
    }
    t.set_status(applied_status(
        t.logging_trait().injected_resources(),
        &report,
    ))
    .await?;
    ensure!(
        report.is_complete(),
        error::IncompleteSnafu {
            trait_name: t.name(),
            failures: report.failures.len(),
        }
    );
    Ok(requeue_slow())
}

async fn remove(t: &TraitInterface) -> Result<RequeueAction> {
    let targets = resolve_targets(t.store(), t.logging_trait()).await?;
    let report = t.injector().remove(t.logging_trait(), targets).await;
    t.set_status(removed_status(
        t.logging_trait().injected_resources(),
        &report,
    ))
    .await?;
    if !report.verified() {
        debug!(
            "Waiting for the logging sidecar of '{}' to be removed from {} resources, {} failed",
            t.name(),
            report.removed.iter().filter(|target| !target.verified).count(),
            report.failures.len()
        );
        return Ok(requeue());
    }

    t.trait_client()
        .remove_finalizer(FINALIZER_SIDECAR_CLEANUP, t.logging_trait())
        .await
        .context(error::RemoveFinalizerSnafu {
            trait_name: t.name(),
            finalizer: FINALIZER_SIDECAR_CLEANUP,
        })?;
    info!("Removed the logging sidecar of '{}'", t.name());
    Ok(no_requeue())
}

/// `handle_reconciliation_error` is called when `reconcile` returns an error.
pub(super) fn handle_reconciliation_error(
    t: Arc<LoggingTrait>,
    e: &Error,
    _: Context,
) -> RequeueAction {
    error!(
        "Logging trait '{}' reconciliation error: {}",
        t.object_name(),
        e
    );
    requeue()
}
