use log::trace;
use logsidecar_model::constants::{FINALIZER_SIDECAR_CLEANUP, KUBE_SYSTEM_NAMESPACE};
use logsidecar_model::{CrdExt, LoggingTrait};

/// The action that the controller needs to take in order to reconcile the [`LoggingTrait`].
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(super) enum Action {
    /// The trait lives in a namespace that the controller leaves alone.
    Ignore,
    AddFinalizer,
    /// Add the sidecar to the workload, or bring it up to date.
    Inject,
    /// The trait is being deleted and the sidecar has to be taken out first.
    Remove,
    /// The trait is being deleted and there is nothing left for us to do.
    Done,
}

pub(super) fn action(logging_trait: &LoggingTrait) -> Action {
    if logging_trait.object_namespace() == KUBE_SYSTEM_NAMESPACE {
        return Action::Ignore;
    }
    let has_finalizer = logging_trait.has_finalizer(FINALIZER_SIDECAR_CLEANUP);
    trace!(
        "logging trait '{}': delete requested {}, finalizer {}",
        logging_trait.object_name(),
        logging_trait.is_delete_requested(),
        has_finalizer
    );
    match (logging_trait.is_delete_requested(), has_finalizer) {
        (true, true) => Action::Remove,
        (true, false) => Action::Done,
        (false, false) => Action::AddFinalizer,
        (false, true) => Action::Inject,
    }
}
