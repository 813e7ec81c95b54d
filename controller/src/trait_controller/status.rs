use logsidecar_injector::{ApplyReport, RemoveReport, TargetFailure};
use logsidecar_model::{InjectedResource, LoggingTraitStatus};

/// The status of a trait after an apply pass. A resource that failed this pass keeps its entry
/// from `previous` since it may still carry the sidecar from an earlier pass.
pub(super) fn applied_status(
    previous: &[InjectedResource],
    report: &ApplyReport,
) -> LoggingTraitStatus {
    let mut injected = report.injected.clone();
    injected.extend(
        previous
            .iter()
            .filter(|resource| {
                report
                    .failures
                    .iter()
                    .any(|failure| &failure.resource == *resource)
            })
            .cloned(),
    );
    injected.sort();
    injected.dedup();

    LoggingTraitStatus {
        injected_resources: injected,
        last_error: last_error(&report.failures),
    }
}

/// The status of a trait after a removal pass. A resource leaves the list once the removal from
/// it has been verified.
pub(super) fn removed_status(
    previous: &[InjectedResource],
    report: &RemoveReport,
) -> LoggingTraitStatus {
    let mut injected: Vec<InjectedResource> = previous
        .iter()
        .filter(|resource| {
            !report
                .removed
                .iter()
                .any(|target| target.verified && &target.resource == *resource)
        })
        .cloned()
        .collect();
    injected.extend(
        report
            .removed
            .iter()
            .filter(|target| !target.verified)
            .map(|target| target.resource.clone()),
    );
    injected.sort();
    injected.dedup();

    LoggingTraitStatus {
        injected_resources: injected,
        last_error: last_error(&report.failures),
    }
}

fn last_error(failures: &[TargetFailure]) -> Option<String> {
    if failures.is_empty() {
        return None;
    }
    Some(
        failures
            .iter()
            .map(|failure| format!("{}: {}", failure.resource, failure.error))
            .collect::<Vec<_>>()
            .join("; "),
    )
}
