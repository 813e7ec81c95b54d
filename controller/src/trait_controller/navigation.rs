/*!

Finds the resources that a `LoggingTrait` applies to: the children of the referenced workload
whose kinds are listed in `targetKinds`, or the workload itself.

!*/

use crate::error::{self, Result};
use kube::core::GroupVersionKind;
use log::{debug, error, trace};
use logsidecar_model::clients::ResourceStore;
use logsidecar_model::{split_api_version, CrdExt, LoggingTrait, WorkloadResource};
use snafu::ResultExt;

/// Returns an empty list when the workload does not exist (yet).
pub(super) async fn resolve_targets<S>(
    store: &S,
    logging_trait: &LoggingTrait,
) -> Result<Vec<WorkloadResource>>
where
    S: ResourceStore + ?Sized,
{
    let namespace = logging_trait.object_namespace();
    let workload_ref = &logging_trait.spec.workload_ref;
    let (group, version) = split_api_version(&workload_ref.api_version);
    let gvk = GroupVersionKind::gvk(group, version, &workload_ref.kind);
    let workload = match store
        .get_resource(&gvk, namespace, &workload_ref.name)
        .await
        .context(error::FetchWorkloadSnafu {
            trait_name: logging_trait.object_name(),
            kind: &workload_ref.kind,
            name: &workload_ref.name,
        })? {
        Some(workload) => workload,
        None => {
            debug!(
                "Workload {} '{}/{}' of logging trait '{}' does not exist",
                workload_ref.kind,
                namespace,
                workload_ref.name,
                logging_trait.object_name()
            );
            return Ok(Vec::new());
        }
    };

    let mut children = Vec::new();
    for target_kind in &logging_trait.spec.target_kinds {
        let (group, version) = split_api_version(&target_kind.api_version);
        let gvk = GroupVersionKind::gvk(group, version, &target_kind.kind);
        match store.list_resources(&gvk, namespace).await {
            Ok(resources) => children.extend(owned_by(&workload, resources)),
            Err(e) => error!(
                "Unable to list {} resources owned by {}: {}",
                target_kind.kind, workload, e
            ),
        }
    }
    trace!("{} has {} target children", workload, children.len());
    Ok(targets_or_workload(workload, children))
}

/// The `resources` whose owner references name `owner`.
fn owned_by(owner: &WorkloadResource, resources: Vec<WorkloadResource>) -> Vec<WorkloadResource> {
    match owner.uid() {
        Some(uid) => resources
            .into_iter()
            .filter(|resource| resource.is_owned_by(uid))
            .collect(),
        None => Vec::new(),
    }
}

fn targets_or_workload(
    workload: WorkloadResource,
    children: Vec<WorkloadResource>,
) -> Vec<WorkloadResource> {
    if children.is_empty() {
        vec![workload]
    } else {
        children
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    fn resource(kind: &str, name: &str, owner_uid: Option<&str>) -> WorkloadResource {
        let owner_references = owner_uid.map(|uid| {
            json!([{
                "apiVersion": "apps/v1",
                "kind": "Deployment",
                "name": "web",
                "uid": uid,
                "controller": true
            }])
        });
        WorkloadResource::from_value(json!({
            "apiVersion": "apps/v1",
            "kind": kind,
            "metadata": {
                "name": name,
                "namespace": "shop",
                "uid": format!("uid-{}", name),
                "ownerReferences": owner_references
            },
            "spec": {}
        }))
        .unwrap()
    }

    #[test]
    fn only_owned_resources_are_targets() {
        let workload = resource("Deployment", "web", None);
        let children = owned_by(
            &workload,
            vec![
                resource("ReplicaSet", "web-1", Some("uid-web")),
                resource("ReplicaSet", "api-1", Some("uid-api")),
                resource("ReplicaSet", "orphan", None),
            ],
        );
        let names: Vec<_> = children.iter().map(|child| child.name()).collect();
        assert_eq!(names, vec!["web-1"]);
    }

    #[test]
    fn workload_without_uid_owns_nothing() {
        let mut workload = resource("Deployment", "web", None);
        workload.metadata.uid = None;
        let children = owned_by(
            &workload,
            vec![resource("ReplicaSet", "web-1", Some("uid-web"))],
        );
        assert!(children.is_empty());
    }

    #[test]
    fn workload_is_the_fallback_target() {
        let workload = resource("Deployment", "web", None);
        let targets = targets_or_workload(workload.clone(), Vec::new());
        assert_eq!(targets, vec![workload.clone()]);

        let child = resource("ReplicaSet", "web-1", Some("uid-web"));
        let targets = targets_or_workload(workload, vec![child.clone()]);
        assert_eq!(targets, vec![child]);
    }
}
