/*!

Named-entry merging for the arrays of a pod template. Containers, volumes and volume mounts are
keyed by their `name`: an entry with the same name is replaced in place, otherwise the new entry
is appended. Entries that are not ours are never touched.

!*/

use log::warn;
use logsidecar_model::{entry_name, Document, FieldPath, Result};
use serde_json::Value;
use std::fmt::{Display, Formatter};

/// A same-named entry that was not created by us was overwritten.
#[derive(Debug, Clone, PartialEq)]
pub struct ConflictWarning {
    pub path: FieldPath,
    pub name: String,
    /// The entry as it was before it was replaced.
    pub discarded: Value,
}

impl Display for ConflictWarning {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "'{}' in '{}' was discarded because of a duplicate name",
            self.name, self.path
        )
    }
}

/// What a merge did to the array.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeOutcome {
    /// An entry with the same name existed and was replaced.
    pub replaced: bool,
    /// Further entries with the same name that were dropped to keep names unique.
    pub duplicates_dropped: usize,
    pub conflict: Option<ConflictWarning>,
}

/// Checks that every entry is a map and returns their names.
fn entry_names<'a>(path: &FieldPath, existing: &'a [Value]) -> Result<Vec<Option<&'a str>>> {
    existing
        .iter()
        .enumerate()
        .map(|(index, entry)| entry_name(path, index, entry))
        .collect()
}

fn name_of(entry: &Value) -> String {
    entry
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned()
}

/// Replaces the first entry named like `entry`, or appends `entry` if there is none. Later entries
/// with the same name are dropped. Returns the replaced entry along with the outcome.
fn merge_named(
    path: &FieldPath,
    existing: &mut Vec<Value>,
    entry: Value,
) -> Result<(MergeOutcome, Option<Value>)> {
    let name = name_of(&entry);
    let matches: Vec<usize> = entry_names(path, existing)?
        .into_iter()
        .enumerate()
        .filter(|(_, existing_name)| *existing_name == Some(name.as_str()))
        .map(|(index, _)| index)
        .collect();

    let (first, rest) = match matches.split_first() {
        None => {
            existing.push(entry);
            return Ok((MergeOutcome::default(), None));
        }
        Some(split) => split,
    };
    let previous = std::mem::replace(&mut existing[*first], entry);
    for index in rest.iter().rev() {
        existing.remove(*index);
    }
    Ok((
        MergeOutcome {
            replaced: true,
            duplicates_dropped: rest.len(),
            conflict: None,
        },
        Some(previous),
    ))
}

/// Merges a container into the `containers` array at `path`.
pub fn merge_container(
    path: &FieldPath,
    existing: &mut Vec<Value>,
    container: Value,
) -> Result<MergeOutcome> {
    Ok(merge_named(path, existing, container)?.0)
}

/// Merges a volume into the `volumes` array at `path`. Replacing a volume that is sourced from
/// something other than the new volume's `ConfigMap` is reported as a conflict.
pub fn merge_volume(
    path: &FieldPath,
    existing: &mut Vec<Value>,
    volume: Value,
) -> Result<MergeOutcome> {
    let source = config_map_name(&volume).map(ToOwned::to_owned);
    let (mut outcome, previous) = merge_named(path, existing, volume)?;
    if let Some(previous) = previous {
        if config_map_name(&previous) != source.as_deref() {
            let conflict = ConflictWarning {
                path: path.clone(),
                name: name_of(&previous),
                discarded: previous,
            };
            warn!("{}: {}", conflict, conflict.discarded);
            outcome.conflict = Some(conflict);
        }
    }
    Ok(outcome)
}

/// Merges a mount into the `volumeMounts` of a container.
pub fn merge_volume_mount(
    path: &FieldPath,
    existing: &mut Vec<Value>,
    mount: Value,
) -> Result<MergeOutcome> {
    Ok(merge_named(path, existing, mount)?.0)
}

/// Appends `entry` unless an entry with the same name exists. Returns whether it was added.
pub fn ensure_named(path: &FieldPath, existing: &mut Vec<Value>, entry: Value) -> Result<bool> {
    let name = name_of(&entry);
    if entry_names(path, existing)?.contains(&Some(name.as_str())) {
        return Ok(false);
    }
    existing.push(entry);
    Ok(true)
}

/// Removes the first entry called `name` by swapping the last entry into its place. Returns
/// `true` when there was nothing to remove, i.e. the removal has been verified.
pub fn remove_named(path: &FieldPath, existing: &mut Vec<Value>, name: &str) -> Result<bool> {
    let position = entry_names(path, existing)?
        .iter()
        .position(|existing_name| *existing_name == Some(name));
    match position {
        Some(index) => {
            existing.swap_remove(index);
            Ok(false)
        }
        None => Ok(true),
    }
}

/// Collects the `volumeMounts` of every container in `containers` other than `skip_container`.
pub fn collect_application_mounts(
    path: &FieldPath,
    containers: &[Value],
    skip_container: &str,
) -> Result<Vec<Value>> {
    let mut mounts = Vec::new();
    for (index, container) in containers.iter().enumerate() {
        if entry_name(path, index, container)? == Some(skip_container) {
            continue;
        }
        let mounts_path = FieldPath::new(["volumeMounts"]);
        let container_mounts = Document::new(container.clone())
            .nested_array(&mounts_path)?
            .unwrap_or_default();
        let nested_path = path.join(index.to_string()).join("volumeMounts");
        entry_names(&nested_path, &container_mounts)?;
        mounts.extend(container_mounts);
    }
    Ok(mounts)
}

/// Runs `edit` on the `volumeMounts` of every container in `containers` other than
/// `skip_container` and returns its results. A container's mounts are only written back when
/// `edit` changed them.
pub fn edit_application_mounts<T, F>(
    path: &FieldPath,
    containers: &mut [Value],
    skip_container: &str,
    mut edit: F,
) -> Result<Vec<T>>
where
    F: FnMut(&FieldPath, &mut Vec<Value>) -> Result<T>,
{
    let mounts_path = FieldPath::new(["volumeMounts"]);
    let mut results = Vec::new();
    for (index, container) in containers.iter_mut().enumerate() {
        if entry_name(path, index, container)? == Some(skip_container) {
            continue;
        }
        let mut document = Document::new(container.clone());
        let before = document.nested_array(&mounts_path)?.unwrap_or_default();
        let mut mounts = before.clone();
        results.push(edit(&path.join(index.to_string()).join("volumeMounts"), &mut mounts)?);
        if mounts != before {
            document.set_array(&mounts_path, mounts)?;
            *container = document.into_value();
        }
    }
    Ok(results)
}

/// Adds the application `mounts` to the sidecar's own mounts. Mounts whose name or mount path is
/// already present are skipped. Returns the number of mounts added.
pub fn share_mounts(sidecar_mounts: &mut Vec<Value>, mounts: Vec<Value>) -> usize {
    let mut added = 0;
    for mount in mounts {
        let taken = sidecar_mounts.iter().any(|existing| {
            existing.get("name") == mount.get("name")
                || existing.get("mountPath") == mount.get("mountPath")
        });
        if !taken {
            sidecar_mounts.push(mount);
            added += 1;
        }
    }
    added
}

fn config_map_name(volume: &Value) -> Option<&str> {
    volume
        .get("configMap")
        .and_then(|source| source.get("name"))
        .and_then(Value::as_str)
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    fn containers_path() -> FieldPath {
        FieldPath::new(["spec", "template", "spec", "containers"])
    }

    fn volumes_path() -> FieldPath {
        FieldPath::new(["spec", "template", "spec", "volumes"])
    }

    fn logging_volume() -> Value {
        json!({
            "name": "logging-stdout-volume",
            "configMap": {"name": "logging-stdout-web-deployment", "defaultMode": 420}
        })
    }

    #[test]
    fn append_when_absent() {
        let mut containers = vec![json!({"name": "app", "image": "shop:1"})];
        let outcome = merge_container(
            &containers_path(),
            &mut containers,
            json!({"name": "logging-stdout", "image": "fluentd:1"}),
        )
        .unwrap();
        assert!(!outcome.replaced);
        assert_eq!(containers.len(), 2);
        assert_eq!(containers[1]["name"], "logging-stdout");
    }

    #[test]
    fn replace_by_name_keeps_position_and_length() {
        let mut containers = vec![
            json!({"name": "logging-stdout", "image": "fluentd:0"}),
            json!({"name": "app"}),
        ];
        let outcome = merge_container(
            &containers_path(),
            &mut containers,
            json!({"name": "logging-stdout", "image": "fluentd:1"}),
        )
        .unwrap();
        assert!(outcome.replaced);
        assert_eq!(containers.len(), 2);
        assert_eq!(containers[0]["image"], "fluentd:1");
        assert_eq!(containers[1], json!({"name": "app"}));
    }

    #[test]
    fn later_duplicates_are_dropped() {
        let mut containers = vec![
            json!({"name": "logging-stdout"}),
            json!({"name": "app"}),
            json!({"name": "logging-stdout"}),
        ];
        let outcome = merge_container(
            &containers_path(),
            &mut containers,
            json!({"name": "logging-stdout", "image": "fluentd:1"}),
        )
        .unwrap();
        assert_eq!(outcome.duplicates_dropped, 1);
        assert_eq!(
            containers,
            vec![
                json!({"name": "logging-stdout", "image": "fluentd:1"}),
                json!({"name": "app"}),
            ]
        );
    }

    #[test]
    fn merging_twice_is_idempotent() {
        let mut volumes = vec![json!({"name": "data", "emptyDir": {}})];
        merge_volume(&volumes_path(), &mut volumes, logging_volume()).unwrap();
        let once = volumes.clone();
        let outcome = merge_volume(&volumes_path(), &mut volumes, logging_volume()).unwrap();
        assert_eq!(volumes, once);
        assert!(outcome.replaced);
        assert!(outcome.conflict.is_none());
    }

    #[test]
    fn foreign_volume_with_same_name_is_a_conflict() {
        let foreign = json!({"name": "logging-stdout-volume", "emptyDir": {}});
        let mut volumes = vec![foreign.clone()];
        let outcome = merge_volume(&volumes_path(), &mut volumes, logging_volume()).unwrap();
        let conflict = outcome.conflict.unwrap();
        assert_eq!(conflict.name, "logging-stdout-volume");
        assert_eq!(conflict.discarded, foreign);
        assert_eq!(volumes, vec![logging_volume()]);
    }

    #[test]
    fn non_object_entry_is_structural_error() {
        let mut volumes = vec![json!({"name": "data"}), json!(42)];
        let err = merge_volume(&volumes_path(), &mut volumes, logging_volume()).unwrap_err();
        assert!(err.is_structural());
        assert_eq!(volumes.len(), 2);
    }

    #[test]
    fn remove_is_verified_on_second_call() {
        let mut containers = vec![
            json!({"name": "logging-stdout"}),
            json!({"name": "app"}),
            json!({"name": "metrics"}),
        ];
        let verified = remove_named(&containers_path(), &mut containers, "logging-stdout").unwrap();
        assert!(!verified);
        assert_eq!(
            containers,
            vec![json!({"name": "metrics"}), json!({"name": "app"})]
        );
        let after_first = containers.clone();
        let verified = remove_named(&containers_path(), &mut containers, "logging-stdout").unwrap();
        assert!(verified);
        assert_eq!(containers, after_first);
    }

    #[test]
    fn ensure_named_does_not_replace() {
        let mut volumes = vec![json!({"name": "logs", "hostPath": {"path": "/var/log"}})];
        let added = ensure_named(
            &volumes_path(),
            &mut volumes,
            json!({"name": "logs", "emptyDir": {}}),
        )
        .unwrap();
        assert!(!added);
        assert_eq!(volumes[0]["hostPath"]["path"], "/var/log");
        assert!(ensure_named(&volumes_path(), &mut volumes, json!({"name": "tmp"})).unwrap());
        assert_eq!(volumes.len(), 2);
    }

    #[test]
    fn application_mounts_are_collected_and_shared_once() {
        let containers = vec![
            json!({"name": "app", "volumeMounts": [
                {"name": "data", "mountPath": "/data"},
                {"name": "logs", "mountPath": "/var/log/app"}
            ]}),
            json!({"name": "logging-stdout", "volumeMounts": [
                {"name": "logging-stdout-volume", "mountPath": "/fluentd/etc/custom.conf"}
            ]}),
            json!({"name": "worker", "volumeMounts": [
                {"name": "data", "mountPath": "/data"}
            ]}),
            json!({"name": "init"}),
        ];
        let mounts =
            collect_application_mounts(&containers_path(), &containers, "logging-stdout").unwrap();
        assert_eq!(mounts.len(), 3);

        let mut sidecar = vec![json!({
            "name": "logging-stdout-volume",
            "mountPath": "/fluentd/etc/custom.conf"
        })];
        assert_eq!(share_mounts(&mut sidecar, mounts), 2);
        assert_eq!(sidecar.len(), 3);
    }

    #[test]
    fn malformed_application_mounts_are_structural_errors() {
        let containers = vec![json!({"name": "app", "volumeMounts": ["data"]})];
        let err = collect_application_mounts(&containers_path(), &containers, "logging-stdout")
            .unwrap_err();
        assert!(err.is_structural());
    }

    #[test]
    fn application_mounts_are_edited_without_the_sidecar() {
        let mut containers = vec![
            json!({"name": "app", "volumeMounts": [{"name": "data", "mountPath": "/data"}]}),
            json!({"name": "logging-stdout"}),
            json!({"name": "worker"}),
        ];
        let storage = json!({"name": "app-logs", "mountPath": "/var/log/app"});
        let added = edit_application_mounts(
            &containers_path(),
            &mut containers,
            "logging-stdout",
            |path, mounts| ensure_named(path, mounts, storage.clone()),
        )
        .unwrap();
        assert_eq!(added, vec![true, true]);
        assert_eq!(containers[0]["volumeMounts"][1]["name"], "app-logs");
        assert_eq!(containers[1], json!({"name": "logging-stdout"}));
        assert_eq!(containers[2]["volumeMounts"], json!([storage]));

        let verified = edit_application_mounts(
            &containers_path(),
            &mut containers,
            "logging-stdout",
            |path, mounts| remove_named(path, mounts, "app-logs"),
        )
        .unwrap();
        assert_eq!(verified, vec![false, false]);
        assert_eq!(
            containers[0]["volumeMounts"],
            json!([{"name": "data", "mountPath": "/data"}])
        );
        assert_eq!(containers[2]["volumeMounts"], json!([]));
    }
}
