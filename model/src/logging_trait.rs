use crate::CrdExt;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// A `LoggingTrait` attaches a logging sidecar to a workload. The `CustomResource` derive also
/// produces a struct named `LoggingTrait` which represents a logging trait object in the k8s API.
#[derive(Clone, CustomResource, Debug, Default, Deserialize, JsonSchema, PartialEq, Serialize)]
#[kube(
    derive = "Default",
    derive = "PartialEq",
    group = "logsidecar.dev",
    kind = "LoggingTrait",
    namespaced,
    plural = "loggingtraits",
    singular = "loggingtrait",
    status = "LoggingTraitStatus",
    version = "v1",
    printcolumn = r#"{"name":"Workload", "type":"string", "jsonPath":".spec.workloadRef.name"}"#,
    printcolumn = r#"{"name":"Kind", "type":"string", "jsonPath":".spec.workloadRef.kind"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct LoggingTraitSpec {
    /// The workload that this trait applies to.
    pub workload_ref: WorkloadReference,
    /// The sidecar image. The controller's default image is used when this is absent.
    pub logging_image: Option<String>,
    /// The sidecar image pull policy, e.g. `IfNotPresent`.
    pub image_pull_policy: Option<String>,
    /// The rendered logging configuration, stored under a single key of the `ConfigMap`.
    pub logging_config: Option<String>,
    /// Several rendered configuration files keyed by file name. Takes precedence over
    /// `logging_config` when both are given.
    pub config_files: Option<BTreeMap<String, String>>,
    /// Where the sidecar finds its configuration file.
    pub mount_path: Option<String>,
    /// The path of the logs that the sidecar should ship, exported as `LOG_PATH`.
    pub log_path: Option<String>,
    /// The kinds of resources owned by the workload that should receive the sidecar. When none of
    /// these exist the workload itself is the target.
    #[serde(deserialize_with = "crate::schema_utils::null_to_default")]
    #[serde(default)]
    pub target_kinds: Vec<TargetKind>,
}

/// A reference to the workload object that a trait applies to.
#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadReference {
    pub api_version: String,
    pub kind: String,
    pub name: String,
}

/// A kind of resource that the workload may own.
#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetKind {
    pub api_version: String,
    pub kind: String,
}

/// A reference to a resource that the controller has injected the sidecar into. While the trait
/// is being deleted, each entry stays until removal of the sidecar from it has been verified.
#[derive(
    Clone, Debug, Default, Deserialize, Eq, Hash, JsonSchema, Ord, PartialEq, PartialOrd, Serialize,
)]
#[serde(rename_all = "camelCase")]
pub struct InjectedResource {
    pub api_version: String,
    pub kind: String,
    pub name: String,
}

impl Display for InjectedResource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{} '{}'", self.api_version, self.kind, self.name)
    }
}

/// The status field of the `LoggingTrait` CRD, written by the controller.
#[derive(Clone, Debug, Default, Deserialize, Eq, JsonSchema, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingTraitStatus {
    /// The resources that currently carry the logging sidecar.
    #[serde(deserialize_with = "crate::schema_utils::null_to_default")]
    #[serde(default)]
    pub injected_resources: Vec<InjectedResource>,
    /// The error encountered during the last reconciliation, if any.
    pub last_error: Option<String>,
}

impl LoggingTrait {
    pub fn injected_resources(&self) -> &[InjectedResource] {
        self.status
            .as_ref()
            .map(|s| s.injected_resources.as_slice())
            .unwrap_or_default()
    }
}

impl CrdExt for LoggingTrait {
    fn object_meta(&self) -> &ObjectMeta {
        &self.metadata
    }
}

#[test]
fn deserialize_minimal_trait() {
    let trait_: LoggingTrait = serde_json::from_value(serde_json::json!({
        "apiVersion": "logsidecar.dev/v1",
        "kind": "LoggingTrait",
        "metadata": {"name": "logs", "namespace": "shop"},
        "spec": {
            "workloadRef": {"apiVersion": "apps/v1", "kind": "Deployment", "name": "web"},
            "targetKinds": null
        }
    }))
    .unwrap();
    assert_eq!(trait_.spec.workload_ref.kind, "Deployment");
    assert!(trait_.spec.target_kinds.is_empty());
    assert!(trait_.spec.logging_image.is_none());
    assert!(trait_.injected_resources().is_empty());
}
