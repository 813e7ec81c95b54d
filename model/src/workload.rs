use crate::document::{Document, FieldPath};
use crate::error::{self, Result};
use crate::InjectedResource;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use kube::core::{DynamicObject, GroupVersionKind, TypeMeta};
use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// Any workload object (`Pod`, `Deployment`, a custom resource, ...) whose shape is not known at
/// compile time. The `apiVersion`/`kind` pair and `metadata` are typed, everything else lives in
/// the structural [`Document`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkloadResource {
    #[serde(flatten)]
    pub types: TypeMeta,
    pub metadata: ObjectMeta,
    #[serde(flatten)]
    pub document: Document,
}

impl WorkloadResource {
    /// Parses a full object representation, e.g. `{"apiVersion": ..., "kind": ..., "spec": ...}`.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        Ok(serde_json::from_value(value).context(error::DynamicObjectSnafu)?)
    }

    pub fn name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or("")
    }

    pub fn namespace(&self) -> &str {
        self.metadata.namespace.as_deref().unwrap_or("")
    }

    pub fn uid(&self) -> Option<&str> {
        self.metadata.uid.as_deref()
    }

    pub fn kind(&self) -> &str {
        &self.types.kind
    }

    pub fn api_version(&self) -> &str {
        &self.types.api_version
    }

    pub fn labels(&self) -> BTreeMap<String, String> {
        self.metadata.labels.clone().unwrap_or_default()
    }

    /// Splits `apiVersion` into its group and version. The core group is the empty string.
    pub fn gvk(&self) -> GroupVersionKind {
        let (group, version) = split_api_version(self.api_version());
        GroupVersionKind::gvk(group, version, self.kind())
    }

    /// A reference to this object suitable for the `ownerReferences` of an object it controls.
    /// Returns `None` if the object has no uid, i.e. it has not been persisted.
    pub fn controller_owner_reference(&self) -> Option<OwnerReference> {
        Some(OwnerReference {
            api_version: self.api_version().to_owned(),
            kind: self.kind().to_owned(),
            name: self.name().to_owned(),
            uid: self.uid()?.to_owned(),
            controller: Some(true),
            block_owner_deletion: Some(true),
        })
    }

    /// Whether `owner_uid` is one of this object's owner references.
    pub fn is_owned_by(&self, owner_uid: &str) -> bool {
        self.metadata
            .owner_references
            .as_ref()
            .map(|refs| refs.iter().any(|r| r.uid == owner_uid))
            .unwrap_or(false)
    }

    /// A reference to this object as recorded in the status of a `LoggingTrait`.
    pub fn reference(&self) -> InjectedResource {
        InjectedResource {
            api_version: self.api_version().to_owned(),
            kind: self.kind().to_owned(),
            name: self.name().to_owned(),
        }
    }

    /// The `spec` subtree, which is what the injector mutates.
    pub fn spec_path() -> FieldPath {
        FieldPath::new(["spec"])
    }
}

impl Display for WorkloadResource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} '{}/{}'",
            self.kind(),
            self.namespace(),
            self.name()
        )
    }
}

impl From<DynamicObject> for WorkloadResource {
    fn from(object: DynamicObject) -> Self {
        Self {
            types: object.types.unwrap_or_default(),
            metadata: object.metadata,
            document: Document::new(object.data),
        }
    }
}

impl From<WorkloadResource> for DynamicObject {
    fn from(resource: WorkloadResource) -> Self {
        DynamicObject {
            types: Some(resource.types),
            metadata: resource.metadata,
            data: resource.document.into_value(),
        }
    }
}

/// Splits an `apiVersion` such as `apps/v1` into `("apps", "v1")`, or `v1` into `("", "v1")`.
pub fn split_api_version(api_version: &str) -> (&str, &str) {
    match api_version.split_once('/') {
        Some((group, version)) => (group, version),
        None => ("", api_version),
    }
}
