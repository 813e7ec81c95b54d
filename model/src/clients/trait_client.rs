use crate::clients::error::{self, Result};
use crate::{CrdExt, LoggingTrait, LoggingTraitStatus};
use json_patch::{AddOperation, PatchOperation, RemoveOperation, ReplaceOperation, TestOperation};
use kube::api::{DeleteParams, Patch, PatchParams};
use kube::Api;
use log::trace;
use serde::Serialize;
use serde_json::Value;
use snafu::{ensure, OptionExt, ResultExt};

/// A client for the `LoggingTrait` custom resource. Finalizers and status are changed with JSON
/// patches that `test` the value they expect to replace so that we never overwrite a concurrent
/// change.
#[derive(Clone)]
pub struct TraitClient {
    client: kube::Client,
}

impl TraitClient {
    pub fn new_from_k8s_client(client: kube::Client) -> Self {
        Self { client }
    }

    fn api(&self, namespace: &str) -> Api<LoggingTrait> {
        Api::namespaced(self.client.clone(), namespace)
    }

    /// Add a finalizer. Checks `logging_trait` to make sure the finalizer is not a duplicate.
    pub async fn add_finalizer(
        &self,
        finalizer: &str,
        logging_trait: &LoggingTrait,
    ) -> Result<LoggingTrait> {
        trace!(
            "adding finalizer {} for {}",
            finalizer,
            logging_trait.object_name()
        );
        let patches = match &logging_trait.metadata.finalizers {
            None => vec![
                JsonPatch::new_test_operation("/metadata/finalizers", Value::Null),
                JsonPatch::new_add_operation("/metadata/finalizers", vec![finalizer]),
            ],
            Some(finalizers) => {
                ensure!(
                    !logging_trait.has_finalizer(finalizer),
                    error::DuplicateFinalizerSnafu { finalizer }
                );
                vec![
                    JsonPatch::new_test_operation("/metadata/finalizers", finalizers),
                    JsonPatch::new_add_operation("/metadata/finalizers/-", finalizer),
                ]
            }
        };
        self.patch(logging_trait, patches, "add finalizer").await
    }

    /// Remove a finalizer. Checks `logging_trait` to make sure the finalizer actually existed.
    pub async fn remove_finalizer(
        &self,
        finalizer: &str,
        logging_trait: &LoggingTrait,
    ) -> Result<LoggingTrait> {
        trace!(
            "removing finalizer {} for {}",
            finalizer,
            logging_trait.object_name()
        );
        let finalizer_idx = logging_trait
            .finalizer_position(finalizer)
            .context(error::DeleteMissingFinalizerSnafu { finalizer })?;
        self.patch(
            logging_trait,
            vec![
                JsonPatch::new_test_operation(
                    format!("/metadata/finalizers/{}", finalizer_idx),
                    finalizer,
                ),
                JsonPatch::new_remove_operation(format!("/metadata/finalizers/{}", finalizer_idx)),
            ],
            "remove finalizer",
        )
        .await
    }

    /// Replaces the `status` of the trait.
    pub async fn set_status(
        &self,
        logging_trait: &LoggingTrait,
        status: LoggingTraitStatus,
    ) -> Result<LoggingTrait> {
        let patch = match &logging_trait.status {
            None => JsonPatch::new_add_operation("/status", status),
            Some(_) => JsonPatch::new_replace_operation("/status", status),
        };
        let name = logging_trait.object_name();
        self.api(logging_trait.object_namespace())
            .patch_status(
                name,
                &PatchParams::default(),
                &Patch::<LoggingTrait>::Json(json_patch::Patch(vec![
                    patch.into_json_patch_operation()
                ])),
            )
            .await
            .context(error::KubeApiCallForSnafu {
                operation: "set status",
                name,
            })
            .map_err(Into::into)
    }

    /// Deletes the trait, e.g. because the workload it is attached to cannot carry a sidecar.
    pub async fn delete(&self, logging_trait: &LoggingTrait) -> Result<()> {
        let name = logging_trait.object_name();
        let _ = self
            .api(logging_trait.object_namespace())
            .delete(name, &DeleteParams::default())
            .await
            .context(error::KubeApiCallSnafu {
                method: "delete",
                what: format!("logging trait '{}'", name),
            })?;
        Ok(())
    }

    async fn patch<I>(
        &self,
        logging_trait: &LoggingTrait,
        patches: I,
        description: &str,
    ) -> Result<LoggingTrait>
    where
        I: IntoIterator<Item = JsonPatch>,
    {
        let name = logging_trait.object_name();
        let patch = json_patch::Patch(
            patches
                .into_iter()
                .map(|item| item.into_json_patch_operation())
                .collect(),
        );
        self.api(logging_trait.object_namespace())
            .patch(name, &PatchParams::default(), &Patch::<LoggingTrait>::Json(patch))
            .await
            .context(error::KubeApiCallForSnafu {
                operation: description,
                name,
            })
            .map_err(Into::into)
    }
}

/// The JSON patch operation type.
#[derive(Debug, Copy, Clone)]
enum PatchOp {
    Add,
    Replace,
    Remove,
    Test,
}

/// Information for constructing a JSON patch.
#[derive(Debug, Clone)]
pub struct JsonPatch {
    op: PatchOp,
    path: String,
    value: Value,
}

impl JsonPatch {
    pub fn new_add_operation<S, V>(path: S, value: V) -> Self
    where
        S: Into<String>,
        V: Serialize,
    {
        Self {
            op: PatchOp::Add,
            path: path.into(),
            value: serde_json::json!(value),
        }
    }

    pub fn new_replace_operation<S, V>(path: S, value: V) -> Self
    where
        S: Into<String>,
        V: Serialize,
    {
        Self {
            op: PatchOp::Replace,
            path: path.into(),
            value: serde_json::json!(value),
        }
    }

    pub fn new_remove_operation<S>(path: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            op: PatchOp::Remove,
            path: path.into(),
            value: Default::default(),
        }
    }

    pub fn new_test_operation<S, V>(path: S, value: V) -> Self
    where
        S: Into<String>,
        V: Serialize,
    {
        Self {
            op: PatchOp::Test,
            path: path.into(),
            value: serde_json::json!(value),
        }
    }

    fn into_json_patch_operation(self) -> PatchOperation {
        match self.op {
            PatchOp::Add => PatchOperation::Add(AddOperation {
                path: self.path,
                value: self.value,
            }),
            PatchOp::Replace => PatchOperation::Replace(ReplaceOperation {
                path: self.path,
                value: self.value,
            }),
            PatchOp::Remove => PatchOperation::Remove(RemoveOperation { path: self.path }),
            PatchOp::Test => PatchOperation::Test(TestOperation {
                path: self.path,
                value: self.value,
            }),
        }
    }
}

#[test]
fn finalizer_patch_tests_before_adding() {
    let ops: Vec<PatchOperation> = vec![
        JsonPatch::new_test_operation("/metadata/finalizers", Value::Null),
        JsonPatch::new_add_operation("/metadata/finalizers", vec!["a"]),
    ]
    .into_iter()
    .map(JsonPatch::into_json_patch_operation)
    .collect();
    let mut doc = serde_json::json!({"metadata": {"finalizers": null}});
    json_patch::patch(&mut doc, &ops).unwrap();
    assert_eq!(doc, serde_json::json!({"metadata": {"finalizers": ["a"]}}));

    let mut doc = serde_json::json!({"metadata": {"finalizers": ["b"]}});
    assert!(json_patch::patch(&mut doc, &ops).is_err());
}
