use crate::artifact::{ArtifactBuilder, SidecarArtifact};
use crate::config_artifact::ConfigArtifactManager;
use crate::error::{self, Error, Result};
use crate::locator::{containers_candidates, volumes_candidates, SchemaLocator};
use crate::merge::{
    collect_application_mounts, edit_application_mounts, ensure_named, merge_container,
    merge_volume, merge_volume_mount, remove_named, share_mounts, ConflictWarning,
};
use log::{debug, error, info, trace};
use logsidecar_model::clients::{OperationResult, ResourceStore};
use logsidecar_model::constants::LOGGING_NAME_PART;
use logsidecar_model::{
    CrdExt, Document, FieldPath, InjectedResource, LoggingConfig, LoggingTrait, SchemaCatalog,
    StorageVolume, WorkloadResource,
};
use serde::Serialize;
use serde_json::Value;
use snafu::{ensure, ResultExt};

/// A target that could not be processed. The other targets of the pass were still processed.
#[derive(Debug)]
pub struct TargetFailure {
    pub resource: InjectedResource,
    pub error: Error,
}

/// The result of [`Injector::apply`].
#[derive(Debug, Default)]
pub struct ApplyReport {
    /// The resources that carry the sidecar after this pass.
    pub injected: Vec<InjectedResource>,
    pub conflicts: Vec<ConflictWarning>,
    pub failures: Vec<TargetFailure>,
}

impl ApplyReport {
    /// Whether every target was processed without error.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// The outcome of removing the sidecar from one resource.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RemovedTarget {
    pub resource: InjectedResource,
    /// `true` when nothing was left to remove, i.e. the sidecar and its `ConfigMap` are gone.
    pub verified: bool,
}

/// The result of [`Injector::remove`].
#[derive(Debug, Default)]
pub struct RemoveReport {
    pub removed: Vec<RemovedTarget>,
    pub failures: Vec<TargetFailure>,
}

impl RemoveReport {
    /// Whether the removal is known to be complete for every target.
    pub fn verified(&self) -> bool {
        self.failures.is_empty() && self.removed.iter().all(|target| target.verified)
    }
}

/// Adds the logging sidecar to workload resources of any kind, and takes it away again.
pub struct Injector<S, C> {
    store: S,
    locator: SchemaLocator<C>,
    builder: ArtifactBuilder,
    base_config: LoggingConfig,
}

impl<S, C> Injector<S, C>
where
    S: ResourceStore,
    C: SchemaCatalog,
{
    /// `base_config` holds the defaults that the settings of each `LoggingTrait` are laid over.
    pub fn new(store: S, catalog: C, builder: ArtifactBuilder, base_config: LoggingConfig) -> Self {
        Self {
            store,
            locator: SchemaLocator::new(catalog),
            builder,
            base_config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Injects the sidecar of `logging_trait` into each of `targets` and persists them. Fails
    /// with `NotApplicable` when none of the targets has a containers or volumes field and none
    /// of them failed.
    pub async fn apply(
        &self,
        logging_trait: &LoggingTrait,
        targets: Vec<WorkloadResource>,
    ) -> Result<ApplyReport> {
        let config = LoggingConfig::from_trait(&logging_trait.spec, &self.base_config);
        let mut report = ApplyReport::default();
        for mut target in targets {
            let resource = target.reference();
            match self.apply_target(&config, &mut target, &mut report).await {
                Ok(true) => report.injected.push(resource),
                Ok(false) => debug!("{} cannot carry a logging sidecar", target),
                Err(e) => {
                    error!("Unable to add the logging sidecar to {}: {}", target, e);
                    report.failures.push(TargetFailure { resource, error: e });
                }
            }
        }
        ensure!(
            !report.injected.is_empty() || !report.failures.is_empty(),
            error::NotApplicableSnafu {
                trait_name: logging_trait.object_name()
            }
        );
        Ok(report)
    }

    /// Removes the sidecar of `logging_trait` from each of `targets` and deletes their
    /// `ConfigMap`s.
    pub async fn remove(
        &self,
        logging_trait: &LoggingTrait,
        targets: Vec<WorkloadResource>,
    ) -> RemoveReport {
        let config = LoggingConfig::from_trait(&logging_trait.spec, &self.base_config);
        let mut report = RemoveReport::default();
        for mut target in targets {
            let resource = target.reference();
            match self.remove_target(&config, &mut target).await {
                Ok(verified) => report.removed.push(RemovedTarget { resource, verified }),
                Err(e) => {
                    error!("Unable to remove the logging sidecar from {}: {}", target, e);
                    report.failures.push(TargetFailure { resource, error: e });
                }
            }
        }
        report
    }

    /// Returns `true` if the sidecar was combined with the target.
    async fn apply_target(
        &self,
        config: &LoggingConfig,
        target: &mut WorkloadResource,
        report: &mut ApplyReport,
    ) -> Result<bool> {
        config
            .check_config_files()
            .context(error::InvalidConfigSnafu {
                resource: target.to_string(),
            })?;
        let namespace = target.namespace().to_owned();
        let config_name = config.config_name(target.name(), target.kind());
        let config_result = ConfigArtifactManager::new(&self.store)
            .ensure(&namespace, target, config)
            .await?;
        trace!("config map '{}' {:?}", config_name, config_result);

        let gvk = target.gvk();
        let artifact = self.builder.build(config, &config_name);
        let mut combined = false;

        if let Some(path) = self.locator.locate(&gvk, &containers_candidates()).await {
            let mut containers = read_array(target, &path)?;
            let sidecar = sidecar_container(config, &artifact, target, &path, &containers)?;
            merge_container(&path, &mut containers, sidecar)
                .context(error::StructuralReadSnafu {
                    resource: target.to_string(),
                })?;
            if let Some(storage) = &artifact.storage {
                let mount = to_value("storage volume mount", target, &storage.application_mount)?;
                edit_application_mounts(&path, &mut containers, LOGGING_NAME_PART, |path, mounts| {
                    ensure_named(path, mounts, mount.clone())
                })
                .context(error::StructuralReadSnafu {
                    resource: target.to_string(),
                })?;
            }
            write_array(target, &path, containers)?;
            combined = true;
        }

        if let Some(path) = self.locator.locate(&gvk, &volumes_candidates()).await {
            let mut volumes = read_array(target, &path)?;
            let volume = to_value("volume", target, &artifact.volume)?;
            let outcome =
                merge_volume(&path, &mut volumes, volume).context(error::StructuralReadSnafu {
                    resource: target.to_string(),
                })?;
            report.conflicts.extend(outcome.conflict);
            if let Some(storage) = &artifact.storage {
                let storage_volume = to_value("storage volume", target, &storage.volume)?;
                ensure_named(&path, &mut volumes, storage_volume).context(
                    error::StructuralReadSnafu {
                        resource: target.to_string(),
                    },
                )?;
            }
            write_array(target, &path, volumes)?;
            combined = true;
        }

        if combined {
            let result = self.persist(target).await?;
            info!("Logging sidecar of {}: {:?}", target, result);
        }
        Ok(combined)
    }

    /// Returns `true` if there was nothing left to remove.
    async fn remove_target(
        &self,
        config: &LoggingConfig,
        target: &mut WorkloadResource,
    ) -> Result<bool> {
        let gvk = target.gvk();
        let mut verified = true;

        if let Some(path) = self.locator.locate(&gvk, &containers_candidates()).await {
            let mut containers = read_array(target, &path)?;
            verified &= remove_named(&path, &mut containers, LOGGING_NAME_PART).context(
                error::StructuralReadSnafu {
                    resource: target.to_string(),
                },
            )?;
            if let Some(storage) = removed_storage(config) {
                let gone = edit_application_mounts(
                    &path,
                    &mut containers,
                    LOGGING_NAME_PART,
                    |path, mounts| remove_named(path, mounts, &storage.name),
                )
                .context(error::StructuralReadSnafu {
                    resource: target.to_string(),
                })?;
                verified &= gone.into_iter().all(|gone| gone);
            }
            write_array(target, &path, containers)?;
        }

        if let Some(path) = self.locator.locate(&gvk, &volumes_candidates()).await {
            let mut volumes = read_array(target, &path)?;
            verified &= remove_named(&path, &mut volumes, &config.volume_name).context(
                error::StructuralReadSnafu {
                    resource: target.to_string(),
                },
            )?;
            if let Some(storage) = removed_storage(config) {
                verified &= remove_named(&path, &mut volumes, &storage.name).context(
                    error::StructuralReadSnafu {
                        resource: target.to_string(),
                    },
                )?;
            }
            write_array(target, &path, volumes)?;
        }

        // Only write the resource back when something was taken out of it.
        if !verified {
            let result = self.persist(target).await?;
            info!("Removed the logging sidecar from {}: {:?}", target, result);
        }

        let namespace = target.namespace().to_owned();
        let config_gone = ConfigArtifactManager::new(&self.store)
            .remove(&namespace, target, config)
            .await?;
        Ok(verified && config_gone)
    }

    /// Writes `target` back to the store. The mutation is carried over as a copy of `spec`, since
    /// the store replaces `target` with the live object before the mutation runs.
    async fn persist(&self, target: &mut WorkloadResource) -> Result<OperationResult> {
        let spec_path = WorkloadResource::spec_path();
        let spec = target.document.field_copy(&spec_path);
        let resource = target.to_string();
        let mutate = move |live: &mut WorkloadResource| match &spec {
            Some(spec) => live.document.set_field(&spec_path, spec.clone()),
            None => Ok(()),
        };
        self.store
            .create_or_update(target, &mutate)
            .await
            .context(error::StoreSnafu {
                operation: "create or update",
                resource,
            })
    }
}

/// The storage volume when it goes away together with the sidecar.
fn removed_storage(config: &LoggingConfig) -> Option<&StorageVolume> {
    config
        .storage
        .as_ref()
        .filter(|_| !config.retain_storage_volume_on_remove)
}

fn read_array(target: &WorkloadResource, path: &FieldPath) -> Result<Vec<Value>> {
    Ok(target
        .document
        .nested_array(path)
        .context(error::StructuralReadSnafu {
            resource: target.to_string(),
        })?
        .unwrap_or_default())
}

fn write_array(target: &mut WorkloadResource, path: &FieldPath, items: Vec<Value>) -> Result<()> {
    let resource = target.to_string();
    target
        .document
        .set_array(path, items)
        .context(error::StructuralReadSnafu { resource })
}

fn to_value<T: Serialize>(
    what: &'static str,
    target: &WorkloadResource,
    value: &T,
) -> Result<Value> {
    serde_json::to_value(value).context(error::SerializeSnafu {
        what,
        resource: target.to_string(),
    })
}

/// The sidecar container with its mounts: the configuration file, the storage volume and,
/// when enabled, everything that the application containers at `path` mount.
fn sidecar_container(
    config: &LoggingConfig,
    artifact: &SidecarArtifact,
    target: &WorkloadResource,
    path: &FieldPath,
    containers: &[Value],
) -> Result<Value> {
    let structural = || error::StructuralReadSnafu {
        resource: target.to_string(),
    };
    let mounts_path = path.join(LOGGING_NAME_PART).join("volumeMounts");
    let mut mounts = Vec::new();
    let config_mount = to_value("volume mount", target, &artifact.volume_mount)?;
    merge_volume_mount(&mounts_path, &mut mounts, config_mount).context(structural())?;
    if let Some(storage) = &artifact.storage {
        let storage_mount = to_value("storage volume mount", target, &storage.sidecar_mount)?;
        merge_volume_mount(&mounts_path, &mut mounts, storage_mount).context(structural())?;
    }
    if config.share_application_mounts {
        let shared = collect_application_mounts(path, containers, LOGGING_NAME_PART)
            .context(structural())?;
        let added = share_mounts(&mut mounts, shared);
        trace!("sharing {} application mounts with the sidecar", added);
    }

    let mut container = Document::new(to_value("container", target, &artifact.container)?);
    container
        .set_array(&FieldPath::new(["volumeMounts"]), mounts)
        .context(structural())?;
    Ok(container.into_value())
}
