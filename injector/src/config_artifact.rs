use crate::error::{self, Result};
use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use log::{debug, info};
use logsidecar_model::clients::{OperationResult, ResourceStore};
use logsidecar_model::{LoggingConfig, WorkloadResource};
use snafu::ResultExt;

/// Keeps the `ConfigMap` that holds the sidecar configuration of a resource in sync. There is at
/// most one such `ConfigMap` per resource since its name is derived from the resource.
pub struct ConfigArtifactManager<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S> ConfigArtifactManager<'a, S>
where
    S: ResourceStore + ?Sized,
{
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    async fn find(
        &self,
        namespace: &str,
        name: &str,
        owner: &WorkloadResource,
    ) -> Result<Option<ConfigMap>> {
        Ok(self
            .store
            .list_config_maps(namespace, name)
            .await
            .context(error::StoreSnafu {
                operation: format!("list config map '{}'", name),
                resource: owner.to_string(),
            })?
            .into_iter()
            .next())
    }

    /// Creates the `ConfigMap` for `owner`, or replaces its data if it already exists.
    pub async fn ensure(
        &self,
        namespace: &str,
        owner: &WorkloadResource,
        config: &LoggingConfig,
    ) -> Result<OperationResult> {
        let name = config.config_name(owner.name(), owner.kind());
        let data = config.rendered_config.to_data(&config.sub_path_key);

        match self.find(namespace, &name, owner).await? {
            None => {
                let config_map = ConfigMap {
                    metadata: ObjectMeta {
                        name: Some(name.clone()),
                        namespace: Some(namespace.to_owned()),
                        labels: owner.metadata.labels.clone(),
                        owner_references: owner
                            .controller_owner_reference()
                            .map(|reference| vec![reference]),
                        ..ObjectMeta::default()
                    },
                    data: Some(data),
                    ..ConfigMap::default()
                };
                self.store
                    .create_config_map(&config_map)
                    .await
                    .context(error::StoreSnafu {
                        operation: format!("create config map '{}'", name),
                        resource: owner.to_string(),
                    })?;
                info!("Created config map '{}/{}' for {}", namespace, name, owner);
                Ok(OperationResult::Created)
            }
            Some(mut config_map) => {
                config_map.data = Some(data);
                self.store
                    .update_config_map(&config_map)
                    .await
                    .context(error::StoreSnafu {
                        operation: format!("update config map '{}'", name),
                        resource: owner.to_string(),
                    })?;
                debug!("Updated config map '{}/{}' for {}", namespace, name, owner);
                Ok(OperationResult::Updated)
            }
        }
    }

    /// Deletes the `ConfigMap` of `owner`. Returns `true` when it was already gone.
    pub async fn remove(
        &self,
        namespace: &str,
        owner: &WorkloadResource,
        config: &LoggingConfig,
    ) -> Result<bool> {
        let name = config.config_name(owner.name(), owner.kind());
        if self.find(namespace, &name, owner).await?.is_none() {
            return Ok(true);
        }
        self.store
            .delete_config_map(namespace, &name)
            .await
            .context(error::StoreSnafu {
                operation: format!("delete config map '{}'", name),
                resource: owner.to_string(),
            })?;
        info!("Deleted config map '{}/{}' for {}", namespace, name, owner);
        Ok(false)
    }
}
