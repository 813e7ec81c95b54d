use crate::clients::error::{self, Result};
use crate::clients::HttpStatusCode;
use crate::WorkloadResource;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::api::{DeleteParams, ListParams, PostParams};
use kube::core::{DynamicObject, GroupVersionKind};
use kube::{Api, ResourceExt};
use log::{debug, trace};
use snafu::ResultExt;

/// The callback handed to [`ResourceStore::create_or_update`]. It receives the freshly fetched
/// object (or the caller's object when it does not exist yet) and applies the desired state to it.
pub type MutateFn<'a> = dyn Fn(&mut WorkloadResource) -> crate::Result<()> + Send + Sync + 'a;

/// What [`ResourceStore::create_or_update`] did.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum OperationResult {
    Created,
    Updated,
    Unchanged,
}

/// The operations that the sidecar injector needs from the cluster. [`KubeStore`] is the
/// implementation backed by the Kubernetes API, tests provide in-memory implementations.
#[async_trait::async_trait]
pub trait ResourceStore: Send + Sync {
    /// Lists the `ConfigMap`s in `namespace` whose name is `name`.
    async fn list_config_maps(&self, namespace: &str, name: &str) -> Result<Vec<ConfigMap>>;

    async fn create_config_map(&self, config_map: &ConfigMap) -> Result<ConfigMap>;

    async fn update_config_map(&self, config_map: &ConfigMap) -> Result<ConfigMap>;

    /// Deletes a `ConfigMap`. Deleting a `ConfigMap` that does not exist is not an error.
    async fn delete_config_map(&self, namespace: &str, name: &str) -> Result<()>;

    /// Gets an object of any kind, `None` if it does not exist.
    async fn get_resource(
        &self,
        gvk: &GroupVersionKind,
        namespace: &str,
        name: &str,
    ) -> Result<Option<WorkloadResource>>;

    /// Lists the objects of a kind in `namespace`.
    async fn list_resources(
        &self,
        gvk: &GroupVersionKind,
        namespace: &str,
    ) -> Result<Vec<WorkloadResource>>;

    /// Fetches the live version of `resource`, runs `mutate` on it and writes it back. If the
    /// object does not exist, `mutate` is run on `resource` and it is created. On success
    /// `resource` holds the object as returned by the API.
    async fn create_or_update(
        &self,
        resource: &mut WorkloadResource,
        mutate: &MutateFn<'_>,
    ) -> Result<OperationResult>;
}

/// A [`ResourceStore`] that talks to the Kubernetes API.
#[derive(Clone)]
pub struct KubeStore {
    client: kube::Client,
}

impl KubeStore {
    pub fn new(client: kube::Client) -> Self {
        Self { client }
    }

    fn config_maps(&self, namespace: &str) -> Api<ConfigMap> {
        Api::namespaced(self.client.clone(), namespace)
    }

    /// Finds the plural name of `gvk` using discovery and returns an `Api` for it.
    async fn dynamic_api(
        &self,
        gvk: &GroupVersionKind,
        namespace: &str,
    ) -> Result<Api<DynamicObject>> {
        let (resource, _capabilities) = kube::discovery::pinned_kind(&self.client, gvk)
            .await
            .context(error::DiscoverySnafu {
                kind: gvk.kind.clone(),
            })?;
        Ok(Api::namespaced_with(self.client.clone(), namespace, &resource))
    }
}

#[async_trait::async_trait]
impl ResourceStore for KubeStore {
    async fn list_config_maps(&self, namespace: &str, name: &str) -> Result<Vec<ConfigMap>> {
        let params = ListParams::default().fields(&format!("metadata.name={}", name));
        Ok(self
            .config_maps(namespace)
            .list(&params)
            .await
            .context(error::KubeApiCallForSnafu {
                operation: "list config maps",
                name,
            })?
            .items)
    }

    async fn create_config_map(&self, config_map: &ConfigMap) -> Result<ConfigMap> {
        trace!("creating config map '{}'", config_map.name_any());
        self.config_maps(config_map.namespace().as_deref().unwrap_or_default())
            .create(&PostParams::default(), config_map)
            .await
            .context(error::KubeApiCallForSnafu {
                operation: "create config map",
                name: config_map.name_any(),
            })
            .map_err(Into::into)
    }

    async fn update_config_map(&self, config_map: &ConfigMap) -> Result<ConfigMap> {
        trace!("updating config map '{}'", config_map.name_any());
        let name = config_map.name_any();
        self.config_maps(config_map.namespace().as_deref().unwrap_or_default())
            .replace(&name, &PostParams::default(), config_map)
            .await
            .context(error::KubeApiCallForSnafu {
                operation: "update config map",
                name: name.as_str(),
            })
            .map_err(Into::into)
    }

    async fn delete_config_map(&self, namespace: &str, name: &str) -> Result<()> {
        trace!("deleting config map '{}/{}'", namespace, name);
        let result = self
            .config_maps(namespace)
            .delete(name, &DeleteParams::default())
            .await;
        if result.is_not_found() {
            debug!(
                "We tried to delete the config map '{}' but it did not exist",
                name
            );
            return Ok(());
        }
        let _ = result.context(error::KubeApiCallForSnafu {
            operation: "delete config map",
            name,
        })?;
        Ok(())
    }

    async fn get_resource(
        &self,
        gvk: &GroupVersionKind,
        namespace: &str,
        name: &str,
    ) -> Result<Option<WorkloadResource>> {
        let api = self.dynamic_api(gvk, namespace).await?;
        Ok(api
            .get_opt(name)
            .await
            .context(error::KubeApiCallForSnafu {
                operation: format!("get {}", gvk.kind),
                name,
            })?
            .map(WorkloadResource::from))
    }

    async fn list_resources(
        &self,
        gvk: &GroupVersionKind,
        namespace: &str,
    ) -> Result<Vec<WorkloadResource>> {
        let api = self.dynamic_api(gvk, namespace).await?;
        Ok(api
            .list(&ListParams::default())
            .await
            .context(error::KubeApiCallSnafu {
                method: "list",
                what: format!("{}s in '{}'", gvk.kind, namespace),
            })?
            .items
            .into_iter()
            .map(WorkloadResource::from)
            .collect())
    }

    async fn create_or_update(
        &self,
        resource: &mut WorkloadResource,
        mutate: &MutateFn<'_>,
    ) -> Result<OperationResult> {
        let api = self.dynamic_api(&resource.gvk(), resource.namespace()).await?;
        let name = resource.name().to_owned();
        let live = api
            .get_opt(&name)
            .await
            .context(error::KubeApiCallForSnafu {
                operation: format!("get {}", resource.kind()),
                name: name.as_str(),
            })?;

        let mut live = match live {
            Some(live) => WorkloadResource::from(live),
            None => {
                mutate(&mut *resource).context(error::MutateSnafu { name: name.as_str() })?;
                let created = api
                    .create(&PostParams::default(), &DynamicObject::from(resource.clone()))
                    .await
                    .context(error::KubeApiCallForSnafu {
                        operation: format!("create {}", resource.kind()),
                        name: name.as_str(),
                    })?;
                *resource = created.into();
                return Ok(OperationResult::Created);
            }
        };

        let before = live.clone();
        mutate(&mut live).context(error::MutateSnafu { name: name.as_str() })?;
        if live == before {
            *resource = live;
            return Ok(OperationResult::Unchanged);
        }
        let updated = api
            .replace(&name, &PostParams::default(), &DynamicObject::from(live))
            .await
            .context(error::KubeApiCallForSnafu {
                operation: format!("update {}", resource.kind()),
                name: name.as_str(),
            })?;
        *resource = updated.into();
        Ok(OperationResult::Updated)
    }
}
