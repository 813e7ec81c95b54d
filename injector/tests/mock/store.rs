use k8s_openapi::api::core::v1::ConfigMap;
use kube::core::GroupVersionKind;
use kube::ResourceExt;
use logsidecar_model::clients::{Error, MutateFn, OperationResult, ResourceStore, Result};
use logsidecar_model::WorkloadResource;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

type ResourceKey = (String, String, String, String);

#[derive(Default)]
struct State {
    config_maps: BTreeMap<(String, String), ConfigMap>,
    resources: BTreeMap<ResourceKey, WorkloadResource>,
    failing: BTreeSet<String>,
    config_map_creates: usize,
    config_map_updates: usize,
    resource_writes: usize,
}

/// An in-memory [`ResourceStore`]. Clones share their state so that a test can look at what the
/// injector wrote.
#[derive(Clone, Default)]
pub(crate) struct MockStore {
    state: Arc<Mutex<State>>,
}

fn key(gvk: &GroupVersionKind, namespace: &str, name: &str) -> ResourceKey {
    (
        gvk.group.clone(),
        gvk.kind.clone(),
        namespace.to_owned(),
        name.to_owned(),
    )
}

fn resource_key(resource: &WorkloadResource) -> ResourceKey {
    key(&resource.gvk(), resource.namespace(), resource.name())
}

impl MockStore {
    pub(crate) fn insert(&self, resource: WorkloadResource) {
        let mut state = self.state.lock().unwrap();
        state.resources.insert(resource_key(&resource), resource);
    }

    pub(crate) fn resource(&self, resource: &WorkloadResource) -> WorkloadResource {
        let state = self.state.lock().unwrap();
        state.resources[&resource_key(resource)].clone()
    }

    pub(crate) fn config_map(&self, name: &str) -> Option<ConfigMap> {
        let state = self.state.lock().unwrap();
        state
            .config_maps
            .get(&(super::NAMESPACE.to_owned(), name.to_owned()))
            .cloned()
    }

    pub(crate) fn config_map_count(&self) -> usize {
        self.state.lock().unwrap().config_maps.len()
    }

    pub(crate) fn config_map_creates(&self) -> usize {
        self.state.lock().unwrap().config_map_creates
    }

    pub(crate) fn config_map_updates(&self) -> usize {
        self.state.lock().unwrap().config_map_updates
    }

    pub(crate) fn resource_writes(&self) -> usize {
        self.state.lock().unwrap().resource_writes
    }

    /// Makes `create_or_update` fail for resources called `name`.
    pub(crate) fn fail_writes_to(&self, name: &str) {
        self.state.lock().unwrap().failing.insert(name.to_owned());
    }
}

#[async_trait::async_trait]
impl ResourceStore for MockStore {
    async fn list_config_maps(&self, namespace: &str, name: &str) -> Result<Vec<ConfigMap>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .config_maps
            .get(&(namespace.to_owned(), name.to_owned()))
            .cloned()
            .into_iter()
            .collect())
    }

    async fn create_config_map(&self, config_map: &ConfigMap) -> Result<ConfigMap> {
        let mut state = self.state.lock().unwrap();
        let key = (config_map.namespace().unwrap_or_default(), config_map.name_any());
        if state.config_maps.contains_key(&key) {
            return Err(Error::store(format!("config map '{}' exists", key.1)));
        }
        state.config_map_creates += 1;
        state.config_maps.insert(key, config_map.clone());
        Ok(config_map.clone())
    }

    async fn update_config_map(&self, config_map: &ConfigMap) -> Result<ConfigMap> {
        let mut state = self.state.lock().unwrap();
        let key = (config_map.namespace().unwrap_or_default(), config_map.name_any());
        if !state.config_maps.contains_key(&key) {
            return Err(Error::store(format!("config map '{}' not found", key.1)));
        }
        state.config_map_updates += 1;
        state.config_maps.insert(key, config_map.clone());
        Ok(config_map.clone())
    }

    async fn delete_config_map(&self, namespace: &str, name: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state
            .config_maps
            .remove(&(namespace.to_owned(), name.to_owned()));
        Ok(())
    }

    async fn get_resource(
        &self,
        gvk: &GroupVersionKind,
        namespace: &str,
        name: &str,
    ) -> Result<Option<WorkloadResource>> {
        let state = self.state.lock().unwrap();
        Ok(state.resources.get(&key(gvk, namespace, name)).cloned())
    }

    async fn list_resources(
        &self,
        gvk: &GroupVersionKind,
        namespace: &str,
    ) -> Result<Vec<WorkloadResource>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .resources
            .iter()
            .filter(|((group, kind, ns, _), _)| {
                group == &gvk.group && kind == &gvk.kind && ns == namespace
            })
            .map(|(_, resource)| resource.clone())
            .collect())
    }

    async fn create_or_update(
        &self,
        resource: &mut WorkloadResource,
        mutate: &MutateFn<'_>,
    ) -> Result<OperationResult> {
        let mut state = self.state.lock().unwrap();
        if state.failing.contains(resource.name()) {
            return Err(Error::store(format!("{} is read-only", resource)));
        }
        let key = resource_key(resource);
        let result = match state.resources.get(&key).cloned() {
            Some(live) => {
                let mut updated = live.clone();
                mutate(&mut updated).map_err(|e| Error::store(e.to_string()))?;
                let result = if updated == live {
                    OperationResult::Unchanged
                } else {
                    OperationResult::Updated
                };
                *resource = updated;
                result
            }
            None => {
                mutate(&mut *resource).map_err(|e| Error::store(e.to_string()))?;
                OperationResult::Created
            }
        };
        if result != OperationResult::Unchanged {
            state.resource_writes += 1;
        }
        state.resources.insert(key, resource.clone());
        Ok(result)
    }
}
