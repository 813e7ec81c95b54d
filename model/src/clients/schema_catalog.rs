use crate::clients::error::{self, Result};
use crate::schema::{BuiltinSchemaCatalog, SchemaCatalog};
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::{
    CustomResourceDefinition, JSONSchemaProps,
};
use kube::api::ListParams;
use kube::core::GroupVersionKind;
use kube::Api;
use log::trace;
use snafu::ResultExt;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

/// How long a looked up custom resource schema, or the absence of one, is reused.
const SCHEMA_TTL: Duration = Duration::from_secs(300);

/// A [`SchemaCatalog`] for everything that can run in the cluster: core workload kinds come from
/// the [`BuiltinSchemaCatalog`], custom kinds from the `openAPIV3Schema` of their
/// `CustomResourceDefinition`.
#[derive(Clone)]
pub struct ClusterSchemaCatalog {
    builtin: BuiltinSchemaCatalog,
    client: kube::Client,
    cache: Arc<SchemaCache>,
}

impl ClusterSchemaCatalog {
    pub fn new(client: kube::Client) -> Self {
        Self {
            builtin: BuiltinSchemaCatalog::default(),
            client,
            cache: Arc::new(SchemaCache::new(SCHEMA_TTL)),
        }
    }
}

#[async_trait::async_trait]
impl SchemaCatalog for ClusterSchemaCatalog {
    async fn schema(&self, gvk: &GroupVersionKind) -> Result<Option<JSONSchemaProps>> {
        if let Some(schema) = self.builtin.get(gvk) {
            return Ok(Some(schema.clone()));
        }
        if let Some(cached) = self.cache.get(gvk, Instant::now()) {
            return Ok(cached);
        }
        trace!(
            "looking up the custom resource definition for '{}/{} {}'",
            gvk.group,
            gvk.version,
            gvk.kind
        );
        let crds = Api::<CustomResourceDefinition>::all(self.client.clone())
            .list(&ListParams::default())
            .await
            .context(error::KubeApiCallSnafu {
                method: "list",
                what: "custom resource definitions",
            })?
            .items;
        let schema = crd_schema(&crds, gvk);
        self.cache.insert(gvk, schema.clone(), Instant::now());
        Ok(schema)
    }
}

type GvkKey = (String, String, String);

/// Custom resource schemas by kind. Entries expire after `ttl` so that definitions installed or
/// changed later are picked up.
#[derive(Debug)]
pub(crate) struct SchemaCache {
    ttl: Duration,
    entries: RwLock<HashMap<GvkKey, (Instant, Option<JSONSchemaProps>)>>,
}

impl SchemaCache {
    pub(crate) fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub(crate) fn get(
        &self,
        gvk: &GroupVersionKind,
        now: Instant,
    ) -> Option<Option<JSONSchemaProps>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(&key(gvk))
            .filter(|(fetched, _)| now.saturating_duration_since(*fetched) < self.ttl)
            .map(|(_, schema)| schema.clone())
    }

    pub(crate) fn insert(
        &self,
        gvk: &GroupVersionKind,
        schema: Option<JSONSchemaProps>,
        now: Instant,
    ) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key(gvk), (now, schema));
    }
}

fn key(gvk: &GroupVersionKind) -> GvkKey {
    (gvk.group.clone(), gvk.version.clone(), gvk.kind.clone())
}

/// Finds the schema for `gvk` among `crds`.
pub(crate) fn crd_schema(
    crds: &[CustomResourceDefinition],
    gvk: &GroupVersionKind,
) -> Option<JSONSchemaProps> {
    crds.iter()
        .filter(|crd| crd.spec.group == gvk.group && crd.spec.names.kind == gvk.kind)
        .flat_map(|crd| crd.spec.versions.iter())
        .find(|version| version.name == gvk.version)
        .and_then(|version| version.schema.as_ref())
        .and_then(|validation| validation.open_api_v3_schema.clone())
}
