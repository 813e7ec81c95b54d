use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::JSONSchemaProps;
use kube::core::GroupVersionKind;
use logsidecar_model::clients::Result;
use logsidecar_model::{BuiltinSchemaCatalog, SchemaCatalog};
use serde_json::json;

/// Knows the core workload kinds plus an `example.com/v1 Database` custom resource that keeps its
/// containers directly under `spec` and has no volumes.
#[derive(Default)]
pub(crate) struct MockCatalog {
    builtin: BuiltinSchemaCatalog,
}

pub(crate) fn database_gvk() -> GroupVersionKind {
    GroupVersionKind::gvk("example.com", "v1", "Database")
}

fn database_schema() -> JSONSchemaProps {
    serde_json::from_value(json!({
        "type": "object",
        "properties": {"spec": {
            "type": "object",
            "properties": {
                "containers": {"type": "array", "items": {"type": "object"}},
                "storageSize": {"type": "string"}
            }
        }}
    }))
    .unwrap()
}

#[async_trait::async_trait]
impl SchemaCatalog for MockCatalog {
    async fn schema(&self, gvk: &GroupVersionKind) -> Result<Option<JSONSchemaProps>> {
        if gvk == &database_gvk() {
            return Ok(Some(database_schema()));
        }
        Ok(self.builtin.get(gvk).cloned())
    }
}
