/*!

Structural schemas describe where fields live in objects of a given kind. We use the OpenAPI v3
schema model (`JSONSchemaProps`) because it is what `CustomResourceDefinition`s carry, and we
describe the core workload kinds in the same model so that both can be searched the same way.

!*/

use crate::clients::Result;
use crate::document::FieldPath;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::{
    JSONSchemaProps, JSONSchemaPropsOrArray,
};
use kube::core::GroupVersionKind;
use std::collections::BTreeMap;

/// Provides the structural schema of a kind.
#[async_trait::async_trait]
pub trait SchemaCatalog: Send + Sync {
    /// Returns the schema for objects of `gvk`, `None` if the kind is not known.
    async fn schema(&self, gvk: &GroupVersionKind) -> Result<Option<JSONSchemaProps>>;
}

/// Resolves the schema of the field at `path` by walking `properties`.
pub fn field_schema<'a>(
    schema: &'a JSONSchemaProps,
    path: &FieldPath,
) -> Option<&'a JSONSchemaProps> {
    path.fields()
        .iter()
        .try_fold(schema, |schema, field| schema.properties.as_ref()?.get(field))
}

/// Whether the schema describes an array.
pub fn is_array(schema: &JSONSchemaProps) -> bool {
    schema.type_.as_deref() == Some("array")
}

/// The schemas of the core workload kinds, reduced to the fields that matter for finding pod
/// templates.
#[derive(Debug, Clone)]
pub struct BuiltinSchemaCatalog {
    schemas: BTreeMap<(String, String, String), JSONSchemaProps>,
}

impl Default for BuiltinSchemaCatalog {
    fn default() -> Self {
        let mut schemas = BTreeMap::new();
        let mut insert = |group: &str, version: &str, kind: &str, schema: JSONSchemaProps| {
            schemas.insert(
                (group.to_owned(), version.to_owned(), kind.to_owned()),
                schema,
            );
        };
        // A pod has the same shape as a pod template.
        insert("", "v1", "Pod", pod_template_schema());
        insert("", "v1", "ReplicationController", template_schema());
        insert("apps", "v1", "Deployment", template_schema());
        insert("apps", "v1", "StatefulSet", template_schema());
        insert("apps", "v1", "ReplicaSet", template_schema());
        insert("apps", "v1", "DaemonSet", template_schema());
        insert("batch", "v1", "Job", template_schema());
        insert("batch", "v1", "CronJob", cron_job_schema());
        Self { schemas }
    }
}

impl BuiltinSchemaCatalog {
    pub fn get(&self, gvk: &GroupVersionKind) -> Option<&JSONSchemaProps> {
        self.schemas
            .get(&(gvk.group.clone(), gvk.version.clone(), gvk.kind.clone()))
    }
}

#[async_trait::async_trait]
impl SchemaCatalog for BuiltinSchemaCatalog {
    async fn schema(&self, gvk: &GroupVersionKind) -> Result<Option<JSONSchemaProps>> {
        Ok(self.get(gvk).cloned())
    }
}

fn typed(type_: &str) -> JSONSchemaProps {
    JSONSchemaProps {
        type_: Some(type_.to_owned()),
        ..JSONSchemaProps::default()
    }
}

fn object<I>(properties: I) -> JSONSchemaProps
where
    I: IntoIterator<Item = (&'static str, JSONSchemaProps)>,
{
    JSONSchemaProps {
        type_: Some("object".to_owned()),
        properties: Some(
            properties
                .into_iter()
                .map(|(name, schema)| (name.to_owned(), schema))
                .collect(),
        ),
        ..JSONSchemaProps::default()
    }
}

fn array_of(items: JSONSchemaProps) -> JSONSchemaProps {
    JSONSchemaProps {
        type_: Some("array".to_owned()),
        items: Some(JSONSchemaPropsOrArray::Schema(Box::new(items))),
        ..JSONSchemaProps::default()
    }
}

fn container_schema() -> JSONSchemaProps {
    object([
        ("name", typed("string")),
        ("image", typed("string")),
        ("env", array_of(typed("object"))),
        ("volumeMounts", array_of(typed("object"))),
    ])
}

fn pod_spec_schema() -> JSONSchemaProps {
    object([
        ("containers", array_of(container_schema())),
        ("initContainers", array_of(container_schema())),
        ("volumes", array_of(typed("object"))),
    ])
}

fn pod_template_schema() -> JSONSchemaProps {
    object([("metadata", typed("object")), ("spec", pod_spec_schema())])
}

/// Kinds that wrap a pod template at `spec.template`.
fn template_schema() -> JSONSchemaProps {
    object([
        ("metadata", typed("object")),
        (
            "spec",
            object([
                ("replicas", typed("integer")),
                ("selector", typed("object")),
                ("template", pod_template_schema()),
            ]),
        ),
    ])
}

fn cron_job_schema() -> JSONSchemaProps {
    object([
        ("metadata", typed("object")),
        (
            "spec",
            object([
                ("schedule", typed("string")),
                (
                    "jobTemplate",
                    object([("spec", object([("template", pod_template_schema())]))]),
                ),
            ]),
        ),
    ])
}

#[cfg(test)]
mod test {
    use super::*;

    fn path(fields: &[&str]) -> FieldPath {
        FieldPath::from(fields)
    }

    #[test]
    fn deployment_containers_are_under_the_template() {
        let catalog = BuiltinSchemaCatalog::default();
        let schema = catalog
            .get(&GroupVersionKind::gvk("apps", "v1", "Deployment"))
            .unwrap();
        let containers = field_schema(schema, &path(&["spec", "template", "spec", "containers"]));
        assert!(is_array(containers.unwrap()));
        assert!(field_schema(schema, &path(&["spec", "containers"])).is_none());
    }

    #[test]
    fn pod_containers_are_under_spec() {
        let catalog = BuiltinSchemaCatalog::default();
        let schema = catalog.get(&GroupVersionKind::gvk("", "v1", "Pod")).unwrap();
        assert!(is_array(
            field_schema(schema, &path(&["spec", "volumes"])).unwrap()
        ));
    }

    #[test]
    fn unknown_kind_has_no_schema() {
        let catalog = BuiltinSchemaCatalog::default();
        assert!(catalog
            .get(&GroupVersionKind::gvk("example.com", "v1", "Database"))
            .is_none());
    }

    #[test]
    fn scalar_is_not_an_array() {
        let catalog = BuiltinSchemaCatalog::default();
        let schema = catalog
            .get(&GroupVersionKind::gvk("apps", "v1", "StatefulSet"))
            .unwrap();
        assert!(!is_array(
            field_schema(schema, &path(&["spec", "replicas"])).unwrap()
        ));
    }

    #[tokio::test]
    async fn builtin_catalog_answers_through_the_trait() {
        let catalog: Box<dyn SchemaCatalog> = Box::new(BuiltinSchemaCatalog::default());
        let gvk = GroupVersionKind::gvk("batch", "v1", "CronJob");
        let schema = catalog.schema(&gvk).await.unwrap().unwrap();
        let containers = path(&["spec", "jobTemplate", "spec", "template", "spec", "containers"]);
        assert!(is_array(field_schema(&schema, &containers).unwrap()));
    }
}
