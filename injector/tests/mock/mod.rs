/*!

Mock implementations of [`ResourceStore`] and [`SchemaCatalog`] so that the injector can be tested
without Kubernetes.

!*/

pub(crate) mod catalog;
pub(crate) mod store;

use logsidecar_model::{LoggingTrait, LoggingTraitSpec, WorkloadReference, WorkloadResource};
use serde_json::{json, Value};

pub(crate) const NAMESPACE: &str = "shop";

pub(crate) fn logging_trait(spec: LoggingTraitSpec) -> LoggingTrait {
    let mut logging_trait = LoggingTrait::new("logs", spec);
    logging_trait.metadata.namespace = Some(NAMESPACE.to_owned());
    logging_trait
}

pub(crate) fn trait_spec(kind: &str, name: &str) -> LoggingTraitSpec {
    LoggingTraitSpec {
        workload_ref: WorkloadReference {
            api_version: "apps/v1".to_owned(),
            kind: kind.to_owned(),
            name: name.to_owned(),
        },
        logging_image: Some("fluentd:1".to_owned()),
        logging_config: Some("<match **>\n  @type stdout\n</match>".to_owned()),
        ..LoggingTraitSpec::default()
    }
}

pub(crate) fn resource(api_version: &str, kind: &str, name: &str, spec: Value) -> WorkloadResource {
    WorkloadResource::from_value(json!({
        "apiVersion": api_version,
        "kind": kind,
        "metadata": {
            "name": name,
            "namespace": NAMESPACE,
            "uid": format!("uid-{}", name),
            "labels": {"app.oam.dev/name": "shop", "app.oam.dev/component": name}
        },
        "spec": spec
    }))
    .unwrap()
}

pub(crate) fn pod(name: &str, spec: Value) -> WorkloadResource {
    resource("v1", "Pod", name, spec)
}

pub(crate) fn deployment(name: &str, containers: Value) -> WorkloadResource {
    resource(
        "apps/v1",
        "Deployment",
        name,
        json!({
            "replicas": 2,
            "selector": {"matchLabels": {"app": name}},
            "template": {
                "metadata": {"labels": {"app": name}},
                "spec": {"containers": containers}
            }
        }),
    )
}
