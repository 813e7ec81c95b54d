/*!

Workload kinds keep their pod template in different places: a `Pod` has its containers at
`spec.containers` while a `Deployment` has them at `spec.template.spec.containers`. The
[`SchemaLocator`] looks at the structural schema of a kind and picks the first candidate path that
the schema accepts.

!*/

use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::JSONSchemaProps;
use kube::core::GroupVersionKind;
use log::{debug, trace};
use logsidecar_model::{field_schema, is_array, FieldPath, SchemaCatalog};

/// Decides whether the schema found at a candidate path is acceptable.
pub type Validator = fn(&JSONSchemaProps) -> bool;

/// A field path that may hold the array we are looking for, with the check that its schema must
/// pass.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub path: FieldPath,
    pub validator: Validator,
}

impl Candidate {
    /// A candidate that is accepted when its schema describes an array.
    pub fn array(fields: &[&str]) -> Self {
        Self {
            path: FieldPath::from(fields),
            validator: is_array,
        }
    }
}

fn candidates(field: &str) -> Vec<Candidate> {
    vec![
        Candidate::array(&["spec", field]),
        Candidate::array(&["spec", "template", "spec", field]),
        Candidate::array(&["spec", "jobTemplate", "spec", "template", "spec", field]),
    ]
}

/// Where `containers` arrays are found, in priority order.
pub fn containers_candidates() -> Vec<Candidate> {
    candidates("containers")
}

/// Where `volumes` arrays are found, in priority order.
pub fn volumes_candidates() -> Vec<Candidate> {
    candidates("volumes")
}

/// Returns the path of the first candidate whose schema exists and passes its validator.
pub fn select(schema: &JSONSchemaProps, candidates: &[Candidate]) -> Option<FieldPath> {
    candidates
        .iter()
        .find(|candidate| {
            field_schema(schema, &candidate.path)
                .map(|field| (candidate.validator)(field))
                .unwrap_or(false)
        })
        .map(|candidate| candidate.path.clone())
}

/// Finds fields in resources of any kind using the schemas of a [`SchemaCatalog`].
#[derive(Debug, Clone)]
pub struct SchemaLocator<C> {
    catalog: C,
}

impl<C> SchemaLocator<C>
where
    C: SchemaCatalog,
{
    pub fn new(catalog: C) -> Self {
        Self { catalog }
    }

    /// Returns the first path of `candidates` that holds an array in objects of `gvk`. A kind
    /// that the catalog does not know, or a catalog that cannot be reached, yields `None`.
    pub async fn locate(
        &self,
        gvk: &GroupVersionKind,
        candidates: &[Candidate],
    ) -> Option<FieldPath> {
        let schema = match self.catalog.schema(gvk).await {
            Ok(Some(schema)) => schema,
            Ok(None) => {
                debug!("No schema is known for kind '{}'", gvk.kind);
                return None;
            }
            Err(e) => {
                debug!("Unable to get the schema for kind '{}': {}", gvk.kind, e);
                return None;
            }
        };
        let found = select(&schema, candidates);
        trace!(
            "located {:?} in kind '{}'",
            found.as_ref().map(ToString::to_string),
            gvk.kind
        );
        found
    }
}
