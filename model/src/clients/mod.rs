mod error;
mod http_status_code;
mod schema_catalog;
mod store;
mod trait_client;

pub use error::{Error, Result};
pub use http_status_code::{HttpStatusCode, StatusCode};
pub use schema_catalog::ClusterSchemaCatalog;
pub use store::{KubeStore, MutateFn, OperationResult, ResourceStore};
pub use trait_client::{JsonPatch, TraitClient};
