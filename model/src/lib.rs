/*!

This library provides the `LoggingTrait` custom resource definition, the structural model used to
edit workloads of any kind, and the clients that read and write them in the cluster.

!*/

#![deny(
    clippy::expect_used,
    clippy::get_unwrap,
    clippy::panic,
    clippy::panic_in_result_fn,
    clippy::panicking_unwrap,
    clippy::unwrap_in_result,
    clippy::unwrap_used
)]

pub use crd_ext::CrdExt;
pub use document::{entry_name, Document, FieldPath};
pub use error::{Error, Result};
pub use logging_config::{
    ConfigMount, ConfigNaming, LoggingConfig, RenderedConfig, StorageVolume,
};
pub use logging_trait::{
    InjectedResource, LoggingTrait, LoggingTraitSpec, LoggingTraitStatus, TargetKind,
    WorkloadReference,
};
pub use schema::{field_schema, is_array, BuiltinSchemaCatalog, SchemaCatalog};
pub use workload::{split_api_version, WorkloadResource};

pub mod clients;
pub mod constants;
mod crd_ext;
mod document;
mod error;
mod logging_config;
mod logging_trait;
mod schema;
mod schema_utils;
mod workload;
