/*!

The logging sidecar injector. Given workload resources of any kind it finds where their pod
template keeps `containers` and `volumes`, merges a logging sidecar into those arrays, keeps the
sidecar's configuration `ConfigMap` in sync and writes the resources back. The inverse operation
removes everything again.

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

pub use apply::{ApplyReport, Injector, RemoveReport, RemovedTarget, TargetFailure};
pub use artifact::{ArtifactBuilder, SidecarArtifact, StorageArtifact};
pub use config_artifact::ConfigArtifactManager;
pub use error::{Error, Result};
pub use locator::{containers_candidates, volumes_candidates, Candidate, SchemaLocator};
pub use merge::{ConflictWarning, MergeOutcome};

mod apply;
mod artifact;
mod config_artifact;
mod error;
mod locator;
pub mod merge;
