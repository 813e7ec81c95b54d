use snafu::Snafu;

pub type Result<T> = std::result::Result<T, Error>;

/// The errors returned by the sidecar injector.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display(
        "None of the resources of logging trait '{}' has a containers or volumes field",
        trait_name
    ))]
    NotApplicable { trait_name: String },

    #[snafu(display("Invalid logging configuration for {}: {}", resource, source))]
    InvalidConfig {
        resource: String,
        source: logsidecar_model::Error,
    },

    #[snafu(display("Unable to read the structure of {}: {}", resource, source))]
    StructuralRead {
        resource: String,
        source: logsidecar_model::Error,
    },

    #[snafu(display("Unable to convert {} for {}: {}", what, resource, source))]
    Serialize {
        what: &'static str,
        resource: String,
        source: serde_json::Error,
    },

    #[snafu(display("Unable to {} for {}: {}", operation, resource, source))]
    Store {
        operation: String,
        resource: String,
        source: logsidecar_model::clients::Error,
    },
}

impl Error {
    /// Whether the error means that the workload cannot carry a logging sidecar at all.
    pub fn is_not_applicable(&self) -> bool {
        matches!(self, Error::NotApplicable { .. })
    }
}
