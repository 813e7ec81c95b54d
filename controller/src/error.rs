use snafu::Snafu;

pub(crate) type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub(crate) enum Error {
    #[snafu(display(
        "Unable to add finalizer '{}' for logging trait '{}': {}",
        finalizer,
        trait_name,
        source
    ))]
    AddFinalizer {
        trait_name: String,
        finalizer: String,
        source: logsidecar_model::clients::Error,
    },

    #[snafu(display("Unable to delete logging trait '{}': {}", trait_name, source))]
    DeleteTrait {
        trait_name: String,
        source: logsidecar_model::clients::Error,
    },

    #[snafu(display("Environment variable '{}' must not be empty", key))]
    EnvEmpty { key: String },

    #[snafu(display(
        "Unable to parse environment variable '{}' value '{}': {}",
        key,
        value,
        source
    ))]
    EnvParseBool {
        key: String,
        value: String,
        source: std::str::ParseBoolError,
    },

    #[snafu(display(
        "Unable to parse environment variable '{}' value '{}': {}",
        key,
        value,
        source
    ))]
    EnvParseNaming {
        key: String,
        value: String,
        source: logsidecar_model::Error,
    },

    #[snafu(display("Unable to read environment variable: '{}': {}", key, source))]
    EnvRead {
        key: String,
        source: std::env::VarError,
    },

    #[snafu(display(
        "Unable to fetch workload {} '{}' of logging trait '{}': {}",
        kind,
        name,
        trait_name,
        source
    ))]
    FetchWorkload {
        trait_name: String,
        kind: String,
        name: String,
        source: logsidecar_model::clients::Error,
    },

    #[snafu(display(
        "Logging sidecar of '{}' could not be added to {} of its resources",
        trait_name,
        failures
    ))]
    Incomplete { trait_name: String, failures: usize },

    #[snafu(display("Unable to inject the logging sidecar of '{}': {}", trait_name, source))]
    Inject {
        trait_name: String,
        source: logsidecar_injector::Error,
    },

    #[snafu(display(
        "Unable to remove finalizer '{}' for logging trait '{}': {}",
        finalizer,
        trait_name,
        source
    ))]
    RemoveFinalizer {
        trait_name: String,
        finalizer: String,
        source: logsidecar_model::clients::Error,
    },

    #[snafu(display("Unable to set the status of logging trait '{}': {}", trait_name, source))]
    SetStatus {
        trait_name: String,
        source: logsidecar_model::clients::Error,
    },

    #[snafu(display(
        "Both '{}' and '{}' are needed for a storage volume, only '{}' is set",
        volume_key,
        mount_path_key,
        present
    ))]
    StorageIncomplete {
        volume_key: String,
        mount_path_key: String,
        present: String,
    },
}
