use crate::clients::{HttpStatusCode, StatusCode};
use crate::Error as ModelError;
use snafu::Snafu;

/// The `Result` type returned by `clients`.
pub type Result<T> = std::result::Result<T, Error>;

/// The public error type returned by `clients`.
#[derive(Debug, Snafu)]
pub struct Error(InnerError);

/// The private error type returned by `clients`.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(super)))]
pub(crate) enum InnerError {
    #[snafu(display("Unable to discover the API resource for '{}': {}", kind, source))]
    Discovery { kind: String, source: kube::Error },

    #[snafu(display("Unable to {} {}: {}", method, what, source))]
    KubeApiCall {
        method: String,
        what: String,
        source: kube::Error,
    },

    #[snafu(display("Unable to {} for '{}': {}", operation, name, source))]
    KubeApiCallFor {
        /// What we were trying to do, e.g. 'add finalizer'.
        operation: String,
        /// The name of the k8s object we were trying to do this for, e.g. 'my-trait'.
        name: String,
        /// The error from kube-rs.
        source: kube::Error,
    },

    #[snafu(display("Unable to apply changes to '{}': {}", name, source))]
    Mutate { name: String, source: ModelError },

    #[snafu(display("{}", message))]
    Store { message: String },

    #[snafu(display(
        "An attempt was made to add the finalizer '{}' more than once",
        finalizer,
    ))]
    DuplicateFinalizer { finalizer: String },

    #[snafu(display(
        "An attempt was made to delete the non-existant finalizer '{}'",
        finalizer,
    ))]
    DeleteMissingFinalizer { finalizer: String },
}

impl Error {
    /// An error raised by a [`ResourceStore`](crate::clients::ResourceStore) that is not backed by
    /// the Kubernetes API.
    pub fn store<S: Into<String>>(message: S) -> Self {
        InnerError::Store {
            message: message.into(),
        }
        .into()
    }
}

impl HttpStatusCode for InnerError {
    fn status_code(&self) -> Option<StatusCode> {
        match self {
            InnerError::Discovery { source: e, .. }
            | InnerError::KubeApiCall { source: e, .. }
            | InnerError::KubeApiCallFor { source: e, .. } => e.status_code(),
            InnerError::Mutate { .. }
            | InnerError::Store { .. }
            | InnerError::DuplicateFinalizer { .. }
            | InnerError::DeleteMissingFinalizer { .. } => None,
        }
    }
}

impl HttpStatusCode for Error {
    fn status_code(&self) -> Option<StatusCode> {
        self.0.status_code()
    }
}
