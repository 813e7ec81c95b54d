use snafu::Snafu;

#[derive(Debug, Snafu)]
pub struct Error(OpaqueError);
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub(crate) enum OpaqueError {
    #[snafu(display("Unable to convert dynamic object: {}", source))]
    DynamicObject { source: serde_json::Error },

    #[snafu(display(
        "Config files are mounted as the directory of '{}', which has none",
        mount_path
    ))]
    ConfigDirectory { mount_path: String },

    #[snafu(display(
        "Config files are mounted at '{}' but none of them is named '{}'",
        directory,
        file
    ))]
    MissingEntryFile { directory: String, file: String },

    #[snafu(display("Parse error: {}", source))]
    SerdePlain { source: serde_plain::Error },

    #[snafu(display(
        "Unable to read '{}' at index {}: expected {} but found {}",
        path,
        index,
        expected,
        found
    ))]
    StructuralEntry {
        path: String,
        index: usize,
        expected: &'static str,
        found: &'static str,
    },

    #[snafu(display("Unable to read '{}': expected {} but found {}", path, expected, found))]
    StructuralRead {
        path: String,
        expected: &'static str,
        found: &'static str,
    },
}

impl Error {
    /// Whether this error was raised because a live document did not have the shape its schema
    /// promised.
    pub fn is_structural(&self) -> bool {
        matches!(
            self.0,
            OpaqueError::StructuralRead { .. } | OpaqueError::StructuralEntry { .. }
        )
    }
}
