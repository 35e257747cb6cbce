//! Error types for the naming directory.

/// Errors surfaced by naming-directory lookups and binds.
///
/// All failures are synchronous and fatal to the calling operation; retry
/// policy, if any, belongs to the caller.
#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
pub enum NamingError {
    /// The name could not be resolved here or in any ancestor directory.
    #[error("cannot resolve '{path}' in naming directory '{directory}'")]
    NameNotFound { path: String, directory: String },

    /// Tried to bind through a segment that does not lead to a directory.
    #[error("cannot bind through '{segment}' in naming directory '{directory}'")]
    BindConflict { segment: String, directory: String },

    /// Identifier construction reached a parentless node without a scheme.
    #[error("missing scheme for naming directory '{name}'")]
    MissingScheme { name: String },

    /// A bound callback reported a failure.
    #[error("callback bound to '{name}' failed: {message}")]
    Callback { name: String, message: String },

    /// A subdirectory filter pattern did not compile.
    #[error("invalid filter pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },
}

impl NamingError {
    /// Shorthand for reporting a callback failure.
    pub fn callback(name: impl Into<String>, message: impl Into<String>) -> Self {
        NamingError::Callback {
            name: name.into(),
            message: message.into(),
        }
    }
}
