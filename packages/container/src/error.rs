//! Error types for the application container.

use std::time::Duration;

use appcell_naming::NamingError;

/// Errors surfaced by container operations.
///
/// `Clone` so the worker thread can park a startup failure in the shared
/// lifecycle state and every waiter in `connect` observes the same error.
#[derive(thiserror::Error, Clone, Debug)]
pub enum Error {
    /// A naming-directory operation failed.
    #[error(transparent)]
    Naming(#[from] NamingError),

    /// A class loader refused to register; aborts startup.
    #[error("class loader registration failed: {message}")]
    ClassLoader { message: String },

    /// A manager failed to initialize; aborts startup.
    #[error("manager '{identifier}' failed to initialize: {message}")]
    Manager { identifier: String, message: String },

    /// Registry mutation after the worker was started.
    #[error("container '{name}' is already started: cannot {operation}")]
    AlreadyStarted { name: String, operation: String },

    /// `connect_timeout` gave up; the container stays in `Starting`.
    #[error("container '{name}' did not become ready within {waited:?}")]
    StartupTimeout { name: String, waited: Duration },

    /// The worker could not be started.
    #[error("container startup failed: {message}")]
    Startup { message: String },

    /// The initial context rejected a request.
    #[error("initial context failure: {message}")]
    Context { message: String },

    /// A reserved environment entry resolved to the wrong kind of value.
    #[error("unexpected value at '{path}': expected {expected}")]
    UnexpectedValue { path: String, expected: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn naming_errors_convert() {
        let naming = NamingError::MissingScheme {
            name: "global".to_string(),
        };
        let error: Error = naming.clone().into();
        assert!(matches!(error, Error::Naming(e) if e == naming));
    }

    #[test]
    fn manager_display_names_the_culprit() {
        let error = Error::Manager {
            identifier: "SessionManager".to_string(),
            message: "no backing store".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("SessionManager"));
        assert!(display.contains("no backing store"));
    }

    #[test]
    fn already_started_display() {
        let error = Error::AlreadyStarted {
            name: "foo".to_string(),
            operation: "add manager".to_string(),
        };
        assert!(format!("{}", error).contains("cannot add manager"));
    }

    #[test]
    fn timeout_display_mentions_the_wait() {
        let error = Error::StartupTimeout {
            name: "foo".to_string(),
            waited: Duration::from_secs(3),
        };
        assert!(format!("{}", error).contains("3s"));
    }
}
