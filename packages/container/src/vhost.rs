//! Virtual host metadata.

use serde::{Deserialize, Serialize};

use crate::container::ApplicationContainer;

/// A domain-name-to-application-base mapping used to select which
/// application serves a given incoming host name.
///
/// Immutable after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualHost {
    name: String,
    app_base: String,
}

impl VirtualHost {
    /// Create a virtual host for the domain `name`, serving applications
    /// below `app_base`.
    pub fn new(name: &str, app_base: &str) -> Self {
        VirtualHost {
            name: name.to_string(),
            app_base: app_base.to_string(),
        }
    }

    /// The vhost's domain name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The vhost's base directory.
    pub fn app_base(&self) -> &str {
        &self.app_base
    }

    /// Whether `container` is the application this virtual host points at.
    ///
    /// Compares the base directory, trimmed of `/` separators, against the
    /// container name.
    pub fn matches(&self, container: &ApplicationContainer) -> bool {
        self.app_base.trim_matches('/') == container.name()
    }
}
