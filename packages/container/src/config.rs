//! Container configuration.
//!
//! Mirrors what the surrounding deployment loads from its system
//! configuration: the worker heartbeat, the naming scheme and the
//! reserved environment entries. Configuration *loading* itself lives
//! outside this crate; these structs are the shape it produces.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use appcell_naming::{BoundValue, NamingDirectory, NamingError, Value};

/// Reserved environment entries are bound under this segment of the root.
pub const ENV_DIRECTORY: &str = "env";

/// Tunables for one application container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerConfig {
    /// Re-check interval for the startup wait and the idle heartbeat, in
    /// seconds.
    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_secs: u64,
    /// Scheme of the naming-directory root.
    #[serde(default = "default_scheme")]
    pub scheme: String,
    /// Reserved environment entries, when the deployment provides them.
    #[serde(default)]
    pub environment: Option<Environment>,
}

impl ContainerConfig {
    /// The heartbeat interval as a duration.
    pub fn heartbeat(&self) -> Duration {
        Duration::from_secs(self.heartbeat_secs)
    }
}

impl Default for ContainerConfig {
    fn default() -> Self {
        ContainerConfig {
            heartbeat_secs: default_heartbeat_secs(),
            scheme: default_scheme(),
            environment: None,
        }
    }
}

fn default_heartbeat_secs() -> u64 {
    1
}

fn default_scheme() -> String {
    "php".to_string()
}

/// The reserved `env/*` values consumed by the container's accessors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    /// The server's base directory, e.g. `/opt/appserver`.
    pub base_directory: String,
    /// The web application base directory, e.g. `/opt/appserver/webapps`.
    pub app_base: String,
    /// The user applications run as.
    pub user: String,
    /// The group applications run as.
    pub group: String,
    /// The umask applications create files with.
    pub umask: String,
}

impl Environment {
    /// Bind the reserved entries on `root`: `env/baseDirectory`,
    /// `env/appBase`, `env/user`, `env/group`, `env/umask` and
    /// `env/<app_name>/tmpDirectory`.
    ///
    /// Existing `env` and `env/<app_name>` sub-directories are reused.
    pub fn apply(&self, root: &NamingDirectory, app_name: &str) -> Result<(), NamingError> {
        let env = subdirectory(root, ENV_DIRECTORY)?;
        env.bind("baseDirectory", Value::from(self.base_directory.as_str()))?;
        env.bind("appBase", Value::from(self.app_base.as_str()))?;
        env.bind("user", Value::from(self.user.as_str()))?;
        env.bind("group", Value::from(self.group.as_str()))?;
        env.bind("umask", Value::from(self.umask.as_str()))?;

        let app = subdirectory(&env, app_name)?;
        app.bind(
            "tmpDirectory",
            Value::from(format!("{}/var/tmp/{}", self.base_directory, app_name)),
        )?;
        Ok(())
    }
}

/// Get the sub-directory bound under `name`, creating it when absent.
fn subdirectory(parent: &NamingDirectory, name: &str) -> Result<NamingDirectory, NamingError> {
    match parent.get_attribute(name) {
        Some(BoundValue::Directory(directory)) => Ok(directory),
        _ => parent.create_subdirectory(name, &[]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn environment() -> Environment {
        Environment {
            base_directory: "/opt/appserver".to_string(),
            app_base: "/opt/appserver/webapps".to_string(),
            user: "www-data".to_string(),
            group: "www-data".to_string(),
            umask: "0002".to_string(),
        }
    }

    #[test]
    fn defaults_from_empty_json() {
        let config: ContainerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.heartbeat_secs, 1);
        assert_eq!(config.scheme, "php");
        assert!(config.environment.is_none());
        assert_eq!(config.heartbeat(), Duration::from_secs(1));
    }

    #[test]
    fn json_round_trip() {
        let config = ContainerConfig {
            heartbeat_secs: 5,
            scheme: "web".to_string(),
            environment: Some(environment()),
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: ContainerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }

    #[test]
    fn apply_binds_reserved_entries() {
        let root = NamingDirectory::root("php", "global");
        environment().apply(&root, "foo").unwrap();

        assert_eq!(
            root.search("php:env/baseDirectory", &[]).unwrap(),
            Value::from("/opt/appserver")
        );
        assert_eq!(
            root.search("php:env/user", &[]).unwrap(),
            Value::from("www-data")
        );
        assert_eq!(
            root.search("php:env/foo/tmpDirectory", &[]).unwrap(),
            Value::from("/opt/appserver/var/tmp/foo")
        );
    }

    #[test]
    fn apply_reuses_an_existing_env_directory() {
        let root = NamingDirectory::root("php", "global");
        let env = root.create_subdirectory(ENV_DIRECTORY, &[]).unwrap();
        env.bind("extra", Value::from("kept")).unwrap();

        environment().apply(&root, "foo").unwrap();

        assert_eq!(root.search("php:env/extra", &[]).unwrap(), Value::from("kept"));
        assert_eq!(
            root.search("php:env/umask", &[]).unwrap(),
            Value::from("0002")
        );
    }
}
