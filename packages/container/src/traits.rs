//! Capability traits consumed from collaborators.
//!
//! Managers, class loaders and the initial context are implemented by the
//! surrounding deployment; the container only drives them through these
//! seams. Collaborator failures are plain messages at the seam and are
//! wrapped into typed errors by the container at the call site.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use appcell_naming::Value;

use crate::container::ApplicationContainer;

/// A component manager hosted by an application container.
pub trait Manager: Send + Sync {
    /// The manager's unique identifier, also its lookup name in the
    /// container's directory.
    fn identifier(&self) -> &str;

    /// Invoked by the container worker during startup, before the
    /// container signals readiness. The container calls this exactly once
    /// per startup; idempotency is not required.
    fn initialize(&self, container: &ApplicationContainer) -> Result<(), String>;
}

/// A class loader registered by the container worker during startup.
pub trait ClassLoader: Send + Sync {
    /// Install the loader.
    fn register(&self, prepend: bool, fail_on_conflict: bool) -> Result<(), String>;
}

/// Service locator supplied by the surrounding deployment.
pub trait InitialContext: Send + Sync {
    /// Construct a new instance of the named type.
    fn new_instance(&self, name: &str, args: &[Value]) -> Result<Value, String>;

    /// Return the named service.
    fn new_service(&self, name: &str) -> Result<Value, String>;
}

/// An initial context that rejects every request.
///
/// Useful as a placeholder for containers that never instantiate
/// services.
pub struct NullContext;

impl InitialContext for NullContext {
    fn new_instance(&self, name: &str, _args: &[Value]) -> Result<Value, String> {
        Err(format!("no initial context to instantiate '{}'", name))
    }

    fn new_service(&self, name: &str) -> Result<Value, String> {
        Err(format!("no initial context to locate service '{}'", name))
    }
}

/// Additional lookup names a manager is reachable by.
///
/// The primary identifier is always bound on the container's own
/// directory; `local_aliases` join it there, while `global_aliases` are
/// bound on the shared root so other applications can resolve the manager
/// too.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagerConfig {
    #[serde(default)]
    pub local_aliases: Vec<String>,
    #[serde(default)]
    pub global_aliases: Vec<String>,
}

/// Recover a manager handle from a naming-directory lookup result.
///
/// Manager lookups resolve through a bound callback that wraps the live
/// handle as an opaque [`Value::Object`]; this unwraps it again.
pub fn manager_from_value(value: &Value) -> Option<Arc<dyn Manager>> {
    value
        .downcast::<Arc<dyn Manager>>()
        .map(|manager| (*manager).clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_context_rejects_everything() {
        let context = NullContext;
        assert!(context.new_instance("Example", &[]).is_err());
        assert!(context.new_service("Example").is_err());
    }

    #[test]
    fn manager_config_defaults_to_no_aliases() {
        let config: ManagerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, ManagerConfig::default());
    }

    #[test]
    fn manager_config_json_round_trip() {
        let config = ManagerConfig {
            local_aliases: vec!["SessionInterface".to_string()],
            global_aliases: vec!["global/session".to_string()],
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: ManagerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }

    #[test]
    fn manager_from_value_rejects_plain_values() {
        assert!(manager_from_value(&Value::from("not a manager")).is_none());
        assert!(manager_from_value(&Value::Null).is_none());
    }
}
