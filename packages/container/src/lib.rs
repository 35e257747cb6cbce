//! appcell container: per-application runtime registry and lifecycle.
//!
//! An [`ApplicationContainer`] holds everything the runtime knows about
//! one deployed application:
//! - the registries for managers, class loaders and virtual hosts
//! - the application's node in the shared naming directory
//! - the worker that performs startup registration and then idles as the
//!   application's live unit of execution
//!
//! Deployment code constructs a container, populates the registries, then
//! calls [`ApplicationContainer::connect`], which blocks until the worker
//! has registered every class loader and initialized every manager. From
//! that point on the registries and the naming directory may be used from
//! any thread.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use appcell_container::{ApplicationContainer, NamingDirectory, NullContext, VirtualHost};
//!
//! let root = NamingDirectory::root("php", "global");
//! let app = ApplicationContainer::new("foo", root, Arc::new(NullContext));
//! app.add_virtual_host(VirtualHost::new("test.local", "/foo")).unwrap();
//!
//! app.connect().unwrap();
//! assert!(app.is_vhost_of("test.local"));
//! ```

mod config;
mod container;
mod error;
mod traits;
mod vhost;

pub use config::{ContainerConfig, Environment, ENV_DIRECTORY};
pub use container::{
    ApplicationContainer, Lifecycle, CACHE_DIRECTORY, DEFAULT_HEARTBEAT, SESSION_DIRECTORY,
};
pub use error::Error;
pub use traits::{
    manager_from_value, ClassLoader, InitialContext, Manager, ManagerConfig, NullContext,
};
pub use vhost::VirtualHost;

// Re-export the naming layer for convenience
pub use appcell_naming::{BoundValue, Callback, NamingDirectory, NamingError, Value};
