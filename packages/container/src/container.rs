//! The per-application container: registries and execution lifecycle.
//!
//! An `ApplicationContainer` tracks the live components of one deployed
//! application — managers, class loaders, virtual hosts — and fronts the
//! naming directory every component binds into. `connect` starts a
//! dedicated worker thread that registers class loaders and initializes
//! managers before signalling readiness; afterwards the worker idles on a
//! heartbeat tick so the application remains a live, addressable unit of
//! execution for the surrounding supervisor.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::{Condvar, Mutex, RwLock};

use appcell_naming::{Callback, NamingDirectory, NamingError, Value};

use crate::config::ContainerConfig;
use crate::error::Error;
use crate::traits::{ClassLoader, InitialContext, Manager, ManagerConfig};
use crate::vhost::VirtualHost;

/// Default re-check interval for startup waits and the idle heartbeat.
pub const DEFAULT_HEARTBEAT: Duration = Duration::from_secs(1);

/// Directory segment for the session store below the tmp directory.
pub const SESSION_DIRECTORY: &str = "session";

/// Directory segment for the cache store below the tmp directory.
pub const CACHE_DIRECTORY: &str = "cache";

/// Observable lifecycle states of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Registries may be populated; the worker has not started.
    Created,
    /// The worker is registering class loaders and initializing managers.
    Starting,
    /// Startup finished; registries are safe to use from any thread.
    Ready,
    /// The worker heartbeats, waiting for process shutdown.
    Idle,
    /// Startup aborted; `connect` reports the error.
    Failed,
}

enum LifecycleState {
    Created,
    Starting,
    Ready,
    Idle,
    Failed(Error),
}

impl LifecycleState {
    fn snapshot(&self) -> Lifecycle {
        match self {
            LifecycleState::Created => Lifecycle::Created,
            LifecycleState::Starting => Lifecycle::Starting,
            LifecycleState::Ready => Lifecycle::Ready,
            LifecycleState::Idle => Lifecycle::Idle,
            LifecycleState::Failed(_) => Lifecycle::Failed,
        }
    }
}

struct Inner {
    name: String,
    naming_directory: NamingDirectory,
    directory: NamingDirectory,
    initial_context: Arc<dyn InitialContext>,
    managers: DashMap<String, Arc<dyn Manager>>,
    class_loaders: RwLock<Vec<Arc<dyn ClassLoader>>>,
    virtual_hosts: RwLock<Vec<VirtualHost>>,
    heartbeat: Duration,
    lifecycle: Mutex<LifecycleState>,
    connected: Condvar,
    shutdown: AtomicBool,
    worker: Mutex<Option<JoinHandle<()>>>,
}

/// Handle to one deployed application's runtime state.
///
/// Clones share the same container; the worker thread and any number of
/// caller threads may each hold one.
#[derive(Clone)]
pub struct ApplicationContainer {
    inner: Arc<Inner>,
}

impl ApplicationContainer {
    /// Create a container named `name`.
    ///
    /// Lookups that are not bound on the container's own directory fall
    /// back to the shared `naming_directory`; the container's bindings
    /// stay private to it.
    pub fn new(
        name: &str,
        naming_directory: NamingDirectory,
        initial_context: Arc<dyn InitialContext>,
    ) -> Self {
        Self::with_heartbeat(name, naming_directory, initial_context, DEFAULT_HEARTBEAT)
    }

    /// Create a container tuned by `config`.
    pub fn with_config(
        name: &str,
        naming_directory: NamingDirectory,
        initial_context: Arc<dyn InitialContext>,
        config: &ContainerConfig,
    ) -> Self {
        Self::with_heartbeat(name, naming_directory, initial_context, config.heartbeat())
    }

    fn with_heartbeat(
        name: &str,
        naming_directory: NamingDirectory,
        initial_context: Arc<dyn InitialContext>,
        heartbeat: Duration,
    ) -> Self {
        let directory = NamingDirectory::child_of(&naming_directory, name);
        ApplicationContainer {
            inner: Arc::new(Inner {
                name: name.to_string(),
                naming_directory,
                directory,
                initial_context,
                managers: DashMap::new(),
                class_loaders: RwLock::new(Vec::new()),
                virtual_hosts: RwLock::new(Vec::new()),
                heartbeat,
                lifecycle: Mutex::new(LifecycleState::Created),
                connected: Condvar::new(),
                shutdown: AtomicBool::new(false),
                worker: Mutex::new(None),
            }),
        }
    }

    /// The unique application name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The container's own directory node.
    pub fn directory(&self) -> &NamingDirectory {
        &self.inner.directory
    }

    /// The shared naming-directory root.
    pub fn naming_directory(&self) -> &NamingDirectory {
        &self.inner.naming_directory
    }

    /// Snapshot of the lifecycle state.
    pub fn state(&self) -> Lifecycle {
        self.inner.lifecycle.lock().snapshot()
    }

    // --- naming delegation ---

    /// Resolve `name` against the container's directory, falling back to
    /// the shared root.
    pub fn search(&self, name: &str, args: &[Value]) -> Result<Value, Error> {
        Ok(self.inner.directory.search(name, args)?)
    }

    /// Bind `value` on the container's directory.
    pub fn bind(&self, name: &str, value: Value) -> Result<(), Error> {
        Ok(self.inner.directory.bind(name, value)?)
    }

    /// Bind a callback on the container's directory.
    pub fn bind_callback(
        &self,
        name: &str,
        callback: Callback,
        bound_args: Vec<Value>,
    ) -> Result<(), Error> {
        Ok(self
            .inner
            .directory
            .bind_callback(name, callback, bound_args)?)
    }

    // --- registries ---

    /// Register `manager` under its identifier.
    ///
    /// The identifier is also bound on the container's directory as a
    /// callback resolving through [`ApplicationContainer::get_manager`],
    /// so lookups always observe the live instance. Re-registering an
    /// identifier replaces the previous manager.
    pub fn add_manager(&self, manager: Arc<dyn Manager>) -> Result<(), Error> {
        self.ensure_not_started("add manager")?;

        let identifier = manager.identifier().to_string();
        if !self.inner.directory.has_attribute(&identifier) {
            let (callback, bound_args) = self.manager_callback(&identifier);
            self.inner
                .directory
                .bind_callback(&identifier, callback, bound_args)?;
        }

        if self
            .inner
            .managers
            .insert(identifier.clone(), manager)
            .is_some()
        {
            log::warn!(
                "replacing manager '{}' in application '{}'",
                identifier,
                self.name()
            );
        }
        Ok(())
    }

    /// Register `manager` and bind its additional lookup names.
    ///
    /// Local aliases are bound on the container's directory, global
    /// aliases on the shared root.
    pub fn add_manager_with(
        &self,
        manager: Arc<dyn Manager>,
        config: &ManagerConfig,
    ) -> Result<(), Error> {
        let identifier = manager.identifier().to_string();
        self.add_manager(manager)?;

        for alias in &config.local_aliases {
            let (callback, bound_args) = self.manager_callback(&identifier);
            self.inner
                .directory
                .bind_callback(alias, callback, bound_args)?;
        }
        for alias in &config.global_aliases {
            let (callback, bound_args) = self.manager_callback(&identifier);
            self.inner
                .naming_directory
                .bind_callback(alias, callback, bound_args)?;
        }
        Ok(())
    }

    /// The manager registered under `identifier`, if any.
    pub fn get_manager(&self, identifier: &str) -> Option<Arc<dyn Manager>> {
        self.inner
            .managers
            .get(identifier)
            .map(|entry| entry.value().clone())
    }

    /// Snapshot of the registered managers.
    pub fn managers(&self) -> Vec<Arc<dyn Manager>> {
        self.inner
            .managers
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Put a class loader on the stack.
    ///
    /// Loaders are registered during startup in reverse insertion order,
    /// so the most recently added loader wins.
    pub fn add_class_loader(&self, class_loader: Arc<dyn ClassLoader>) -> Result<(), Error> {
        self.ensure_not_started("add class loader")?;
        self.inner.class_loaders.write().push(class_loader);
        Ok(())
    }

    /// Bound the application to `virtual_host`.
    pub fn add_virtual_host(&self, virtual_host: VirtualHost) -> Result<(), Error> {
        self.ensure_not_started("add virtual host")?;
        self.inner.virtual_hosts.write().push(virtual_host);
        Ok(())
    }

    /// Whether the application is a virtual host for `server_name`.
    ///
    /// Exact, case-sensitive match on the registered vhost names.
    pub fn is_vhost_of(&self, server_name: &str) -> bool {
        self.inner
            .virtual_hosts
            .read()
            .iter()
            .any(|vhost| vhost.name() == server_name)
    }

    /// The registered virtual hosts, in insertion order.
    pub fn virtual_hosts(&self) -> Vec<VirtualHost> {
        self.inner.virtual_hosts.read().clone()
    }

    // --- lifecycle ---

    /// Start the container worker and block until it is ready.
    ///
    /// Returns once every class loader has been registered and every
    /// manager initialized; a startup failure is returned as the error the
    /// worker hit. Waits unboundedly, re-checking on the heartbeat tick.
    /// Calling `connect` on a container that is already ready returns
    /// immediately.
    pub fn connect(&self) -> Result<(), Error> {
        self.start_worker()?;
        log::debug!("{} waits to be connected", self.name());
        self.wait_connected(None)?;
        log::debug!("{} has successfully been connected", self.name());
        Ok(())
    }

    /// Like [`ApplicationContainer::connect`], giving up after `timeout`.
    ///
    /// On timeout the container is left in `Starting`: the worker keeps
    /// running and a later `connect` call may still succeed.
    pub fn connect_timeout(&self, timeout: Duration) -> Result<(), Error> {
        self.start_worker()?;
        self.wait_connected(Some(timeout))
    }

    fn wait_connected(&self, timeout: Option<Duration>) -> Result<(), Error> {
        let deadline = timeout.map(|timeout| Instant::now() + timeout);
        let mut state = self.inner.lifecycle.lock();
        loop {
            match &*state {
                LifecycleState::Ready | LifecycleState::Idle => return Ok(()),
                LifecycleState::Failed(error) => return Err(error.clone()),
                _ => {}
            }

            let mut wait = self.inner.heartbeat;
            if let Some(deadline) = deadline {
                let now = Instant::now();
                if now >= deadline {
                    return Err(Error::StartupTimeout {
                        name: self.name().to_string(),
                        waited: timeout.unwrap_or_default(),
                    });
                }
                wait = wait.min(deadline - now);
            }
            self.inner.connected.wait_for(&mut state, wait);
        }
    }

    fn start_worker(&self) -> Result<(), Error> {
        {
            let mut state = self.inner.lifecycle.lock();
            if !matches!(*state, LifecycleState::Created) {
                return Ok(());
            }
            *state = LifecycleState::Starting;
        }

        let container = self.clone();
        let handle = thread::Builder::new()
            .name(format!("appcell-{}", self.name()))
            .spawn(move || container.run())
            .map_err(|e| Error::Startup {
                message: e.to_string(),
            })?;
        *self.inner.worker.lock() = Some(handle);
        Ok(())
    }

    /// Worker body: register class loaders, initialize managers, signal
    /// readiness, then idle on the heartbeat.
    fn run(&self) {
        let result = self
            .register_class_loaders()
            .and_then(|()| self.initialize_managers());
        let failed = result.is_err();

        {
            let mut state = self.inner.lifecycle.lock();
            match result {
                Ok(()) => *state = LifecycleState::Ready,
                Err(error) => {
                    log::error!("application '{}' failed to start: {}", self.name(), error);
                    *state = LifecycleState::Failed(error);
                }
            }
            self.inner.connected.notify_all();
        }

        if !failed {
            self.idle();
        }
    }

    /// Register every class loader, most recently added first.
    pub fn register_class_loaders(&self) -> Result<(), Error> {
        let class_loaders: Vec<Arc<dyn ClassLoader>> = self
            .inner
            .class_loaders
            .read()
            .iter()
            .rev()
            .cloned()
            .collect();
        for class_loader in class_loaders {
            class_loader
                .register(true, true)
                .map_err(|message| Error::ClassLoader { message })?;
        }
        Ok(())
    }

    /// Initialize every registered manager with this container.
    pub fn initialize_managers(&self) -> Result<(), Error> {
        let managers: Vec<(String, Arc<dyn Manager>)> = self
            .inner
            .managers
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        for (identifier, manager) in managers {
            manager
                .initialize(self)
                .map_err(|message| Error::Manager {
                    identifier,
                    message,
                })?;
        }
        Ok(())
    }

    fn idle(&self) {
        let mut state = self.inner.lifecycle.lock();
        *state = LifecycleState::Idle;
        while !self.inner.shutdown.load(Ordering::Acquire) {
            self.inner.connected.wait_for(&mut state, self.inner.heartbeat);
            if self.inner.shutdown.load(Ordering::Acquire) {
                break;
            }
            log::trace!("application '{}' is running", self.name());
        }
    }

    /// Ask the idle worker to exit and join it.
    ///
    /// A latch for supervisors and tests; in production the container
    /// lives until process shutdown.
    pub fn shutdown(&self) {
        self.inner.shutdown.store(true, Ordering::Release);
        self.inner.connected.notify_all();
        if let Some(handle) = self.inner.worker.lock().take() {
            let _ = handle.join();
        }
    }

    // --- initial context delegation ---

    /// Construct a new instance through the initial context.
    pub fn new_instance(&self, name: &str, args: &[Value]) -> Result<Value, Error> {
        self.inner
            .initial_context
            .new_instance(name, args)
            .map_err(|message| Error::Context { message })
    }

    /// Locate a service through the initial context.
    pub fn new_service(&self, name: &str) -> Result<Value, Error> {
        self.inner
            .initial_context
            .new_service(name)
            .map_err(|message| Error::Context { message })
    }

    // --- reserved environment accessors ---

    /// The server's base directory, with `append` appended when given.
    pub fn base_directory(&self, append: Option<&str>) -> Result<String, Error> {
        let mut base = self.env_string("env/baseDirectory")?;
        if let Some(suffix) = append {
            base.push_str(suffix);
        }
        Ok(base)
    }

    /// The web application base directory.
    pub fn app_base(&self) -> Result<String, Error> {
        self.env_string("env/appBase")
    }

    /// The path to this application below the application base.
    pub fn webapp_path(&self) -> Result<String, Error> {
        Ok(format!("{}/{}", self.app_base()?, self.name()))
    }

    /// This application's temporary directory.
    pub fn tmp_dir(&self) -> Result<String, Error> {
        self.env_string(&format!("env/{}/tmpDirectory", self.name()))
    }

    /// The session directory below the temporary directory.
    pub fn session_dir(&self) -> Result<String, Error> {
        Ok(format!("{}/{}", self.tmp_dir()?, SESSION_DIRECTORY))
    }

    /// The cache directory below the temporary directory.
    pub fn cache_dir(&self) -> Result<String, Error> {
        Ok(format!("{}/{}", self.tmp_dir()?, CACHE_DIRECTORY))
    }

    /// The user the application runs as.
    pub fn user(&self) -> Result<String, Error> {
        self.env_string("env/user")
    }

    /// The group the application runs as.
    pub fn group(&self) -> Result<String, Error> {
        self.env_string("env/group")
    }

    /// The umask the application creates files and directories with.
    pub fn umask(&self) -> Result<String, Error> {
        self.env_string("env/umask")
    }

    // --- helpers ---

    fn ensure_not_started(&self, operation: &str) -> Result<(), Error> {
        if matches!(*self.inner.lifecycle.lock(), LifecycleState::Created) {
            Ok(())
        } else {
            Err(Error::AlreadyStarted {
                name: self.name().to_string(),
                operation: operation.to_string(),
            })
        }
    }

    /// A callback resolving `identifier` through the live manager map, so
    /// a replaced manager is picked up by later lookups.
    fn manager_callback(&self, identifier: &str) -> (Callback, Vec<Value>) {
        let container = self.clone();
        let callback: Callback = Arc::new(move |args| {
            let identifier = args.first().and_then(Value::as_str).ok_or_else(|| {
                NamingError::callback("manager lookup", "missing identifier argument")
            })?;
            Ok(match container.get_manager(identifier) {
                Some(manager) => Value::object(manager),
                None => Value::Null,
            })
        });
        (callback, vec![Value::from(identifier)])
    }

    fn env_string(&self, path: &str) -> Result<String, Error> {
        let qualified = match self.inner.naming_directory.scheme() {
            Some(scheme) => format!("{}:{}", scheme, path),
            None => path.to_string(),
        };
        match self.inner.naming_directory.search(&qualified, &[])? {
            Value::String(s) => Ok(s),
            _ => Err(Error::UnexpectedValue {
                path: qualified,
                expected: "string",
            }),
        }
    }
}

impl std::fmt::Debug for ApplicationContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApplicationContainer")
            .field("name", &self.inner.name)
            .field("state", &self.state())
            .finish()
    }
}
