//! End-to-end lifecycle tests: startup synchronization, readiness and the
//! defined partial states.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use appcell_container::{
    manager_from_value, ApplicationContainer, ClassLoader, ContainerConfig, Environment, Error,
    Lifecycle, Manager, NamingDirectory, NullContext, Value, VirtualHost,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

struct CountingManager {
    identifier: String,
    initialized: AtomicUsize,
}

impl CountingManager {
    fn new(identifier: &str) -> Arc<Self> {
        Arc::new(CountingManager {
            identifier: identifier.to_string(),
            initialized: AtomicUsize::new(0),
        })
    }
}

impl Manager for CountingManager {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn initialize(&self, _container: &ApplicationContainer) -> Result<(), String> {
        self.initialized.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct RecordingClassLoader {
    registered: AtomicUsize,
}

impl ClassLoader for RecordingClassLoader {
    fn register(&self, _prepend: bool, _fail_on_conflict: bool) -> Result<(), String> {
        self.registered.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Blocks in `initialize` until released through the channel.
struct StallingManager {
    release: Mutex<mpsc::Receiver<()>>,
}

impl Manager for StallingManager {
    fn identifier(&self) -> &str {
        "stalling"
    }

    fn initialize(&self, _container: &ApplicationContainer) -> Result<(), String> {
        let _ = self.release.lock().map_err(|e| e.to_string())?.recv();
        Ok(())
    }
}

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
fn full_startup_flow() {
    init_logging();

    let root = NamingDirectory::root("php", "global");
    environment().apply(&root, "foo").unwrap();

    let container = ApplicationContainer::new("foo", root.clone(), Arc::new(NullContext));

    let session = CountingManager::new("SessionManager");
    let servlet = CountingManager::new("ServletManager");
    container.add_manager(session.clone()).unwrap();
    container.add_manager(servlet.clone()).unwrap();

    let loader = Arc::new(RecordingClassLoader {
        registered: AtomicUsize::new(0),
    });
    container.add_class_loader(loader.clone()).unwrap();

    container
        .add_virtual_host(VirtualHost::new("test.local", "/foo"))
        .unwrap();

    container.connect().unwrap();

    // registration and initialization happened before connect returned,
    // each exactly once
    assert_eq!(loader.registered.load(Ordering::SeqCst), 1);
    assert_eq!(session.initialized.load(Ordering::SeqCst), 1);
    assert_eq!(servlet.initialized.load(Ordering::SeqCst), 1);
    assert!(matches!(
        container.state(),
        Lifecycle::Ready | Lifecycle::Idle
    ));

    // the registries and the directory are usable from any thread
    let shared = container.clone();
    let looked_up = thread::spawn(move || {
        assert!(shared.is_vhost_of("test.local"));
        assert_eq!(shared.user().unwrap(), "www-data");
        shared.search("SessionManager", &[]).unwrap()
    })
    .join()
    .unwrap();
    assert_eq!(
        manager_from_value(&looked_up).unwrap().identifier(),
        "SessionManager"
    );

    container.shutdown();
}

#[test]
fn connect_timeout_leaves_container_starting() {
    init_logging();

    let (release, blocked) = mpsc::channel();

    let config = ContainerConfig {
        heartbeat_secs: 1,
        ..ContainerConfig::default()
    };
    let container = ApplicationContainer::with_config(
        "stalled",
        NamingDirectory::root("php", "global"),
        Arc::new(NullContext),
        &config,
    );
    container
        .add_manager(Arc::new(StallingManager {
            release: Mutex::new(blocked),
        }))
        .unwrap();

    let err = container
        .connect_timeout(Duration::from_millis(200))
        .unwrap_err();
    assert!(matches!(err, Error::StartupTimeout { .. }));
    assert_eq!(container.state(), Lifecycle::Starting);

    // once the manager is released, the same container still connects
    release.send(()).unwrap();
    container.connect().unwrap();
    assert!(matches!(
        container.state(),
        Lifecycle::Ready | Lifecycle::Idle
    ));

    container.shutdown();
}

#[test]
fn directory_bindings_work_while_running() {
    init_logging();

    let container = ApplicationContainer::new(
        "binder",
        NamingDirectory::root("php", "global"),
        Arc::new(NullContext),
    );
    container.connect().unwrap();

    // naming bindings are not frozen by startup, unlike the registries
    container.bind("runtime", Value::from("late")).unwrap();
    assert_eq!(
        container.search("runtime", &[]).unwrap(),
        Value::from("late")
    );

    container.shutdown();
}
