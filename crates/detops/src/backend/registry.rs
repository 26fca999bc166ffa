//! Runtime registry for accelerator backends.
//!
//! Backend crates register themselves here from a static initializer, so the
//! set of registered backends reflects exactly which backend crates were
//! linked into the binary. The dispatch layer consults the registry at call
//! time; an empty registry is what "not compiled with GPU support" looks like
//! at run time.

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock, RwLock};

use super::spec::{AccelBackend, BackendError, BackendResult};
use crate::env;

struct AccelRegistry {
    backends: RwLock<BTreeMap<String, Arc<dyn AccelBackend>>>,
}

impl AccelRegistry {
    fn new() -> Self {
        Self {
            backends: RwLock::new(BTreeMap::new()),
        }
    }

    fn register(&self, backend: Arc<dyn AccelBackend>) {
        let name = backend.backend_name().to_string();
        self.backends
            .write()
            .expect("accelerator registry lock poisoned")
            .insert(name, backend);
    }

    fn get(&self, name: &str) -> Option<Arc<dyn AccelBackend>> {
        self.backends
            .read()
            .expect("accelerator registry lock poisoned")
            .get(name)
            .cloned()
    }

    fn list(&self) -> Vec<String> {
        self.backends
            .read()
            .expect("accelerator registry lock poisoned")
            .keys()
            .cloned()
            .collect()
    }

    fn active(&self) -> BackendResult<Option<Arc<dyn AccelBackend>>> {
        if let Some(selected) = env::accel_backend_override() {
            return match self.get(selected) {
                Some(backend) => Ok(Some(backend)),
                None => Err(BackendError::execution(format!(
                    "DETOPS_ACCEL_BACKEND selects {selected:?} but no such backend is registered"
                ))),
            };
        }
        let backends = self
            .backends
            .read()
            .expect("accelerator registry lock poisoned");
        match backends.len() {
            0 => Ok(None),
            1 => Ok(backends.values().next().cloned()),
            _ => Err(BackendError::execution(format!(
                "multiple accelerator backends registered ({}); select one via DETOPS_ACCEL_BACKEND",
                backends.keys().cloned().collect::<Vec<_>>().join(", ")
            ))),
        }
    }
}

static GLOBAL_REGISTRY: OnceLock<AccelRegistry> = OnceLock::new();

fn global_registry() -> &'static AccelRegistry {
    GLOBAL_REGISTRY.get_or_init(AccelRegistry::new)
}

/// Register an accelerator backend under its own name.
///
/// Backend crates call this from a static initializer so that linking the
/// crate is sufficient to make the backend routable; registering a second
/// backend with the same name replaces the first.
pub fn register_accel_backend(backend: Arc<dyn AccelBackend>) {
    global_registry().register(backend);
}

/// Look up a registered backend by name.
pub fn accel_backend(name: &str) -> Option<Arc<dyn AccelBackend>> {
    global_registry().get(name)
}

/// Returns the backend accelerator dispatch should route to.
///
/// With no backend registered this is `Ok(None)` (the unsupported
/// configuration). With exactly one backend registered, that backend wins.
/// With several, the `DETOPS_ACCEL_BACKEND` environment variable must select
/// one; an ambiguous or dangling selection is an execution error rather than
/// an arbitrary pick.
pub fn active_accel_backend() -> BackendResult<Option<Arc<dyn AccelBackend>>> {
    global_registry().active()
}

/// List all registered backend names in sorted order.
pub fn list_accel_backends() -> Vec<String> {
    global_registry().list()
}

/// Check whether a backend with the given name is registered.
pub fn has_accel_backend(name: &str) -> bool {
    global_registry().get(name).is_some()
}
