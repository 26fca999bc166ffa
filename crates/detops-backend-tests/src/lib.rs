//! Shared test support for accelerator backends.
//!
//! Backend crates pull this in as a dev-dependency and invoke
//! [`define_dispatch_tests!`] to stamp out the conformance suite against
//! their own backend; dispatch-level routing behavior is covered here once,
//! through [`recording_backend::RecordingBackend`].

pub mod conformance;
pub mod recording_backend;

/// Generates the backend conformance suite as a `#[cfg(test)]` module.
///
/// `$backend_ctor` is a zero-argument constructor closure and
/// `$backend_name` the name the backend registers under.
#[macro_export]
macro_rules! define_dispatch_tests {
    ($module:ident, $backend_ctor:expr, $backend_name:expr) => {
        #[cfg(test)]
        mod $module {
            use $crate::conformance;

            #[test]
            fn backend_reports_expected_name() {
                let backend = ($backend_ctor)();
                conformance::reports_expected_name(&backend, $backend_name);
            }

            #[test]
            fn backend_rejects_host_resident_dets() {
                let backend = ($backend_ctor)();
                conformance::rejects_host_resident_dets(&backend);
            }

            #[test]
            fn backend_is_registered_after_linking() {
                conformance::registered_under($backend_name);
            }

            #[test]
            fn availability_probe_is_stable() {
                let backend = ($backend_ctor)();
                conformance::availability_probe_is_stable(&backend);
            }
        }
    };
}
