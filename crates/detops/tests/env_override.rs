//! `DETOPS_ACCEL_BACKEND` selection against the registry.
//!
//! The selector is read once per process, so this file holds a single test
//! that sets the variable before anything touches the registry.

use detops::backend::registry::active_accel_backend;
use detops::backend::BackendError;

#[test]
fn dangling_selection_is_an_execution_error() {
    std::env::set_var("DETOPS_ACCEL_BACKEND", "absent-backend");

    let err = active_accel_backend().expect_err("selected backend is not registered");
    match err {
        BackendError::Execution { message } => {
            assert!(
                message.contains("absent-backend"),
                "message should name the dangling selection: {message}"
            );
        }
        other => panic!("expected Execution, got {other:?}"),
    }
}
