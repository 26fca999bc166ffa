use std::env;
use std::sync::OnceLock;

static ACCEL_BACKEND: OnceLock<Option<String>> = OnceLock::new();

/// Returns the backend name selected via `DETOPS_ACCEL_BACKEND`, if any.
///
/// The value is read once per process; registry lookups treat an empty or
/// unset variable as "no selection".
pub(crate) fn accel_backend_override() -> Option<&'static str> {
    ACCEL_BACKEND
        .get_or_init(|| match env::var("DETOPS_ACCEL_BACKEND") {
            Ok(value) if !value.trim().is_empty() => Some(value.trim().to_string()),
            _ => None,
        })
        .as_deref()
}
