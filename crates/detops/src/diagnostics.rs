//! Environment snapshots for support triage.
//!
//! "Is accelerator support compiled in, and can it see a device?" is the
//! first question behind most routing bug reports. [`collect`] answers it in
//! one serializable struct.

use anyhow::Result;
use serde::Serialize;

use crate::backend::registry::{accel_backend, active_accel_backend, list_accel_backends};

/// Registration and availability state of one accelerator backend.
#[derive(Debug, Clone, Serialize)]
pub struct BackendStatus {
    /// Registered backend name.
    pub name: String,
    /// Whether the backend can reach its device runtime right now.
    pub available: bool,
}

/// Snapshot of the dispatch environment.
#[derive(Debug, Clone, Serialize)]
pub struct EnvReport {
    /// Version of this crate.
    pub crate_version: &'static str,
    /// Host kernel the dispatcher falls back to for host-resident inputs.
    pub host_kernel: &'static str,
    /// Every registered accelerator backend, sorted by name.
    pub accel_backends: Vec<BackendStatus>,
    /// Backend accelerator dispatch would route to, if one is selectable.
    pub active_backend: Option<String>,
    /// Why backend selection failed, when it did.
    pub selection_error: Option<String>,
}

impl EnvReport {
    /// Renders the report as pretty-printed JSON for bug reports.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Collects the current dispatch environment.
pub fn collect() -> EnvReport {
    let accel_backends = list_accel_backends()
        .into_iter()
        .map(|name| {
            let available = accel_backend(&name).map(|b| b.is_available()).unwrap_or(false);
            BackendStatus { name, available }
        })
        .collect();
    let (active_backend, selection_error) = match active_accel_backend() {
        Ok(Some(backend)) => (Some(backend.backend_name().to_string()), None),
        Ok(None) => (None, None),
        Err(err) => (None, Some(err.to_string())),
    };
    EnvReport {
        crate_version: env!("CARGO_PKG_VERSION"),
        host_kernel: "nms_rotated_cpu",
        accel_backends,
        active_backend,
        selection_error,
    }
}
