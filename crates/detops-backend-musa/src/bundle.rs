//! Precompiled kernel bundles.
//!
//! MUSA kernels are compiled offline by the vendor toolchain. At run time the
//! backend locates a bundle through `DETOPS_MUSA_KERNEL_BUNDLE`: a JSON
//! manifest naming each kernel symbol and the binary image file that carries
//! it, with image paths resolved relative to the manifest.

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use detops::backend::{BackendError, BackendResult};
use serde::{Deserialize, Serialize};

pub const MUSA_BUNDLE_VERSION: u32 = 1;

/// Environment variable pointing at the bundle manifest file.
pub const MUSA_BUNDLE_ENV: &str = "DETOPS_MUSA_KERNEL_BUNDLE";

/// On-disk bundle manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MusaBundle {
    pub bundle_version: u32,
    pub kernels: Vec<KernelEntry>,
}

/// One compiled kernel in a bundle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KernelEntry {
    /// Symbol exported by the compiled module.
    pub symbol: String,
    /// Image file holding the module, relative to the manifest.
    pub image: String,
}

/// A bundle with every kernel image read into memory.
#[derive(Debug, Clone)]
pub struct DecodedBundle {
    images: HashMap<String, Vec<u8>>,
}

impl DecodedBundle {
    /// Returns the module image exporting `symbol`.
    pub fn image_for(&self, symbol: &str) -> BackendResult<&[u8]> {
        self.images
            .get(symbol)
            .map(Vec::as_slice)
            .ok_or_else(|| {
                BackendError::execution(format!(
                    "kernel symbol {symbol:?} is not present in the loaded bundle"
                ))
            })
    }
}

/// Resolves the bundle manifest path from the environment.
pub fn bundle_path_from_env() -> BackendResult<PathBuf> {
    match env::var(MUSA_BUNDLE_ENV) {
        Ok(value) if !value.trim().is_empty() => Ok(PathBuf::from(value)),
        _ => Err(BackendError::execution(format!(
            "{MUSA_BUNDLE_ENV} is not set; the MUSA backend needs a kernel bundle to launch from"
        ))),
    }
}

/// Reads a manifest and every image it references.
pub fn load_bundle(manifest_path: &Path) -> BackendResult<DecodedBundle> {
    let manifest_bytes = fs::read(manifest_path).map_err(|err| {
        BackendError::execution(format!(
            "failed to read bundle manifest {}: {err}",
            manifest_path.display()
        ))
    })?;
    let manifest: MusaBundle = serde_json::from_slice(&manifest_bytes).map_err(|err| {
        BackendError::execution(format!(
            "failed to parse bundle manifest {}: {err}",
            manifest_path.display()
        ))
    })?;
    if manifest.bundle_version != MUSA_BUNDLE_VERSION {
        return Err(BackendError::execution(format!(
            "bundle manifest {} has version {}, expected {MUSA_BUNDLE_VERSION}",
            manifest_path.display(),
            manifest.bundle_version
        )));
    }

    let base = manifest_path.parent().unwrap_or_else(|| Path::new("."));
    let mut images = HashMap::with_capacity(manifest.kernels.len());
    for entry in &manifest.kernels {
        let image_path = base.join(&entry.image);
        let image = fs::read(&image_path).map_err(|err| {
            BackendError::execution(format!(
                "failed to read kernel image {}: {err}",
                image_path.display()
            ))
        })?;
        if images.insert(entry.symbol.clone(), image).is_some() {
            return Err(BackendError::execution(format!(
                "bundle manifest {} lists symbol {:?} twice",
                manifest_path.display(),
                entry.symbol
            )));
        }
    }
    Ok(DecodedBundle { images })
}

/// Decoded bundles shared across launches, keyed by manifest path.
///
/// The first launch through a manifest reads and decodes it; later
/// launches reuse the decoded images. Failed loads are not cached, so a
/// bundle that appears on disk later still gets picked up.
pub(crate) struct BundleCache {
    decoded: Mutex<HashMap<PathBuf, Arc<DecodedBundle>>>,
}

impl BundleCache {
    pub(crate) fn new() -> Self {
        Self {
            decoded: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the decoded bundle behind `manifest`, loading it on first
    /// use.
    pub(crate) fn load(&self, manifest: &Path) -> BackendResult<Arc<DecodedBundle>> {
        if let Some(found) = self
            .decoded
            .lock()
            .expect("bundle cache mutex poisoned")
            .get(manifest)
            .cloned()
        {
            return Ok(found);
        }

        // Decode outside the lock; when two first loads race, the first
        // insert wins and the loser's decode is dropped.
        let fresh = Arc::new(load_bundle(manifest)?);
        let mut decoded = self
            .decoded
            .lock()
            .expect("bundle cache mutex poisoned");
        Ok(Arc::clone(
            decoded.entry(manifest.to_path_buf()).or_insert(fresh),
        ))
    }
}
