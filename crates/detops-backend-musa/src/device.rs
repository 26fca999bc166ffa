//! MUSA driver bindings loaded at run time.
//!
//! The driver library is opened with `libloading` the first time the backend
//! touches the device, so the crate links cleanly on machines without a MUSA
//! stack and merely reports unavailability there. Symbols follow the MUSA
//! driver API, which mirrors the CUDA driver API with a `mu` prefix.

use std::env;
use std::ffi::{c_void, CString};
use std::fmt;
use std::sync::{Arc, OnceLock};

use detops::backend::{BackendError, BackendResult};
use libloading::Library;

type MUresult = i32;
type MUdevice = i32;
type MUcontext = *mut c_void;
type MUdeviceptr = u64;
type MUmodule = *mut c_void;
type MUfunction = *mut c_void;
type MUstream = *mut c_void;

const MUSA_SUCCESS: MUresult = 0;

/// Environment variable overriding the driver library path.
pub const MUSA_LIBRARY_ENV: &str = "DETOPS_MUSA_LIBRARY";

type MuInitFn = unsafe extern "C" fn(flags: u32) -> MUresult;
type MuDeviceGetFn = unsafe extern "C" fn(device: *mut MUdevice, ordinal: i32) -> MUresult;
type MuCtxCreateFn =
    unsafe extern "C" fn(ctx: *mut MUcontext, flags: u32, dev: MUdevice) -> MUresult;
type MuCtxDestroyFn = unsafe extern "C" fn(ctx: MUcontext) -> MUresult;
type MuCtxSetCurrentFn = unsafe extern "C" fn(ctx: MUcontext) -> MUresult;
type MuCtxSynchronizeFn = unsafe extern "C" fn() -> MUresult;
type MuMemAllocFn = unsafe extern "C" fn(dptr: *mut MUdeviceptr, bytesize: usize) -> MUresult;
type MuMemFreeFn = unsafe extern "C" fn(dptr: MUdeviceptr) -> MUresult;
type MuMemcpyHtoDFn = unsafe extern "C" fn(
    dst_device: MUdeviceptr,
    src_host: *const c_void,
    byte_count: usize,
) -> MUresult;
type MuMemcpyDtoHFn = unsafe extern "C" fn(
    dst_host: *mut c_void,
    src_device: MUdeviceptr,
    byte_count: usize,
) -> MUresult;
type MuModuleLoadDataFn =
    unsafe extern "C" fn(module: *mut MUmodule, image: *const c_void) -> MUresult;
type MuModuleUnloadFn = unsafe extern "C" fn(module: MUmodule) -> MUresult;
type MuModuleGetFunctionFn =
    unsafe extern "C" fn(hfunc: *mut MUfunction, hmod: MUmodule, name: *const i8) -> MUresult;
type MuLaunchKernelFn = unsafe extern "C" fn(
    f: MUfunction,
    grid_dim_x: u32,
    grid_dim_y: u32,
    grid_dim_z: u32,
    block_dim_x: u32,
    block_dim_y: u32,
    block_dim_z: u32,
    shared_mem_bytes: u32,
    h_stream: MUstream,
    kernel_params: *mut *mut c_void,
    extra: *mut *mut c_void,
) -> MUresult;

struct DriverFns {
    mu_init: MuInitFn,
    mu_device_get: MuDeviceGetFn,
    mu_ctx_create: MuCtxCreateFn,
    mu_ctx_destroy: MuCtxDestroyFn,
    mu_ctx_set_current: MuCtxSetCurrentFn,
    mu_ctx_synchronize: MuCtxSynchronizeFn,
    mu_mem_alloc: MuMemAllocFn,
    mu_mem_free: MuMemFreeFn,
    mu_memcpy_hto_d: MuMemcpyHtoDFn,
    mu_memcpy_dto_h: MuMemcpyDtoHFn,
    mu_module_load_data: MuModuleLoadDataFn,
    mu_module_unload: MuModuleUnloadFn,
    mu_module_get_function: MuModuleGetFunctionFn,
    mu_launch_kernel: MuLaunchKernelFn,
}

pub struct MusaDriver {
    _lib: Library,
    fns: DriverFns,
    // Stored as usize so MusaDriver stays Send + Sync for the backend trait.
    ctx: usize,
}

impl Drop for MusaDriver {
    fn drop(&mut self) {
        if self.ctx != 0 {
            // SAFETY: Context is owned by this driver instance and destroyed once on drop.
            let _ = unsafe { (self.fns.mu_ctx_destroy)(self.ctx_ptr()) };
            self.ctx = 0;
        }
    }
}

/// Device allocation freed when the last reference drops.
pub struct DeviceBuffer {
    driver: Arc<MusaDriver>,
    ptr: MUdeviceptr,
    bytes: usize,
}

impl fmt::Debug for DeviceBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceBuffer")
            .field("ptr", &self.ptr)
            .field("bytes", &self.bytes)
            .finish()
    }
}

impl DeviceBuffer {
    pub fn bytes(&self) -> usize {
        self.bytes
    }

    pub fn device_ptr(&self) -> u64 {
        self.ptr
    }

    pub fn read_to_vec(&self) -> BackendResult<Vec<u8>> {
        self.driver.download(self.ptr, self.bytes)
    }
}

impl Drop for DeviceBuffer {
    fn drop(&mut self) {
        // SAFETY: Device pointer was allocated by this driver and is released once on drop.
        let _ = unsafe { (self.driver.fns.mu_mem_free)(self.ptr) };
    }
}

pub struct MusaModule {
    driver: Arc<MusaDriver>,
    module: usize,
}

impl Drop for MusaModule {
    fn drop(&mut self) {
        if self.module != 0 {
            // SAFETY: Module belongs to this driver and is unloaded once.
            let _ = unsafe { (self.driver.fns.mu_module_unload)(self.module_ptr()) };
            self.module = 0;
        }
    }
}

impl MusaModule {
    fn module_ptr(&self) -> MUmodule {
        self.module as MUmodule
    }
}

#[derive(Clone)]
pub struct MusaFunction {
    #[allow(dead_code)]
    module: Arc<MusaModule>,
    func: usize,
}

impl MusaFunction {
    fn func_ptr(&self) -> MUfunction {
        self.func as MUfunction
    }
}

static MUSA_DRIVER: OnceLock<Result<Arc<MusaDriver>, String>> = OnceLock::new();

/// Reports whether the MUSA driver can be loaded and a context created.
pub fn is_available() -> bool {
    driver().is_ok()
}

/// Returns the process-wide driver handle, initializing it on first use.
pub fn driver() -> BackendResult<Arc<MusaDriver>> {
    let init = MUSA_DRIVER.get_or_init(|| match MusaDriver::new() {
        Ok(driver) => Ok(Arc::new(driver)),
        Err(err) => Err(err.to_string()),
    });
    match init {
        Ok(driver) => Ok(Arc::clone(driver)),
        Err(msg) => Err(BackendError::execution(format!(
            "MUSA driver unavailable: {msg}"
        ))),
    }
}

impl MusaDriver {
    fn new() -> BackendResult<Self> {
        let lib = load_musa_library()?;
        let fns = DriverFns {
            mu_init: load_symbol(&lib, b"muInit\0")?,
            mu_device_get: load_symbol(&lib, b"muDeviceGet\0")?,
            mu_ctx_create: load_symbol(&lib, b"muCtxCreate\0")?,
            mu_ctx_destroy: load_symbol(&lib, b"muCtxDestroy\0")?,
            mu_ctx_set_current: load_symbol(&lib, b"muCtxSetCurrent\0")?,
            mu_ctx_synchronize: load_symbol(&lib, b"muCtxSynchronize\0")?,
            mu_mem_alloc: load_symbol(&lib, b"muMemAlloc\0")?,
            mu_mem_free: load_symbol(&lib, b"muMemFree\0")?,
            mu_memcpy_hto_d: load_symbol(&lib, b"muMemcpyHtoD\0")?,
            mu_memcpy_dto_h: load_symbol(&lib, b"muMemcpyDtoH\0")?,
            mu_module_load_data: load_symbol(&lib, b"muModuleLoadData\0")?,
            mu_module_unload: load_symbol(&lib, b"muModuleUnload\0")?,
            mu_module_get_function: load_symbol(&lib, b"muModuleGetFunction\0")?,
            mu_launch_kernel: load_symbol(&lib, b"muLaunchKernel\0")?,
        };

        // SAFETY: Calls are made with valid pointers and follow the MUSA driver API contract.
        unsafe {
            check_musa((fns.mu_init)(0), "muInit")?;
            let mut dev: MUdevice = 0;
            check_musa(
                (fns.mu_device_get)(&mut dev as *mut MUdevice, 0),
                "muDeviceGet",
            )?;
            let mut ctx: MUcontext = std::ptr::null_mut();
            check_musa(
                (fns.mu_ctx_create)(&mut ctx as *mut MUcontext, 0, dev),
                "muCtxCreate",
            )?;
            check_musa((fns.mu_ctx_set_current)(ctx), "muCtxSetCurrent")?;
            Ok(Self {
                _lib: lib,
                fns,
                ctx: ctx as usize,
            })
        }
    }

    pub fn alloc(self: &Arc<Self>, bytes: usize) -> BackendResult<Arc<DeviceBuffer>> {
        self.ensure_current()?;
        let mut ptr: MUdeviceptr = 0;
        // Zero-byte allocations are rejected by some driver revisions; round
        // up while keeping the logical size.
        let request = bytes.max(1);
        // SAFETY: `ptr` is a valid out pointer for the allocation call.
        unsafe {
            check_musa(
                (self.fns.mu_mem_alloc)(&mut ptr as *mut MUdeviceptr, request),
                "muMemAlloc",
            )?;
        }
        Ok(Arc::new(DeviceBuffer {
            driver: Arc::clone(self),
            ptr,
            bytes,
        }))
    }

    pub fn alloc_and_upload(self: &Arc<Self>, bytes: &[u8]) -> BackendResult<Arc<DeviceBuffer>> {
        let buffer = self.alloc(bytes.len())?;
        if !bytes.is_empty() {
            self.ensure_current()?;
            // SAFETY: Destination is a valid device allocation of `bytes.len()` and the
            // source host slice is live for the duration of the call.
            unsafe {
                check_musa(
                    (self.fns.mu_memcpy_hto_d)(
                        buffer.ptr,
                        bytes.as_ptr() as *const c_void,
                        bytes.len(),
                    ),
                    "muMemcpyHtoD",
                )?;
            }
        }
        Ok(buffer)
    }

    pub fn download(&self, ptr: MUdeviceptr, bytes: usize) -> BackendResult<Vec<u8>> {
        self.ensure_current()?;
        let mut out = vec![0u8; bytes];
        if bytes != 0 {
            // SAFETY: Source device pointer is valid for `bytes`; destination host buffer
            // is freshly allocated with the same length.
            unsafe {
                check_musa(
                    (self.fns.mu_memcpy_dto_h)(out.as_mut_ptr() as *mut c_void, ptr, bytes),
                    "muMemcpyDtoH",
                )?;
            }
        }
        Ok(out)
    }

    /// Loads a compiled kernel image (the binary produced by `mcc`).
    pub fn load_module(self: &Arc<Self>, image: &[u8]) -> BackendResult<Arc<MusaModule>> {
        self.ensure_current()?;
        let mut module: MUmodule = std::ptr::null_mut();
        // SAFETY: `image` points at a complete kernel binary; the out pointer is valid.
        unsafe {
            check_musa(
                (self.fns.mu_module_load_data)(
                    &mut module as *mut MUmodule,
                    image.as_ptr() as *const c_void,
                ),
                "muModuleLoadData",
            )?;
        }
        Ok(Arc::new(MusaModule {
            driver: Arc::clone(self),
            module: module as usize,
        }))
    }

    pub fn get_function(
        &self,
        module: &Arc<MusaModule>,
        symbol: &str,
    ) -> BackendResult<MusaFunction> {
        self.ensure_current()?;
        let c_symbol = CString::new(symbol)
            .map_err(|_| BackendError::execution("kernel symbol contains NUL byte"))?;
        let mut function: MUfunction = std::ptr::null_mut();
        // SAFETY: Module and output pointers are valid.
        unsafe {
            check_musa(
                (self.fns.mu_module_get_function)(
                    &mut function as *mut MUfunction,
                    module.module_ptr(),
                    c_symbol.as_ptr(),
                ),
                "muModuleGetFunction",
            )?;
        }
        Ok(MusaFunction {
            module: Arc::clone(module),
            func: function as usize,
        })
    }

    pub fn launch_kernel(
        &self,
        function: &MusaFunction,
        grid: (u32, u32, u32),
        block: (u32, u32, u32),
        shared_mem_bytes: u32,
        params: &mut [*mut c_void],
    ) -> BackendResult<()> {
        self.ensure_current()?;
        // SAFETY: Function handle and parameter pointers are valid for the launch.
        unsafe {
            check_musa(
                (self.fns.mu_launch_kernel)(
                    function.func_ptr(),
                    grid.0,
                    grid.1,
                    grid.2,
                    block.0,
                    block.1,
                    block.2,
                    shared_mem_bytes,
                    std::ptr::null_mut(),
                    params.as_mut_ptr(),
                    std::ptr::null_mut(),
                ),
                "muLaunchKernel",
            )?;
        }
        Ok(())
    }

    /// Blocks until all work queued on the context has finished.
    pub fn synchronize(&self) -> BackendResult<()> {
        self.ensure_current()?;
        // SAFETY: No arguments; synchronizes the current context.
        unsafe { check_musa((self.fns.mu_ctx_synchronize)(), "muCtxSynchronize") }
    }

    fn ensure_current(&self) -> BackendResult<()> {
        // SAFETY: Context was created by this driver and remains valid until drop.
        unsafe {
            check_musa(
                (self.fns.mu_ctx_set_current)(self.ctx_ptr()),
                "muCtxSetCurrent",
            )
        }
    }

    fn ctx_ptr(&self) -> MUcontext {
        self.ctx as MUcontext
    }
}

fn load_musa_library() -> BackendResult<Library> {
    if let Ok(path) = env::var(MUSA_LIBRARY_ENV) {
        // SAFETY: Dynamic library probe only; no symbols are invoked at this stage.
        return unsafe { Library::new(&path) }.map_err(|err| {
            BackendError::execution(format!(
                "failed to load MUSA driver library from {MUSA_LIBRARY_ENV}={path}: {err}"
            ))
        });
    }

    let candidates = ["libmusa.so.1", "libmusa.so"];
    for candidate in candidates {
        // SAFETY: Dynamic library probe only; no symbols are invoked at this stage.
        if let Ok(lib) = unsafe { Library::new(candidate) } {
            return Ok(lib);
        }
    }

    Err(BackendError::execution(
        "failed to load MUSA driver library (tried libmusa.so.1, libmusa.so)",
    ))
}

fn load_symbol<T: Copy>(lib: &Library, name: &'static [u8]) -> BackendResult<T> {
    // SAFETY: Caller provides the expected symbol type from the MUSA driver API.
    let sym = unsafe { lib.get::<T>(name) }.map_err(|err| {
        BackendError::execution(format!(
            "failed to resolve MUSA symbol {}: {err}",
            String::from_utf8_lossy(name)
        ))
    })?;
    Ok(*sym)
}

fn check_musa(code: MUresult, op: &str) -> BackendResult<()> {
    if code == MUSA_SUCCESS {
        Ok(())
    } else {
        Err(BackendError::execution(format!(
            "MUSA driver call {op} failed with code {code}"
        )))
    }
}
