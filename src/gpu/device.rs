//! GPU device discovery, validation, and activation.
//!
//! The activation path mirrors the CUDA runtime contract: query the
//! device count, range-check the requested index, then make the device
//! current for the calling thread. When compiled without the `cuda`
//! feature, activation fails with a capability error and discovery
//! reports an empty inventory.

use std::fmt;
use std::str::FromStr;

#[cfg(feature = "cuda")]
use cudarc::runtime::sys;
use serde::{Deserialize, Serialize};
#[cfg(not(feature = "cuda"))]
use tracing::info;

#[cfg(feature = "cuda")]
use crate::gpu::cuda_check;
use crate::gpu::CudaError;

/// A parsed device reference.
///
/// Accepts the conventional string forms: `"cpu"`, `"cuda"` (device 0),
/// `"cuda:1"`, or a bare index like `"1"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Cpu,
    Cuda(i32),
}

impl Device {
    /// CUDA index for this device, if it names one.
    pub fn index(&self) -> Option<i32> {
        match self {
            Device::Cpu => None,
            Device::Cuda(id) => Some(*id),
        }
    }
}

impl FromStr for Device {
    type Err = CudaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("cpu") {
            return Ok(Device::Cpu);
        }
        if s.eq_ignore_ascii_case("cuda") {
            return Ok(Device::Cuda(0));
        }
        if let Some(rest) = s.strip_prefix("cuda:") {
            let id = rest
                .parse::<i32>()
                .map_err(|_| CudaError::InvalidDeviceString(s.to_string()))?;
            return Ok(Device::Cuda(id));
        }
        if let Ok(id) = s.parse::<i32>() {
            return Ok(Device::Cuda(id));
        }
        Err(CudaError::InvalidDeviceString(s.to_string()))
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Cuda(id) => write!(f, "cuda:{id}"),
        }
    }
}

/// Information about a single GPU device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Device index.
    pub id: usize,

    /// Device name (e.g., "NVIDIA GeForce GTX 1070").
    pub name: String,

    /// Total device memory in bytes.
    pub total_mem: usize,

    /// Free device memory in bytes (at detection time).
    pub free_mem: usize,

    /// Compute capability (major, minor).
    pub compute_capability: (u32, u32),
}

/// Number of visible CUDA devices.
pub fn device_count() -> Result<usize, CudaError> {
    #[cfg(feature = "cuda")]
    {
        let mut count = 0i32;
        // SAFETY: count is a valid out-pointer for the duration of the call
        unsafe { cuda_check(sys::cudaGetDeviceCount(&mut count)) }.map_err(|code| {
            CudaError::DeviceQuery {
                call: "cudaGetDeviceCount",
                code,
            }
        })?;
        Ok(count as usize)
    }

    #[cfg(not(feature = "cuda"))]
    {
        Err(CudaError::CudaUnavailable {
            op: "cuda_device_count",
        })
    }
}

/// Index of the device currently active on the calling thread.
pub fn current_device() -> Result<i32, CudaError> {
    #[cfg(feature = "cuda")]
    {
        let mut device = 0i32;
        // SAFETY: device is a valid out-pointer for the duration of the call
        unsafe { cuda_check(sys::cudaGetDevice(&mut device)) }.map_err(|code| {
            CudaError::DeviceQuery {
                call: "cudaGetDevice",
                code,
            }
        })?;
        Ok(device)
    }

    #[cfg(not(feature = "cuda"))]
    {
        Err(CudaError::CudaUnavailable {
            op: "cuda_current_device",
        })
    }
}

/// Range-check a requested device index against the reported count.
pub fn validate_device_id(device_id: i32, available: usize) -> Result<(), CudaError> {
    if device_id < 0 || device_id as usize >= available {
        return Err(CudaError::InvalidDeviceId {
            requested: device_id,
            available,
        });
    }
    Ok(())
}

/// Activate `device_id` for subsequent CUDA operations on this thread.
///
/// The index is validated against the driver-reported count before the
/// switch; every failure is surfaced immediately with no retry.
pub fn set_device(device_id: i32) -> Result<(), CudaError> {
    #[cfg(feature = "cuda")]
    {
        let available = device_count()?;
        validate_device_id(device_id, available)?;

        // SAFETY: device_id was validated against the driver-reported count
        unsafe { cuda_check(sys::cudaSetDevice(device_id)) }
            .map_err(|code| CudaError::DeviceActivation { device_id, code })?;

        tracing::debug!(device = device_id, "Activated CUDA device");
        Ok(())
    }

    #[cfg(not(feature = "cuda"))]
    {
        let _ = device_id;
        Err(CudaError::CudaUnavailable {
            op: "cuda_set_device",
        })
    }
}

/// Detect all available GPU devices.
///
/// With the `cuda` feature enabled, enumerates devices through the CUDA
/// runtime. Without it, returns an empty list (CPU-only mode); probing
/// is read-only and deliberately lenient, unlike [`set_device`].
pub fn detect_devices() -> Result<Vec<DeviceInfo>, CudaError> {
    #[cfg(feature = "cuda")]
    {
        detect_devices_cuda()
    }

    #[cfg(not(feature = "cuda"))]
    {
        info!("CUDA not enabled, running in CPU-only mode");
        Ok(Vec::new())
    }
}

#[cfg(feature = "cuda")]
fn detect_devices_cuda() -> Result<Vec<DeviceInfo>, CudaError> {
    let count = device_count()?;
    if count == 0 {
        return Ok(Vec::new());
    }

    // Probing free memory switches the active device, so remember and
    // restore the caller's selection.
    let previous = current_device()?;

    let mut devices = Vec::with_capacity(count);
    let mut failure = None;
    for id in 0..count as i32 {
        match probe_device(id) {
            Ok(info) => devices.push(info),
            Err(err) => {
                failure = Some(err);
                break;
            }
        }
    }

    // SAFETY: previous was reported by cudaGetDevice above
    let _ = unsafe { cuda_check(sys::cudaSetDevice(previous)) };

    match failure {
        Some(err) => Err(err),
        None => {
            tracing::info!(count = devices.len(), "Detected CUDA devices");
            Ok(devices)
        }
    }
}

#[cfg(feature = "cuda")]
fn probe_device(id: i32) -> Result<DeviceInfo, CudaError> {
    use std::ffi::CStr;
    use std::mem::MaybeUninit;

    let probe_err = |code: i32| CudaError::DeviceProbe {
        device_id: id,
        code,
    };

    let mut prop = MaybeUninit::<sys::cudaDeviceProp>::uninit();
    // SAFETY: prop is a valid out-pointer; id is within the reported count
    unsafe { cuda_check(sys::cudaGetDeviceProperties_v2(prop.as_mut_ptr(), id)) }
        .map_err(probe_err)?;
    // SAFETY: initialized by the successful call above
    let prop = unsafe { prop.assume_init() };

    // SAFETY: the driver fills prop.name with a NUL-terminated string
    let name = unsafe { CStr::from_ptr(prop.name.as_ptr()) }
        .to_string_lossy()
        .into_owned();

    // SAFETY: id is within the reported count
    unsafe { cuda_check(sys::cudaSetDevice(id)) }.map_err(probe_err)?;

    let mut free = 0usize;
    let mut total = 0usize;
    // SAFETY: free and total are valid out-pointers for the call
    unsafe { cuda_check(sys::cudaMemGetInfo(&mut free, &mut total)) }.map_err(probe_err)?;

    Ok(DeviceInfo {
        id: id as usize,
        name,
        total_mem: prop.totalGlobalMem as usize,
        free_mem: free,
        compute_capability: (prop.major as u32, prop.minor as u32),
    })
}
