//! Caching-allocator reclaim and device memory snapshots.
//!
//! The CUDA runtime pools freed allocations in the active device's
//! default memory pool rather than returning them to the platform.
//! [`empty_cache`] trims that pool to zero, forcing every unused cached
//! block back to the driver. Safe to call when nothing is cached.

#[cfg(feature = "cuda")]
use cudarc::runtime::sys;
use serde::{Deserialize, Serialize};

#[cfg(feature = "cuda")]
use crate::gpu::cuda_check;
use crate::gpu::CudaError;

/// Free/total memory snapshot for the active device, in bytes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MemInfo {
    pub free: usize,
    pub total: usize,
}

impl MemInfo {
    /// Bytes currently in use (allocated or cached) on the device.
    pub fn used(&self) -> usize {
        self.total.saturating_sub(self.free)
    }
}

/// Release all unused cached memory on the active device back to the
/// platform.
///
/// The reclaim call's status is checked and surfaced as
/// [`CudaError::CacheRelease`]; concurrent use against in-flight
/// allocator operations inherits the runtime's own thread-safety rules.
pub fn empty_cache() -> Result<(), CudaError> {
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

        let mut pool: sys::cudaMemPool_t = std::ptr::null_mut();
        // SAFETY: pool is a valid out-pointer; device was reported by the driver
        unsafe { cuda_check(sys::cudaDeviceGetDefaultMemPool(&mut pool, device)) }
            .map_err(|code| CudaError::CacheRelease { code })?;

        // SAFETY: pool handle obtained from the driver above
        unsafe { cuda_check(sys::cudaMemPoolTrimTo(pool, 0)) }
            .map_err(|code| CudaError::CacheRelease { code })?;

        tracing::debug!(device, "Released unused cached device memory");
        Ok(())
    }

    #[cfg(not(feature = "cuda"))]
    {
        Err(CudaError::CudaUnavailable {
            op: "cuda_empty_cache",
        })
    }
}

/// Free/total memory for the currently active device.
pub fn mem_info() -> Result<MemInfo, CudaError> {
    #[cfg(feature = "cuda")]
    {
        let mut free = 0usize;
        let mut total = 0usize;
        // SAFETY: free and total are valid out-pointers for the call
        unsafe { cuda_check(sys::cudaMemGetInfo(&mut free, &mut total)) }.map_err(|code| {
            CudaError::DeviceQuery {
                call: "cudaMemGetInfo",
                code,
            }
        })?;
        Ok(MemInfo { free, total })
    }

    #[cfg(not(feature = "cuda"))]
    {
        Err(CudaError::CudaUnavailable {
            op: "cuda_mem_info",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mem_info_used() {
        let info = MemInfo {
            free: 6 * 1024 * 1024 * 1024,
            total: 8 * 1024 * 1024 * 1024,
        };
        assert_eq!(info.used(), 2 * 1024 * 1024 * 1024);

        // A stale snapshot can report free > total; used saturates.
        let info = MemInfo { free: 10, total: 5 };
        assert_eq!(info.used(), 0);
    }

    #[cfg(not(feature = "cuda"))]
    #[test]
    fn test_empty_cache_unavailable_without_cuda() {
        let err = empty_cache().unwrap_err();
        assert_eq!(
            err,
            CudaError::CudaUnavailable {
                op: "cuda_empty_cache"
            }
        );
    }
}
