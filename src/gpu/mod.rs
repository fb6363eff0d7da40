//! GPU device control and allocator cache management.
//!
//! - [`device`]: device discovery, validation, and activation
//! - [`memory`]: caching-allocator reclaim and memory snapshots
//!
//! Everything that touches the CUDA runtime is compiled only with the
//! `cuda` feature; the fallback paths fail with
//! [`CudaError::CudaUnavailable`] instead of attempting a platform call.

pub mod device;
pub mod memory;

use thiserror::Error;

/// Failures surfaced by the device-control boundary.
///
/// Platform failures carry the raw `cudaError_t` status code so callers
/// can correlate with driver logs; nothing is retried or recovered here.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CudaError {
    #[error("{op} requires CUDA support (crate built without the `cuda` feature)")]
    CudaUnavailable { op: &'static str },

    #[error("{call} failed with code {code}")]
    DeviceQuery { call: &'static str, code: i32 },

    #[error("invalid device id {requested} for CUDA (available devices: {available})")]
    InvalidDeviceId { requested: i32, available: usize },

    #[error("cudaSetDevice({device_id}) failed with code {code}")]
    DeviceActivation { device_id: i32, code: i32 },

    #[error("failed to probe device {device_id} with code {code}")]
    DeviceProbe { device_id: i32, code: i32 },

    #[error("cache release failed with code {code}")]
    CacheRelease { code: i32 },

    #[error("unrecognized device string: {0:?}")]
    InvalidDeviceString(String),
}

/// Translate a raw runtime status into the numeric code, `Ok` on success.
///
/// The caller picks the [`CudaError`] variant the code lands in, since
/// the same status means different things on different calls.
#[cfg(feature = "cuda")]
pub(crate) fn cuda_check(status: cudarc::runtime::sys::cudaError_t) -> Result<(), i32> {
    use cudarc::runtime::sys::cudaError_t;

    if status == cudaError_t::cudaSuccess {
        Ok(())
    } else {
        Err(status as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_payloads() {
        let err = CudaError::InvalidDeviceId {
            requested: 2,
            available: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("invalid device id 2"));
        assert!(msg.contains("available devices: 2"));

        let err = CudaError::DeviceActivation {
            device_id: 1,
            code: 101,
        };
        assert_eq!(err.to_string(), "cudaSetDevice(1) failed with code 101");

        let err = CudaError::DeviceQuery {
            call: "cudaGetDeviceCount",
            code: 3,
        };
        assert_eq!(err.to_string(), "cudaGetDeviceCount failed with code 3");
    }

    #[test]
    fn test_unavailable_message_names_operation() {
        let err = CudaError::CudaUnavailable {
            op: "cuda_set_device",
        };
        assert!(err.to_string().starts_with("cuda_set_device"));
        assert!(err.to_string().contains("CUDA support"));
    }
}
