//! cuda-devctl: CUDA device selection and cache reclamation.
//!
//! A thin, validated boundary over the CUDA runtime for inference hosts:
//! pick an accelerator device by index (with range checking against the
//! driver-reported count) and force the caching allocator to hand unused
//! pooled memory back to the platform.
//!
//! All platform access is gated behind the `cuda` cargo feature. Without
//! it the crate still builds and the pure logic (validation, device
//! parsing, inventory types) is fully usable; the operations that need a
//! driver fail with [`gpu::CudaError::CudaUnavailable`].

pub mod gpu;

pub use gpu::device::{
    current_device, detect_devices, device_count, set_device, validate_device_id, Device,
    DeviceInfo,
};
pub use gpu::memory::{empty_cache, mem_info, MemInfo};
pub use gpu::CudaError;
