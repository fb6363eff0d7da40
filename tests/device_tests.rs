//! Integration tests for device selection and validation.

use cuda_devctl::gpu::device::{validate_device_id, Device, DeviceInfo};
use cuda_devctl::CudaError;

#[test]
fn test_selection_window() {
    // Two visible devices: 0 and 1 are selectable, 2 and -1 are not.
    let count = 2;

    validate_device_id(0, count).unwrap();
    validate_device_id(1, count).unwrap();

    let err = validate_device_id(2, count).unwrap_err();
    assert_eq!(
        err.to_string(),
        "invalid device id 2 for CUDA (available devices: 2)"
    );

    let err = validate_device_id(-1, count).unwrap_err();
    assert!(matches!(
        err,
        CudaError::InvalidDeviceId {
            requested: -1,
            available: 2
        }
    ));
}

#[test]
fn test_no_devices_rejects_everything() {
    for id in [-1, 0, 1, 100] {
        assert!(validate_device_id(id, 0).is_err());
    }
}

#[test]
fn test_device_string_forms() {
    assert_eq!("cpu".parse::<Device>().unwrap(), Device::Cpu);
    assert_eq!("cuda".parse::<Device>().unwrap(), Device::Cuda(0));
    assert_eq!("cuda:2".parse::<Device>().unwrap(), Device::Cuda(2));
    assert_eq!("0".parse::<Device>().unwrap(), Device::Cuda(0));

    assert_eq!(Device::Cuda(2).index(), Some(2));
    assert_eq!(Device::Cpu.index(), None);

    let err = "rocm:0".parse::<Device>().unwrap_err();
    assert!(matches!(err, CudaError::InvalidDeviceString(_)));
}

#[test]
fn test_device_info_json_shape() {
    let info = DeviceInfo {
        id: 0,
        name: "NVIDIA GeForce GTX 1070".to_string(),
        total_mem: 8 * 1024 * 1024 * 1024,
        free_mem: 7 * 1024 * 1024 * 1024,
        compute_capability: (6, 1),
    };

    let json = serde_json::to_string(&info).unwrap();
    assert!(json.contains("\"id\":0"));
    assert!(json.contains("GTX 1070"));

    let back: DeviceInfo = serde_json::from_str(&json).unwrap();
    assert_eq!(back.compute_capability, (6, 1));
    assert_eq!(back.total_mem, info.total_mem);
}

// Exercises the real activation path when a driver and at least one
// device are present; skips quietly otherwise so the suite stays green
// on CUDA-enabled builds running on CPU-only machines.
#[cfg(feature = "cuda")]
#[test]
fn test_activation_on_hardware() {
    use cuda_devctl::gpu::device::{current_device, device_count, set_device};

    let count = match device_count() {
        Ok(n) if n > 0 => n,
        _ => return,
    };

    for id in 0..count as i32 {
        set_device(id).unwrap();
        assert_eq!(current_device().unwrap(), id);
    }

    let err = set_device(count as i32).unwrap_err();
    assert!(matches!(err, CudaError::InvalidDeviceId { .. }));

    set_device(0).unwrap();
}
