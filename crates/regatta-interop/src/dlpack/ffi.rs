//! C-ABI descriptor types from the DLPack specification.

use std::ffi::c_void;

/// Device kinds a tensor descriptor can reference.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DLDeviceType {
    Cpu = 1,
    Cuda = 2,
    CudaHost = 3,
    OpenCl = 4,
    Vulkan = 7,
    Metal = 8,
    Rocm = 10,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DLDevice {
    pub device_type: DLDeviceType,
    pub device_id: i32,
}

pub fn cpu_device() -> DLDevice {
    DLDevice {
        device_type: DLDeviceType::Cpu,
        device_id: 0,
    }
}

/// Element type codes from the DLPack ABI.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DLDataTypeCode {
    Int = 0,
    UInt = 1,
    Float = 2,
    OpaqueHandle = 3,
    Bfloat = 4,
    Complex = 5,
    Bool = 6,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DLDataType {
    pub code: u8,
    pub bits: u8,
    pub lanes: u16,
}

pub fn dtype_i32() -> DLDataType {
    DLDataType {
        code: DLDataTypeCode::Int as u8,
        bits: 32,
        lanes: 1,
    }
}

pub fn dtype_i64() -> DLDataType {
    DLDataType {
        code: DLDataTypeCode::Int as u8,
        bits: 64,
        lanes: 1,
    }
}

pub fn dtype_f32() -> DLDataType {
    DLDataType {
        code: DLDataTypeCode::Float as u8,
        bits: 32,
        lanes: 1,
    }
}

pub fn dtype_f64() -> DLDataType {
    DLDataType {
        code: DLDataTypeCode::Float as u8,
        bits: 64,
        lanes: 1,
    }
}

/// The plain tensor descriptor: type, shape, strides, data pointer.
///
/// `shape` and `strides` point at `ndim` entries owned by the surrounding
/// managed context; `strides` may be null, meaning compact row-major.
/// Strides are in elements, not bytes.
#[repr(C)]
#[derive(Debug)]
pub struct DLTensor {
    pub data: *mut c_void,
    pub device: DLDevice,
    pub ndim: i32,
    pub dtype: DLDataType,
    pub shape: *mut i64,
    pub strides: *mut i64,
    pub byte_offset: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dtype_helpers() {
        assert_eq!(
            dtype_i32(),
            DLDataType {
                code: 0,
                bits: 32,
                lanes: 1
            }
        );
        assert_eq!(
            dtype_f64(),
            DLDataType {
                code: 2,
                bits: 64,
                lanes: 1
            }
        );
    }

    #[test]
    fn test_cpu_device() {
        let device = cpu_device();
        assert_eq!(device.device_type, DLDeviceType::Cpu);
        assert_eq!(device.device_id, 0);
    }
}
