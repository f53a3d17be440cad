use std::ffi::c_void;

use regatta_common::error::{Error, Result};
use regatta_storage::Values;

use super::ffi::{DLDataType, DLDevice, DLTensor};

/// Capsule name while ownership has not been transferred.
pub const DLPACK_CAPSULE_NAME: &str = "dltensor";
/// Capsule name after a consumer has taken ownership. Both names are part of
/// the wire contract with DLPack consumers and must not change.
pub const DLPACK_CAPSULE_NAME_USED: &str = "used_dltensor";

/// Owns a tensor descriptor together with the context that keeps the
/// referenced memory alive.
///
/// The deleter ([`ManagedTensor::delete`]) runs exactly once no matter which
/// path releases the tensor; dropping the guard is the teardown hook for
/// callers that unwrapped a capsule themselves.
#[derive(Debug)]
pub struct ManagedTensor {
    tensor: DLTensor,
    ctx: Option<Box<TensorContext>>,
}

#[derive(Debug)]
struct TensorContext {
    shape: Vec<i64>,
    strides: Vec<i64>,
    /// Keeps the buffers behind `tensor.data` alive. Either a shared
    /// reference to a source column's backing storage (1-D export) or a
    /// buffer owned by this context alone (2-D export).
    #[allow(dead_code)]
    storage: Values,
}

impl ManagedTensor {
    pub(crate) fn new(
        storage: Values,
        data: *mut c_void,
        device: DLDevice,
        dtype: DLDataType,
        shape: Vec<i64>,
        strides: Vec<i64>,
    ) -> Self {
        let mut ctx = Box::new(TensorContext {
            shape,
            strides,
            storage,
        });
        let tensor = DLTensor {
            data,
            device,
            ndim: ctx.shape.len() as i32,
            dtype,
            shape: ctx.shape.as_mut_ptr(),
            strides: ctx.strides.as_mut_ptr(),
            byte_offset: 0,
        };
        Self {
            tensor,
            ctx: Some(ctx),
        }
    }

    pub fn dl_tensor(&self) -> &DLTensor {
        &self.tensor
    }

    pub fn device(&self) -> DLDevice {
        self.tensor.device
    }

    pub fn dtype(&self) -> DLDataType {
        self.tensor.dtype
    }

    pub fn shape(&self) -> &[i64] {
        self.ctx.as_ref().map(|c| c.shape.as_slice()).unwrap_or(&[])
    }

    pub fn strides(&self) -> &[i64] {
        self.ctx
            .as_ref()
            .map(|c| c.strides.as_slice())
            .unwrap_or(&[])
    }

    pub fn data_ptr(&self) -> *const c_void {
        self.tensor.data
    }

    pub fn is_deleted(&self) -> bool {
        self.ctx.is_none()
    }

    /// Releases the descriptor context and nulls the pointers. Idempotent;
    /// also runs on drop. Never frees source column storage the context only
    /// borrowed a reference to.
    pub fn delete(&mut self) {
        if self.ctx.take().is_some() {
            self.tensor.data = std::ptr::null_mut();
            self.tensor.shape = std::ptr::null_mut();
            self.tensor.strides = std::ptr::null_mut();
            self.tensor.ndim = 0;
        }
    }
}

impl Drop for ManagedTensor {
    fn drop(&mut self) {
        self.delete();
    }
}

/// Ownership state of a capsule, mirrored by its protocol name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapsuleState {
    Unconsumed,
    Consumed,
}

/// A named opaque handle transferring tensor ownership across the
/// interchange boundary.
///
/// Created in the `"dltensor"` state; the first successful consumption
/// renames it to `"used_dltensor"` and every later attempt observes
/// [`Error::CapsuleAlreadyConsumed`]. Dropping an unconsumed capsule runs
/// the deleter.
#[derive(Debug)]
pub struct TensorCapsule {
    state: CapsuleState,
    tensor: Option<ManagedTensor>,
}

impl TensorCapsule {
    pub(crate) fn new(tensor: ManagedTensor) -> Self {
        Self {
            state: CapsuleState::Unconsumed,
            tensor: Some(tensor),
        }
    }

    pub fn state(&self) -> CapsuleState {
        self.state
    }

    pub fn is_consumed(&self) -> bool {
        self.state == CapsuleState::Consumed
    }

    /// The capsule's current protocol name.
    pub fn name(&self) -> &'static str {
        match self.state {
            CapsuleState::Unconsumed => DLPACK_CAPSULE_NAME,
            CapsuleState::Consumed => DLPACK_CAPSULE_NAME_USED,
        }
    }

    /// Borrows the descriptor without affecting the capsule state.
    pub fn dl_tensor(&self) -> Option<&DLTensor> {
        self.tensor.as_ref().map(|t| t.dl_tensor())
    }

    /// Marks the capsule consumed and hands the descriptor to the caller
    /// without running its deleter.
    ///
    /// The returned guard's drop is the deleter from here on; the capsule
    /// itself stays behind renamed `"used_dltensor"`.
    pub fn take_tensor(&mut self) -> Result<ManagedTensor> {
        if self.state == CapsuleState::Consumed {
            return Err(Error::CapsuleAlreadyConsumed);
        }
        let tensor = self
            .tensor
            .take()
            .ok_or_else(|| Error::invalid_capsule("missing tensor descriptor"))?;
        self.state = CapsuleState::Consumed;
        Ok(tensor)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use aligned_vec::AVec;
    use regatta_storage::A64;

    use super::super::ffi::{cpu_device, dtype_i64};
    use super::*;

    fn sample_tensor() -> ManagedTensor {
        let buf: Arc<AVec<i64, A64>> = Arc::new(AVec::from_iter(64, [1i64, 2, 3]));
        let data = buf.as_ptr() as *mut c_void;
        ManagedTensor::new(
            Values::Int64(buf),
            data,
            cpu_device(),
            dtype_i64(),
            vec![3],
            vec![1],
        )
    }

    #[test]
    fn test_capsule_starts_unconsumed() {
        let capsule = TensorCapsule::new(sample_tensor());
        assert_eq!(capsule.state(), CapsuleState::Unconsumed);
        assert_eq!(capsule.name(), DLPACK_CAPSULE_NAME);
        assert!(capsule.dl_tensor().is_some());
    }

    #[test]
    fn test_take_renames_and_second_take_fails() {
        let mut capsule = TensorCapsule::new(sample_tensor());
        let tensor = capsule.take_tensor().unwrap();
        assert_eq!(capsule.name(), DLPACK_CAPSULE_NAME_USED);
        assert!(capsule.is_consumed());
        assert!(!tensor.is_deleted());

        let err = capsule.take_tensor().unwrap_err();
        assert_eq!(err, Error::CapsuleAlreadyConsumed);
    }

    #[test]
    fn test_delete_is_idempotent() {
        let mut tensor = sample_tensor();
        assert!(!tensor.data_ptr().is_null());
        tensor.delete();
        assert!(tensor.is_deleted());
        assert!(tensor.data_ptr().is_null());
        assert!(tensor.shape().is_empty());
        tensor.delete();
        assert!(tensor.is_deleted());
    }

    #[test]
    fn test_descriptor_reads_through_context() {
        let tensor = sample_tensor();
        assert_eq!(tensor.shape(), &[3]);
        assert_eq!(tensor.strides(), &[1]);
        assert_eq!(tensor.dtype(), dtype_i64());
        let dl = tensor.dl_tensor();
        assert_eq!(dl.ndim, 1);
        // SAFETY: shape points at the context-owned vec while undeleted.
        let shape0 = unsafe { *dl.shape };
        assert_eq!(shape0, 3);
    }

    #[test]
    fn test_capsule_name_constants() {
        assert_eq!(DLPACK_CAPSULE_NAME, "dltensor");
        assert_eq!(DLPACK_CAPSULE_NAME_USED, "used_dltensor");
    }
}
