//! Interchange boundary for Regatta tables.
//!
//! Converts the native column/table model to and from Arrow record batches
//! ([`to_arrow`]/[`from_arrow`]) and DLPack tensor capsules
//! ([`to_dlpack`]/[`from_dlpack`]). Export naming for nested columns is
//! described by a [`ColumnMetadata`] tree built with [`gather_metadata`].

mod arrow_convert;
mod dlpack;
mod metadata;

pub use arrow_convert::{from_arrow, to_arrow};
pub use dlpack::{
    CapsuleState, DLDataType, DLDataTypeCode, DLDevice, DLDeviceType, DLPACK_CAPSULE_NAME,
    DLPACK_CAPSULE_NAME_USED, DLTensor, ManagedTensor, TensorCapsule, cpu_device, dtype_f32,
    dtype_f64, dtype_i32, dtype_i64, from_dlpack, to_dlpack,
};
pub use metadata::{ColumnMetadata, ColumnNames, gather_metadata};
