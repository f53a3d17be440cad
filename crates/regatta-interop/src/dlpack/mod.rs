//! DLPack tensor interchange: capsule export and import.

mod capsule;
mod ffi;

use std::ffi::c_void;
use std::sync::Arc;

use aligned_vec::AVec;
use regatta_common::error::{Error, Result};

pub use self::capsule::{
    CapsuleState, DLPACK_CAPSULE_NAME, DLPACK_CAPSULE_NAME_USED, ManagedTensor, TensorCapsule,
};
pub use self::ffi::{
    DLDataType, DLDataTypeCode, DLDevice, DLDeviceType, DLTensor, cpu_device, dtype_f32,
    dtype_f64, dtype_i32, dtype_i64,
};
use regatta_common::types::DataType;
use regatta_storage::{A64, Column, Table, Values};

macro_rules! export_capsule {
    ($columns:expr, $rows:expr, $variant:ident, $ty:ty, $dtype:expr) => {{
        if $columns.len() == 1 {
            let col = $columns[0].as_ref();
            let Values::$variant(buf) = col.values() else {
                return Err(Error::internal("column variant mismatch"));
            };
            // SAFETY: the offset is inside the backing buffer and the context
            // below holds an Arc on it for the capsule's lifetime.
            let data = unsafe { buf.as_ptr().add(col.offset()) } as *mut c_void;
            ManagedTensor::new(
                Values::$variant(Arc::clone(buf)),
                data,
                cpu_device(),
                $dtype,
                vec![$rows as i64],
                vec![1],
            )
        } else {
            let mut packed: AVec<$ty, A64> = AVec::with_capacity(64, $rows * $columns.len());
            for col in $columns {
                let col = col.as_ref();
                let Values::$variant(buf) = col.values() else {
                    return Err(Error::internal("column variant mismatch"));
                };
                packed.extend_from_slice(&buf[col.offset()..col.offset() + col.len()]);
            }
            let buf = Arc::new(packed);
            let data = buf.as_ptr() as *mut c_void;
            ManagedTensor::new(
                Values::$variant(buf),
                data,
                cpu_device(),
                $dtype,
                vec![$rows as i64, $columns.len() as i64],
                vec![1, $rows as i64],
            )
        }
    }};
}

macro_rules! import_columns {
    ($tensor:expr, $ty:ty, $variant:ident, $rows:expr, $cols:expr, $rs:expr, $cs:expr) => {{
        let rows = $rows as usize;
        let cols = $cols as usize;
        let base = $tensor.data_ptr() as *const u8;
        if base.is_null() && rows * cols > 0 {
            return Err(Error::invalid_capsule("null data pointer"));
        }
        let byte_offset = $tensor.dl_tensor().byte_offset as usize;
        let mut columns = Vec::with_capacity(cols);
        for j in 0..cols {
            let mut data: AVec<$ty, A64> = AVec::with_capacity(64, rows.max(1));
            for i in 0..rows {
                let elem = (i as i64 * $rs + j as i64 * $cs) as usize;
                let off = byte_offset + elem * std::mem::size_of::<$ty>();
                // SAFETY: the descriptor's context keeps the storage alive
                // until `delete`, and `off` stays inside the extent described
                // by shape and strides.
                let value = unsafe { std::ptr::read_unaligned(base.add(off) as *const $ty) };
                data.push(value);
            }
            columns.push(Column::try_from_parts(
                Values::$variant(Arc::new(data)),
                None,
            )?);
        }
        Table::try_new(columns)
    }};
}

/// Exports an all-valid numeric table as a DLPack capsule.
///
/// A single column becomes a 1-D tensor referencing the column's backing
/// storage directly (no copy); multiple columns become a 2-D column-major
/// tensor over one materialized buffer owned by the capsule. The deleter
/// never frees the source columns' storage.
///
/// Checked before any conversion work: the column list must be non-empty,
/// every column must report zero nulls, and all columns must share one
/// numeric element type.
pub fn to_dlpack(table: &Table) -> Result<TensorCapsule> {
    let columns = table.columns();
    if columns.is_empty() {
        return Err(Error::invalid_tensor_shape("empty column list"));
    }
    for (idx, col) in columns.iter().enumerate() {
        let nulls = col.null_count();
        if nulls > 0 {
            return Err(Error::nulls_not_allowed(format!(
                "column {} has {} null values",
                idx, nulls
            )));
        }
    }
    let dtype = columns[0].data_type();
    if !dtype.is_numeric() {
        return Err(Error::unsupported_type(format!(
            "{} columns cannot form a tensor",
            dtype
        )));
    }
    for (idx, col) in columns.iter().enumerate().skip(1) {
        if col.data_type() != dtype {
            return Err(Error::invalid_tensor_shape(format!(
                "column {} is {}, expected {}",
                idx,
                col.data_type(),
                dtype
            )));
        }
    }
    let rows = table.num_rows();
    log::debug!("to_dlpack: {} x {} tensor of {}", rows, columns.len(), dtype);

    let tensor = match dtype {
        DataType::Int32 => export_capsule!(columns, rows, Int32, i32, dtype_i32()),
        DataType::Int64 => export_capsule!(columns, rows, Int64, i64, dtype_i64()),
        DataType::Float32 => export_capsule!(columns, rows, Float32, f32, dtype_f32()),
        DataType::Float64 => export_capsule!(columns, rows, Float64, f64, dtype_f64()),
        other => {
            return Err(Error::unsupported_type(format!(
                "{} columns cannot form a tensor",
                other
            )));
        }
    };
    Ok(TensorCapsule::new(tensor))
}

/// Consumes an unconsumed capsule into native columns.
///
/// The capsule is renamed `"used_dltensor"` before conversion; the
/// descriptor's deleter runs before this function returns, on both success
/// and error paths. Every produced column owns a fresh copy of its tensor
/// slice. A second call on the same capsule observes
/// [`Error::CapsuleAlreadyConsumed`].
pub fn from_dlpack(capsule: &mut TensorCapsule) -> Result<Table> {
    let mut tensor = capsule.take_tensor()?;
    let result = tensor_to_table(&tensor);
    tensor.delete();
    result
}

fn tensor_to_table(tensor: &ManagedTensor) -> Result<Table> {
    let device = tensor.device();
    if device.device_type != DLDeviceType::Cpu {
        return Err(Error::unsupported_type(format!(
            "device {:?} is not supported",
            device.device_type
        )));
    }
    let dtype = tensor.dtype();
    if dtype.lanes != 1 {
        return Err(Error::unsupported_type(format!(
            "{} vector lanes are not supported",
            dtype.lanes
        )));
    }
    let shape = tensor.shape();
    let (rows, cols) = match shape {
        [rows] => (*rows, 1),
        [rows, cols] => (*rows, *cols),
        _ => {
            return Err(Error::invalid_tensor_shape(format!(
                "{}-dimensional tensors are not supported",
                shape.len()
            )));
        }
    };
    if rows < 0 || cols < 0 {
        return Err(Error::invalid_tensor_shape(format!(
            "negative extent in shape {:?}",
            shape
        )));
    }
    let strides = tensor.strides();
    let (row_stride, col_stride) = if strides.len() == shape.len() {
        if strides.iter().any(|s| *s < 0) {
            return Err(Error::invalid_tensor_shape(
                "negative strides are not supported",
            ));
        }
        (strides[0], strides.get(1).copied().unwrap_or(0))
    } else {
        // Absent strides mean compact row-major per the DLPack convention.
        if shape.len() == 2 { (cols, 1) } else { (1, 0) }
    };
    log::debug!("from_dlpack: {} x {} tensor", rows, cols);

    match (dtype.code, dtype.bits) {
        (c, 32) if c == DLDataTypeCode::Int as u8 => {
            import_columns!(tensor, i32, Int32, rows, cols, row_stride, col_stride)
        }
        (c, 64) if c == DLDataTypeCode::Int as u8 => {
            import_columns!(tensor, i64, Int64, rows, cols, row_stride, col_stride)
        }
        (c, 32) if c == DLDataTypeCode::Float as u8 => {
            import_columns!(tensor, f32, Float32, rows, cols, row_stride, col_stride)
        }
        (c, 64) if c == DLDataTypeCode::Float as u8 => {
            import_columns!(tensor, f64, Float64, rows, cols, row_stride, col_stride)
        }
        (code, bits) => Err(Error::unsupported_type(format!(
            "tensor dtype (code {}, {} bits) has no native equivalent",
            code, bits
        ))),
    }
}
