//! Regatta - columnar table interchange for Arrow and DLPack.
//!
//! Regatta models tables as ordered sets of typed, nullable, nested columns
//! over reference-counted backing buffers, and converts them to and from two
//! standard exchange formats:
//!
//! - **Arrow**: [`to_arrow`] / [`from_arrow`] move whole tables across the
//!   Arrow `RecordBatch` boundary, with export names for nested columns
//!   described by a [`ColumnMetadata`] tree ([`gather_metadata`]).
//! - **DLPack**: [`to_dlpack`] / [`from_dlpack`] move all-valid numeric
//!   tables through capsule-wrapped tensor descriptors with
//!   single-consumption ownership transfer.
//!
//! # Architecture
//!
//! ```text
//! Column/Table model → metadata walker → Arrow or DLPack converter
//! ```
//!
//! Conversions are one-shot and all-or-nothing: an error leaves no partial
//! tables, no half-renamed capsules, and no leaked buffers.
//!
//! # Example
//!
//! ```rust
//! use regatta::{Column, ColumnNames, DataType, Table, Value};
//! use regatta::{from_arrow, gather_metadata, to_arrow};
//!
//! let ints =
//!     Column::from_values(&DataType::Int64, vec![Value::Int64(1), Value::Null]).unwrap();
//! let table = Table::try_new(vec![ints]).unwrap();
//!
//! let names = ColumnNames::new().with("ints");
//! let metadata = gather_metadata(&table, Some(&names)).unwrap();
//! let batch = to_arrow(&table, &metadata).unwrap();
//! assert_eq!(batch.schema().field(0).name(), "ints");
//!
//! let back = from_arrow(&batch).unwrap();
//! assert_eq!(back, table);
//! ```

pub use arrow;
pub use regatta_common::error::{Error, Result};
pub use regatta_common::types::{DataType, StructField, Value};
pub use regatta_interop::{
    CapsuleState, ColumnMetadata, ColumnNames, DLPACK_CAPSULE_NAME, DLPACK_CAPSULE_NAME_USED,
    ManagedTensor, TensorCapsule, from_arrow, from_dlpack, gather_metadata, to_arrow, to_dlpack,
};
pub use regatta_storage::{Column, NullBitmap, Table, Values};
