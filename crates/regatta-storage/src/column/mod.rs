mod access;
mod mutation;
mod serde;

use std::sync::Arc;

use ::serde::{Deserialize, Serialize};
use aligned_vec::AVec;
use chrono::{DateTime, NaiveDate, Utc};
use regatta_common::error::{Error, Result};
use regatta_common::types::{DataType, StructField};
use rust_decimal::Decimal;

pub use self::serde::A64;
use crate::NullBitmap;

/// Typed backing buffers for one column.
///
/// Buffers are shared via `Arc`; a [`Column`] addresses them through its own
/// offset/length window, so cloning or slicing never copies element data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Values {
    Bool(Arc<Vec<bool>>),
    Int32(
        #[serde(
            serialize_with = "serde::serialize_avec_i32",
            deserialize_with = "serde::deserialize_avec_i32"
        )]
        Arc<AVec<i32, A64>>,
    ),
    Int64(
        #[serde(
            serialize_with = "serde::serialize_avec_i64",
            deserialize_with = "serde::deserialize_avec_i64"
        )]
        Arc<AVec<i64, A64>>,
    ),
    Float32(
        #[serde(
            serialize_with = "serde::serialize_avec_f32",
            deserialize_with = "serde::deserialize_avec_f32"
        )]
        Arc<AVec<f32, A64>>,
    ),
    Float64(
        #[serde(
            serialize_with = "serde::serialize_avec_f64",
            deserialize_with = "serde::deserialize_avec_f64"
        )]
        Arc<AVec<f64, A64>>,
    ),
    Numeric(Arc<Vec<Decimal>>),
    String(Arc<Vec<String>>),
    Date(Arc<Vec<NaiveDate>>),
    Timestamp(Arc<Vec<DateTime<Utc>>>),
    List {
        /// Element boundaries, absolute into the child's row space; row `i`
        /// of the backing column spans `offsets[i]..offsets[i + 1]`.
        offsets: Arc<Vec<i32>>,
        child: Box<Column>,
    },
    Struct {
        fields: Vec<StructField>,
        /// One column per field, covering exactly the parent's view.
        children: Vec<Column>,
    },
    Dictionary {
        #[serde(
            serialize_with = "serde::serialize_avec_i32",
            deserialize_with = "serde::deserialize_avec_i32"
        )]
        keys: Arc<AVec<i32, A64>>,
        values: Box<Column>,
    },
}

/// A typed, nullable sequence of values.
///
/// `offset`/`len` delimit a window into the shared backing buffers; an absent
/// bitmap and an all-valid bitmap are equivalent states. Struct children are
/// sliced together with their parent, list offsets index the full child.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    values: Values,
    nulls: Option<Arc<NullBitmap>>,
    offset: usize,
    len: usize,
}

impl Column {
    /// Creates an empty column of the given type.
    pub fn new(data_type: &DataType) -> Self {
        let values = match data_type {
            DataType::Bool => Values::Bool(Arc::new(Vec::new())),
            DataType::Int32 => Values::Int32(Arc::new(AVec::new(64))),
            DataType::Int64 => Values::Int64(Arc::new(AVec::new(64))),
            DataType::Float32 => Values::Float32(Arc::new(AVec::new(64))),
            DataType::Float64 => Values::Float64(Arc::new(AVec::new(64))),
            DataType::Numeric(_) => Values::Numeric(Arc::new(Vec::new())),
            DataType::String => Values::String(Arc::new(Vec::new())),
            DataType::Date => Values::Date(Arc::new(Vec::new())),
            DataType::Timestamp => Values::Timestamp(Arc::new(Vec::new())),
            DataType::List(elem_type) => Values::List {
                offsets: Arc::new(vec![0]),
                child: Box::new(Column::new(elem_type)),
            },
            DataType::Struct(fields) => Values::Struct {
                fields: fields.clone(),
                children: fields.iter().map(|f| Column::new(&f.data_type)).collect(),
            },
            DataType::Dictionary(value_type) => Values::Dictionary {
                keys: Arc::new(AVec::new(64)),
                values: Box::new(Column::new(value_type)),
            },
        };
        Self {
            values,
            nulls: None,
            offset: 0,
            len: 0,
        }
    }

    /// Builds a column of `data_type` from a sequence of values.
    pub fn from_values(
        data_type: &DataType,
        values: impl IntoIterator<Item = regatta_common::types::Value>,
    ) -> Result<Self> {
        let mut column = Column::new(data_type);
        for value in values {
            column.push(value)?;
        }
        Ok(column)
    }

    /// Assembles an owned column from backing parts.
    ///
    /// The view covers the whole backing. A bitmap, when present, must match
    /// the backing length, and struct children must be equal-length.
    pub fn try_from_parts(values: Values, nulls: Option<NullBitmap>) -> Result<Self> {
        let len = match backing_len_of(&values) {
            Some(len) => len,
            None => nulls.as_ref().map(|b| b.len()).unwrap_or(0),
        };
        if let Values::Struct { children, .. } = &values {
            for child in children {
                if child.len() != len {
                    return Err(Error::schema_mismatch(format!(
                        "struct child has {} rows, expected {}",
                        child.len(),
                        len
                    )));
                }
            }
        }
        if let Some(bitmap) = &nulls {
            if bitmap.len() != len {
                return Err(Error::schema_mismatch(format!(
                    "validity bitmap covers {} rows, expected {}",
                    bitmap.len(),
                    len
                )));
            }
        }
        Ok(Self {
            values,
            nulls: nulls.map(Arc::new),
            offset: 0,
            len,
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Window start into the backing buffers.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn values(&self) -> &Values {
        &self.values
    }

    pub fn nulls(&self) -> Option<&NullBitmap> {
        self.nulls.as_deref()
    }

    pub fn data_type(&self) -> DataType {
        match &self.values {
            Values::Bool(_) => DataType::Bool,
            Values::Int32(_) => DataType::Int32,
            Values::Int64(_) => DataType::Int64,
            Values::Float32(_) => DataType::Float32,
            Values::Float64(_) => DataType::Float64,
            Values::Numeric(_) => DataType::Numeric(None),
            Values::String(_) => DataType::String,
            Values::Date(_) => DataType::Date,
            Values::Timestamp(_) => DataType::Timestamp,
            Values::List { child, .. } => DataType::List(Box::new(child.data_type())),
            Values::Struct { fields, .. } => DataType::Struct(fields.clone()),
            Values::Dictionary { values, .. } => {
                DataType::Dictionary(Box::new(values.data_type()))
            }
        }
    }

    /// Zero-copy view of `len` rows starting at `offset`.
    pub fn slice(&self, offset: usize, len: usize) -> Result<Self> {
        if offset.saturating_add(len) > self.len {
            return Err(Error::out_of_bounds(offset + len, self.len));
        }
        let values = match &self.values {
            Values::Struct { fields, children } => Values::Struct {
                fields: fields.clone(),
                children: children
                    .iter()
                    .map(|c| c.slice(offset, len))
                    .collect::<Result<Vec<_>>>()?,
            },
            other => other.clone(),
        };
        Ok(Self {
            values,
            nulls: self.nulls.clone(),
            offset: self.offset + offset,
            len,
        })
    }

    /// Number of rows the backing buffers hold.
    fn backing_len(&self) -> usize {
        backing_len_of(&self.values).unwrap_or(self.len)
    }

    pub(crate) fn is_contiguous(&self) -> bool {
        self.offset == 0 && self.len == self.backing_len()
    }
}

/// Row count implied by backing buffers; `None` when the buffers alone cannot
/// tell (a struct with no fields).
fn backing_len_of(values: &Values) -> Option<usize> {
    match values {
        Values::Bool(data) => Some(data.len()),
        Values::Int32(data) => Some(data.len()),
        Values::Int64(data) => Some(data.len()),
        Values::Float32(data) => Some(data.len()),
        Values::Float64(data) => Some(data.len()),
        Values::Numeric(data) => Some(data.len()),
        Values::String(data) => Some(data.len()),
        Values::Date(data) => Some(data.len()),
        Values::Timestamp(data) => Some(data.len()),
        Values::List { offsets, .. } => Some(offsets.len().saturating_sub(1)),
        Values::Struct { children, .. } => children.first().map(|c| c.len()),
        Values::Dictionary { keys, .. } => Some(keys.len()),
    }
}

impl PartialEq for Column {
    /// Logical equality: same type and element sequence. A sliced view equals
    /// an owned column with the same content; an absent bitmap equals an
    /// all-valid one.
    fn eq(&self, other: &Self) -> bool {
        self.data_type() == other.data_type()
            && self.len == other.len
            && (0..self.len).all(|i| self.get_value(i) == other.get_value(i))
    }
}
