//! Conversion between native tables and Arrow `RecordBatch`es.

use std::sync::Arc;

use aligned_vec::AVec;
use arrow::array::{
    Array, ArrayRef, AsArray, BooleanArray, Date32Array, Decimal128Array, DictionaryArray,
    Float32Array, Float64Array, Int32Array, Int64Array, ListArray, StringArray, StructArray,
    TimestampMicrosecondArray,
};
use arrow::buffer::{BooleanBuffer, NullBuffer, OffsetBuffer, ScalarBuffer};
use arrow::datatypes::{
    DataType as ArrowDataType, Date32Type, Decimal128Type, Field, Fields, Float32Type,
    Float64Type, Int32Type, Int64Type, Schema, TimeUnit, TimestampMicrosecondType,
};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use chrono::DateTime;
use regatta_common::error::{Error, Result};
use regatta_common::types::{StructField, Value};
use regatta_storage::{A64, Column, NullBitmap, Table, Values};
use rust_decimal::Decimal;

use crate::metadata::ColumnMetadata;

/// Precision/scale used for NUMERIC columns on the Arrow side.
const NUMERIC_PRECISION: u8 = 38;
const NUMERIC_SCALE: u8 = 9;

/// Converts a table into an Arrow record batch.
///
/// One field per column; field names (and nested struct field names) come
/// from the metadata tree, which must match the table's shape. The table is
/// not consumed; buffers are copied into Arrow's layout.
pub fn to_arrow(table: &Table, metadata: &[ColumnMetadata]) -> Result<RecordBatch> {
    if metadata.len() != table.num_columns() {
        return Err(Error::invalid_metadata_shape(format!(
            "{} metadata nodes for {} columns",
            metadata.len(),
            table.num_columns()
        )));
    }
    log::debug!(
        "to_arrow: {} columns x {} rows",
        table.num_columns(),
        table.num_rows()
    );

    let mut fields = Vec::with_capacity(table.num_columns());
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(table.num_columns());
    for (col, meta) in table.columns().iter().zip(metadata) {
        let array = column_to_array(col, Some(meta))?;
        fields.push(Field::new(meta.name.clone(), array.data_type().clone(), true));
        arrays.push(array);
    }

    let schema = Arc::new(Schema::new(fields));
    let options = RecordBatchOptions::new().with_row_count(Some(table.num_rows()));
    RecordBatch::try_new_with_options(schema, arrays, &options)
        .map_err(|e| Error::internal(e.to_string()))
}

/// Converts an Arrow record batch into a native table.
///
/// The resulting columns own their storage independent of the input batch.
pub fn from_arrow(batch: &RecordBatch) -> Result<Table> {
    log::debug!(
        "from_arrow: {} columns x {} rows",
        batch.num_columns(),
        batch.num_rows()
    );
    let columns = batch
        .columns()
        .iter()
        .map(array_to_column)
        .collect::<Result<Vec<_>>>()?;
    Table::try_new(columns)
}

fn column_to_array(col: &Column, meta: Option<&ColumnMetadata>) -> Result<ArrayRef> {
    if let Some(meta) = meta {
        if !meta.children.is_empty() && !matches!(col.values(), Values::Struct { .. }) {
            return Err(Error::invalid_metadata_shape(format!(
                "metadata for a {} column cannot carry children",
                col.data_type()
            )));
        }
    }
    let n = col.len();

    match col.values() {
        Values::Bool(_) => {
            let values: Vec<Option<bool>> = col
                .iter()
                .map(|v| match v {
                    Value::Bool(b) => Some(b),
                    _ => None,
                })
                .collect();
            Ok(Arc::new(BooleanArray::from(values)))
        }
        Values::Int32(_) => {
            let values: Vec<Option<i32>> = col
                .iter()
                .map(|v| match v {
                    Value::Int32(x) => Some(x),
                    _ => None,
                })
                .collect();
            Ok(Arc::new(Int32Array::from(values)))
        }
        Values::Int64(_) => {
            let values: Vec<Option<i64>> = col
                .iter()
                .map(|v| match v {
                    Value::Int64(x) => Some(x),
                    _ => None,
                })
                .collect();
            Ok(Arc::new(Int64Array::from(values)))
        }
        Values::Float32(_) => {
            let values: Vec<Option<f32>> = col
                .iter()
                .map(|v| match v {
                    Value::Float32(x) => Some(x.0),
                    _ => None,
                })
                .collect();
            Ok(Arc::new(Float32Array::from(values)))
        }
        Values::Float64(_) => {
            let values: Vec<Option<f64>> = col
                .iter()
                .map(|v| match v {
                    Value::Float64(x) => Some(x.0),
                    _ => None,
                })
                .collect();
            Ok(Arc::new(Float64Array::from(values)))
        }
        Values::Numeric(_) => {
            let values: Vec<Option<i128>> = col
                .iter()
                .map(|v| match v {
                    Value::Numeric(mut d) => {
                        d.rescale(NUMERIC_SCALE as u32);
                        Some(d.mantissa())
                    }
                    _ => None,
                })
                .collect();
            let array = Decimal128Array::from(values)
                .with_precision_and_scale(NUMERIC_PRECISION, NUMERIC_SCALE as i8)
                .map_err(|e| Error::unsupported_type(e.to_string()))?;
            Ok(Arc::new(array))
        }
        Values::String(_) => {
            let values: Vec<Option<String>> = col
                .iter()
                .map(|v| match v {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect();
            Ok(Arc::new(StringArray::from(values)))
        }
        Values::Date(_) => {
            let values: Vec<Option<i32>> = col
                .iter()
                .map(|v| match v {
                    Value::Date(d) => Some(Date32Type::from_naive_date(d)),
                    _ => None,
                })
                .collect();
            Ok(Arc::new(Date32Array::from(values)))
        }
        Values::Timestamp(_) => {
            let values: Vec<Option<i64>> = col
                .iter()
                .map(|v| match v {
                    Value::Timestamp(ts) => Some(ts.timestamp_micros()),
                    _ => None,
                })
                .collect();
            Ok(Arc::new(
                TimestampMicrosecondArray::from(values).with_timezone("UTC"),
            ))
        }
        Values::List { offsets, child } => {
            let base = col.offset();
            let start = offsets[base] as usize;
            let end = offsets[base + n] as usize;
            let child_view = child.slice(start, end - start)?;
            let child_array = column_to_array(&child_view, None)?;
            let rebased: Vec<i32> = offsets[base..=base + n]
                .iter()
                .map(|o| o - start as i32)
                .collect();
            let field = Arc::new(Field::new("item", child_array.data_type().clone(), true));
            let array = ListArray::try_new(
                field,
                OffsetBuffer::new(ScalarBuffer::from(rebased)),
                child_array,
                view_nulls(col),
            )
            .map_err(|e| Error::internal(e.to_string()))?;
            Ok(Arc::new(array))
        }
        Values::Struct { fields, children } => {
            let metas: &[ColumnMetadata] = meta.map(|m| m.children.as_slice()).unwrap_or(&[]);
            if !metas.is_empty() && metas.len() != children.len() {
                return Err(Error::invalid_metadata_shape(format!(
                    "{} metadata children for {} struct fields",
                    metas.len(),
                    children.len()
                )));
            }
            if children.is_empty() {
                return Ok(Arc::new(StructArray::new_empty_fields(n, view_nulls(col))));
            }
            let mut arrow_fields = Vec::with_capacity(children.len());
            let mut arrays: Vec<ArrayRef> = Vec::with_capacity(children.len());
            for (i, (field, child)) in fields.iter().zip(children.iter()).enumerate() {
                let child_meta = metas.get(i);
                let array = column_to_array(child, child_meta)?;
                let name = child_meta
                    .map(|m| m.name.as_str())
                    .filter(|name| !name.is_empty())
                    .unwrap_or(field.name.as_str());
                arrow_fields.push(Arc::new(Field::new(name, array.data_type().clone(), true)));
                arrays.push(array);
            }
            let array = StructArray::try_new(Fields::from(arrow_fields), arrays, view_nulls(col))
                .map_err(|e| Error::internal(e.to_string()))?;
            Ok(Arc::new(array))
        }
        Values::Dictionary { keys, values } => {
            let base = col.offset();
            let key_values: Vec<Option<i32>> = (0..n)
                .map(|i| {
                    if col.is_null(i) {
                        None
                    } else {
                        Some(keys[base + i])
                    }
                })
                .collect();
            let keys_array = Int32Array::from(key_values);
            let values_array = column_to_array(values, None)?;
            let array = DictionaryArray::<Int32Type>::try_new(keys_array, values_array)
                .map_err(|e| Error::unsupported_type(e.to_string()))?;
            Ok(Arc::new(array))
        }
    }
}

fn array_to_column(array: &ArrayRef) -> Result<Column> {
    let n = array.len();
    match array.data_type() {
        ArrowDataType::Boolean => {
            let arr = array.as_boolean();
            let data: Vec<bool> = (0..n).map(|i| arr.is_valid(i) && arr.value(i)).collect();
            Column::try_from_parts(Values::Bool(Arc::new(data)), array_nulls(array.as_ref()))
        }
        ArrowDataType::Int32 => {
            let arr = array.as_primitive::<Int32Type>();
            let data: AVec<i32, A64> = AVec::from_iter(
                64,
                (0..n).map(|i| if arr.is_valid(i) { arr.value(i) } else { 0 }),
            );
            Column::try_from_parts(Values::Int32(Arc::new(data)), array_nulls(array.as_ref()))
        }
        ArrowDataType::Int64 => {
            let arr = array.as_primitive::<Int64Type>();
            let data: AVec<i64, A64> = AVec::from_iter(
                64,
                (0..n).map(|i| if arr.is_valid(i) { arr.value(i) } else { 0 }),
            );
            Column::try_from_parts(Values::Int64(Arc::new(data)), array_nulls(array.as_ref()))
        }
        ArrowDataType::Float32 => {
            let arr = array.as_primitive::<Float32Type>();
            let data: AVec<f32, A64> = AVec::from_iter(
                64,
                (0..n).map(|i| if arr.is_valid(i) { arr.value(i) } else { 0.0 }),
            );
            Column::try_from_parts(Values::Float32(Arc::new(data)), array_nulls(array.as_ref()))
        }
        ArrowDataType::Float64 => {
            let arr = array.as_primitive::<Float64Type>();
            let data: AVec<f64, A64> = AVec::from_iter(
                64,
                (0..n).map(|i| if arr.is_valid(i) { arr.value(i) } else { 0.0 }),
            );
            Column::try_from_parts(Values::Float64(Arc::new(data)), array_nulls(array.as_ref()))
        }
        ArrowDataType::Utf8 => {
            let arr = array.as_string::<i32>();
            let data: Vec<String> = (0..n)
                .map(|i| {
                    if arr.is_valid(i) {
                        arr.value(i).to_string()
                    } else {
                        String::new()
                    }
                })
                .collect();
            Column::try_from_parts(Values::String(Arc::new(data)), array_nulls(array.as_ref()))
        }
        ArrowDataType::Date32 => {
            let arr = array.as_primitive::<Date32Type>();
            let data: Vec<chrono::NaiveDate> = (0..n)
                .map(|i| {
                    let days = if arr.is_valid(i) { arr.value(i) } else { 0 };
                    Date32Type::to_naive_date(days)
                })
                .collect();
            Column::try_from_parts(Values::Date(Arc::new(data)), array_nulls(array.as_ref()))
        }
        ArrowDataType::Timestamp(TimeUnit::Microsecond, _) => {
            let arr = array.as_primitive::<TimestampMicrosecondType>();
            let mut data = Vec::with_capacity(n);
            for i in 0..n {
                let micros = if arr.is_valid(i) { arr.value(i) } else { 0 };
                let ts = DateTime::from_timestamp_micros(micros).ok_or_else(|| {
                    Error::unsupported_type(format!("timestamp {} out of range", micros))
                })?;
                data.push(ts);
            }
            Column::try_from_parts(
                Values::Timestamp(Arc::new(data)),
                array_nulls(array.as_ref()),
            )
        }
        ArrowDataType::Decimal128(_, scale) => {
            if *scale < 0 {
                return Err(Error::unsupported_type(format!(
                    "decimal scale {} is negative",
                    scale
                )));
            }
            let arr = array.as_primitive::<Decimal128Type>();
            let mut data = Vec::with_capacity(n);
            for i in 0..n {
                let raw = if arr.is_valid(i) { arr.value(i) } else { 0 };
                let value = Decimal::try_from_i128_with_scale(raw, *scale as u32)
                    .map_err(|e| Error::unsupported_type(format!("decimal out of range: {}", e)))?;
                data.push(value);
            }
            Column::try_from_parts(Values::Numeric(Arc::new(data)), array_nulls(array.as_ref()))
        }
        ArrowDataType::List(_) => {
            let arr = array.as_list::<i32>();
            let offsets = arr.value_offsets();
            let start = offsets[0];
            let child_slice = arr
                .values()
                .slice(start as usize, (offsets[n] - start) as usize);
            let child = array_to_column(&child_slice)?;
            let rebased: Vec<i32> = offsets.iter().map(|o| o - start).collect();
            Column::try_from_parts(
                Values::List {
                    offsets: Arc::new(rebased),
                    child: Box::new(child),
                },
                array_nulls(array.as_ref()),
            )
        }
        ArrowDataType::Struct(arrow_fields) => {
            let arr = array.as_struct();
            let mut fields = Vec::with_capacity(arrow_fields.len());
            let mut children = Vec::with_capacity(arrow_fields.len());
            for (field, column) in arrow_fields.iter().zip(arr.columns()) {
                let child = array_to_column(column)?;
                fields.push(StructField::new(field.name(), child.data_type()));
                children.push(child);
            }
            Column::try_from_parts(
                Values::Struct { fields, children },
                array_nulls(array.as_ref()),
            )
        }
        ArrowDataType::Dictionary(key_type, _) => {
            if **key_type != ArrowDataType::Int32 {
                return Err(Error::unsupported_type(format!(
                    "dictionary keyed by {}",
                    key_type
                )));
            }
            let arr = array.as_dictionary::<Int32Type>();
            let keys = arr.keys();
            let data: AVec<i32, A64> = AVec::from_iter(
                64,
                (0..n).map(|i| if keys.is_valid(i) { keys.value(i) } else { 0 }),
            );
            let values = array_to_column(arr.values())?;
            Column::try_from_parts(
                Values::Dictionary {
                    keys: Arc::new(data),
                    values: Box::new(values),
                },
                array_nulls(array.as_ref()),
            )
        }
        other => Err(Error::unsupported_type(format!(
            "arrow type {} has no native equivalent",
            other
        ))),
    }
}

fn view_nulls(col: &Column) -> Option<NullBuffer> {
    if col.null_count() == 0 {
        return None;
    }
    let valid: Vec<bool> = (0..col.len()).map(|i| col.is_valid(i)).collect();
    Some(NullBuffer::new(BooleanBuffer::from(valid)))
}

fn array_nulls(array: &dyn Array) -> Option<NullBitmap> {
    if array.null_count() == 0 {
        return None;
    }
    let mut bitmap = NullBitmap::new();
    for i in 0..array.len() {
        bitmap.push(array.is_null(i));
    }
    Some(bitmap)
}
