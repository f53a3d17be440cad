use regatta_common::error::{Error, Result};
use regatta_common::types::Value;

use super::{Column, Values};

impl Column {
    /// Whether row `index` of the view is null. Out-of-range reads report
    /// null, matching the bitmap's convention.
    pub fn is_null(&self, index: usize) -> bool {
        if index >= self.len() {
            return true;
        }
        match &self.nulls {
            Some(nulls) => nulls.is_null(self.offset() + index),
            None => false,
        }
    }

    pub fn is_valid(&self, index: usize) -> bool {
        !self.is_null(index)
    }

    /// Nulls in the view window. Consistent with the bitmap population count
    /// by construction; an absent bitmap counts as zero.
    pub fn null_count(&self) -> usize {
        match &self.nulls {
            Some(nulls) => nulls.count_null_range(self.offset(), self.len()),
            None => 0,
        }
    }

    pub fn get(&self, index: usize) -> Result<Value> {
        if index >= self.len() {
            return Err(Error::out_of_bounds(index, self.len()));
        }
        Ok(self.get_value(index))
    }

    pub fn get_value(&self, index: usize) -> Value {
        if index >= self.len() || self.is_null(index) {
            return Value::Null;
        }
        let at = self.offset() + index;

        match &self.values {
            Values::Bool(data) => Value::Bool(data[at]),
            Values::Int32(data) => Value::Int32(data[at]),
            Values::Int64(data) => Value::Int64(data[at]),
            Values::Float32(data) => Value::float32(data[at]),
            Values::Float64(data) => Value::float64(data[at]),
            Values::Numeric(data) => Value::Numeric(data[at]),
            Values::String(data) => Value::String(data[at].clone()),
            Values::Date(data) => Value::Date(data[at]),
            Values::Timestamp(data) => Value::Timestamp(data[at]),
            Values::List { offsets, child } => {
                let start = offsets[at] as usize;
                let end = offsets[at + 1] as usize;
                Value::List((start..end).map(|i| child.get_value(i)).collect())
            }
            Values::Struct { fields, children } => Value::Struct(
                fields
                    .iter()
                    .zip(children.iter())
                    .map(|(f, c)| (f.name.clone(), c.get_value(index)))
                    .collect(),
            ),
            Values::Dictionary { keys, values } => values.get_value(keys[at] as usize),
        }
    }

    /// Iterates the view's values in row order.
    pub fn iter(&self) -> impl Iterator<Item = Value> + '_ {
        (0..self.len()).map(|i| self.get_value(i))
    }
}
