use std::sync::Arc;

use regatta_common::error::{Error, Result};
use regatta_common::types::{DataType, Value};

use super::{Column, Values};
use crate::NullBitmap;

impl Column {
    /// Appends one value.
    ///
    /// The value is validated against the column type before anything is
    /// touched, so a failed push leaves the column unchanged. Pushing into a
    /// shared or sliced column first compacts the view into fresh buffers
    /// (copy-on-write).
    pub fn push(&mut self, value: Value) -> Result<()> {
        check_value(&self.data_type(), &value)?;
        if !self.is_contiguous() {
            self.compact();
        }
        self.append(value);
        Ok(())
    }

    pub fn clear(&mut self) {
        *self = Column::new(&self.data_type());
    }

    /// Rebuilds the view into owned, offset-zero buffers.
    pub(crate) fn compact(&mut self) {
        let mut fresh = Column::new(&self.data_type());
        for i in 0..self.len() {
            fresh.append(self.get_value(i));
        }
        *self = fresh;
    }

    /// Appends a value already checked against the column type.
    fn append(&mut self, value: Value) {
        let is_null = value.is_null();

        match (&mut self.values, value) {
            (Values::Bool(data), Value::Bool(v)) => Arc::make_mut(data).push(v),
            (Values::Bool(data), _) => Arc::make_mut(data).push(false),

            (Values::Int32(data), Value::Int32(v)) => Arc::make_mut(data).push(v),
            (Values::Int32(data), _) => Arc::make_mut(data).push(0),

            (Values::Int64(data), Value::Int64(v)) => Arc::make_mut(data).push(v),
            (Values::Int64(data), _) => Arc::make_mut(data).push(0),

            (Values::Float32(data), Value::Float32(v)) => Arc::make_mut(data).push(v.0),
            (Values::Float32(data), _) => Arc::make_mut(data).push(0.0),

            (Values::Float64(data), Value::Float64(v)) => Arc::make_mut(data).push(v.0),
            (Values::Float64(data), _) => Arc::make_mut(data).push(0.0),

            (Values::Numeric(data), Value::Numeric(v)) => Arc::make_mut(data).push(v),
            (Values::Numeric(data), _) => {
                Arc::make_mut(data).push(rust_decimal::Decimal::ZERO)
            }

            (Values::String(data), Value::String(v)) => Arc::make_mut(data).push(v),
            (Values::String(data), _) => Arc::make_mut(data).push(String::new()),

            (Values::Date(data), Value::Date(v)) => Arc::make_mut(data).push(v),
            (Values::Date(data), _) => Arc::make_mut(data).push(Default::default()),

            (Values::Timestamp(data), Value::Timestamp(v)) => Arc::make_mut(data).push(v),
            (Values::Timestamp(data), _) => Arc::make_mut(data).push(Default::default()),

            (Values::List { offsets, child }, value) => {
                if !child.is_contiguous() {
                    child.compact();
                }
                if let Value::List(items) = value {
                    for item in items {
                        child.append(item);
                    }
                }
                Arc::make_mut(offsets).push(child.len() as i32);
            }

            (Values::Struct { children, .. }, Value::Struct(entries)) => {
                for (child, (_, item)) in children.iter_mut().zip(entries) {
                    child.append(item);
                }
            }
            (Values::Struct { children, .. }, _) => {
                for child in children.iter_mut() {
                    child.append(Value::Null);
                }
            }

            (Values::Dictionary { keys, values }, value) => {
                if !values.is_contiguous() {
                    values.compact();
                }
                let key = if value.is_null() {
                    0
                } else {
                    let existing = (0..values.len()).find(|&i| values.get_value(i) == value);
                    match existing {
                        Some(i) => i as i32,
                        None => {
                            values.append(value);
                            (values.len() - 1) as i32
                        }
                    }
                };
                Arc::make_mut(keys).push(key);
            }
        }

        if is_null {
            let len = self.len;
            let nulls = self
                .nulls
                .get_or_insert_with(|| Arc::new(NullBitmap::new_valid(len)));
            Arc::make_mut(nulls).push(true);
        } else if let Some(nulls) = &mut self.nulls {
            Arc::make_mut(nulls).push(false);
        }
        self.len += 1;
    }
}

/// Validates a value against a column type before any mutation.
fn check_value(data_type: &DataType, value: &Value) -> Result<()> {
    if value.is_null() {
        return Ok(());
    }
    match (data_type, value) {
        (DataType::Bool, Value::Bool(_))
        | (DataType::Int32, Value::Int32(_))
        | (DataType::Int64, Value::Int64(_))
        | (DataType::Float32, Value::Float32(_))
        | (DataType::Float64, Value::Float64(_))
        | (DataType::Numeric(_), Value::Numeric(_))
        | (DataType::String, Value::String(_))
        | (DataType::Date, Value::Date(_))
        | (DataType::Timestamp, Value::Timestamp(_)) => Ok(()),

        (DataType::List(elem_type), Value::List(items)) => items
            .iter()
            .try_for_each(|item| check_value(elem_type, item)),

        (DataType::Struct(fields), Value::Struct(entries)) => {
            if fields.len() != entries.len() {
                return Err(Error::type_mismatch(
                    data_type.to_string(),
                    format!("STRUCT with {} fields", entries.len()),
                ));
            }
            fields
                .iter()
                .zip(entries.iter())
                .try_for_each(|(field, (_, item))| check_value(&field.data_type, item))
        }

        (DataType::Dictionary(value_type), value) => check_value(value_type, value),

        _ => Err(Error::type_mismatch(
            data_type.to_string(),
            value.type_name(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use regatta_common::types::StructField;

    use super::*;

    #[test]
    fn test_push_type_mismatch_leaves_column_unchanged() {
        let mut col = Column::from_values(&DataType::Int64, vec![Value::Int64(1)]).unwrap();
        let err = col.push(Value::String("x".to_string())).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));
        assert_eq!(col.len(), 1);
        assert_eq!(col.get_value(0), Value::Int64(1));
    }

    #[test]
    fn test_push_struct_arity_mismatch() {
        let dt = DataType::Struct(vec![
            StructField::new("a", DataType::Int64),
            StructField::new("b", DataType::String),
        ]);
        let mut col = Column::new(&dt);
        let err = col
            .push(Value::Struct(vec![("a".to_string(), Value::Int64(1))]))
            .unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));
        assert!(col.is_empty());
    }

    #[test]
    fn test_push_nested_element_mismatch() {
        let dt = DataType::List(Box::new(DataType::Int64));
        let mut col = Column::new(&dt);
        let err = col
            .push(Value::List(vec![Value::Int64(1), Value::Bool(true)]))
            .unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));
        assert!(col.is_empty());
    }

    #[test]
    fn test_push_null_creates_bitmap_lazily() {
        let mut col = Column::new(&DataType::Int64);
        col.push(Value::Int64(1)).unwrap();
        assert!(col.nulls().is_none());
        col.push(Value::Null).unwrap();
        let nulls = col.nulls().unwrap();
        assert_eq!(nulls.len(), 2);
        assert!(nulls.is_valid(0));
        assert!(nulls.is_null(1));
        assert_eq!(col.null_count(), 1);
    }

    #[test]
    fn test_push_into_slice_copies_on_write() {
        let base = Column::from_values(
            &DataType::Int64,
            (0..6).map(Value::Int64).collect::<Vec<_>>(),
        )
        .unwrap();
        let mut view = base.slice(2, 2).unwrap();
        view.push(Value::Int64(99)).unwrap();

        assert_eq!(view.len(), 3);
        assert_eq!(view.offset(), 0);
        assert_eq!(view.get_value(0), Value::Int64(2));
        assert_eq!(view.get_value(2), Value::Int64(99));

        // The original column is untouched.
        assert_eq!(base.len(), 6);
        assert_eq!(base.get_value(5), Value::Int64(5));
    }

    #[test]
    fn test_push_into_shared_clone_copies_on_write() {
        let base = Column::from_values(&DataType::Int64, vec![Value::Int64(1)]).unwrap();
        let mut copy = base.clone();
        copy.push(Value::Int64(2)).unwrap();
        assert_eq!(base.len(), 1);
        assert_eq!(copy.len(), 2);
    }

    #[test]
    fn test_push_list_rows() {
        let dt = DataType::List(Box::new(DataType::Int64));
        let mut col = Column::new(&dt);
        col.push(Value::List(vec![Value::Int64(1), Value::Int64(2)]))
            .unwrap();
        col.push(Value::Null).unwrap();
        col.push(Value::List(vec![])).unwrap();
        col.push(Value::List(vec![Value::Null, Value::Int64(4)]))
            .unwrap();

        assert_eq!(col.len(), 4);
        assert_eq!(
            col.get_value(0),
            Value::List(vec![Value::Int64(1), Value::Int64(2)])
        );
        assert_eq!(col.get_value(1), Value::Null);
        assert_eq!(col.get_value(2), Value::List(vec![]));
        assert_eq!(
            col.get_value(3),
            Value::List(vec![Value::Null, Value::Int64(4)])
        );
    }

    #[test]
    fn test_push_struct_rows_keeps_children_aligned() {
        let dt = DataType::Struct(vec![
            StructField::new("a", DataType::Int64),
            StructField::new("b", DataType::String),
        ]);
        let mut col = Column::new(&dt);
        col.push(Value::Struct(vec![
            ("a".to_string(), Value::Int64(1)),
            ("b".to_string(), Value::String("x".to_string())),
        ]))
        .unwrap();
        col.push(Value::Null).unwrap();
        col.push(Value::Struct(vec![
            ("a".to_string(), Value::Null),
            ("b".to_string(), Value::String("z".to_string())),
        ]))
        .unwrap();

        assert_eq!(col.len(), 3);
        assert_eq!(col.null_count(), 1);
        assert_eq!(
            col.get_value(2),
            Value::Struct(vec![
                ("a".to_string(), Value::Null),
                ("b".to_string(), Value::String("z".to_string())),
            ])
        );
    }

    #[test]
    fn test_dictionary_push_interns_repeats() {
        let dt = DataType::Dictionary(Box::new(DataType::String));
        let mut col = Column::new(&dt);
        for s in ["red", "green", "red", "red", "green"] {
            col.push(Value::String(s.to_string())).unwrap();
        }
        assert_eq!(col.len(), 5);
        match col.values() {
            Values::Dictionary { values, .. } => assert_eq!(values.len(), 2),
            _ => panic!("expected dictionary"),
        }
        assert_eq!(col.get_value(3), Value::String("red".to_string()));
    }

    #[test]
    fn test_clear() {
        let mut col = Column::from_values(
            &DataType::Int64,
            vec![Value::Int64(1), Value::Null],
        )
        .unwrap();
        col.clear();
        assert!(col.is_empty());
        assert_eq!(col.null_count(), 0);
        assert_eq!(col.data_type(), DataType::Int64);
        col.push(Value::Int64(5)).unwrap();
        assert_eq!(col.get_value(0), Value::Int64(5));
    }
}
