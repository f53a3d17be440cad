use indexmap::IndexMap;
use regatta_common::error::{Error, Result};
use regatta_common::types::DataType;
use regatta_storage::Table;
use serde::{Deserialize, Serialize};

/// Export name for one column, with child nodes mirroring struct nesting.
///
/// A node exists for every level of struct nesting; list elements and
/// primitives carry no children.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ColumnMetadata {
    pub name: String,
    pub children: Vec<ColumnMetadata>,
}

impl ColumnMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
        }
    }

    pub fn with_children(name: impl Into<String>, children: Vec<ColumnMetadata>) -> Self {
        Self {
            name: name.into(),
            children,
        }
    }
}

/// Caller-supplied naming scheme: an ordered mapping from column name to the
/// naming of that column's struct fields.
///
/// An empty child map under a struct column means "default names for that
/// subtree"; a non-empty one must match the struct's field count exactly.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ColumnNames(pub IndexMap<String, ColumnNames>);

impl ColumnNames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, children: ColumnNames) {
        self.0.insert(name.into(), children);
    }

    /// Builder-style insertion of a leaf (no nested names).
    pub fn with(mut self, name: impl Into<String>) -> Self {
        self.insert(name, ColumnNames::new());
        self
    }

    /// Builder-style insertion with nested names.
    pub fn with_nested(mut self, name: impl Into<String>, children: ColumnNames) -> Self {
        self.insert(name, children);
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, ColumnNames)> for ColumnNames {
    fn from_iter<T: IntoIterator<Item = (S, ColumnNames)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(name, children)| (name.into(), children))
                .collect(),
        )
    }
}

/// Builds the per-column metadata tree for export.
///
/// With no naming structure, every name defaults to empty while the node
/// shape still mirrors struct nesting. With one, the shape is checked against
/// the runtime column types and any mismatch is an error; no partial tree is
/// ever returned.
pub fn gather_metadata(
    table: &Table,
    names: Option<&ColumnNames>,
) -> Result<Vec<ColumnMetadata>> {
    match names {
        None => Ok(table
            .columns()
            .iter()
            .map(|col| default_metadata(&col.data_type()))
            .collect()),
        Some(names) => {
            if names.len() != table.num_columns() {
                return Err(Error::invalid_metadata_shape(format!(
                    "{} names supplied for {} columns",
                    names.len(),
                    table.num_columns()
                )));
            }
            table
                .columns()
                .iter()
                .zip(names.0.iter())
                .map(|(col, (name, children))| walk(name, children, &col.data_type()))
                .collect()
        }
    }
}

fn default_metadata(data_type: &DataType) -> ColumnMetadata {
    let children = match data_type {
        DataType::Struct(fields) => fields
            .iter()
            .map(|f| default_metadata(&f.data_type))
            .collect(),
        _ => Vec::new(),
    };
    ColumnMetadata {
        name: String::new(),
        children,
    }
}

fn walk(name: &str, children: &ColumnNames, data_type: &DataType) -> Result<ColumnMetadata> {
    match data_type {
        DataType::Struct(fields) => {
            if children.is_empty() {
                let mut node = default_metadata(data_type);
                node.name = name.to_string();
                Ok(node)
            } else if children.len() != fields.len() {
                Err(Error::invalid_metadata_shape(format!(
                    "column '{}': {} names for {} struct fields",
                    name,
                    children.len(),
                    fields.len()
                )))
            } else {
                let nodes = fields
                    .iter()
                    .zip(children.0.iter())
                    .map(|(field, (child_name, grandchildren))| {
                        walk(child_name, grandchildren, &field.data_type)
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(ColumnMetadata::with_children(name, nodes))
            }
        }
        // List elements and primitives contribute no metadata recursion.
        _ => {
            if children.is_empty() {
                Ok(ColumnMetadata::new(name))
            } else {
                Err(Error::invalid_metadata_shape(format!(
                    "column '{}' of type {} cannot carry nested names",
                    name, data_type
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use regatta_common::types::{StructField, Value};
    use regatta_storage::Column;

    use super::*;

    fn sample_table() -> Table {
        let ints = Column::from_values(&DataType::Int32, vec![Value::Int32(1)]).unwrap();
        let rec = Column::from_values(
            &DataType::Struct(vec![
                StructField::new("a", DataType::Int32),
                StructField::new("b", DataType::String),
            ]),
            vec![Value::Struct(vec![
                ("a".to_string(), Value::Int32(1)),
                ("b".to_string(), Value::String("x".to_string())),
            ])],
        )
        .unwrap();
        Table::try_new(vec![ints, rec]).unwrap()
    }

    #[test]
    fn test_gather_without_names_defaults_to_empty() {
        let metadata = gather_metadata(&sample_table(), None).unwrap();
        assert_eq!(metadata.len(), 2);
        assert_eq!(metadata[0].name, "");
        assert!(metadata[0].children.is_empty());
        assert_eq!(metadata[1].name, "");
        assert_eq!(metadata[1].children.len(), 2);
        assert_eq!(metadata[1].children[0].name, "");
    }

    #[test]
    fn test_gather_with_names() {
        let names = ColumnNames::new()
            .with("ints")
            .with_nested("rec", ColumnNames::new().with("a").with("b"));
        let metadata = gather_metadata(&sample_table(), Some(&names)).unwrap();
        assert_eq!(metadata[0], ColumnMetadata::new("ints"));
        assert_eq!(
            metadata[1],
            ColumnMetadata::with_children(
                "rec",
                vec![ColumnMetadata::new("a"), ColumnMetadata::new("b")]
            )
        );
    }

    #[test]
    fn test_gather_top_level_arity_mismatch() {
        let names = ColumnNames::new().with("ints");
        let err = gather_metadata(&sample_table(), Some(&names)).unwrap_err();
        assert!(matches!(err, Error::InvalidMetadataShape(_)));
    }

    #[test]
    fn test_gather_struct_arity_mismatch() {
        let names = ColumnNames::new()
            .with("ints")
            .with_nested("rec", ColumnNames::new().with("a"));
        let err = gather_metadata(&sample_table(), Some(&names)).unwrap_err();
        assert!(matches!(err, Error::InvalidMetadataShape(_)));
    }

    #[test]
    fn test_gather_names_under_non_struct_column() {
        let names = ColumnNames::new()
            .with_nested("ints", ColumnNames::new().with("oops"))
            .with_nested("rec", ColumnNames::new().with("a").with("b"));
        let err = gather_metadata(&sample_table(), Some(&names)).unwrap_err();
        assert!(matches!(err, Error::InvalidMetadataShape(_)));
    }

    #[test]
    fn test_gather_empty_struct_children_defaults() {
        let names = ColumnNames::new().with("ints").with("rec");
        let metadata = gather_metadata(&sample_table(), Some(&names)).unwrap();
        assert_eq!(metadata[1].name, "rec");
        assert_eq!(metadata[1].children.len(), 2);
        assert_eq!(metadata[1].children[0].name, "");
    }

    #[test]
    fn test_list_column_contributes_no_recursion() {
        let lists = Column::from_values(
            &DataType::List(Box::new(DataType::Struct(vec![StructField::new(
                "a",
                DataType::Int32,
            )]))),
            vec![Value::List(vec![])],
        )
        .unwrap();
        let table = Table::try_new(vec![lists]).unwrap();
        let metadata = gather_metadata(&table, None).unwrap();
        assert!(metadata[0].children.is_empty());
    }
}
