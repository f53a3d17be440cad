//! Common types and error handling for Regatta columnar interchange.

#![warn(rustdoc::broken_intra_doc_links)]

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{DataType, StructField, Value};
