//! Typed conversion of delimited text plus a JSON sidecar schema into the
//! event stream consumed by statistical-package dataset writers.
//!
//! A [`SchemaDocument`] declares each column's kind, labels, categories and
//! missing values. The [`Converter`] resolves it against the source header
//! for a [`TargetFormat`] and emits one [`TypedValue`] per cell to a
//! [`DatasetSink`].

pub mod calendar;
pub mod convert;
pub mod dataset;
pub mod error;
pub mod logger;
pub mod replay;
pub mod resolver;
pub mod schema;
pub mod sinks;
pub mod source;
pub mod target;
pub mod value;

pub use crate::error::{Error, Result};
pub use calendar::{DayOffsetCalendar, ElapsedCalendar};
pub use convert::{ConversionSummary, ConvertOptions, Converter, convert};
pub use dataset::{Category, Code, ColumnSchema, DeclaredKind, MissingSpec, StorageKind};
pub use replay::RecordedDataset;
pub use resolver::{SchemaResolver, SchemaTable, classify};
pub use schema::{ColumnDecl, MissingDecl, SchemaDocument};
pub use sinks::{CsvSink, DatasetSink, MemorySink, SinkContext, SinkEvent};
pub use source::{CsvSource, MemorySource, RowSource, SourceEncoding};
pub use target::{Target, TargetFormat};
pub use value::{Classification, Payload, TypedValue};
