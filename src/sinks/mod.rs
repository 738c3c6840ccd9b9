mod csv;
mod memory;

use crate::dataset::{Category, ColumnSchema};
use crate::error::Result;
use crate::resolver::SchemaTable;
use crate::target::Target;
use crate::value::TypedValue;

pub use csv::CsvSink;
pub use memory::{MemorySink, SinkEvent};

/// Provides high-level dataset information to sinks when they are opened.
#[derive(Debug, Clone, Copy)]
pub struct SinkContext<'a> {
    pub target: &'a Target,
    pub columns: &'a [ColumnSchema],
    /// Number of data rows, known only after a width scan.
    pub row_count: Option<u64>,
}

impl<'a> SinkContext<'a> {
    #[must_use]
    pub fn new(table: &'a SchemaTable, row_count: Option<u64>) -> Self {
        Self {
            target: table.target(),
            columns: table.columns(),
            row_count,
        }
    }
}

/// Consumer of the typed event stream of one dataset.
///
/// Events arrive as `open`, one `declare_variable` per column (each followed
/// by its `declare_category_label` events), then `value` for every cell in
/// row order with `end_row` after each row, and finally `close`. If the
/// conversion fails after `open`, `abort` is called once instead of `close`.
pub trait DatasetSink {
    /// Called before any declaration to allow the sink to initialise internal state.
    fn open(&mut self, context: SinkContext<'_>) -> Result<()>;

    fn declare_variable(&mut self, index: usize, column: &ColumnSchema) -> Result<()>;

    /// Value label of the column at `index`; `category.tag` is set when the
    /// code is user-missing on a tagging target.
    fn declare_category_label(&mut self, index: usize, category: &Category) -> Result<()>;

    /// One cell; `row` counts data rows from zero.
    fn value(&mut self, row: u64, column: usize, value: &TypedValue<'_>) -> Result<()>;

    fn end_row(&mut self, _row: u64) -> Result<()> {
        Ok(())
    }

    /// Called once all rows have been forwarded to the sink.
    fn close(&mut self) -> Result<()>;

    /// Releases resources after a failed conversion.
    fn abort(&mut self) {}
}

impl<S: DatasetSink + ?Sized> DatasetSink for &mut S {
    fn open(&mut self, context: SinkContext<'_>) -> Result<()> {
        (**self).open(context)
    }

    fn declare_variable(&mut self, index: usize, column: &ColumnSchema) -> Result<()> {
        (**self).declare_variable(index, column)
    }

    fn declare_category_label(&mut self, index: usize, category: &Category) -> Result<()> {
        (**self).declare_category_label(index, category)
    }

    fn value(&mut self, row: u64, column: usize, value: &TypedValue<'_>) -> Result<()> {
        (**self).value(row, column, value)
    }

    fn end_row(&mut self, row: u64) -> Result<()> {
        (**self).end_row(row)
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }

    fn abort(&mut self) {
        (**self).abort();
    }
}
