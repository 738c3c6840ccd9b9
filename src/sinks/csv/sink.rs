use std::io::Write;

use csv::{ByteRecord, Writer, WriterBuilder};
use itoa::Buffer as ItoaBuffer;
use ryu::Buffer as RyuBuffer;

use crate::dataset::{Category, ColumnSchema};
use crate::error::{Error, Result};
use crate::sinks::{DatasetSink, SinkContext};
use crate::value::TypedValue;

use super::encode::{encode_value, fill_record};

const DEFAULT_SCRATCH_CAPACITY: usize = 64;

/// Writes converted rows into delimited text (CSV/TSV).
pub struct CsvSink<W: Write> {
    output: Option<W>,
    writer: Option<Writer<W>>,
    delimiter: u8,
    write_headers: bool,
    record: ByteRecord,
    scratch: Vec<Vec<u8>>, // one scratch buffer per column
    ryu: RyuBuffer,
    itoa: ItoaBuffer,
}

impl<W: Write> CsvSink<W> {
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self {
            output: Some(writer),
            writer: None,
            delimiter: b',',
            write_headers: true,
            record: ByteRecord::new(),
            scratch: Vec::new(),
            ryu: RyuBuffer::new(),
            itoa: ItoaBuffer::new(),
        }
    }

    #[must_use]
    pub const fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    #[must_use]
    pub const fn with_headers(mut self, headers: bool) -> Self {
        self.write_headers = headers;
        self
    }

    /// Returns the underlying output once the sink has been closed.
    pub fn into_inner(self) -> Option<W> {
        self.output
    }

    fn writer(&mut self) -> Result<&mut Writer<W>> {
        self.writer
            .as_mut()
            .ok_or_else(|| Error::sink("CSV sink is not open"))
    }

    fn build_writer(&mut self) -> Result<()> {
        let output = self
            .output
            .take()
            .ok_or_else(|| Error::sink("CSV sink output already taken"))?;
        let writer = WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_writer(output);
        self.writer = Some(writer);
        Ok(())
    }

    fn write_headers(&mut self, columns: &[ColumnSchema]) -> Result<()> {
        if !self.write_headers {
            return Ok(());
        }
        let mut header = ByteRecord::with_capacity(columns.len() * 8, columns.len());
        for column in columns {
            header.push_field(column.name.as_bytes());
        }
        self.writer()?.write_byte_record(&header)?;
        Ok(())
    }
}

impl<W: Write> DatasetSink for CsvSink<W> {
    fn open(&mut self, context: SinkContext<'_>) -> Result<()> {
        if self.writer.is_some() {
            return Err(Error::sink("CSV sink cannot be reused without closing"));
        }
        self.build_writer()?;
        let column_count = context.columns.len();
        self.record = ByteRecord::with_capacity(DEFAULT_SCRATCH_CAPACITY, column_count);
        self.scratch = (0..column_count)
            .map(|_| Vec::with_capacity(DEFAULT_SCRATCH_CAPACITY))
            .collect();
        self.write_headers(context.columns)
    }

    fn declare_variable(&mut self, _index: usize, _column: &ColumnSchema) -> Result<()> {
        Ok(())
    }

    fn declare_category_label(&mut self, _index: usize, _category: &Category) -> Result<()> {
        Ok(())
    }

    fn value(&mut self, _row: u64, column: usize, value: &TypedValue<'_>) -> Result<()> {
        let buf = self
            .scratch
            .get_mut(column)
            .ok_or_else(|| Error::sink(format!("column {column} was not declared")))?;
        encode_value(value, buf, &mut self.ryu, &mut self.itoa);
        Ok(())
    }

    fn end_row(&mut self, _row: u64) -> Result<()> {
        fill_record(&mut self.record, &self.scratch);
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| Error::sink("CSV sink is not open"))?;
        writer.write_byte_record(&self.record)?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
            let out = writer
                .into_inner()
                .map_err(|e| Error::sink(format!("csv into_inner failed: {e}")))?;
            self.output = Some(out);
        }
        self.scratch.clear();
        self.record.clear();
        Ok(())
    }

    fn abort(&mut self) {
        self.writer = None;
        self.scratch.clear();
        self.record.clear();
    }
}
