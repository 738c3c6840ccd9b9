//! The conversion driver: header resolution, optional width scan, and the
//! streamed data pass into a [`DatasetSink`].

use std::borrow::Cow;
use std::result::Result as StdResult;

use csv::ByteRecord;
use rayon::prelude::*;

use crate::calendar::{DayOffsetCalendar, ElapsedCalendar};
use crate::dataset::{ColumnSchema, StorageKind};
use crate::error::{ConversionError, Result};
use crate::logger::{log_error, log_info, set_log_prefix};
use crate::resolver::{SchemaResolver, SchemaTable, decode_cell};
use crate::schema::SchemaDocument;
use crate::sinks::{DatasetSink, SinkContext};
use crate::source::{RowSource, SourceEncoding};
use crate::target::Target;
use crate::value::{Classification, TypedValue};

const DEFAULT_BATCH_ROWS: usize = 4096;

/// Settings for one conversion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConvertOptions {
    target: Target,
    batch_rows: usize,
    parallel: bool,
    encoding: SourceEncoding,
}

impl ConvertOptions {
    #[must_use]
    pub fn new(target: impl Into<Target>) -> Self {
        Self {
            target: target.into(),
            batch_rows: DEFAULT_BATCH_ROWS,
            parallel: true,
            encoding: SourceEncoding::UTF8,
        }
    }

    #[must_use]
    pub const fn with_target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }

    /// Rows decoded per batch; zero is treated as one.
    #[must_use]
    pub const fn with_batch_rows(mut self, rows: usize) -> Self {
        self.batch_rows = if rows == 0 { 1 } else { rows };
        self
    }

    /// Decode batches on the rayon pool. Output order is unaffected.
    #[must_use]
    pub const fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    #[must_use]
    pub const fn with_encoding(mut self, encoding: SourceEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    #[must_use]
    pub const fn with_day_calendar(mut self, calendar: DayOffsetCalendar) -> Self {
        self.target = self.target.with_day_calendar(calendar);
        self
    }

    #[must_use]
    pub const fn with_elapsed_calendar(mut self, calendar: ElapsedCalendar) -> Self {
        self.target = self.target.with_elapsed_calendar(calendar);
        self
    }

    #[must_use]
    pub const fn target(&self) -> &Target {
        &self.target
    }

    #[must_use]
    pub const fn batch_rows(&self) -> usize {
        self.batch_rows
    }

    #[must_use]
    pub const fn parallel(&self) -> bool {
        self.parallel
    }

    #[must_use]
    pub const fn encoding(&self) -> SourceEncoding {
        self.encoding
    }
}

/// Counts reported by a successful conversion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConversionSummary {
    pub rows: u64,
    pub columns: usize,
    pub system_missing: u64,
    pub user_missing: u64,
}

impl ConversionSummary {
    fn count(&mut self, value: &TypedValue<'_>) {
        match value.classification {
            Classification::SystemMissing => self.system_missing += 1,
            Classification::UserMissing(_) => self.user_missing += 1,
            Classification::Present => {}
        }
    }
}

/// Drives rows from a [`RowSource`] through the resolved schema into a sink.
#[derive(Debug, Clone, Copy)]
pub struct Converter<'a> {
    document: &'a SchemaDocument,
    options: ConvertOptions,
}

impl<'a> Converter<'a> {
    #[must_use]
    pub const fn new(document: &'a SchemaDocument, options: ConvertOptions) -> Self {
        Self { document, options }
    }

    #[must_use]
    pub const fn options(&self) -> &ConvertOptions {
        &self.options
    }

    /// Reads the header (and, for targets that need it, scans string widths)
    /// without touching a sink.
    ///
    /// # Errors
    ///
    /// Returns the first schema, category or conversion error encountered.
    pub fn resolve_schema<S: RowSource>(&self, source: &mut S) -> Result<SchemaTable> {
        self.prepare(source).map(|(table, _)| table)
    }

    /// Converts the whole source into `sink`.
    ///
    /// Nothing reaches the sink if the header cannot be resolved or the width
    /// scan fails. Once the sink is opened, a failure calls
    /// [`DatasetSink::abort`] once and `close` is never called.
    ///
    /// # Errors
    ///
    /// Returns the first error in row order; see [`crate::Error`].
    pub fn convert<S, K>(&self, source: &mut S, sink: &mut K) -> Result<ConversionSummary>
    where
        S: RowSource,
        K: DatasetSink + ?Sized,
    {
        let _prefix = set_log_prefix(self.options.target().format().name());
        let (table, row_count) = self.prepare(source)?;
        let result = sink
            .open(SinkContext::new(&table, row_count))
            .and_then(|()| self.emit(&table, source, sink));
        match result {
            Ok(summary) => {
                sink.close()?;
                log_info(&format!(
                    "converted {} rows x {} columns for {}",
                    summary.rows,
                    summary.columns,
                    table.target().format()
                ));
                Ok(summary)
            }
            Err(err) => {
                log_error(&format!("conversion aborted: {err}"));
                sink.abort();
                Err(err)
            }
        }
    }

    fn prepare<S: RowSource>(&self, source: &mut S) -> Result<(SchemaTable, Option<u64>)> {
        let mut record = ByteRecord::new();
        if !source.read_record(&mut record)? {
            return Err(ConversionError::EmptySource.into());
        }
        let header = decode_header(self.options.encoding, &record)?;
        let table = SchemaResolver::new(self.document, self.options.target).resolve(&header)?;
        if !self.options.target.format().requires_storage_width() {
            return Ok((table, None));
        }

        let (widths, rows) = self.scan_widths(&table, source)?;
        source.rewind()?;
        source.read_record(&mut record)?;
        Ok((table.with_storage_widths(&widths), Some(rows)))
    }

    fn read_batch<S: RowSource>(&self, source: &mut S, records: &mut Vec<ByteRecord>) -> Result<usize> {
        let mut filled = 0;
        while filled < self.options.batch_rows {
            if filled == records.len() {
                records.push(ByteRecord::new());
            }
            if !source.read_record(&mut records[filled])? {
                break;
            }
            filled += 1;
        }
        Ok(filled)
    }

    #[cfg_attr(feature = "hotpath", hotpath::measure)]
    fn scan_widths<S: RowSource>(&self, table: &SchemaTable, source: &mut S) -> Result<(Vec<usize>, u64)> {
        let encoding = self.options.encoding;
        let mut widths = vec![0; table.len()];
        let mut records = Vec::new();
        let mut rows: u64 = 0;
        loop {
            let filled = self.read_batch(source, &mut records)?;
            if filled == 0 {
                break;
            }
            let batch = &records[..filled];
            let first_row = rows + 1;
            let observe = |scan: WidthScan, (offset, record): (usize, &ByteRecord)| {
                scan.observe(table, encoding, first_row + offset as u64, record)
            };
            let scan = if self.options.parallel {
                batch
                    .par_iter()
                    .enumerate()
                    .fold(|| WidthScan::new(table.len()), observe)
                    .reduce(|| WidthScan::new(table.len()), WidthScan::merge)
            } else {
                batch
                    .iter()
                    .enumerate()
                    .fold(WidthScan::new(table.len()), observe)
            };
            scan.merge_into(&mut widths)?;
            rows += filled as u64;
        }
        Ok((widths, rows))
    }

    fn emit<S, K>(&self, table: &SchemaTable, source: &mut S, sink: &mut K) -> Result<ConversionSummary>
    where
        S: RowSource,
        K: DatasetSink + ?Sized,
    {
        for column in table.columns() {
            sink.declare_variable(column.index, column)?;
            for category in &column.categories {
                sink.declare_category_label(column.index, category)?;
            }
        }

        let encoding = self.options.encoding;
        let mut summary = ConversionSummary {
            columns: table.len(),
            ..ConversionSummary::default()
        };
        let mut records = Vec::new();
        loop {
            let filled = self.read_batch(source, &mut records)?;
            if filled == 0 {
                break;
            }
            let batch = &records[..filled];
            let first_observation = summary.rows;
            let decode = |(offset, record): (usize, _)| {
                decode_row(table, encoding, first_observation + offset as u64 + 1, record)
            };
            let decoded: Vec<_> = if self.options.parallel {
                batch.par_iter().enumerate().map(decode).collect()
            } else {
                batch.iter().enumerate().map(decode).collect()
            };

            for (offset, values) in decoded.into_iter().enumerate() {
                let values = values?;
                let observation = first_observation + offset as u64;
                for (column, value) in values.iter().enumerate() {
                    summary.count(value);
                    sink.value(observation, column, value)?;
                }
                sink.end_row(observation)?;
            }
            summary.rows += filled as u64;
        }
        Ok(summary)
    }
}

/// Resolves and converts in one call.
///
/// # Errors
///
/// See [`Converter::convert`].
pub fn convert<S, K>(
    document: &SchemaDocument,
    source: &mut S,
    sink: &mut K,
    options: ConvertOptions,
) -> Result<ConversionSummary>
where
    S: RowSource,
    K: DatasetSink + ?Sized,
{
    Converter::new(document, options).convert(source, sink)
}

fn decode_header(encoding: SourceEncoding, record: &ByteRecord) -> Result<Vec<String>> {
    record
        .iter()
        .enumerate()
        .map(|(index, bytes)| -> Result<String> {
            let text = encoding
                .decode(bytes)
                .ok_or(ConversionError::MalformedHeader { index })?;
            let name = if index == 0 {
                text.trim_start_matches('\u{feff}')
            } else {
                text.as_ref()
            };
            Ok(name.to_owned())
        })
        .collect()
}

fn check_row_len(table: &SchemaTable, row: u64, record: &ByteRecord) -> StdResult<(), ConversionError> {
    if record.len() == table.len() {
        Ok(())
    } else {
        Err(ConversionError::RaggedRow {
            row,
            expected: table.len(),
            found: record.len(),
        })
    }
}

fn decode_text<'r>(
    encoding: SourceEncoding,
    column: &ColumnSchema,
    row: u64,
    bytes: &'r [u8],
) -> StdResult<Cow<'r, str>, ConversionError> {
    encoding
        .decode(bytes)
        .ok_or_else(|| ConversionError::MalformedCell {
            row,
            column: column.name.clone(),
            details: Cow::Owned(format!("cell is not valid {} text", encoding.name())),
        })
}

/// Decodes one data row; `row` is the source row number (header is row 0).
#[cfg_attr(feature = "hotpath", hotpath::measure)]
fn decode_row<'r>(
    table: &SchemaTable,
    encoding: SourceEncoding,
    row: u64,
    record: &'r ByteRecord,
) -> StdResult<Vec<TypedValue<'r>>, ConversionError> {
    check_row_len(table, row, record)?;
    table
        .columns()
        .iter()
        .zip(record.iter())
        .map(|(column, bytes)| -> StdResult<TypedValue<'r>, ConversionError> {
            let value = match decode_text(encoding, column, row, bytes)? {
                Cow::Borrowed(text) => decode_cell(column, text),
                Cow::Owned(text) => decode_cell(column, &text).map(TypedValue::into_owned),
            };
            value.map_err(|err| err.at(row, &column.name))
        })
        .collect()
}

/// Per-column maximum string widths, reduced across rows.
///
/// Keeps the error of the lowest row so parallel scans report the same
/// failure as a serial one.
struct WidthScan {
    widths: Vec<usize>,
    error: Option<(u64, ConversionError)>,
}

impl WidthScan {
    fn new(columns: usize) -> Self {
        Self {
            widths: vec![0; columns],
            error: None,
        }
    }

    fn observe(
        mut self,
        table: &SchemaTable,
        encoding: SourceEncoding,
        row: u64,
        record: &ByteRecord,
    ) -> Self {
        if self.error.is_some() {
            return self;
        }
        if let Err(err) = self.scan_row(table, encoding, row, record) {
            self.record_error(row, err);
        }
        self
    }

    fn scan_row(
        &mut self,
        table: &SchemaTable,
        encoding: SourceEncoding,
        row: u64,
        record: &ByteRecord,
    ) -> StdResult<(), ConversionError> {
        check_row_len(table, row, record)?;
        for (column, bytes) in table.columns().iter().zip(record.iter()) {
            if column.storage != StorageKind::String {
                continue;
            }
            let width = decode_text(encoding, column, row, bytes)?.len();
            let slot = &mut self.widths[column.index];
            *slot = (*slot).max(width);
        }
        Ok(())
    }

    fn record_error(&mut self, row: u64, err: ConversionError) {
        if self.error.as_ref().is_none_or(|(first, _)| row < *first) {
            self.error = Some((row, err));
        }
    }

    fn merge(mut self, other: Self) -> Self {
        for (mine, theirs) in self.widths.iter_mut().zip(other.widths) {
            *mine = (*mine).max(theirs);
        }
        if let Some((row, err)) = other.error {
            self.record_error(row, err);
        }
        self
    }

    fn merge_into(self, widths: &mut [usize]) -> StdResult<(), ConversionError> {
        if let Some((_, err)) = self.error {
            return Err(err);
        }
        for (total, width) in widths.iter_mut().zip(self.widths) {
            *total = (*total).max(width);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::{MemorySink, SinkEvent};
    use crate::source::MemorySource;
    use crate::target::TargetFormat;

    fn document() -> SchemaDocument {
        SchemaDocument::from_json_str(
            r#"{"variables": [
                {"name": "id", "type": "NUMERIC"},
                {"name": "name", "type": "STRING"}
            ]}"#,
        )
        .unwrap()
    }

    #[test]
    fn widths_and_row_count_reach_the_sink() {
        let document = document();
        let mut source = MemorySource::from_rows([
            vec!["id", "name"],
            vec!["1", "Ann"],
            vec!["2", "Bartholomew"],
            vec!["3", ""],
        ]);
        let mut sink = MemorySink::new();
        let options = ConvertOptions::new(TargetFormat::Stata).with_batch_rows(2);
        let summary = convert(&document, &mut source, &mut sink, options).unwrap();

        assert_eq!(summary.rows, 3);
        assert_eq!(summary.system_missing, 1);
        assert!(matches!(
            sink.events()[0],
            SinkEvent::Open { row_count: Some(3), columns: 2, .. }
        ));
        let SinkEvent::DeclareVariable { column, .. } = &sink.events()[2] else {
            panic!("expected a variable declaration");
        };
        assert_eq!(column.storage_width, "Bartholomew".len());
    }

    #[test]
    fn parallel_and_serial_runs_match() {
        let document = document();
        let mut rows = vec![vec!["id".to_owned(), "name".to_owned()]];
        rows.extend((0..50).map(|i| vec![i.to_string(), format!("n{i}")]));

        let run = |parallel: bool| {
            let mut source = MemorySource::new(rows.clone());
            let mut sink = MemorySink::new();
            let options = ConvertOptions::new(TargetFormat::Spss)
                .with_batch_rows(7)
                .with_parallel(parallel);
            convert(&document, &mut source, &mut sink, options).unwrap();
            sink.into_events()
        };
        assert_eq!(run(true), run(false));
    }

    #[test]
    fn width_scan_reports_lowest_failing_row() {
        let document = document();
        let mut rows = vec![vec!["id".to_owned(), "name".to_owned()]];
        rows.extend((0..40).map(|i| vec![i.to_string(), "x".to_owned()]));
        rows[9] = vec!["8".to_owned()];
        rows[30] = vec!["29".to_owned()];

        let mut source = MemorySource::new(rows);
        let mut sink = MemorySink::new();
        let err = convert(
            &document,
            &mut source,
            &mut sink,
            ConvertOptions::new(TargetFormat::Stata).with_batch_rows(64),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Conversion(ConversionError::RaggedRow { row: 9, expected: 2, found: 1 })
        ));
        assert!(sink.events().is_empty());
    }

    #[test]
    fn byte_order_mark_is_stripped_from_the_header() {
        let document = document();
        let mut source = MemorySource::from_rows([vec!["\u{feff}id", "name"], vec!["1", "a"]]);
        let table = Converter::new(&document, ConvertOptions::new(TargetFormat::Csv))
            .resolve_schema(&mut source)
            .unwrap();
        assert_eq!(table.columns()[0].name, "id");
    }
}
