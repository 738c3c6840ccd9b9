//! Row sources: ordered records of raw cell bytes, header first.

use std::borrow::Cow;
use std::io::{Read, Seek};

use csv::{ByteRecord, Reader, ReaderBuilder};
use encoding_rs::{Encoding, UTF_8};

use crate::error::Result;

/// Supplies rows of raw cells. Row 0 is the header.
///
/// Sources must be rewindable: targets that need string widths up front read
/// the rows twice.
pub trait RowSource {
    /// Reads the next row into `record`, returning `false` once exhausted.
    fn read_record(&mut self, record: &mut ByteRecord) -> Result<bool>;

    /// Positions the source back at the header row.
    fn rewind(&mut self) -> Result<()>;
}

impl<S: RowSource + ?Sized> RowSource for &mut S {
    fn read_record(&mut self, record: &mut ByteRecord) -> Result<bool> {
        (**self).read_record(record)
    }

    fn rewind(&mut self) -> Result<()> {
        (**self).rewind()
    }
}

/// Character encoding of the cells of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceEncoding(&'static Encoding);

impl SourceEncoding {
    pub const UTF8: Self = Self(UTF_8);

    /// Resolves a WHATWG encoding label such as `latin1` or `windows-1252`.
    #[must_use]
    pub fn for_label(label: &str) -> Option<Self> {
        Encoding::for_label(label.trim().as_bytes()).map(Self)
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        self.0.name()
    }

    /// Decodes one cell; `None` if the bytes are malformed in this encoding.
    #[must_use]
    pub fn decode(self, bytes: &[u8]) -> Option<Cow<'_, str>> {
        if self.0 == UTF_8 {
            return simdutf8::basic::from_utf8(bytes).ok().map(Cow::Borrowed);
        }
        self.0
            .decode_without_bom_handling_and_without_replacement(bytes)
    }
}

impl Default for SourceEncoding {
    fn default() -> Self {
        Self::UTF8
    }
}

/// Delimited text read through the `csv` crate.
///
/// Rows may have differing cell counts here; the driver reports ragged rows
/// with their position.
pub struct CsvSource<R> {
    reader: Reader<R>,
}

impl<R: Read + Seek> CsvSource<R> {
    #[must_use]
    pub fn new(input: R) -> Self {
        Self::with_delimiter(input, b',')
    }

    #[must_use]
    pub fn with_delimiter(input: R, delimiter: u8) -> Self {
        let reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(delimiter)
            .from_reader(input);
        Self { reader }
    }

    pub fn into_inner(self) -> R {
        self.reader.into_inner()
    }
}

impl<R: Read + Seek> RowSource for CsvSource<R> {
    fn read_record(&mut self, record: &mut ByteRecord) -> Result<bool> {
        Ok(self.reader.read_byte_record(record)?)
    }

    fn rewind(&mut self) -> Result<()> {
        self.reader.seek(csv::Position::new())?;
        Ok(())
    }
}

/// Rows held in memory; produced by the replay adapter and used in tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemorySource {
    rows: Vec<Vec<String>>,
    position: usize,
}

impl MemorySource {
    #[must_use]
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows, position: 0 }
    }

    #[must_use]
    pub fn from_rows<I, R, C>(rows: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = C>,
        C: Into<String>,
    {
        Self::new(
            rows.into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        )
    }

    #[must_use]
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }
}

impl RowSource for MemorySource {
    fn read_record(&mut self, record: &mut ByteRecord) -> Result<bool> {
        let Some(row) = self.rows.get(self.position) else {
            return Ok(false);
        };
        record.clear();
        for cell in row {
            record.push_field(cell.as_bytes());
        }
        self.position += 1;
        Ok(true)
    }

    fn rewind(&mut self) -> Result<()> {
        self.position = 0;
        Ok(())
    }
}
