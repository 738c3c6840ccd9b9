//! Inverse adapter: rebuilds a schema document and text rows from a recorded
//! event stream, so a converted dataset can be fed through the driver again.

use serde_json::{Number, Value};

use crate::dataset::{Code, ColumnSchema, DeclaredKind, MissingSpec};
use crate::error::{Error, Result};
use crate::schema::{ColumnDecl, MissingDecl, SchemaDocument};
use crate::sinks::{MemorySink, SinkEvent};
use crate::source::MemorySource;
use crate::target::{Target, TargetFormat};
use crate::value::{Payload, TypedValue};

/// Columns, categories and rows recovered from sink events.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedDataset {
    target: Target,
    columns: Vec<ColumnSchema>,
    rows: Vec<Vec<TypedValue<'static>>>,
}

impl RecordedDataset {
    /// # Errors
    ///
    /// See [`Self::from_events`].
    pub fn from_sink(sink: &MemorySink) -> Result<Self> {
        Self::from_events(sink.events())
    }

    /// Rebuilds the dataset from a complete `open ... close` stream.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Sink`] if the stream was aborted, is not closed, or
    /// references undeclared columns.
    pub fn from_events(events: &[SinkEvent]) -> Result<Self> {
        let mut target = None;
        let mut columns: Vec<ColumnSchema> = Vec::new();
        let mut rows: Vec<Vec<TypedValue<'static>>> = Vec::new();
        let mut closed = false;

        for event in events {
            match event {
                SinkEvent::Open {
                    target: opened, ..
                } => target = Some(*opened),
                SinkEvent::DeclareVariable { column, .. } => {
                    let mut column = column.clone();
                    column.categories.clear();
                    columns.push(column);
                }
                SinkEvent::DeclareCategoryLabel { index, category } => {
                    let column = columns
                        .iter_mut()
                        .find(|column| column.index == *index)
                        .ok_or_else(|| Error::sink(format!("label for undeclared column {index}")))?;
                    column.categories.push(category.clone());
                }
                SinkEvent::Value { row, column, value } => {
                    let row = usize::try_from(*row)
                        .map_err(|_| Error::sink(format!("row {row} out of range")))?;
                    if *column >= columns.len() {
                        return Err(Error::sink(format!("value for undeclared column {column}")));
                    }
                    if rows.len() <= row {
                        rows.resize_with(row + 1, Vec::new);
                    }
                    rows[row].push(value.clone());
                }
                SinkEvent::Close => closed = true,
                SinkEvent::Abort => return Err(Error::sink("recorded stream was aborted")),
            }
        }

        let target = target.ok_or_else(|| Error::sink("recorded stream was never opened"))?;
        if !closed {
            return Err(Error::sink("recorded stream was not closed"));
        }
        Ok(Self {
            target,
            columns,
            rows,
        })
    }

    #[must_use]
    pub const fn target(&self) -> &Target {
        &self.target
    }

    #[must_use]
    pub fn columns(&self) -> &[ColumnSchema] {
        &self.columns
    }

    #[must_use]
    pub fn rows(&self) -> &[Vec<TypedValue<'static>>] {
        &self.rows
    }

    /// Declarations that resolve back to the recorded columns.
    ///
    /// # Errors
    ///
    /// Returns a calendar error if a recorded date code is not representable.
    pub fn to_schema_document(&self) -> Result<SchemaDocument> {
        let mut document =
            SchemaDocument::new(Some(self.target.format().package_tag().to_owned()));
        for column in &self.columns {
            document.push(column_decl(column)?)?;
        }
        Ok(document)
    }

    /// Renders every row back to text, header first.
    ///
    /// # Errors
    ///
    /// Returns a calendar error if a recorded date value is not representable.
    pub fn to_source(&self) -> Result<MemorySource> {
        let mut rows = Vec::with_capacity(self.rows.len() + 1);
        rows.push(self.columns.iter().map(|c| c.name.clone()).collect());
        let mut ryu = ryu::Buffer::new();
        for row in &self.rows {
            let cells = self
                .columns
                .iter()
                .zip(row)
                .map(|(column, value)| cell_text(column, &value.payload, &mut ryu))
                .collect::<Result<Vec<_>>>()?;
            rows.push(cells);
        }
        Ok(MemorySource::new(rows))
    }
}

fn cell_text(column: &ColumnSchema, payload: &Payload<'_>, ryu: &mut ryu::Buffer) -> Result<String> {
    if let (Some(encoding), Some(code)) = (&column.date, payload.to_code()) {
        return Ok(encoding.render(&code)?);
    }
    Ok(match payload {
        Payload::Empty => String::new(),
        Payload::Double(v) => ryu.format(*v).to_owned(),
        Payload::Int32(v) => v.to_string(),
        Payload::Str(s) => s.to_string(),
    })
}

fn code_value(column: &ColumnSchema, code: &Code) -> Result<Value> {
    if let Some(encoding) = &column.date {
        return Ok(Value::String(encoding.render(code)?));
    }
    Ok(match code {
        Code::Double(v) => Number::from_f64(*v).map_or(Value::Null, Value::Number),
        Code::Int32(v) => Value::from(*v),
        Code::Str(s) => Value::String(s.clone()),
    })
}

fn column_decl(column: &ColumnSchema) -> Result<ColumnDecl> {
    let mut decl = ColumnDecl::new(column.name.clone(), column.declared_kind);
    decl.label.clone_from(&column.label);
    decl.format.clone_from(&column.format);
    if column.is_date() && column.declared_kind == DeclaredKind::Numeric && decl.format.is_none() {
        // Csv dates carry no display format; keep a marker so the column stays a date.
        decl.format = TargetFormat::Stata.date_format().map(str::to_owned);
    }

    for category in &column.categories {
        decl = decl.with_category(code_value(column, &category.code)?, category.label.clone());
    }

    let mut pending: Vec<Value> = Vec::new();
    for spec in column.missingness.specs() {
        match spec {
            MissingSpec::Discrete(code) => pending.push(code_value(column, code)?),
            MissingSpec::Range { low, high } => {
                if !pending.is_empty() {
                    decl.missing
                        .push(MissingDecl::Discrete(std::mem::take(&mut pending)));
                }
                decl.missing.push(MissingDecl::range(
                    code_value(column, low)?,
                    code_value(column, high)?,
                ));
            }
        }
    }
    if !pending.is_empty() {
        decl.missing.push(MissingDecl::Discrete(pending));
    }
    Ok(decl)
}
