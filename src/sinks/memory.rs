use std::fmt;

use crate::dataset::{Category, ColumnSchema, MissingSpec};
use crate::error::Result;
use crate::sinks::{DatasetSink, SinkContext};
use crate::target::Target;
use crate::value::{Classification, Payload, TypedValue};

/// One recorded sink call, with owned data.
#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    Open {
        target: Target,
        columns: usize,
        row_count: Option<u64>,
    },
    DeclareVariable {
        index: usize,
        column: ColumnSchema,
    },
    DeclareCategoryLabel {
        index: usize,
        category: Category,
    },
    Value {
        row: u64,
        column: usize,
        value: TypedValue<'static>,
    },
    Close,
    Abort,
}

/// Records every event it receives.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    events: Vec<SinkEvent>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> &[SinkEvent] {
        &self.events
    }

    #[must_use]
    pub fn into_events(self) -> Vec<SinkEvent> {
        self.events
    }

    /// One line per event, in the format of [`SinkEvent`]'s `Display`.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        for event in &self.events {
            out.push_str(&event.to_string());
            out.push('\n');
        }
        out
    }
}

impl DatasetSink for MemorySink {
    fn open(&mut self, context: SinkContext<'_>) -> Result<()> {
        self.events.push(SinkEvent::Open {
            target: *context.target,
            columns: context.columns.len(),
            row_count: context.row_count,
        });
        Ok(())
    }

    fn declare_variable(&mut self, index: usize, column: &ColumnSchema) -> Result<()> {
        self.events.push(SinkEvent::DeclareVariable {
            index,
            column: column.clone(),
        });
        Ok(())
    }

    fn declare_category_label(&mut self, index: usize, category: &Category) -> Result<()> {
        self.events.push(SinkEvent::DeclareCategoryLabel {
            index,
            category: category.clone(),
        });
        Ok(())
    }

    fn value(&mut self, row: u64, column: usize, value: &TypedValue<'_>) -> Result<()> {
        self.events.push(SinkEvent::Value {
            row,
            column,
            value: value.clone().into_owned(),
        });
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.events.push(SinkEvent::Close);
        Ok(())
    }

    fn abort(&mut self) {
        self.events.push(SinkEvent::Abort);
    }
}

fn write_payload(f: &mut fmt::Formatter<'_>, payload: &Payload<'_>) -> fmt::Result {
    match payload {
        Payload::Double(v) => write!(f, "{v}"),
        Payload::Int32(v) => write!(f, "{v}"),
        Payload::Str(s) => write!(f, "{s:?}"),
        Payload::Empty => f.write_str("."),
    }
}

fn write_spec(f: &mut fmt::Formatter<'_>, spec: &MissingSpec) -> fmt::Result {
    match spec {
        MissingSpec::Discrete(code) => write!(f, "{code}"),
        MissingSpec::Range { low, high } => write!(f, "{low}..={high}"),
    }
}

impl fmt::Display for SinkEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open {
                target,
                columns,
                row_count,
            } => {
                write!(f, "open {} columns={columns}", target.format())?;
                if let Some(rows) = row_count {
                    write!(f, " rows={rows}")?;
                }
                Ok(())
            }
            Self::DeclareVariable { index, column } => {
                write!(f, "variable {index} {} {}", column.name, column.storage)?;
                if let Some(format) = &column.format {
                    write!(f, " format={format}")?;
                }
                if column.storage_width > 0 {
                    write!(f, " width={}", column.storage_width)?;
                }
                if let Some(label) = &column.label {
                    write!(f, " label={label:?}")?;
                }
                if !column.missingness.is_empty() {
                    f.write_str(" missing=[")?;
                    for (i, spec) in column.missingness.specs().iter().enumerate() {
                        if i > 0 {
                            f.write_str(", ")?;
                        }
                        write_spec(f, spec)?;
                    }
                    f.write_str("]")?;
                }
                Ok(())
            }
            Self::DeclareCategoryLabel { index, category } => {
                write!(f, "label {index} {} {:?}", category.code, category.label)?;
                match (category.user_missing, category.tag) {
                    (true, Some(tag)) => write!(f, " missing({tag})"),
                    (true, None) => f.write_str(" missing"),
                    (false, _) => Ok(()),
                }
            }
            Self::Value { row, column, value } => {
                write!(f, "value {row} {column} ")?;
                write_payload(f, &value.payload)?;
                match value.classification {
                    Classification::UserMissing(Some(tag)) => write!(f, " missing({tag})"),
                    Classification::UserMissing(None) => f.write_str(" missing"),
                    Classification::Present | Classification::SystemMissing => Ok(()),
                }
            }
            Self::Close => f.write_str("close"),
            Self::Abort => f.write_str("abort"),
        }
    }
}
