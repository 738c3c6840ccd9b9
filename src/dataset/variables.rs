use std::fmt;

use crate::calendar::DateEncoding;

use super::labels::Category;
use super::missing::Missingness;

/// Column descriptor handed to dataset sinks, mirroring a package variable.
///
/// Built once per dataset by the resolver and read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSchema {
    pub index: usize,
    pub name: String,
    pub label: Option<String>,
    pub declared_kind: DeclaredKind,
    pub storage: StorageKind,
    /// Present when the column is a calendar column for the resolved target.
    pub date: Option<DateEncoding>,
    /// Display format tag, e.g. `%td` or `EDATE40` for calendar columns.
    pub format: Option<String>,
    pub alignment: Alignment,
    /// Maximum byte length of the column's cells; only filled for string
    /// storage once the width scan has run.
    pub storage_width: usize,
    pub missingness: Missingness,
    pub categories: Vec<Category>,
}

impl ColumnSchema {
    #[must_use]
    pub fn new(index: usize, name: String, declared_kind: DeclaredKind, storage: StorageKind) -> Self {
        Self {
            index,
            name,
            label: None,
            declared_kind,
            storage,
            date: None,
            format: None,
            alignment: storage.default_alignment(),
            storage_width: 0,
            missingness: Missingness::default(),
            categories: Vec::new(),
        }
    }

    #[must_use]
    pub const fn is_date(&self) -> bool {
        self.date.is_some()
    }
}

/// Kind written in the schema document's `type` property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclaredKind {
    Numeric,
    String,
    Date,
}

impl DeclaredKind {
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "NUMERIC" => Some(Self::Numeric),
            "STRING" => Some(Self::String),
            "DATE" => Some(Self::Date),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_tag(self) -> &'static str {
        match self {
            Self::Numeric => "NUMERIC",
            Self::String => "STRING",
            Self::Date => "DATE",
        }
    }
}

impl fmt::Display for DeclaredKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// Physical representation of a column's values on the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Double,
    Int32,
    String,
}

impl StorageKind {
    #[must_use]
    pub const fn default_alignment(self) -> Alignment {
        match self {
            Self::String => Alignment::Left,
            Self::Double | Self::Int32 => Alignment::Right,
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Double => "DOUBLE",
            Self::Int32 => "INT32",
            Self::String => "STRING",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Left,
    Right,
}
