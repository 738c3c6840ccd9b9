//! Resolution of the schema document against a data header and a target.

mod categories;
mod decode;
mod missing;

use std::collections::HashMap;

use crate::dataset::{ColumnSchema, DeclaredKind, StorageKind};
use crate::error::{Result, SchemaError};
use crate::logger::{is_verbose, log_info, log_warn};
use crate::schema::{ColumnDecl, SchemaDocument};
use crate::target::{Target, TargetFormat, is_calendar_marker};

pub use decode::{decode_cell, parse_number};
pub use missing::{classify, classify_code};

/// Ordered column schemas of one dataset, frozen before the data pass.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaTable {
    target: Target,
    columns: Vec<ColumnSchema>,
    by_name: HashMap<String, usize>,
}

impl SchemaTable {
    #[must_use]
    pub const fn target(&self) -> &Target {
        &self.target
    }

    #[must_use]
    pub fn columns(&self) -> &[ColumnSchema] {
        &self.columns
    }

    #[must_use]
    pub fn column(&self, index: usize) -> Option<&ColumnSchema> {
        self.columns.get(index)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ColumnSchema> {
        self.by_name.get(name).map(|index| &self.columns[*index])
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Copy of the table with string storage widths filled from a width scan.
    ///
    /// `widths` is indexed by column position; missing entries leave the
    /// width at zero.
    #[must_use]
    pub fn with_storage_widths(&self, widths: &[usize]) -> Self {
        let mut table = self.clone();
        for column in &mut table.columns {
            if column.storage == StorageKind::String {
                column.storage_width = widths.get(column.index).copied().unwrap_or(0);
            }
        }
        table
    }
}

/// Builds column schemas from a [`SchemaDocument`] for one target package.
///
/// The same document resolves differently per target: calendar markers,
/// date encodings and missing-value capacity all come from the target.
#[derive(Debug, Clone, Copy)]
pub struct SchemaResolver<'a> {
    document: &'a SchemaDocument,
    target: Target,
}

impl<'a> SchemaResolver<'a> {
    #[must_use]
    pub const fn new(document: &'a SchemaDocument, target: Target) -> Self {
        Self { document, target }
    }

    /// Resolves one schema per header name, in header order.
    ///
    /// # Errors
    ///
    /// Fails with [`SchemaError::ColumnNotFound`] for header names without a
    /// declaration, [`SchemaError::DuplicateColumn`] for repeated header
    /// names, and with any error raised while resolving a single column.
    pub fn resolve<S: AsRef<str>>(&self, header: &[S]) -> Result<SchemaTable> {
        let format = self.target.format();
        if let Some(package) = self.document.package()
            && TargetFormat::from_package_tag(package) != Some(format)
        {
            log_info(&format!(
                "schema document is tagged {package}, resolving for {format}"
            ));
        }

        let mut columns = Vec::with_capacity(header.len());
        let mut by_name = HashMap::with_capacity(header.len());
        for (index, name) in header.iter().enumerate() {
            let name = name.as_ref();
            if by_name.insert(name.to_owned(), index).is_some() {
                return Err(SchemaError::DuplicateColumn {
                    column: name.to_owned(),
                }
                .into());
            }
            columns.push(self.resolve_column(index, name)?);
        }

        for decl in self.document.columns() {
            if !by_name.contains_key(&decl.name) {
                log_warn(&format!(
                    "column {} is declared but not present in the data",
                    decl.name
                ));
            }
        }

        Ok(SchemaTable {
            target: self.target,
            columns,
            by_name,
        })
    }

    /// Resolves the schema of the header cell at `index`.
    ///
    /// # Errors
    ///
    /// Returns schema, category or calendar errors for the column's
    /// declarations.
    pub fn resolve_column(&self, index: usize, name: &str) -> Result<ColumnSchema> {
        let decl = self
            .document
            .get(name)
            .ok_or_else(|| SchemaError::ColumnNotFound(name.to_owned()))?;
        let declared_kind = decl.declared_kind().ok_or_else(|| SchemaError::UnknownType {
            column: name.to_owned(),
            found: decl.declared_type.clone(),
        })?;

        let column = self.build_column(index, decl, declared_kind)?;
        if is_verbose() {
            log_info(&describe(&column));
        }
        Ok(column)
    }

    fn build_column(
        &self,
        index: usize,
        decl: &ColumnDecl,
        declared_kind: DeclaredKind,
    ) -> Result<ColumnSchema> {
        let format = self.target.format();
        let is_date = match declared_kind {
            DeclaredKind::Date => true,
            DeclaredKind::Numeric => decl
                .format
                .as_deref()
                .is_some_and(is_calendar_marker),
            DeclaredKind::String => false,
        };

        let date = is_date.then(|| self.target.date_encoding());
        let storage = match (date, declared_kind) {
            (Some(encoding), _) => encoding.storage(),
            (None, DeclaredKind::String) => StorageKind::String,
            (None, _) => StorageKind::Double,
        };

        let mut column = ColumnSchema::new(index, decl.name.clone(), declared_kind, storage);
        column.label.clone_from(&decl.label);
        column.date = date;
        column.format = if is_date {
            format.date_format().map(str::to_owned)
        } else {
            decl.format.clone()
        };
        column.missingness = missing::resolve_missingness(decl, &column, format)?;
        column.categories = categories::resolve_categories(decl, &column)?;
        Ok(column)
    }
}

fn describe(column: &ColumnSchema) -> String {
    let mut text = format!("column {} resolved as {}", column.name, column.storage);
    if column.is_date() {
        text.push_str(" date");
    }
    if !column.missingness.is_empty() {
        text.push_str(&format!(", {} missing specs", column.missingness.len()));
    }
    if !column.categories.is_empty() {
        text.push_str(&format!(", {} categories", column.categories.len()));
    }
    text
}
