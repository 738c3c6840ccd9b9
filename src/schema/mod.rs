//! The sidecar schema document, materialized once into a name-indexed table.

mod decl;

use std::collections::HashMap;
use std::io::{Read, Write};

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{Result, SchemaError};

pub use decl::{CategoryDecl, ColumnDecl, MissingDecl};

#[derive(Deserialize)]
struct RawDocument {
    #[serde(rename = "type")]
    package: Option<String>,
    variables: Vec<RawVariable>,
}

#[derive(Deserialize)]
struct RawVariable {
    name: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    label: Option<String>,
    format: Option<String>,
    #[serde(default)]
    categories: Vec<CategoryDecl>,
    #[serde(default)]
    missing: Value,
}

/// Per-column declarations of one dataset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaDocument {
    package: Option<String>,
    columns: Vec<ColumnDecl>,
    by_name: HashMap<String, usize>,
}

impl SchemaDocument {
    #[must_use]
    pub fn new(package: Option<String>) -> Self {
        Self {
            package,
            columns: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    /// Parses a schema document from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Json`] for malformed JSON and
    /// [`crate::Error::Schema`] for structurally invalid declarations.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let raw: RawDocument = serde_json::from_str(text)?;
        Self::from_raw(raw)
    }

    /// # Errors
    ///
    /// See [`Self::from_json_str`].
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let raw: RawDocument = serde_json::from_slice(bytes)?;
        Self::from_raw(raw)
    }

    /// # Errors
    ///
    /// See [`Self::from_json_str`]; I/O failures surface as JSON errors.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let raw: RawDocument = serde_json::from_reader(reader)?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawDocument) -> Result<Self> {
        let mut document = Self::new(raw.package);
        for (index, variable) in raw.variables.into_iter().enumerate() {
            let name = variable
                .name
                .filter(|name| !name.is_empty())
                .ok_or(SchemaError::MissingName { index })?;
            let missing = decl::parse_missing(&name, variable.missing)?;
            document.push(ColumnDecl {
                name,
                declared_type: variable.kind,
                label: variable.label.filter(|label| !label.is_empty()),
                format: variable.format.filter(|format| !format.is_empty()),
                categories: variable.categories,
                missing,
            })?;
        }
        Ok(document)
    }

    /// Appends a column declaration.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::DuplicateColumn`] if the name is already declared.
    pub fn push(&mut self, column: ColumnDecl) -> std::result::Result<(), SchemaError> {
        if self.by_name.contains_key(&column.name) {
            return Err(SchemaError::DuplicateColumn {
                column: column.name,
            });
        }
        self.by_name.insert(column.name.clone(), self.columns.len());
        self.columns.push(column);
        Ok(())
    }

    /// Package tag from the document's top-level `type` property.
    #[must_use]
    pub fn package(&self) -> Option<&str> {
        self.package.as_deref()
    }

    #[must_use]
    pub fn columns(&self) -> &[ColumnDecl] {
        &self.columns
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ColumnDecl> {
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

    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut root = Map::new();
        if let Some(package) = &self.package {
            root.insert("type".to_owned(), Value::String(package.clone()));
        }
        root.insert(
            "variables".to_owned(),
            Value::Array(self.columns.iter().map(ColumnDecl::to_value).collect()),
        );
        Value::Object(root)
    }

    /// Writes the document as compact JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the writer fails.
    pub fn to_writer<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer(writer, &self.to_value())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests;
