use std::borrow::Cow;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::dataset::DeclaredKind;
use crate::error::SchemaError;

/// Declarations for one column, as written in the schema document.
///
/// Values are kept as JSON until the resolver decodes them against a target.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDecl {
    pub name: String,
    /// Raw `type` property; validated at resolution.
    pub declared_type: Option<String>,
    pub label: Option<String>,
    /// Calendar marker such as `%td` or `EDATE40`.
    pub format: Option<String>,
    pub categories: Vec<CategoryDecl>,
    /// Missing-value declarations in document order.
    pub missing: Vec<MissingDecl>,
}

impl ColumnDecl {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: DeclaredKind) -> Self {
        Self {
            name: name.into(),
            declared_type: Some(kind.as_tag().to_owned()),
            label: None,
            format: None,
            categories: Vec::new(),
            missing: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    #[must_use]
    pub fn with_category(mut self, code: impl Into<Value>, label: impl Into<String>) -> Self {
        self.categories.push(CategoryDecl {
            code: Some(code.into()),
            label: Some(Value::String(label.into())),
        });
        self
    }

    #[must_use]
    pub fn with_missing(mut self, missing: MissingDecl) -> Self {
        self.missing.push(missing);
        self
    }

    /// Declared kind, if the `type` property is a recognized tag.
    #[must_use]
    pub fn declared_kind(&self) -> Option<DeclaredKind> {
        self.declared_type.as_deref().and_then(DeclaredKind::from_tag)
    }

    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut object = Map::new();
        object.insert("name".to_owned(), Value::String(self.name.clone()));
        if let Some(kind) = &self.declared_type {
            object.insert("type".to_owned(), Value::String(kind.clone()));
        }
        if let Some(label) = &self.label {
            object.insert("label".to_owned(), Value::String(label.clone()));
        }
        if let Some(format) = &self.format {
            object.insert("format".to_owned(), Value::String(format.clone()));
        }
        if !self.categories.is_empty() {
            let categories = self
                .categories
                .iter()
                .map(CategoryDecl::to_value)
                .collect();
            object.insert("categories".to_owned(), Value::Array(categories));
        }
        match self.missing.as_slice() {
            [] => {}
            [single] => {
                object.insert("missing".to_owned(), single.to_value());
            }
            many => {
                object.insert(
                    "missing".to_owned(),
                    Value::Array(many.iter().map(MissingDecl::to_value).collect()),
                );
            }
        }
        Value::Object(object)
    }
}

/// One `{code, label}` entry. Either side may be absent in a malformed
/// document; the resolver reports that.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CategoryDecl {
    #[serde(default)]
    pub code: Option<Value>,
    #[serde(default)]
    pub label: Option<Value>,
}

impl CategoryDecl {
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut object = Map::new();
        if let Some(code) = &self.code {
            object.insert("code".to_owned(), code.clone());
        }
        if let Some(label) = &self.label {
            object.insert("label".to_owned(), label.clone());
        }
        Value::Object(object)
    }
}

/// One object of a column's `missing` property.
#[derive(Debug, Clone, PartialEq)]
pub enum MissingDecl {
    /// `{type: "DISCRETE", values: [...]}`
    Discrete(Vec<Value>),
    /// `{type: "RANGE", low, high, "discrete-value"}`; at least one part is set.
    Range {
        bounds: Option<(Value, Value)>,
        discrete_value: Option<Value>,
    },
}

impl MissingDecl {
    #[must_use]
    pub fn discrete<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::Discrete(values.into_iter().map(Into::into).collect())
    }

    #[must_use]
    pub fn range(low: impl Into<Value>, high: impl Into<Value>) -> Self {
        Self::Range {
            bounds: Some((low.into(), high.into())),
            discrete_value: None,
        }
    }

    #[must_use]
    pub fn range_with_value(
        low: impl Into<Value>,
        high: impl Into<Value>,
        value: impl Into<Value>,
    ) -> Self {
        Self::Range {
            bounds: Some((low.into(), high.into())),
            discrete_value: Some(value.into()),
        }
    }

    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut object = Map::new();
        match self {
            Self::Discrete(values) => {
                object.insert("type".to_owned(), Value::String("DISCRETE".to_owned()));
                object.insert("values".to_owned(), Value::Array(values.clone()));
            }
            Self::Range {
                bounds,
                discrete_value,
            } => {
                object.insert("type".to_owned(), Value::String("RANGE".to_owned()));
                if let Some((low, high)) = bounds {
                    object.insert("low".to_owned(), low.clone());
                    object.insert("high".to_owned(), high.clone());
                }
                if let Some(value) = discrete_value {
                    object.insert("discrete-value".to_owned(), value.clone());
                }
            }
        }
        Value::Object(object)
    }
}

fn invalid(column: &str, details: impl Into<Cow<'static, str>>) -> SchemaError {
    SchemaError::InvalidMissing {
        column: column.to_owned(),
        details: details.into(),
    }
}

/// Accepts `missing` as absent, one object, or an array of objects.
pub(super) fn parse_missing(column: &str, value: Value) -> Result<Vec<MissingDecl>, SchemaError> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => items
            .into_iter()
            .map(|item| parse_missing_object(column, item))
            .collect(),
        object @ Value::Object(_) => Ok(vec![parse_missing_object(column, object)?]),
        _ => Err(invalid(column, "expected an object or an array of objects")),
    }
}

fn parse_missing_object(column: &str, value: Value) -> Result<MissingDecl, SchemaError> {
    let Value::Object(mut object) = value else {
        return Err(invalid(column, "expected an object"));
    };
    let kind = match object.remove("type") {
        Some(Value::String(kind)) => kind,
        Some(_) => return Err(invalid(column, "missing.type must be a string")),
        None => return Err(invalid(column, "missing.type is required")),
    };
    match kind.as_str() {
        "DISCRETE" => match object.remove("values") {
            Some(Value::Array(values)) if !values.is_empty() => Ok(MissingDecl::Discrete(values)),
            Some(Value::Array(_)) => Err(invalid(column, "missing.values is empty")),
            _ => Err(invalid(column, "DISCRETE requires a missing.values array")),
        },
        "RANGE" => {
            let bounds = match (object.remove("low"), object.remove("high")) {
                (Some(low), Some(high)) => Some((low, high)),
                (None, None) => None,
                (Some(_), None) => {
                    return Err(invalid(column, "missing.low specified without missing.high"));
                }
                (None, Some(_)) => {
                    return Err(invalid(column, "missing.high specified without missing.low"));
                }
            };
            let discrete_value = object.remove("discrete-value");
            if bounds.is_none() && discrete_value.is_none() {
                return Err(invalid(
                    column,
                    "RANGE requires low and high or a discrete-value",
                ));
            }
            Ok(MissingDecl::Range {
                bounds,
                discrete_value,
            })
        }
        other => Err(invalid(column, format!("unknown missing.type {other:?}"))),
    }
}
