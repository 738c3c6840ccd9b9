use std::borrow::Cow;

use serde_json::Value;

use crate::dataset::{Code, ColumnSchema, StorageKind};
use crate::error::CellError;
use crate::value::{Classification, Payload, TypedValue};

use super::missing::classify_code;

/// Parses a numeric cell: ASCII whitespace trimmed, whole text consumed,
/// finite result.
#[must_use]
pub fn parse_number(text: &str) -> Option<f64> {
    let trimmed = text.trim_ascii();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Decodes a JSON code (category code or missing value) into the column's
/// native representation.
pub(crate) fn decode_json_code(column: &ColumnSchema, value: &Value) -> Option<Code> {
    if let Some(encoding) = &column.date {
        return value.as_str().and_then(|text| encoding.encode(text).ok());
    }
    match column.storage {
        StorageKind::String => match value {
            Value::String(text) => Some(Code::Str(text.clone())),
            Value::Number(number) => Some(Code::Str(number.to_string())),
            _ => None,
        },
        StorageKind::Double | StorageKind::Int32 => match value {
            Value::Number(number) => number.as_f64().filter(|v| v.is_finite()).map(Code::Double),
            Value::String(text) => parse_number(text).map(Code::Double),
            _ => None,
        },
    }
}

/// Decodes one raw cell and classifies it against the column's missingness.
///
/// # Errors
///
/// Returns [`CellError`] when a non-empty cell does not decode for the
/// column's kind.
#[cfg_attr(feature = "hotpath", hotpath::measure)]
pub fn decode_cell<'a>(column: &ColumnSchema, raw: &'a str) -> Result<TypedValue<'a>, CellError> {
    if raw.is_empty() {
        return Ok(TypedValue::system_missing(column.storage));
    }
    let payload = if let Some(encoding) = &column.date {
        let code = encoding
            .encode(raw)
            .map_err(|err| CellError::new(err.to_string()))?;
        Payload::from(code)
    } else {
        match column.storage {
            StorageKind::String => Payload::Str(Cow::Borrowed(raw)),
            StorageKind::Double | StorageKind::Int32 => {
                let value = parse_number(raw)
                    .ok_or_else(|| CellError::new(format!("{raw:?} is not a number")))?;
                Payload::Double(value)
            }
        }
    };
    let classification = if column.missingness.is_empty() {
        Classification::Present
    } else {
        payload
            .to_code()
            .map_or(Classification::Present, |code| classify_code(&column.missingness, &code))
    };
    Ok(TypedValue::new(column.storage, classification, payload))
}
