use serde_json::Value;

use crate::dataset::{Category, ColumnSchema};
use crate::error::CategoryError;
use crate::schema::ColumnDecl;

use super::decode::decode_json_code;

fn label_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Decodes the category list of a column against its resolved kind.
///
/// `column.missingness` must already be resolved: codes that fall inside it
/// are flagged user-missing and carry the tag of the first matching spec.
pub(crate) fn resolve_categories(
    decl: &ColumnDecl,
    column: &ColumnSchema,
) -> Result<Vec<Category>, CategoryError> {
    let missing_field = |index: usize, field: &'static str| CategoryError::MissingField {
        column: column.name.clone(),
        index,
        field,
    };

    decl.categories
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let raw_code = entry.code.as_ref().ok_or_else(|| missing_field(index, "code"))?;
            let label = entry
                .label
                .as_ref()
                .and_then(label_text)
                .ok_or_else(|| missing_field(index, "label"))?;
            let code =
                decode_json_code(column, raw_code).ok_or_else(|| CategoryError::BadCode {
                    column: column.name.clone(),
                    code: raw_code.to_string(),
                })?;

            let mut category = Category::new(code, label);
            if let Some(index) = column.missingness.first_match(&category.code) {
                category.user_missing = true;
                category.tag = column.missingness.tag_at(index);
            }
            Ok(category)
        })
        .collect()
}
