use std::borrow::Cow;

use serde_json::Value;

use crate::dataset::{Code, ColumnSchema, DeclaredKind, MissingSpec, Missingness};
use crate::error::{CellError, SchemaError};
use crate::schema::{ColumnDecl, MissingDecl};
use crate::target::TargetFormat;
use crate::value::Classification;

use super::decode::{decode_cell, decode_json_code};

/// Tests a decoded value against the column's missingness in declared order.
#[must_use]
pub fn classify_code(missingness: &Missingness, code: &Code) -> Classification {
    missingness
        .first_match(code)
        .map_or(Classification::Present, |index| {
            Classification::UserMissing(missingness.tag_at(index))
        })
}

/// Classifies one raw cell of `column`: empty cells are system missing,
/// others are decoded and matched against the declared missing specs.
///
/// # Errors
///
/// Returns [`CellError`] if a non-empty cell does not decode.
pub fn classify(column: &ColumnSchema, raw: &str) -> Result<Classification, CellError> {
    decode_cell(column, raw).map(|value| value.classification)
}

fn is_ordered(low: &Code, high: &Code) -> bool {
    match (low, high) {
        (Code::Str(low), Code::Str(high)) => low <= high,
        _ => matches!((low.as_f64(), high.as_f64()), (Some(l), Some(h)) if l <= h),
    }
}

/// Decodes and validates the `missing` declarations of a column for `target`.
///
/// Declarations are flattened in document order: every discrete value is its
/// own spec, a range contributes its bounds before its discrete value.
pub(crate) fn resolve_missingness(
    decl: &ColumnDecl,
    column: &ColumnSchema,
    target: TargetFormat,
) -> Result<Missingness, SchemaError> {
    let tagged = target.supports_tagged_missing();
    if decl.missing.is_empty() {
        return Ok(Missingness::new([], tagged));
    }

    let is_string = column.declared_kind == DeclaredKind::String;
    let unsupported = |what: &'static str| SchemaError::UnsupportedMissing {
        column: column.name.clone(),
        what,
        target: target.name(),
    };
    if is_string && !target.supports_string_missing() {
        return Err(unsupported("string"));
    }

    let decode = |value: &Value| {
        decode_json_code(column, value).ok_or_else(|| SchemaError::BadMissingValue {
            column: column.name.clone(),
            value: value.to_string(),
        })
    };

    let mut specs = Vec::new();
    for missing in &decl.missing {
        match missing {
            MissingDecl::Discrete(values) => {
                for value in values {
                    specs.push(MissingSpec::Discrete(decode(value)?));
                }
            }
            MissingDecl::Range {
                bounds,
                discrete_value,
            } => {
                if let Some((low, high)) = bounds {
                    if is_string {
                        return Err(unsupported("range"));
                    }
                    let (low, high) = (decode(low)?, decode(high)?);
                    if !is_ordered(&low, &high) {
                        return Err(SchemaError::InvalidMissing {
                            column: column.name.clone(),
                            details: Cow::Owned(format!("range low {low} exceeds high {high}")),
                        });
                    }
                    specs.push(MissingSpec::Range { low, high });
                }
                if let Some(value) = discrete_value {
                    specs.push(MissingSpec::Discrete(decode(value)?));
                }
            }
        }
    }

    let missingness = Missingness::new(specs, tagged);
    target.check_missing_capacity(&column.name, &missingness)?;
    Ok(missingness)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::dataset::StorageKind;
    use crate::target::Target;

    fn numeric_column() -> ColumnSchema {
        ColumnSchema::new(0, "score".to_owned(), DeclaredKind::Numeric, StorageKind::Double)
    }

    fn decl(missing: Vec<MissingDecl>) -> ColumnDecl {
        let mut decl = ColumnDecl::new("score", DeclaredKind::Numeric);
        decl.missing = missing;
        decl
    }

    #[test]
    fn discrete_values_flatten_in_order() {
        let missing = resolve_missingness(
            &decl(vec![MissingDecl::discrete([-99, -98])]),
            &numeric_column(),
            TargetFormat::Stata,
        )
        .unwrap();
        assert_eq!(missing.len(), 2);
        assert_eq!(
            classify_code(&missing, &Code::Double(-98.0)),
            Classification::UserMissing(Some('b'))
        );
    }

    #[test]
    fn range_precedes_its_discrete_value() {
        let missing = resolve_missingness(
            &decl(vec![MissingDecl::range_with_value(-9, -7, 99)]),
            &numeric_column(),
            TargetFormat::Stata,
        )
        .unwrap();
        assert_eq!(
            missing.specs(),
            &[
                MissingSpec::Range {
                    low: Code::Double(-9.0),
                    high: Code::Double(-7.0)
                },
                MissingSpec::Discrete(Code::Double(99.0)),
            ]
        );
    }

    #[test]
    fn inverted_range_is_invalid() {
        let err = resolve_missingness(
            &decl(vec![MissingDecl::range(5, 1)]),
            &numeric_column(),
            TargetFormat::Spss,
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidMissing { .. }));
    }

    #[test]
    fn undecodable_value_is_reported_verbatim() {
        let err = resolve_missingness(
            &decl(vec![MissingDecl::discrete([json!("n/a")])]),
            &numeric_column(),
            TargetFormat::Spss,
        )
        .unwrap_err();
        assert_eq!(
            err,
            SchemaError::BadMissingValue {
                column: "score".to_owned(),
                value: "\"n/a\"".to_owned(),
            }
        );
    }

    #[test]
    fn string_missing_depends_on_target() {
        let column =
            ColumnSchema::new(0, "code".to_owned(), DeclaredKind::String, StorageKind::String);
        let mut string_decl = ColumnDecl::new("code", DeclaredKind::String);
        string_decl.missing = vec![MissingDecl::discrete(["NA", "DK"])];

        assert!(matches!(
            resolve_missingness(&string_decl, &column, TargetFormat::Stata),
            Err(SchemaError::UnsupportedMissing { what: "string", .. })
        ));
        let missing = resolve_missingness(&string_decl, &column, TargetFormat::Spss).unwrap();
        assert_eq!(
            classify_code(&missing, &Code::Str("DK".to_owned())),
            Classification::UserMissing(None)
        );

        string_decl.missing = vec![MissingDecl::range("A", "C")];
        assert!(matches!(
            resolve_missingness(&string_decl, &column, TargetFormat::Csv),
            Err(SchemaError::UnsupportedMissing { what: "range", .. })
        ));
    }

    #[test]
    fn classify_separates_system_and_user_missing() {
        let mut column = numeric_column();
        column.missingness = resolve_missingness(
            &decl(vec![MissingDecl::discrete([-99])]),
            &column,
            Target::new(TargetFormat::Stata).format(),
        )
        .unwrap();

        assert_eq!(classify(&column, "-99"), Ok(Classification::UserMissing(Some('a'))));
        assert_eq!(classify(&column, ""), Ok(Classification::SystemMissing));
        assert_eq!(classify(&column, "42.5"), Ok(Classification::Present));
        assert!(classify(&column, "forty").is_err());
    }
}
