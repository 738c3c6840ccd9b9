use serde_json::json;

use super::*;
use crate::dataset::DeclaredKind;
use crate::error::Error;

fn parse(value: &serde_json::Value) -> Result<SchemaDocument> {
    SchemaDocument::from_json_str(&value.to_string())
}

#[test]
fn materializes_columns_by_name() {
    let doc = parse(&json!({
        "type": "STATA",
        "variables": [
            {"name": "id", "type": "NUMERIC"},
            {"name": "sex", "type": "STRING", "label": "Sex",
             "categories": [{"code": "M", "label": "Male"}]},
        ]
    }))
    .unwrap();

    assert_eq!(doc.package(), Some("STATA"));
    assert_eq!(doc.len(), 2);
    let sex = doc.get("sex").unwrap();
    assert_eq!(sex.declared_kind(), Some(DeclaredKind::String));
    assert_eq!(sex.label.as_deref(), Some("Sex"));
    assert_eq!(sex.categories.len(), 1);
    assert!(doc.get("age").is_none());
}

#[test]
fn missing_accepts_object_or_array() {
    let doc = parse(&json!({
        "variables": [
            {"name": "a", "type": "NUMERIC",
             "missing": {"type": "DISCRETE", "values": [-9, -8]}},
            {"name": "b", "type": "NUMERIC",
             "missing": [
                {"type": "RANGE", "low": -9, "high": -7},
                {"type": "RANGE", "discrete-value": 99}
             ]},
        ]
    }))
    .unwrap();

    assert_eq!(
        doc.get("a").unwrap().missing,
        vec![MissingDecl::discrete([-9, -8])]
    );
    let b = &doc.get("b").unwrap().missing;
    assert_eq!(b[0], MissingDecl::range(-9, -7));
    assert_eq!(
        b[1],
        MissingDecl::Range {
            bounds: None,
            discrete_value: Some(json!(99)),
        }
    );
}

#[test]
fn low_without_high_is_rejected() {
    let err = parse(&json!({
        "variables": [
            {"name": "a", "type": "NUMERIC", "missing": {"type": "RANGE", "low": 1}}
        ]
    }))
    .unwrap_err();
    assert!(matches!(
        err,
        Error::Schema(SchemaError::InvalidMissing { ref column, .. }) if column == "a"
    ));
}

#[test]
fn unknown_missing_type_and_empty_values_are_rejected() {
    for missing in [
        json!({"type": "INTERVAL"}),
        json!({"values": [1]}),
        json!({"type": "DISCRETE", "values": []}),
        json!("DISCRETE"),
    ] {
        let err = parse(&json!({
            "variables": [{"name": "a", "type": "NUMERIC", "missing": missing}]
        }))
        .unwrap_err();
        assert!(
            matches!(err, Error::Schema(SchemaError::InvalidMissing { .. })),
            "{missing}: {err}"
        );
    }
}

#[test]
fn duplicate_and_unnamed_entries_are_rejected() {
    let err = parse(&json!({
        "variables": [{"name": "a", "type": "NUMERIC"}, {"name": "a", "type": "STRING"}]
    }))
    .unwrap_err();
    assert!(matches!(
        err,
        Error::Schema(SchemaError::DuplicateColumn { ref column }) if column == "a"
    ));

    let err = parse(&json!({
        "variables": [{"name": "a", "type": "NUMERIC"}, {"type": "STRING"}]
    }))
    .unwrap_err();
    assert!(matches!(
        err,
        Error::Schema(SchemaError::MissingName { index: 1 })
    ));
}

#[test]
fn malformed_json_is_a_json_error() {
    let err = SchemaDocument::from_json_str("{\"variables\": [").unwrap_err();
    assert!(matches!(err, Error::Json(_)));

    let err = SchemaDocument::from_json_str("{\"type\": \"SPSS\"}").unwrap_err();
    assert!(matches!(err, Error::Json(_)));
}

#[test]
fn empty_label_and_format_are_dropped() {
    let doc = parse(&json!({
        "variables": [{"name": "a", "type": "NUMERIC", "label": "", "format": ""}]
    }))
    .unwrap();
    let a = doc.get("a").unwrap();
    assert_eq!(a.label, None);
    assert_eq!(a.format, None);
}

#[test]
fn serializes_back_to_an_equivalent_document() {
    let mut doc = SchemaDocument::new(Some("SPSS".to_owned()));
    doc.push(
        ColumnDecl::new("visit", DeclaredKind::Numeric)
            .with_label("Visit date")
            .with_format("EDATE40")
            .with_category("1960-01-01", "Epoch")
            .with_missing(MissingDecl::range_with_value(-9, -7, 99)),
    )
    .unwrap();
    doc.push(ColumnDecl::new("code", DeclaredKind::String).with_missing(MissingDecl::discrete(["NA"])))
        .unwrap();

    let mut bytes = Vec::new();
    doc.to_writer(&mut bytes).unwrap();
    let reparsed = SchemaDocument::from_slice(&bytes).unwrap();
    assert_eq!(reparsed, doc);

    assert_eq!(
        doc.get("visit").unwrap().to_value()["missing"],
        json!({"type": "RANGE", "low": -9, "high": -7, "discrete-value": 99})
    );
}

#[test]
fn push_rejects_duplicates() {
    let mut doc = SchemaDocument::default();
    doc.push(ColumnDecl::new("x", DeclaredKind::Numeric)).unwrap();
    assert_eq!(
        doc.push(ColumnDecl::new("x", DeclaredKind::Date)),
        Err(SchemaError::DuplicateColumn {
            column: "x".to_owned()
        })
    );
    assert_eq!(doc.len(), 1);
}
