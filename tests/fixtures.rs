#![allow(clippy::pedantic)]
//! Each `tests/fixtures/<case>/schema.json` is converted against the sibling
//! `data.csv` for the target named by the document's `type`, and the recorded
//! sink stream must match `expected.txt`.

use std::fs::{self, File};
use std::path::Path;

use statcsv::{ConvertOptions, CsvSource, MemorySink, SchemaDocument, TargetFormat, convert};

fn run_fixture(path: &Path) -> datatest_stable::Result<()> {
    let dir = path.parent().ok_or("fixture has no parent directory")?;
    let document = SchemaDocument::from_slice(&fs::read(path)?)?;
    let format = document
        .package()
        .and_then(TargetFormat::from_package_tag)
        .ok_or("fixture schema has no recognised type")?;

    let mut source = CsvSource::new(File::open(dir.join("data.csv"))?);
    let mut sink = MemorySink::new();
    let result = convert(&document, &mut source, &mut sink, ConvertOptions::new(format));

    let mut actual = sink.render();
    if let Err(err) = result {
        actual.push_str(&format!("error: {err}\n"));
    }
    let expected = fs::read_to_string(dir.join("expected.txt"))?;
    assert_eq!(
        actual.trim_end(),
        expected.trim_end(),
        "fixture {}",
        dir.display()
    );
    Ok(())
}

datatest_stable::harness! {{
    test = run_fixture,
    root = "tests/fixtures",
    pattern = r"schema\.json$"
}}
