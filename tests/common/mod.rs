use statcsv::{
    ConversionSummary, ConvertOptions, MemorySink, MemorySource, Result, SchemaDocument, convert,
};

pub fn document(json: &str) -> SchemaDocument {
    SchemaDocument::from_json_str(json).expect("valid schema document")
}

pub fn rows(text: &str) -> MemorySource {
    MemorySource::from_rows(
        text.lines()
            .map(|line| line.split(',').map(str::to_owned).collect::<Vec<_>>()),
    )
}

pub fn run(
    document: &SchemaDocument,
    source: &mut MemorySource,
    options: ConvertOptions,
) -> (Result<ConversionSummary>, MemorySink) {
    let mut sink = MemorySink::new();
    let result = convert(document, source, &mut sink, options);
    (result, sink)
}
