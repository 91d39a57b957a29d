#![no_main]
use covmeasure::index::SourceIndex;
use covmeasure::ingest::IngestContext;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let ctx = IngestContext {
        index: SourceIndex::from_relative_paths(["org/acme/Foo.groovy"]),
        ..IngestContext::default()
    };
    // Extractor must not panic on any input.
    let _ = covmeasure::parsers::cobertura::parse(data, &ctx);
});
