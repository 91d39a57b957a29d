#![no_main]
use covmeasure::ingest::IngestContext;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Extractor must not panic on any input.
    let _ = covmeasure::parsers::clover::parse(data, &IngestContext::default());
});
