mod common;

use covmeasure::config::Config;
use covmeasure::detect::Format;
use covmeasure::error::CoverageError;
use covmeasure::ingest::{ingest, IngestContext, IngestSummary};
use covmeasure::model::{MeasureLog, Metric};
use covmeasure::resource::Resource;

/// Test the full `ingest::ingest()` pipeline: check the file, detect, extract.
#[test]
fn ingest_clover_file_auto_detect() {
    let (_dir, path) = common::write_report("clover.xml", include_bytes!("fixtures/clover.xml"));

    let mut log = MeasureLog::new();
    let summary = ingest(&path, None, &IngestContext::default(), &mut log).unwrap();

    assert_eq!(summary.format, Some(Format::Clover));
    assert_eq!(summary.measures, log.len());
    assert_eq!(summary.skipped, 0);
    assert_eq!(log.number(&Resource::Project, Metric::Coverage), Some(5.0));
}

#[test]
fn ingest_jacoco_file_auto_detect() {
    let (_dir, path) = common::write_report("jacoco.xml", include_bytes!("fixtures/jacoco.xml"));
    let ctx = common::context(&["org/sonar/samples/ClassUnderTest.groovy"]);

    let mut log = MeasureLog::new();
    let summary = ingest(&path, None, &ctx, &mut log).unwrap();

    assert_eq!(summary.format, Some(Format::Jacoco));
    assert_eq!(summary.skipped, 2);
    assert!(summary.measures > 0);
}

#[test]
fn ingest_cobertura_file_auto_detect() {
    let (_dir, path) =
        common::write_report("coverage.xml", include_bytes!("fixtures/cobertura.xml"));
    let ctx = common::context(&["org/sonar/samples/ClassUnderTest.groovy", "Hello.groovy"]);

    let mut log = MeasureLog::new();
    let summary = ingest(&path, None, &ctx, &mut log).unwrap();

    assert_eq!(summary.format, Some(Format::Cobertura));
    assert_eq!(summary.skipped, 1);
}

#[test]
fn missing_report_emits_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let mut log = MeasureLog::new();
    let summary = ingest(
        &dir.path().join("clover.xml"),
        None,
        &IngestContext::default(),
        &mut log,
    )
    .unwrap();

    assert_eq!(summary, IngestSummary::default());
    assert!(log.is_empty());
}

#[test]
fn reingesting_yields_identical_measures() {
    let (_dir, path) = common::write_report("clover.xml", include_bytes!("fixtures/clover.xml"));
    let ctx = IngestContext::default();

    let mut first = MeasureLog::new();
    ingest(&path, None, &ctx, &mut first).unwrap();
    let mut second = MeasureLog::new();
    ingest(&path, None, &ctx, &mut second).unwrap();

    assert!(!first.is_empty());
    assert_eq!(first.measures, second.measures);
}

#[test]
fn malformed_report_fails_after_partial_emission() {
    let (_dir, path) = common::write_report(
        "clover.xml",
        include_bytes!("fixtures/malformed_clover.xml"),
    );

    let mut log = MeasureLog::new();
    let err = ingest(&path, None, &IngestContext::default(), &mut log).unwrap_err();

    assert!(matches!(err, CoverageError::Report { .. }));
    assert!(err.to_string().contains("clover.xml"), "{err}");
    assert!(log.number(&Resource::Project, Metric::Coverage).is_some());
}

#[test]
fn truncated_report_is_an_xml_error() {
    let full = include_str!("fixtures/clover.xml");
    let truncated = &full[..full.len() / 2];
    let (_dir, path) = common::write_report("clover.xml", truncated.as_bytes());

    let mut log = MeasureLog::new();
    assert!(ingest(&path, None, &IngestContext::default(), &mut log).is_err());
}

#[test]
fn format_override_skips_detection() {
    // Clover content read as JaCoCo: the document element is wrong
    let (_dir, path) = common::write_report("report.xml", include_bytes!("fixtures/clover.xml"));
    let mut log = MeasureLog::new();
    let err = ingest(&path, Some(Format::Jacoco), &IngestContext::default(), &mut log)
        .unwrap_err();
    assert!(err.to_string().contains("<report>"), "{err}");

    // a forced format that matches the content reads normally
    let (_dir, path) = common::write_report("report.xml", include_bytes!("fixtures/jacoco.xml"));
    let mut log = MeasureLog::new();
    let ctx = common::context(&["Hello.groovy"]);
    let summary = ingest(&path, Some(Format::Jacoco), &ctx, &mut log).unwrap();
    assert_eq!(summary.format, Some(Format::Jacoco));
    assert!(log.number(&Resource::file("", "Hello.groovy"), Metric::LinesToCover).is_some());
}

#[test]
fn unknown_format_is_an_error() {
    let (_dir, path) = common::write_report("coverage.info", b"SF:/src/lib.rs\nDA:1,1\nend_of_record\n");
    let mut log = MeasureLog::new();
    let err = ingest(&path, None, &IngestContext::default(), &mut log).unwrap_err();
    assert!(err.to_string().contains("Unknown coverage format"), "{err}");
}

#[test]
fn config_drives_resolution() {
    let (_dir, path) = common::write_report("jacoco.xml", include_bytes!("fixtures/jacoco.xml"));
    let config = Config::from_toml_str(
        r#"
source_roots = ["/work/project/src/main/groovy"]
tracked_files = [
  "/work/project/src/main/groovy/org/sonar/samples/ClassUnderTest.groovy",
  "/work/project/src/main/groovy/Hello.groovy",
]
exclusions = ["**/Hello"]
"#,
    )
    .unwrap();
    let ctx = config.context().unwrap();

    let mut log = MeasureLog::new();
    let summary = ingest(&path, None, &ctx, &mut log).unwrap();

    assert_eq!(summary.skipped, 2);
    assert!(log
        .number(&Resource::file("org/sonar/samples", "ClassUnderTest.groovy"), Metric::LinesToCover)
        .is_some());
    assert_eq!(log.for_resource(&Resource::file("", "Hello.groovy")).count(), 0);
}
