// tests/array_fixture.rs

use std::path::PathBuf;

use rql_fixtures::{Fixture, Language, RunConfig, Runner, resolve, validate};

fn array_fixture() -> Fixture {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures/array.yaml");
    Fixture::load(&path).unwrap_or_else(|e| panic!("{}", e))
}

#[test]
fn test_array_fixture_validates() {
    let fixture = array_fixture();
    let issues = validate(&fixture);
    let rendered: Vec<String> = issues.iter().map(|i| i.to_string()).collect();
    assert!(issues.is_empty(), "validation issues:\n{}", rendered.join("\n"));
}

#[test]
fn test_array_fixture_resolves_in_every_language() {
    let fixture = array_fixture();
    for language in Language::ALL {
        let cases = resolve(&fixture, language).unwrap_or_else(|e| panic!("{}", e));
        assert_eq!(cases.len(), fixture.tests.len(), "Failed for {}", language);
    }
}

#[test]
fn test_array_fixture_passes() {
    let fixture = array_fixture();
    let report = Runner::new(RunConfig::default()).run(&fixture);
    assert!(report.is_success(), "{}", report);
    assert!(report.passed > 300, "only {} checks ran", report.passed);
    assert!(report.skipped > 0);
}
