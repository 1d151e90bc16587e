mod common;

use common::{gallio_report, Case};
use gallio_sensor::{
    errors::SensorError,
    report::{parser, Status},
};
use std::time::Duration;

const SAMPLE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<report xmlns="http://www.gallio.org/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <testPackage><files><file>bin/Debug/Acme.Tests.dll</file></files></testPackage>
  <testModel />
  <testPackageRun startTime="2010-06-01T10:00:00" endTime="2010-06-01T10:00:02">
    <testStepRun startTime="2010-06-01T10:00:00" endTime="2010-06-01T10:00:02">
      <testStep id="root" name="Root" fullName="" isPrimary="true" isTestCase="false">
        <metadata />
      </testStep>
      <children>
        <testStepRun>
          <testStep id="f1" name="ParserTests" fullName="Acme.Tests/ParserTests" isTestCase="false">
            <codeReference assembly="Acme.Tests, Version=1.0.0.0" namespace="Acme" type="Acme.ParserTests" />
          </testStep>
          <children>
            <testStepRun>
              <testStep id="t1" name="ParsesNumbers" fullName="Acme.Tests/ParserTests/ParsesNumbers" isTestCase="true">
                <codeReference assembly="Acme.Tests, Version=1.0.0.0" namespace="Acme" type="Acme.ParserTests" member="ParsesNumbers" />
              </testStep>
              <testLog><streams /></testLog>
              <result assertCount="2" duration="0.012" testCount="1">
                <outcome status="passed" />
              </result>
            </testStepRun>
            <testStepRun>
              <testStep id="t2" name="RejectsGarbage" fullName="Acme.Tests/ParserTests/RejectsGarbage" isTestCase="true">
                <codeReference assembly="Acme.Tests, Version=1.0.0.0" namespace="Acme" type="Acme.ParserTests" member="RejectsGarbage" />
              </testStep>
              <testLog>
                <streams>
                  <stream name="ConsoleOutput"><body><contents><text>parsing...</text></contents></body></stream>
                  <stream name="Failures">
                    <body><contents>
                      <section name="Expected values to be equal.">
                        <contents><text>Expected: 3 &amp; Actual: 4</text></contents>
                      </section>
                    </contents></body>
                  </stream>
                </streams>
              </testLog>
              <result assertCount="1" duration="0.5" testCount="1">
                <outcome status="failed" />
              </result>
            </testStepRun>
            <testStepRun>
              <testStep id="t3" name="ThrowsOnNull" fullName="Acme.Tests/ParserTests/ThrowsOnNull" isTestCase="true">
                <codeReference assembly="Acme.Tests, Version=1.0.0.0" namespace="Acme" type="Acme.ParserTests" member="ThrowsOnNull" />
              </testStep>
              <result duration="0.001" testCount="1">
                <outcome status="failed" category="error" />
              </result>
            </testStepRun>
            <testStepRun>
              <testStep id="t4" name="Slow" fullName="Acme.Tests/ParserTests/Slow" isTestCase="true">
                <codeReference assembly="Acme.Tests, Version=1.0.0.0" namespace="Acme" type="Acme.ParserTests" member="Slow" />
              </testStep>
              <result duration="0" testCount="1">
                <outcome status="skipped" category="ignored" />
              </result>
            </testStepRun>
          </children>
          <result duration="0.6"><outcome status="failed" /></result>
        </testStepRun>
      </children>
      <result duration="0.6"><outcome status="failed" /></result>
    </testStepRun>
    <statistics assertCount="3" duration="0.6" failedCount="2" passedCount="1" skippedCount="1" testCount="4" />
  </testPackageRun>
</report>
"#;

#[test]
fn reads_test_cases_in_report_order() {
    let report = parser::parse(SAMPLE.as_bytes()).unwrap();
    let names: Vec<_> = report.cases.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "Acme.Tests/ParserTests/ParsesNumbers",
            "Acme.Tests/ParserTests/RejectsGarbage",
            "Acme.Tests/ParserTests/ThrowsOnNull",
            "Acme.Tests/ParserTests/Slow",
        ]
    );
    let statuses: Vec<_> = report.cases.iter().map(|c| c.status.clone()).collect();
    assert_eq!(
        statuses,
        vec![Status::Passed, Status::Failed, Status::Error, Status::Skipped]
    );
}

#[test]
fn reads_fixture_duration_and_failure_text() {
    let report = parser::parse(SAMPLE.as_bytes()).unwrap();

    let passed = &report.cases[0];
    assert_eq!(passed.fixture.as_deref(), Some("Acme.ParserTests"));
    assert_eq!(passed.assembly.as_deref(), Some("Acme.Tests, Version=1.0.0.0"));
    assert_eq!(passed.duration, Duration::from_millis(12));
    assert_eq!(passed.message, None);

    let failed = &report.cases[1];
    assert_eq!(failed.duration, Duration::from_millis(500));
    // Console output is not part of the failure.
    assert_eq!(failed.message.as_deref(), Some("Expected: 3 & Actual: 4"));
}

#[test]
fn unrepresentable_durations_read_as_zero() {
    let xml = SAMPLE
        .replace(r#"duration="0.012""#, r#"duration="1e30""#)
        .replace(r#"duration="0.5""#, r#"duration="-3""#)
        .replace(r#"duration="0.001""#, r#"duration="NaN""#);
    let report = parser::parse(xml.as_bytes()).unwrap();

    assert_eq!(report.len(), 4);
    assert_eq!(report.cases[0].duration, Duration::ZERO);
    assert_eq!(report.cases[1].duration, Duration::ZERO);
    assert_eq!(report.cases[2].duration, Duration::ZERO);
}

#[test]
fn parsing_is_deterministic() {
    let first = parser::parse(SAMPLE.as_bytes()).unwrap();
    let second = parser::parse(SAMPLE.as_bytes()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn empty_report_has_no_cases() {
    let report = parser::parse(br#"<report xmlns="http://www.gallio.org/" />"#).unwrap();
    assert!(report.is_empty());
}

#[test]
fn unknown_outcome_is_kept_for_the_mapper() {
    let xml = gallio_report(&[Case::passed("A"), Case::with_status("B", "exploded")]);
    let report = parser::parse(xml.as_bytes()).unwrap();
    assert_eq!(report.len(), 2);
    assert_eq!(report.cases[1].status, Status::Unrecognized("exploded".to_string()));
}

#[test]
fn truncated_report_keeps_completed_cases() {
    let xml = gallio_report(&[Case::passed("A"), Case::failed("B", "boom"), Case::passed("C")]);
    // Steps: root, fixture, A, B, C. Cut inside C.
    let cut = xml.match_indices("<testStepRun>").nth(4).unwrap().0 + 30;
    let failure = parser::parse(xml[..cut].as_bytes()).unwrap_err();

    assert!(matches!(failure.error, SensorError::ReportParse { .. }));
    let names: Vec<_> = failure.recovered.cases.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["Acme.CalculatorTests/A", "Acme.CalculatorTests/B"]
    );
}

#[test]
fn mismatched_tags_report_position_and_fragment() {
    let xml = "<report><testPackageRun><testStepRun></testPackageRun></report>";
    let failure = parser::parse(xml.as_bytes()).unwrap_err();
    match failure.error {
        SensorError::ReportParse {
            position, fragment, ..
        } => {
            assert!(position > 0);
            assert!(fragment.contains("testPackageRun"));
        }
        other => panic!("unexpected error: {}", other),
    }
    assert!(failure.recovered.is_empty());
}

#[test]
fn foreign_documents_are_rejected() {
    let failure = parser::parse(br#"<testsuite name="x"><testcase name="a"/></testsuite>"#)
        .unwrap_err();
    assert!(failure.error.to_string().contains("not a Gallio report"));

    let failure = parser::parse(b"").unwrap_err();
    assert!(failure.error.to_string().contains("no <report> element"));
}
