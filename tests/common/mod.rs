#![allow(dead_code)]
use gallio_sensor::config::{Mode, RunConfiguration};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use tempfile::TempDir;

/// A test case of a generated report: name, outcome status, outcome
/// category and failure text.
pub struct Case<'a> {
    pub name: &'a str,
    pub status: &'a str,
    pub category: Option<&'a str>,
    pub failure: Option<&'a str>,
}

impl<'a> Case<'a> {
    pub fn passed(name: &'a str) -> Self {
        Case {
            name,
            status: "passed",
            category: None,
            failure: None,
        }
    }

    pub fn failed(name: &'a str, failure: &'a str) -> Self {
        Case {
            name,
            status: "failed",
            category: None,
            failure: Some(failure),
        }
    }

    pub fn skipped(name: &'a str) -> Self {
        Case {
            name,
            status: "skipped",
            category: Some("ignored"),
            failure: None,
        }
    }

    pub fn with_status(name: &'a str, status: &'a str) -> Self {
        Case {
            name,
            status,
            category: None,
            failure: None,
        }
    }
}

/// A Gallio report with every case inside one `Acme.CalculatorTests`
/// fixture.
pub fn gallio_report(cases: &[Case<'_>]) -> String {
    let mut steps = String::new();
    for (idx, case) in cases.iter().enumerate() {
        steps.push_str(&format!(
            r#"
          <testStepRun>
            <testStep id="case{idx}" name="{name}" fullName="Acme.CalculatorTests/{name}" isTestCase="true">
              <codeReference assembly="Acme.Tests" namespace="Acme" type="Acme.CalculatorTests" member="{name}" />
            </testStep>"#,
            idx = idx,
            name = case.name
        ));
        if let Some(failure) = case.failure {
            steps.push_str(&format!(
                r#"
            <testLog><streams><stream name="Failures"><body><contents><text>{}</text></contents></body></stream></streams></testLog>"#,
                failure
            ));
        }
        let category = case
            .category
            .map(|c| format!(r#" category="{}""#, c))
            .unwrap_or_default();
        steps.push_str(&format!(
            r#"
            <result duration="0.25"><outcome status="{}"{} /></result>
          </testStepRun>"#,
            case.status, category
        ));
    }

    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<report xmlns="http://www.gallio.org/">
  <testPackageRun>
    <testStepRun>
      <testStep id="root" name="Root" fullName="" isTestCase="false" />
      <children>
        <testStepRun>
          <testStep id="fixture" name="CalculatorTests" fullName="Acme.CalculatorTests" isTestCase="false">
            <codeReference assembly="Acme.Tests" namespace="Acme" type="Acme.CalculatorTests" />
          </testStep>
          <children>{}
          </children>
          <result duration="1.0"><outcome status="passed" /></result>
        </testStepRun>
      </children>
      <result duration="1.0"><outcome status="passed" /></result>
    </testStepRun>
  </testPackageRun>
</report>
"#,
        steps
    )
}

/// Script prologue: parses the Gallio report arguments into `$REPORT`,
/// records the arguments and leaves an `invoked` marker next to itself.
const PROLOGUE: &str = r#"
for arg in "$@"; do
  case "$arg" in
    /report-directory:*) REPORT_DIR="${arg#/report-directory:}" ;;
    /report-name-format:*) REPORT_NAME="${arg#/report-name-format:}" ;;
  esac
done
REPORT="$REPORT_DIR/$REPORT_NAME.xml"
touch "$(dirname "$0")/invoked"
printf '%s\n' "$@" > "$(dirname "$0")/args.txt"
"#;

/// A Gallio installation whose `Gallio.Echo.exe` is a shell script, plus an
/// empty module directory.
pub struct FakeGallio {
    pub root: TempDir,
}

impl FakeGallio {
    pub fn new(body: &str) -> Self {
        let root = tempfile::tempdir().unwrap();
        let bin = root.path().join("install/bin");
        fs::create_dir_all(&bin).unwrap();
        fs::create_dir_all(root.path().join("module")).unwrap();
        fs::write(bin.join("Gallio.Echo.exe"), format!("{}\n{}\n", PROLOGUE, body))
            .unwrap();
        FakeGallio { root }
    }

    /// A runner that writes `xml` as its report and exits with `code`.
    pub fn writing(xml: &str, code: i32) -> Self {
        Self::new(&format!(
            "cat > \"$REPORT\" <<'GALLIO_EOF'\n{}\nGALLIO_EOF\nexit {}",
            xml, code
        ))
    }

    pub fn install_dir(&self) -> PathBuf {
        self.root.path().join("install")
    }

    pub fn module_dir(&self) -> PathBuf {
        self.root.path().join("module")
    }

    pub fn invoked(&self) -> bool {
        self.install_dir().join("bin/invoked").exists()
    }

    /// Arguments of the last invocation, one per line.
    pub fn args(&self) -> String {
        fs::read_to_string(self.install_dir().join("bin/args.txt")).unwrap_or_default()
    }

    /// Run-mode configuration pointing at this installation. The script
    /// is started through `sh`, so it needs no execute permission.
    pub fn config(&self) -> RunConfiguration {
        RunConfiguration {
            install_folder: self.install_dir(),
            launcher: Some("sh".to_string()),
            mode: Mode::Run,
            base_dir: self.module_dir(),
            ..RunConfiguration::default()
        }
    }

    pub fn with_timeout(&self, timeout: Duration) -> RunConfiguration {
        RunConfiguration {
            timeout,
            ..self.config()
        }
    }
}

pub fn write(path: &Path, contents: &str) {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).unwrap();
    }
    fs::write(path, contents).unwrap();
}
