use crate::{config::RunConfiguration, errors::SensorError};
use std::path::PathBuf;
use tracing::{debug, warn};

/// Resolve the report files of a reuse pass.
///
/// `reportsPath` is taken relative to the module and may be a glob pattern;
/// matches are returned in path order. No match is
/// [SensorError::ReportNotFound].
pub fn reuse_reports(conf: &RunConfiguration) -> Result<Vec<PathBuf>, SensorError> {
    let pattern = conf.reports_path.as_deref().ok_or_else(|| {
        SensorError::ConfigurationInvalid(
            "reportsPath is required in reuseReport mode".to_string(),
        )
    })?;
    let full = conf.in_module(pattern);

    let mut found: Vec<PathBuf> = glob::glob(&full.to_string_lossy())?
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(err) => {
                warn!(%err, "unreadable path while locating reports");
                None
            }
        })
        .filter(|path| path.is_file())
        .collect();
    found.sort();

    if found.is_empty() {
        return Err(SensorError::ReportNotFound(full));
    }
    debug!(reports = ?found, "reusing existing reports");
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Mode;
    use std::fs;

    fn reuse(dir: &std::path::Path, pattern: &str) -> RunConfiguration {
        RunConfiguration {
            mode: Mode::ReuseReport,
            reports_path: Some(pattern.to_string()),
            base_dir: dir.to_path_buf(),
            ..RunConfiguration::default()
        }
    }

    #[test]
    fn pattern_matches_are_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b-report.xml"), "<report/>").unwrap();
        fs::write(dir.path().join("a-report.xml"), "<report/>").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();

        let found = reuse_reports(&reuse(dir.path(), "*-report.xml")).unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a-report.xml", "b-report.xml"]);
    }

    #[test]
    fn missing_report_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = reuse_reports(&reuse(dir.path(), "missing.xml")).unwrap_err();
        assert!(matches!(err, SensorError::ReportNotFound(p) if p.ends_with("missing.xml")));
    }

    #[test]
    fn absolute_paths_ignore_module_dir() {
        let dir = tempfile::tempdir().unwrap();
        let report = dir.path().join("existing.xml");
        fs::write(&report, "<report/>").unwrap();

        let conf = reuse(std::path::Path::new("/nonexistent"), report.to_str().unwrap());
        assert_eq!(reuse_reports(&conf).unwrap(), vec![report]);
    }
}
