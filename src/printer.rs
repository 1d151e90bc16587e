//! Colored terminal output for analysis results.
use crate::{
    publish::RecordingPublisher,
    sensor::{Analysis, Outcome},
};
use colored::*;

/// Generate a colorized report of one analysis.
pub fn report_str(analysis: &Analysis) -> String {
    let mut buf = String::new();
    let name = &analysis.module;
    match &analysis.outcome {
        Outcome::Skipped => {
            buf.push_str(&"- ".dimmed().to_string());
            buf.push_str(&name.dimmed().to_string());
            buf.push_str(&" (skipped)".dimmed().to_string());
        }
        Outcome::Failed(err) => {
            buf.push_str(&"✗ ".red().to_string());
            buf.push_str(&name.bold().red().to_string());
            buf.push_str(&format!(": {}", err).red().to_string());
        }
        Outcome::Published { measures, warning } => {
            let broken = measures.failures() + measures.errors();
            let counts = format!(
                "{} tests / {} failing / {} errors / {} skipped ({:.2}s)",
                measures.total(),
                measures.failures(),
                measures.errors(),
                measures.skipped(),
                measures.duration().as_secs_f64()
            );
            if broken == 0 {
                buf.push_str(&"✓ ".green().to_string());
                buf.push_str(&name.bold().green().to_string());
                buf.push_str(&format!(": {}", counts).green().to_string());
            } else {
                buf.push_str(&"✗ ".yellow().to_string());
                buf.push_str(&name.bold().yellow().to_string());
                buf.push_str(&format!(": {}", counts).yellow().to_string());
            }
            if let Some(warning) = warning {
                buf.push_str(&format!(" (partial report: {})", warning).dimmed().to_string());
            }
            for test in measures.failing() {
                buf.push_str("\n    ");
                buf.push_str(&test.name.red().to_string());
                if let Some(msg) = test.message.as_deref().and_then(|m| m.lines().next()) {
                    buf.push_str(&format!(": {}", msg).dimmed().to_string());
                }
            }
        }
    }
    buf
}

/// Measures as `module[:resource] metric = value` lines.
pub fn measures_str(publisher: &RecordingPublisher) -> String {
    let mut buf = String::new();
    for published in &publisher.measures {
        buf.push_str(&published.module.blue().to_string());
        if let Some(resource) = &published.resource {
            buf.push_str(&format!(":{}", resource).blue().to_string());
        }
        buf.push_str(&format!(" {} = {}\n", published.measure.metric, published.measure.value));
    }
    buf
}

/// One line per analysis followed by the totals.
pub fn summary(analyses: &[Analysis]) -> String {
    let (mut published, mut failed, mut skipped) = (0, 0, 0);
    let mut buf = String::new();
    for analysis in analyses {
        buf.push_str(&report_str(analysis));
        buf.push('\n');
        match analysis.outcome {
            Outcome::Skipped => skipped += 1,
            Outcome::Failed(_) => failed += 1,
            Outcome::Published { .. } => published += 1,
        }
    }
    buf.push_str(&format!(
        "  {} / {} / {}\n",
        format!("{} published", published).green(),
        format!("{} failed", failed).red(),
        format!("{} skipped", skipped).dimmed(),
    ));
    buf
}
