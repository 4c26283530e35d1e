//! Session report rendering.

use packlet_bundler::{SessionReport, UnitOutcome};

use super::{error, format_duration, format_size, info, success, warning};

/// Print per-unit result lines and a session summary to stderr.
pub fn print_report(report: &SessionReport) {
    for unit in &report.units {
        match &unit.outcome {
            UnitOutcome::Succeeded { artifacts } => {
                let bytes: u64 = artifacts.iter().map(|a| a.bytes).sum();
                success(&format!(
                    "{}: {} ({} files, {}) in {}",
                    unit.label,
                    unit.output_file,
                    artifacts.len(),
                    format_size(bytes),
                    format_duration(unit.duration)
                ));
            }
            UnitOutcome::Failed { error: failure } => {
                error(&format!("{}: {}", unit.label, failure));
            }
            UnitOutcome::Canceled => {
                warning(&format!("{}: canceled", unit.label));
            }
        }
    }

    if let Some(stub) = &report.entry_stub {
        info(&format!("entry stub: {}", stub.filename));
    }
    if report.error_templates > 0 {
        info(&format!(
            "error templates registered: {}",
            report.error_templates
        ));
    }

    let succeeded = report.units.iter().filter(|u| u.succeeded()).count();
    let total_bytes: u64 = report
        .units
        .iter()
        .flat_map(|u| u.artifacts())
        .map(|a| a.bytes)
        .sum();
    info(&format!(
        "{}/{} units succeeded, {} written in {}",
        succeeded,
        report.units.len(),
        format_size(total_bytes),
        format_duration(report.duration)
    ));
}
