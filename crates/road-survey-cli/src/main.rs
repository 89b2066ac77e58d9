//! `road-survey`: validate a JSON submission file and print reports or an audit log

mod input;
mod logging;
mod settings;

use anyhow::{Context, Result};
use clap::Parser;
use input::SubmissionFile;
use road_survey_lib::{AuditRecord, Report, SurveyValidator, validate_parallel};
use settings::{OutputFormat, Settings};
use std::io::Write;

fn main() -> Result<()> {
    let settings = Settings::parse();
    let logging_guard = logging::setup_logging();

    if settings.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(settings.threads)
            .build_global()
            .context("Failed to configure worker threads")?;
    }

    let all_accepted = run(&settings)?;
    if settings.strict && !all_accepted {
        tracing::warn!("Some roads were not accepted");
        drop(logging_guard);
        std::process::exit(1);
    }
    Ok(())
}

/// Validate the input file and write the requested output; true if every road was accepted
#[cfg_attr(feature = "profiling", profiling::function)]
fn run(settings: &Settings) -> Result<bool> {
    let (config, submissions) = SubmissionFile::load(&settings.input)?.into_submissions()?;
    let config = settings.apply_overrides(config);
    tracing::debug!(?config, ignore = ?settings.ignore, "Validation configuration");

    let validator = SurveyValidator::default();
    let results = validate_parallel(&submissions, &validator, &config, settings.ignore)?;
    let all_accepted = results.iter().all(|(_, r)| r.status().is_accepted());

    let json = match settings.format {
        OutputFormat::Report => {
            let reports: Vec<Report> = results.iter().map(|(_, r)| r.report()).collect();
            serde_json::to_string_pretty(&reports)?
        }
        OutputFormat::Audit => {
            let records: Vec<AuditRecord> = results.iter().flat_map(|(_, r)| r.audit_log()).collect();
            serde_json::to_string_pretty(&records)?
        }
    };

    match &settings.output {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), "Wrote results");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{json}")?;
        }
    }

    Ok(all_accepted)
}
