use clap::{Parser, ValueEnum};
use road_survey_lib::{CheckConfig, IgnoreSet};
use std::path::PathBuf;

/// Which serialization of the results to print
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Status plus counting messages grouped by severity, one entry per road
    Report,
    /// Flat list of every finding, regardless of ignore tags
    Audit,
}

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
/// Road Survey - validate survey submissions against road centerlines
pub struct Settings {
    /// JSON submission file with routes and survey tables
    #[clap(value_name = "FILE")]
    pub input: PathBuf,

    /// Ignore tags to suppress, comma separated (e.g. "force,review")
    #[clap(short, long, default_value = "", value_parser = parse_ignore)]
    pub ignore: IgnoreSet,

    /// Output shape
    #[clap(short, long, value_enum, default_value_t = OutputFormat::Report)]
    pub format: OutputFormat,

    /// Write output here instead of stdout
    #[clap(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Override the maximum distance from a coordinate to the route
    #[clap(long)]
    pub distance_tolerance: Option<f64>,

    /// Override the maximum station/measure disagreement
    #[clap(long)]
    pub station_tolerance: Option<f64>,

    /// Override the factor turning stations into route measure units
    #[clap(long)]
    pub station_factor: Option<f64>,

    /// Worker threads for parallel validation (0 = one per core)
    #[clap(short = 'j', long, default_value = "0")]
    pub threads: usize,

    /// Exit with status 1 when any road is not accepted
    #[clap(long, default_value = "false")]
    pub strict: bool,
}

fn parse_ignore(s: &str) -> Result<IgnoreSet, String> {
    s.parse().map_err(|e: road_survey_lib::Error| e.to_string())
}

impl Settings {
    /// Apply command-line overrides on top of a file-provided configuration
    pub fn apply_overrides(&self, mut config: CheckConfig) -> CheckConfig {
        if let Some(v) = self.distance_tolerance {
            config.distance_tolerance = v;
        }
        if let Some(v) = self.station_tolerance {
            config.station_tolerance = v;
        }
        if let Some(v) = self.station_factor {
            config.station_to_measure_factor = v;
        }
        config
    }
}
