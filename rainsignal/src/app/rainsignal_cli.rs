use super::{AppConfig, AppError};
use clap::{Parser, Subcommand, ValueEnum};
use rainsignal_core::model::rain::SeverityLadderPreset;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// command line tool running rain-adaptive traffic signal control
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct RainsignalCliArguments {
    /// select the rainsignal operation to run
    #[command(subcommand)]
    pub op: RainsignalOperation,
}

/// which control strategies a run executes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// fixed-time signals, statistics only
    Baseline,
    /// rain-adaptive signal control
    Adaptive,
    /// a baseline run followed by an adaptive run
    Both,
}

#[derive(Debug, Clone, Serialize, Deserialize, Subcommand)]
pub enum RainsignalOperation {
    /// runs the control loop against the grid simulation and writes statistics
    Run {
        /// TOML or JSON configuration file. when omitted, defaults and
        /// RAINSIGNAL__ environment overrides are used.
        #[arg(short, long)]
        config: Option<String>,
        #[arg(short, long, value_enum, default_value_t = RunMode::Both)]
        mode: RunMode,
        /// overrides the configured number of steps
        #[arg(short, long)]
        steps: Option<u64>,
        /// overrides the configured output directory
        #[arg(short, long)]
        output_directory: Option<String>,
    },
    /// prints the category, intensity, adjustment factors and surface
    /// estimates for a rainfall rate
    Classify {
        /// rainfall rate in mm/h
        #[arg(short, long)]
        rainfall: f64,
        /// severity ladder preset: impact, controller or simulator
        #[arg(short, long, value_parser = parse_ladder, default_value = "impact")]
        ladder: SeverityLadderPreset,
    },
    /// lists rain events found in a historical rainfall CSV
    RainEvents {
        /// CSV with `step,rainfall_mm_h` or `timestamp,precipitation_mm` columns
        #[arg(short, long)]
        input: String,
        #[arg(short, long, default_value_t = 30.0)]
        min_duration_minutes: f64,
        #[arg(short, long, value_parser = parse_ladder, default_value = "simulator")]
        ladder: SeverityLadderPreset,
    },
    /// prints the default configuration as TOML
    DefaultConfig,
}

impl RainsignalOperation {
    pub fn run(&self) -> Result<(), AppError> {
        match self {
            RainsignalOperation::Run {
                config,
                mode,
                steps,
                output_directory,
            } => {
                let mut app_config = AppConfig::load(config.as_deref())?;
                if let Some(steps) = steps {
                    app_config.engine.steps = *steps;
                }
                if let Some(dir) = output_directory {
                    app_config.output.directory = dir.clone();
                }
                let out_dir = app_config.output.directory.clone();
                crate::app::run_simulation(&app_config, *mode, Path::new(&out_dir))?;
                Ok(())
            }
            RainsignalOperation::Classify { rainfall, ladder } => {
                let result = crate::app::classify_rainfall(*rainfall, *ladder)?;
                let json = serde_json::to_string_pretty(&result)
                    .map_err(|e| AppError::InternalError(format!("failure encoding result: {e}")))?;
                println!("{json}");
                Ok(())
            }
            RainsignalOperation::RainEvents {
                input,
                min_duration_minutes,
                ladder,
            } => crate::app::run_rain_events(Path::new(input), *min_duration_minutes, *ladder),
            RainsignalOperation::DefaultConfig => {
                println!("{}", AppConfig::default_toml()?);
                Ok(())
            }
        }
    }
}

fn parse_ladder(s: &str) -> Result<SeverityLadderPreset, String> {
    s.parse::<SeverityLadderPreset>().map_err(|e| e.to_string())
}
