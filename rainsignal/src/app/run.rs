use super::{AppConfig, AppError, RunMode};
use crate::backend::GridSimulation;
use kdam::{Bar, BarExt};
use rainsignal_core::engine::{ControlLoop, ControlMode, RunSummary};
use rainsignal_core::model::stats::{IntersectionSummary, StatisticsSink};
use std::fs::File;
use std::path::Path;

/// the outputs of one control-loop run
#[derive(Debug, Clone)]
pub struct RunResult {
    pub mode: ControlMode,
    pub summary: RunSummary,
    pub statistics: StatisticsSink,
    pub intersections: Vec<IntersectionSummary>,
}

/// runs the grid simulation once per requested control mode, writing each
/// run's statistics to `output_directory`. with [`RunMode::Both`] a comparison
/// of mean waiting times is logged at the end.
pub fn run_simulation(
    config: &AppConfig,
    mode: RunMode,
    output_directory: &Path,
) -> Result<Vec<RunResult>, AppError> {
    let modes = match mode {
        RunMode::Baseline => vec![ControlMode::Baseline],
        RunMode::Adaptive => vec![ControlMode::Adaptive],
        RunMode::Both => vec![ControlMode::Baseline, ControlMode::Adaptive],
    };
    std::fs::create_dir_all(output_directory).map_err(|e| AppError::WriteError {
        filepath: output_directory.to_string_lossy().to_string(),
        error: e.to_string(),
    })?;

    let mut results = vec![];
    for control_mode in modes {
        let result = run_once(config, control_mode)?;
        write_result(&result, output_directory, config.output.write_summaries)?;
        results.push(result);
    }

    if let [baseline, adaptive] = results.as_slice() {
        log_comparison(baseline, adaptive);
    }
    Ok(results)
}

fn run_once(config: &AppConfig, mode: ControlMode) -> Result<RunResult, AppError> {
    let mut engine_config = config.engine.clone();
    engine_config.mode = mode;
    let steps = engine_config.steps;

    // every run starts from a fresh, identically seeded network and weather
    let mut backend = GridSimulation::new(&config.backend)?;
    let mut weather = config.weather.build()?;
    let mut control_loop = ControlLoop::new(engine_config)?;

    let mut bar = Bar::builder()
        .total(steps as usize)
        .desc(format!("{} run", mode_name(mode)))
        .build()
        .map_err(|e| AppError::InternalError(format!("error building progress bar: {e}")))?;
    let summary = control_loop.run_with_progress(&mut backend, weather.as_mut(), |_| {
        let _ = bar.update(1);
    })?;
    eprintln!();

    log::info!(
        "{} run finished after {} steps: {} weather updates, {} program transitions, {} phase adjustments",
        mode_name(mode),
        summary.steps,
        summary.weather_updates,
        summary.program_transitions,
        summary.phase_adjustments
    );
    Ok(RunResult {
        mode,
        summary,
        statistics: control_loop.statistics().clone(),
        intersections: control_loop.intersection_summaries(),
    })
}

fn write_result(
    result: &RunResult,
    output_directory: &Path,
    write_summaries: bool,
) -> Result<(), AppError> {
    let name = mode_name(result.mode);
    let results_path = output_directory.join(format!("{name}_results.csv"));
    let file = create_file(&results_path)?;
    result
        .statistics
        .write_csv(file)
        .map_err(|e| write_error(&results_path, e))?;
    log::info!("wrote {}", results_path.to_string_lossy());

    if write_summaries {
        let summary_path = output_directory.join(format!("{name}_intersections.csv"));
        let file = create_file(&summary_path)?;
        StatisticsSink::write_summaries_csv(&result.intersections, file)
            .map_err(|e| write_error(&summary_path, e))?;
        log::info!("wrote {}", summary_path.to_string_lossy());
    }
    Ok(())
}

fn log_comparison(baseline: &RunResult, adaptive: &RunResult) {
    let base_wait = baseline.statistics.mean_vehicle_wait();
    let adaptive_wait = adaptive.statistics.mean_vehicle_wait();
    let change = if base_wait > 0.0 {
        format!("{:+.1}%", (adaptive_wait - base_wait) / base_wait * 100.0)
    } else {
        String::from("n/a")
    };
    log::info!(
        "mean vehicle wait: baseline {base_wait:.2}s, adaptive {adaptive_wait:.2}s ({change})"
    );
    log::info!(
        "traffic flow: baseline {} vehicles, adaptive {} vehicles",
        baseline.statistics.total_traffic_flow(),
        adaptive.statistics.total_traffic_flow()
    );
}

fn mode_name(mode: ControlMode) -> &'static str {
    match mode {
        ControlMode::Baseline => "baseline",
        ControlMode::Adaptive => "adaptive",
    }
}

fn create_file(path: &Path) -> Result<File, AppError> {
    File::create(path).map_err(|e| write_error(path, e))
}

fn write_error<E: std::fmt::Display>(path: &Path, e: E) -> AppError {
    AppError::WriteError {
        filepath: path.to_string_lossy().to_string(),
        error: e.to_string(),
    }
}
