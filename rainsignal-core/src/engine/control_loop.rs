use super::{
    BackendError, ControlMode, EngineConfig, EngineError, FailurePolicy, SignalBackend,
    StepReport, WeatherSource,
};
use crate::model::{
    congestion::{CongestionEstimator, QueueSample},
    rain::{road_friction, visibility_factor, RainImpactModel, RainfallReading, SeverityCategory},
    signal::{AdaptivePhaseController, IntersectionId, IntersectionTelemetry},
    stats::{IntersectionSummary, StatisticsRecord, StatisticsSink},
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// backend seconds per tick
const SECONDS_PER_STEP: f64 = 1.0;

/// counters describing a finished (or stopped) run
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub steps: u64,
    pub weather_updates: u64,
    pub program_transitions: usize,
    pub phase_adjustments: usize,
    pub skipped_ticks: u64,
    pub stopped_early: bool,
}

/// step-synchronous loop tying the backend, the weather source, the rain model
/// and the adaptive controller together. one instance drives one run.
pub struct ControlLoop {
    config: EngineConfig,
    model: RainImpactModel,
    controller: AdaptivePhaseController,
    congestion: CongestionEstimator,
    statistics: StatisticsSink,
    stop: Arc<AtomicBool>,
    reading: RainfallReading,
    rain_started_at: Option<u64>,
    summary: RunSummary,
}

impl ControlLoop {
    pub fn new(config: EngineConfig) -> Result<ControlLoop, EngineError> {
        config.validate()?;
        let model = RainImpactModel::try_from(&config.rain)?;
        let controller = AdaptivePhaseController::new(config.controller.clone())?;
        let congestion = CongestionEstimator::new(config.congestion.clone());
        Ok(ControlLoop {
            config,
            model,
            controller,
            congestion,
            statistics: StatisticsSink::new(),
            stop: Arc::new(AtomicBool::new(false)),
            reading: RainfallReading::dry(0),
            rain_started_at: None,
            summary: RunSummary::default(),
        })
    }

    /// flag checked between ticks. setting it ends the run after the current tick.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn controller(&self) -> &AdaptivePhaseController {
        &self.controller
    }

    pub fn statistics(&self) -> &StatisticsSink {
        &self.statistics
    }

    pub fn intersection_summaries(&self) -> Vec<IntersectionSummary> {
        self.congestion.summaries()
    }

    pub fn run(
        &mut self,
        backend: &mut dyn SignalBackend,
        weather: &mut dyn WeatherSource,
    ) -> Result<RunSummary, EngineError> {
        self.run_with_progress(backend, weather, |_| {})
    }

    /// runs the configured number of ticks, calling `on_step` after each one.
    pub fn run_with_progress<F>(
        &mut self,
        backend: &mut dyn SignalBackend,
        weather: &mut dyn WeatherSource,
        mut on_step: F,
    ) -> Result<RunSummary, EngineError>
    where
        F: FnMut(&StepReport),
    {
        if self.config.mode == ControlMode::Adaptive && !self.controller.is_initialized() {
            self.controller.initialize(backend)?;
        }
        log::info!(
            "running {} steps in {:?} mode with weather from {}",
            self.config.steps,
            self.config.mode,
            weather.name()
        );
        for tick in 0..self.config.steps {
            if self.stop.load(Ordering::SeqCst) {
                log::info!("stop requested, ending run after {tick} steps");
                self.summary.stopped_early = true;
                break;
            }
            let report = match self.tick(backend, weather, tick) {
                Ok(report) => report,
                Err(e) => {
                    if let Err(restore) = self.restore_programs(backend) {
                        log::warn!("failed restoring default programs after error: {restore}");
                    }
                    return Err(e);
                }
            };
            on_step(&report);
        }
        self.restore_programs(backend)?;
        Ok(self.summary.clone())
    }

    /// switches every rain-adapted intersection back to its default program.
    /// per-intersection failures are logged.
    fn restore_programs(&mut self, backend: &mut dyn SignalBackend) -> Result<(), EngineError> {
        if !self.controller.is_initialized() {
            return Ok(());
        }
        let outcome = self.controller.restore_defaults(backend)?;
        for (id, e) in outcome.failures.iter() {
            log::warn!("intersection '{id}' left on its rain program: {e}");
        }
        Ok(())
    }

    /// one tick: weather poll on the cadence, telemetry and congestion sampling,
    /// green retiming, backend advance and statistics.
    pub fn tick(
        &mut self,
        backend: &mut dyn SignalBackend,
        weather: &mut dyn WeatherSource,
        tick: u64,
    ) -> Result<StepReport, EngineError> {
        let mut skip = false;
        if tick % self.config.weather_interval == 0 {
            skip = self.update_weather(backend, weather, tick)?;
        }
        if !skip {
            skip = self.control(backend, tick)?;
        }
        if skip {
            self.summary.skipped_ticks += 1;
        }
        let report = backend
            .advance()
            .map_err(|source| EngineError::Backend { step: tick, source })?;
        self.record(&report, tick);
        self.summary.steps += 1;
        Ok(report)
    }

    fn update_weather(
        &mut self,
        backend: &mut dyn SignalBackend,
        weather: &mut dyn WeatherSource,
        tick: u64,
    ) -> Result<bool, EngineError> {
        match weather.rainfall(tick) {
            Ok(rate) => self.reading = RainfallReading::at_step(rate, tick),
            Err(e) => log::warn!(
                "weather poll at step {tick} failed, keeping {:.2} mm/h: {e}",
                self.reading.rainfall_mm_h
            ),
        }
        self.summary.weather_updates += 1;
        let rate = self.reading.rainfall_mm_h;
        let category = self.model.classify(rate);
        let intensity = self.model.intensity(rate);
        match (category.is_raining(), self.rain_started_at) {
            (true, None) => self.rain_started_at = Some(tick),
            (false, Some(_)) => self.rain_started_at = None,
            _ => {}
        }
        log::info!(
            "step {tick}: rainfall {rate:.2} mm/h, category {category}, intensity {intensity:.2}, visibility {:.2}, friction {:.2}",
            visibility_factor(rate),
            self.friction(rate, tick)
        );

        let flow = self.model.apply(&self.config.base_parameters, rate);
        if let Err(e) = backend.apply_flow_parameters(&flow) {
            return self.on_failures(tick, vec![(String::from("*"), e)]);
        }
        if self.config.mode == ControlMode::Baseline {
            return Ok(false);
        }
        let outcome = self.controller.update_weather(backend, category, intensity)?;
        self.summary.program_transitions += outcome.transitions.len();
        self.on_failures(tick, outcome.failures)
    }

    fn control(&mut self, backend: &mut dyn SignalBackend, tick: u64) -> Result<bool, EngineError> {
        let telemetry = match self.collect_telemetry(backend) {
            Ok(t) => t,
            Err(e) => return self.on_failures(tick, vec![(String::from("*"), e)]),
        };
        let stopped = self.congestion.config().stopped_speed_threshold;
        for (id, current) in telemetry.iter() {
            let sample = QueueSample::from_telemetry(current, stopped);
            self.congestion
                .set_incoming_lanes(id, current.incoming_lanes.len());
            self.congestion.record_sample(
                id,
                sample.queue_length,
                sample.wait_time_sum,
                sample.vehicle_count,
            );
        }
        if self.config.mode == ControlMode::Baseline {
            return Ok(false);
        }
        let outcome = self
            .controller
            .step(backend, &telemetry, &self.congestion)?;
        self.summary.phase_adjustments += outcome.adjusted.len();
        self.on_failures(tick, outcome.failures)
    }

    fn collect_telemetry(
        &self,
        backend: &dyn SignalBackend,
    ) -> Result<HashMap<IntersectionId, IntersectionTelemetry>, BackendError> {
        backend
            .intersection_ids()?
            .into_iter()
            .map(|id| {
                let t = backend.telemetry(&id)?;
                Ok((id, t))
            })
            .collect()
    }

    /// applies the failure policy. returns true when the rest of the tick is skipped.
    fn on_failures(
        &self,
        tick: u64,
        failures: Vec<(IntersectionId, BackendError)>,
    ) -> Result<bool, EngineError> {
        let mut failures = failures.into_iter();
        let (id, first) = match failures.next() {
            Some(f) => f,
            None => return Ok(false),
        };
        match self.config.failure_policy {
            FailurePolicy::Abort => Err(EngineError::Backend {
                step: tick,
                source: first,
            }),
            FailurePolicy::SkipTick => {
                log::warn!("skipping step {tick}, intersection '{id}': {first}");
                for (id, e) in failures {
                    log::warn!("skipping step {tick}, intersection '{id}': {e}");
                }
                Ok(true)
            }
        }
    }

    fn friction(&self, rate: f64, tick: u64) -> f64 {
        let minutes = self
            .rain_started_at
            .map(|start| (tick - start) as f64 * SECONDS_PER_STEP / 60.0);
        road_friction(rate, self.config.road_surface, minutes)
    }

    fn record(&mut self, report: &StepReport, tick: u64) {
        let rate = self.reading.rainfall_mm_h;
        let category: SeverityCategory = self.model.classify(rate);
        self.statistics.push(StatisticsRecord {
            step: report.step,
            vehicle_wait_time: report.mean_vehicle_wait,
            pedestrian_wait_time: report.mean_pedestrian_wait,
            traffic_flow: report.arrived,
            rain_category: category,
            rainfall_mm_h: rate,
            visibility: visibility_factor(rate),
            friction: self.friction(rate, tick),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::ControlLoop;
    use crate::engine::recording_backend::{four_phase, Command, RecordingBackend};
    use crate::engine::{
        ControlMode, EngineConfig, EngineError, FailurePolicy, WeatherError, WeatherSource,
    };
    use crate::model::rain::SeverityCategory;

    /// rainfall looked up from a fixed series, failing past its end
    struct SeriesWeather(Vec<f64>);

    impl WeatherSource for SeriesWeather {
        fn rainfall(&mut self, step: u64) -> Result<f64, WeatherError> {
            self.0
                .get(step as usize)
                .copied()
                .ok_or_else(|| WeatherError::RequestFailed(format!("no value for step {step}")))
        }

        fn name(&self) -> String {
            String::from("series")
        }
    }

    fn config(steps: u64, interval: u64) -> EngineConfig {
        EngineConfig {
            steps,
            weather_interval: interval,
            ..Default::default()
        }
    }

    #[test]
    fn test_adaptive_run_enters_and_leaves_rain() {
        let mut backend = RecordingBackend::with_intersections(&["j1", "j2"]);
        // heavy rain for the first two weather polls, then dry
        let mut weather = SeriesWeather(vec![20.0, 20.0, 20.0, 20.0, 0.0, 0.0]);
        let mut engine = ControlLoop::new(config(6, 2)).unwrap();
        let summary = engine.run(&mut backend, &mut weather).unwrap();

        assert_eq!(summary.steps, 6);
        assert_eq!(summary.weather_updates, 3);
        // enter rain, then restore, for both intersections
        assert_eq!(summary.program_transitions, 4);
        assert_eq!(backend.intersections["j1"].active, "0");

        let records = engine.statistics().records();
        assert_eq!(records.len(), 6);
        assert_eq!(records[0].rain_category, SeverityCategory::Heavy);
        assert!(records[0].visibility < 1.0);
        assert_eq!(records[5].rain_category, SeverityCategory::None);
        assert_eq!(records[5].visibility, 1.0);
        assert!(backend
            .commands
            .iter()
            .any(|c| matches!(c, Command::FlowParameters(_))));
    }

    #[test]
    fn test_baseline_never_commands_signals() {
        let mut backend = RecordingBackend::with_intersections(&["j1"]);
        let mut weather = SeriesWeather(vec![30.0; 4]);
        let mut engine = ControlLoop::new(EngineConfig {
            mode: ControlMode::Baseline,
            ..config(4, 1)
        })
        .unwrap();
        engine.run(&mut backend, &mut weather).unwrap();
        assert!(backend
            .commands
            .iter()
            .all(|c| matches!(c, Command::FlowParameters(_))));
        assert_eq!(backend.active_phases("j1"), four_phase());
        assert_eq!(engine.statistics().len(), 4);
        assert_eq!(engine.intersection_summaries().len(), 1);
    }

    #[test]
    fn test_failed_weather_poll_keeps_reading() {
        let mut backend = RecordingBackend::with_intersections(&["j1"]);
        // only step 0 has a value
        let mut weather = SeriesWeather(vec![20.0]);
        let mut engine = ControlLoop::new(config(3, 1)).unwrap();
        engine.run(&mut backend, &mut weather).unwrap();
        let records = engine.statistics().records();
        assert!(records.iter().all(|r| r.rainfall_mm_h == 20.0));
    }

    #[test]
    fn test_failure_policy() {
        let mut backend = RecordingBackend::with_intersections(&["j1"]);
        backend.failing.insert("j1".to_string());
        let mut engine = ControlLoop::new(config(3, 1)).unwrap();
        let result = engine.run(&mut backend, &mut SeriesWeather(vec![0.0; 3]));
        assert!(matches!(result, Err(EngineError::Backend { step: 0, .. })));

        let mut engine = ControlLoop::new(EngineConfig {
            failure_policy: FailurePolicy::SkipTick,
            ..config(3, 1)
        })
        .unwrap();
        let summary = engine
            .run(&mut backend, &mut SeriesWeather(vec![0.0; 3]))
            .unwrap();
        assert_eq!(summary.skipped_ticks, 3);
        assert_eq!(engine.statistics().len(), 3);
    }

    #[test]
    fn test_abort_restores_default_programs() {
        let mut backend = RecordingBackend::with_intersections(&["j1", "j2"]);
        backend.failing_step = Some(2);
        let mut engine = ControlLoop::new(config(5, 1)).unwrap();
        let result = engine.run(&mut backend, &mut SeriesWeather(vec![20.0; 5]));
        assert!(matches!(result, Err(EngineError::Backend { step: 2, .. })));
        for id in ["j1", "j2"] {
            assert_eq!(backend.intersections[id].active, "0");
            assert!(!engine.controller().state(id).unwrap().is_rain_adapted());
        }
        assert_eq!(
            backend.commands.last(),
            Some(&Command::SwitchProgram("j2".to_string(), "0".to_string()))
        );
    }

    #[test]
    fn test_congestion_lengthens_green_under_rain() {
        let mut backend = RecordingBackend::with_intersections(&["j1"]);
        // 24 stopped vehicles over 4 lanes of 10 vehicles: congestion 0.6
        backend.queue("j1", 24);
        let mut engine = ControlLoop::new(config(1, 1)).unwrap();
        let summary = engine
            .run(&mut backend, &mut SeriesWeather(vec![20.0]))
            .unwrap();
        assert_eq!(summary.phase_adjustments, 1);
        let durations: Vec<f64> = backend
            .commands
            .iter()
            .filter_map(|c| match c {
                Command::SetPhaseDuration(id, d) if id == "j1" => Some(*d),
                _ => None,
            })
            .collect();
        assert_eq!(durations.len(), 1);
        // heavy rain 1.3, congestion 1.2, within [10, 120]
        assert!((durations[0] - 31.0 * 1.3 * 1.2).abs() < 1e-9);
        let summaries = engine.intersection_summaries();
        assert_eq!(summaries[0].max_queue_length, 24);
    }

    #[test]
    fn test_stop_flag() {
        let mut backend = RecordingBackend::with_intersections(&["j1"]);
        let mut engine = ControlLoop::new(config(100, 10)).unwrap();
        let stop = engine.stop_handle();
        let summary = engine
            .run_with_progress(&mut backend, &mut SeriesWeather(vec![0.0; 100]), |report| {
                if report.step == 5 {
                    stop.store(true, std::sync::atomic::Ordering::SeqCst);
                }
            })
            .unwrap();
        assert!(summary.stopped_early);
        assert_eq!(summary.steps, 5);
    }

    #[test]
    fn test_rejects_zero_interval() {
        assert!(ControlLoop::new(config(10, 0)).is_err());
    }
}
