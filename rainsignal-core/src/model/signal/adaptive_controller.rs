use super::{
    ControllerConfig, ControllerError, IntersectionId, IntersectionState, IntersectionTelemetry,
    PhaseKind, SignalMode, SignalProgram,
};
use crate::engine::{BackendError, SignalBackend};
use crate::model::congestion::CongestionEstimator;
use crate::model::rain::SeverityCategory;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// a green-phase retiming computed for one intersection in one tick
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct PhaseAdjustment {
    pub intersection_id: IntersectionId,
    pub phase_index: usize,
    /// captured duration of the phase, in seconds
    pub original_duration: f64,
    /// clamped duration sent to the backend, in seconds
    pub new_duration: f64,
    pub weather_factor: f64,
    pub congestion_factor: f64,
    pub congestion_level: f64,
}

impl PhaseAdjustment {
    pub fn combined_factor(&self) -> f64 {
        self.weather_factor * self.congestion_factor
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum ProgramTransition {
    EnterRain {
        intersection_id: IntersectionId,
        program_id: String,
    },
    Resize {
        intersection_id: IntersectionId,
        from: String,
        to: String,
    },
    Restore {
        intersection_id: IntersectionId,
        program_id: String,
    },
}

impl ProgramTransition {
    pub fn intersection_id(&self) -> &str {
        match self {
            ProgramTransition::EnterRain {
                intersection_id, ..
            } => intersection_id,
            ProgramTransition::Resize {
                intersection_id, ..
            } => intersection_id,
            ProgramTransition::Restore {
                intersection_id, ..
            } => intersection_id,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct WeatherUpdateOutcome {
    pub category: SeverityCategory,
    pub intensity: f64,
    pub transitions: Vec<ProgramTransition>,
    /// intersections left in their previous state because a command failed
    pub failures: Vec<(IntersectionId, BackendError)>,
}

#[derive(Debug, Clone, Default)]
pub struct StepOutcome {
    pub adjusted: Vec<PhaseAdjustment>,
    pub failures: Vec<(IntersectionId, BackendError)>,
}

/// backend work decided for one intersection during a weather update
enum PendingTransition {
    Load {
        program: SignalProgram,
        replacing: Option<String>,
    },
    Restore {
        program_id: String,
    },
}

/// Retimes signal phases from the current rain category and the congestion
/// level of each intersection.
///
/// Two mechanisms cooperate:
///
/// * on every weather update the whole program of an intersection is swapped
///   for a rain program sized to the rain intensity, and swapped back once the
///   rain stops
/// * on every tick the running green phase is set to its captured duration
///   scaled by the weather and congestion factors, clamped to the green bounds
///
/// The captured schedule of each intersection is never modified, so restoring
/// the default program always reproduces the original timing.
#[derive(Debug, Clone)]
pub struct AdaptivePhaseController {
    config: ControllerConfig,
    intersections: BTreeMap<IntersectionId, IntersectionState>,
    initialized: bool,
    category: SeverityCategory,
    intensity: f64,
}

impl AdaptivePhaseController {
    pub fn new(config: ControllerConfig) -> Result<AdaptivePhaseController, ControllerError> {
        config.validate()?;
        Ok(AdaptivePhaseController {
            config,
            intersections: BTreeMap::new(),
            initialized: false,
            category: SeverityCategory::None,
            intensity: 0.0,
        })
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn category(&self) -> SeverityCategory {
        self.category
    }

    pub fn intensity(&self) -> f64 {
        self.intensity
    }

    /// weather factor of the current category
    pub fn weather_factor(&self) -> f64 {
        self.config.weather_factor(self.category)
    }

    pub fn intersection_ids(&self) -> impl Iterator<Item = &IntersectionId> {
        self.intersections.keys()
    }

    pub fn state(&self, intersection_id: &str) -> Result<&IntersectionState, ControllerError> {
        self.intersections
            .get(intersection_id)
            .ok_or_else(|| ControllerError::UnknownIntersection(intersection_id.to_string()))
    }

    /// captures the running program of every backend intersection. may only run once.
    ///
    /// # Returns
    ///
    /// the number of intersections now under control
    pub fn initialize(&mut self, backend: &dyn SignalBackend) -> Result<usize, ControllerError> {
        if self.initialized {
            return Err(ControllerError::AlreadyInitialized);
        }
        let mut captured = BTreeMap::new();
        for id in backend.intersection_ids()? {
            let telemetry = backend.telemetry(&id)?;
            let state =
                IntersectionState::capture(&telemetry, self.config.legacy_parity_fallback)?;
            log::debug!(
                "captured program '{}' of intersection '{}' with {} phases",
                state.default_program_id(),
                id,
                state.original().len()
            );
            captured.insert(id, state);
        }
        self.intersections = captured;
        self.initialized = true;
        log::info!(
            "initialized adaptive control for {} intersections",
            self.intersections.len()
        );
        Ok(self.intersections.len())
    }

    /// derives the rain program of an intersection from its captured schedule.
    /// green phases are lengthened with intensity and clamped to the green
    /// bounds, yellow phases are lengthened up to `amber_max_factor`, red
    /// phases are unchanged. the result only depends on the captured schedule
    /// and `intensity`.
    pub fn create_custom_program(
        &self,
        intersection_id: &str,
        intensity: f64,
    ) -> Result<SignalProgram, ControllerError> {
        if !(0.0..=1.0).contains(&intensity) {
            return Err(ControllerError::InvalidIntensity(intensity));
        }
        let state = self.state(intersection_id)?;
        let program_id = format!(
            "{}_rain_{}",
            state.default_program_id(),
            (intensity * 100.0).floor() as u32
        );
        let green_scale = 1.0 + self.config.green_intensity_gain * intensity;
        let amber_scale = 1.0 + (self.config.amber_max_factor - 1.0) * intensity;
        let phases = state
            .original()
            .iter()
            .map(|phase| {
                let mut definition = phase.definition.clone();
                definition.duration = match phase.kind {
                    PhaseKind::Green => self.config.clamp_green(definition.duration * green_scale),
                    PhaseKind::Yellow => definition.duration * amber_scale,
                    PhaseKind::Red => definition.duration,
                };
                definition
            })
            .collect();
        Ok(SignalProgram::new(&program_id, phases))
    }

    /// moves every intersection toward the program that matches the new
    /// weather. an intersection changes state only once all of its backend
    /// commands succeed; failed intersections are reported and keep their
    /// previous program.
    pub fn update_weather(
        &mut self,
        backend: &mut dyn SignalBackend,
        category: SeverityCategory,
        intensity: f64,
    ) -> Result<WeatherUpdateOutcome, ControllerError> {
        if !(0.0..=1.0).contains(&intensity) {
            return Err(ControllerError::InvalidIntensity(intensity));
        }
        if category != self.category {
            log::info!(
                "rain category changed from {} to {} (intensity {:.2})",
                self.category,
                category,
                intensity
            );
        }
        self.category = category;
        self.intensity = intensity;

        let mut outcome = WeatherUpdateOutcome {
            category,
            intensity,
            ..Default::default()
        };
        let ids: Vec<IntersectionId> = self.intersections.keys().cloned().collect();
        for id in ids {
            let pending = match self.pending_transition(&id, category, intensity)? {
                Some(p) => p,
                None => continue,
            };
            match pending {
                PendingTransition::Load { program, replacing } => {
                    let result = backend
                        .set_program_logic(&id, &program)
                        .and_then(|_| backend.switch_program(&id, &program.program_id));
                    if let Err(e) = result {
                        log::warn!("unable to load rain program for intersection '{id}': {e}");
                        outcome.failures.push((id, e));
                        continue;
                    }
                    let transition = match replacing {
                        None => ProgramTransition::EnterRain {
                            intersection_id: id.clone(),
                            program_id: program.program_id.clone(),
                        },
                        Some(from) => ProgramTransition::Resize {
                            intersection_id: id.clone(),
                            from,
                            to: program.program_id.clone(),
                        },
                    };
                    log::info!(
                        "intersection '{}' switched to rain program '{}'",
                        id,
                        program.program_id
                    );
                    if let Some(state) = self.intersections.get_mut(&id) {
                        state.enter_rain(program, category, intensity);
                    }
                    outcome.transitions.push(transition);
                }
                PendingTransition::Restore { program_id } => {
                    if let Err(e) = backend.switch_program(&id, &program_id) {
                        log::warn!("unable to restore program for intersection '{id}': {e}");
                        outcome.failures.push((id, e));
                        continue;
                    }
                    log::info!("intersection '{id}' restored to program '{program_id}'");
                    if let Some(state) = self.intersections.get_mut(&id) {
                        state.restore();
                    }
                    outcome.transitions.push(ProgramTransition::Restore {
                        intersection_id: id,
                        program_id,
                    });
                }
            }
        }
        Ok(outcome)
    }

    /// returns every rain-adapted intersection to its default program
    pub fn restore_defaults(
        &mut self,
        backend: &mut dyn SignalBackend,
    ) -> Result<WeatherUpdateOutcome, ControllerError> {
        self.update_weather(backend, SeverityCategory::None, 0.0)
    }

    fn pending_transition(
        &self,
        intersection_id: &str,
        category: SeverityCategory,
        intensity: f64,
    ) -> Result<Option<PendingTransition>, ControllerError> {
        let state = self.state(intersection_id)?;
        let raining = category.is_raining();
        let pending = match state.mode() {
            SignalMode::Tracking if raining => Some(PendingTransition::Load {
                program: self.create_custom_program(intersection_id, intensity)?,
                replacing: None,
            }),
            SignalMode::Tracking => None,
            SignalMode::RainAdapted { .. } if !raining => Some(PendingTransition::Restore {
                program_id: state.default_program_id().to_string(),
            }),
            SignalMode::RainAdapted {
                program,
                category: current,
                ..
            } => {
                if *current != category && self.config.resize_on_severity_change {
                    Some(PendingTransition::Load {
                        program: self.create_custom_program(intersection_id, intensity)?,
                        replacing: Some(program.program_id.clone()),
                    })
                } else {
                    None
                }
            }
        };
        Ok(pending)
    }

    /// computes this tick's green retimings. intersections without telemetry,
    /// running a program the controller did not activate, or currently in a
    /// non-green phase produce no adjustment.
    pub fn plan_step(
        &self,
        telemetry: &HashMap<IntersectionId, IntersectionTelemetry>,
        congestion: &CongestionEstimator,
    ) -> Result<Vec<PhaseAdjustment>, ControllerError> {
        let weather_factor = self.weather_factor();
        let planned = self
            .intersections
            .par_iter()
            .map(|(id, state)| match telemetry.get(id) {
                Some(current) => self.plan_intersection(state, current, weather_factor, congestion),
                None => Ok(None),
            })
            .collect::<Result<Vec<_>, ControllerError>>()?;
        Ok(planned.into_iter().flatten().collect())
    }

    fn plan_intersection(
        &self,
        state: &IntersectionState,
        current: &IntersectionTelemetry,
        weather_factor: f64,
        congestion: &CongestionEstimator,
    ) -> Result<Option<PhaseAdjustment>, ControllerError> {
        if current.program_id != state.active_program_id() {
            log::debug!(
                "intersection '{}' runs program '{}' instead of '{}', not adjusting",
                state.intersection_id(),
                current.program_id,
                state.active_program_id()
            );
            return Ok(None);
        }
        let phase = state.phase(current.phase_index)?;
        if phase.kind != PhaseKind::Green {
            return Ok(None);
        }
        let congestion_level = congestion.congestion_level(state.intersection_id());
        let congestion_factor = self.config.congestion_factor(congestion_level);
        let new_duration = self
            .config
            .clamp_green(phase.duration() * weather_factor * congestion_factor);
        Ok(Some(PhaseAdjustment {
            intersection_id: state.intersection_id().to_string(),
            phase_index: current.phase_index,
            original_duration: phase.duration(),
            new_duration,
            weather_factor,
            congestion_factor,
            congestion_level,
        }))
    }

    /// sends planned retimings to the backend one at a time
    pub fn apply_adjustments(
        &self,
        backend: &mut dyn SignalBackend,
        adjustments: Vec<PhaseAdjustment>,
    ) -> StepOutcome {
        let mut outcome = StepOutcome::default();
        for adjustment in adjustments {
            if adjustment.combined_factor() != 1.0 {
                log::debug!(
                    "intersection '{}' phase {}: {:.1}s -> {:.1}s (weather {:.2}, congestion {:.2} at level {:.2})",
                    adjustment.intersection_id,
                    adjustment.phase_index,
                    adjustment.original_duration,
                    adjustment.new_duration,
                    adjustment.weather_factor,
                    adjustment.congestion_factor,
                    adjustment.congestion_level
                );
            }
            match backend.set_phase_duration(&adjustment.intersection_id, adjustment.new_duration)
            {
                Ok(()) => outcome.adjusted.push(adjustment),
                Err(e) => outcome
                    .failures
                    .push((adjustment.intersection_id.clone(), e)),
            }
        }
        outcome
    }

    /// plans and applies one tick of green retimings
    pub fn step(
        &self,
        backend: &mut dyn SignalBackend,
        telemetry: &HashMap<IntersectionId, IntersectionTelemetry>,
        congestion: &CongestionEstimator,
    ) -> Result<StepOutcome, ControllerError> {
        let adjustments = self.plan_step(telemetry, congestion)?;
        Ok(self.apply_adjustments(backend, adjustments))
    }
}

#[cfg(test)]
mod tests {
    use super::{AdaptivePhaseController, ProgramTransition};
    use crate::engine::recording_backend::{four_phase, Command, RecordingBackend};
    use crate::engine::SignalBackend;
    use crate::model::congestion::CongestionEstimator;
    use crate::model::rain::{SeverityCategory, SeverityLadder, SeverityLadderPreset};
    use crate::model::signal::{ControllerConfig, ControllerError, PhaseDefinition, SignalMode};
    use std::collections::HashMap;

    fn initialized(ids: &[&str]) -> (AdaptivePhaseController, RecordingBackend) {
        let backend = RecordingBackend::with_intersections(ids);
        let mut controller = AdaptivePhaseController::new(ControllerConfig::default()).unwrap();
        controller.initialize(&backend).unwrap();
        (controller, backend)
    }

    fn snapshot(backend: &RecordingBackend) -> HashMap<String, crate::model::signal::IntersectionTelemetry> {
        backend
            .intersection_ids()
            .unwrap()
            .into_iter()
            .map(|id| {
                let t = backend.telemetry(&id).unwrap();
                (id, t)
            })
            .collect()
    }

    #[test]
    fn test_query_before_initialize() {
        let controller = AdaptivePhaseController::new(ControllerConfig::default()).unwrap();
        assert!(matches!(
            controller.state("j1"),
            Err(ControllerError::UnknownIntersection(_))
        ));
        assert!(matches!(
            controller.create_custom_program("j1", 0.5),
            Err(ControllerError::UnknownIntersection(_))
        ));
    }

    #[test]
    fn test_initialize_once() {
        let (mut controller, backend) = initialized(&["j1", "j2"]);
        assert_eq!(controller.intersection_ids().count(), 2);
        assert!(matches!(
            controller.initialize(&backend),
            Err(ControllerError::AlreadyInitialized)
        ));
        let state = controller.state("j1").unwrap();
        assert_eq!(state.default_program_id(), "0");
        assert_eq!(state.incoming_lanes(), 4);
        assert_eq!(*state.mode(), SignalMode::Tracking);
    }

    #[test]
    fn test_custom_program() {
        let (controller, _) = initialized(&["j1"]);
        let program = controller.create_custom_program("j1", 0.4).unwrap();
        assert_eq!(program.program_id, "0_rain_40");
        let durations: Vec<f64> = program.phases.iter().map(|p| p.duration).collect();
        // green 31 * 1.2, yellow unchanged with the default amber factor
        assert!((durations[0] - 37.2).abs() < 1e-9);
        assert_eq!(durations[1], 5.0);
        assert!((durations[2] - 37.2).abs() < 1e-9);
        assert_eq!(durations[3], 5.0);
        assert_eq!(program, controller.create_custom_program("j1", 0.4).unwrap());
    }

    #[test]
    fn test_custom_program_never_shortens_yellow() {
        let config = ControllerConfig {
            amber_max_factor: 1.5,
            ..Default::default()
        };
        let backend = RecordingBackend::with_intersections(&["j1"]);
        let mut controller = AdaptivePhaseController::new(config).unwrap();
        controller.initialize(&backend).unwrap();
        for intensity in [0.0, 0.3, 1.0] {
            let program = controller.create_custom_program("j1", intensity).unwrap();
            assert!(program.phases[1].duration >= 5.0);
        }
        let full = controller.create_custom_program("j1", 1.0).unwrap();
        assert!((full.phases[1].duration - 7.5).abs() < 1e-9);
    }

    #[test]
    fn test_custom_program_rejects_intensity() {
        let (controller, _) = initialized(&["j1"]);
        assert!(matches!(
            controller.create_custom_program("j1", 1.2),
            Err(ControllerError::InvalidIntensity(_))
        ));
        assert!(controller.create_custom_program("j1", f64::NAN).is_err());
    }

    #[test]
    fn test_custom_program_clamps_green() {
        let mut backend = RecordingBackend::default();
        backend.add(
            "j1",
            "0",
            vec![
                PhaseDefinition::new(100.0, "GGrr"),
                PhaseDefinition::new(4.0, "yyrr"),
                PhaseDefinition::new(8.0, "rrGG"),
                PhaseDefinition::new(2.0, "rrrr"),
            ],
        );
        let mut controller = AdaptivePhaseController::new(ControllerConfig::default()).unwrap();
        controller.initialize(&backend).unwrap();
        let program = controller.create_custom_program("j1", 1.0).unwrap();
        assert_eq!(program.phases[0].duration, 120.0);
        assert_eq!(program.phases[2].duration, 12.0);
        assert_eq!(program.phases[3].duration, 2.0);
    }

    #[test]
    fn test_rain_and_restore_round_trip() {
        let (mut controller, mut backend) = initialized(&["j1", "j2"]);
        let outcome = controller
            .update_weather(&mut backend, SeverityCategory::Heavy, 0.5)
            .unwrap();
        assert_eq!(outcome.transitions.len(), 2);
        assert!(outcome.failures.is_empty());
        assert_eq!(controller.state("j1").unwrap().active_program_id(), "0_rain_50");
        assert_eq!(backend.intersections["j1"].active, "0_rain_50");

        let outcome = controller.restore_defaults(&mut backend).unwrap();
        assert!(matches!(
            outcome.transitions[0],
            ProgramTransition::Restore { .. }
        ));
        assert_eq!(backend.intersections["j1"].active, "0");
        assert_eq!(backend.active_phases("j1"), four_phase());
        let state = controller.state("j1").unwrap();
        assert_eq!(state.default_program().phases, four_phase());
        assert!(!state.is_rain_adapted());
    }

    #[test]
    fn test_category_change_resizes() {
        let (mut controller, mut backend) = initialized(&["j1"]);
        controller
            .update_weather(&mut backend, SeverityCategory::Light, 0.1)
            .unwrap();
        // same category, no commands
        let before = backend.commands.len();
        let outcome = controller
            .update_weather(&mut backend, SeverityCategory::Light, 0.15)
            .unwrap();
        assert!(outcome.transitions.is_empty());
        assert_eq!(backend.commands.len(), before);

        let outcome = controller
            .update_weather(&mut backend, SeverityCategory::Severe, 0.9)
            .unwrap();
        assert_eq!(
            outcome.transitions,
            vec![ProgramTransition::Resize {
                intersection_id: "j1".to_string(),
                from: "0_rain_10".to_string(),
                to: "0_rain_90".to_string(),
            }]
        );
    }

    #[test]
    fn test_category_change_without_resize() {
        let config = ControllerConfig {
            resize_on_severity_change: false,
            ..Default::default()
        };
        let mut backend = RecordingBackend::with_intersections(&["j1"]);
        let mut controller = AdaptivePhaseController::new(config).unwrap();
        controller.initialize(&backend).unwrap();
        controller
            .update_weather(&mut backend, SeverityCategory::Light, 0.1)
            .unwrap();
        let outcome = controller
            .update_weather(&mut backend, SeverityCategory::Heavy, 0.6)
            .unwrap();
        assert!(outcome.transitions.is_empty());
        assert_eq!(controller.state("j1").unwrap().active_program_id(), "0_rain_10");
        assert_eq!(controller.weather_factor(), 1.3);
    }

    #[test]
    fn test_failed_command_keeps_state() {
        let (mut controller, mut backend) = initialized(&["j1", "j2"]);
        backend.failing.insert("j2".to_string());
        let outcome = controller
            .update_weather(&mut backend, SeverityCategory::Moderate, 0.3)
            .unwrap();
        assert_eq!(outcome.transitions.len(), 1);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].0, "j2");
        assert!(controller.state("j1").unwrap().is_rain_adapted());
        assert!(!controller.state("j2").unwrap().is_rain_adapted());
    }

    #[test]
    fn test_heavy_rain_with_congestion() {
        let (mut controller, mut backend) = initialized(&["j1"]);
        let ladder = SeverityLadder::from(SeverityLadderPreset::Controller);
        let category = ladder.classify(12.0);
        assert_eq!(category, SeverityCategory::Heavy);
        // stay on the default program so only the per-tick path is exercised
        controller.category = category;

        let mut congestion = CongestionEstimator::default();
        congestion.set_incoming_lanes("j1", 4);
        congestion.record_sample("j1", 24, 0.0, 24);
        assert!((congestion.congestion_level("j1") - 0.6).abs() < 1e-12);

        let telemetry = snapshot(&backend);
        let outcome = controller
            .step(&mut backend, &telemetry, &congestion)
            .unwrap();
        let adjustment = &outcome.adjusted[0];
        assert_eq!(adjustment.weather_factor, 1.3);
        assert_eq!(adjustment.congestion_factor, 1.2);
        assert!((adjustment.new_duration - 31.0 * 1.3 * 1.2).abs() < 1e-9);
        assert_eq!(
            backend.commands.last(),
            Some(&Command::SetPhaseDuration(
                "j1".to_string(),
                adjustment.new_duration
            ))
        );
        // the override lasts for the running phase only
        assert_eq!(backend.running_duration("j1"), Some(adjustment.new_duration));
        assert_eq!(backend.active_phases("j1"), four_phase());
        backend.set_phase("j1", 1);
        assert_eq!(backend.running_duration("j1"), Some(5.0));
    }

    #[test]
    fn test_dry_step_keeps_original_duration() {
        let (controller, mut backend) = initialized(&["j1"]);
        let telemetry = snapshot(&backend);
        let outcome = controller
            .step(&mut backend, &telemetry, &CongestionEstimator::default())
            .unwrap();
        assert_eq!(outcome.adjusted[0].new_duration, 31.0);
    }

    #[test]
    fn test_step_skips_non_green_and_foreign_programs() {
        let (controller, mut backend) = initialized(&["j1", "j2"]);
        backend.set_phase("j1", 1);
        if let Some(i) = backend.intersections.get_mut("j2") {
            i.programs.insert("other".to_string(), four_phase());
            i.active = "other".to_string();
        }
        let adjustments = controller
            .plan_step(&snapshot(&backend), &CongestionEstimator::default())
            .unwrap();
        assert!(adjustments.is_empty());
    }

    #[test]
    fn test_step_durations_within_bounds() {
        for (captured, expected) in [(90.0, 120.0), (3.0, 10.0)] {
            let mut backend = RecordingBackend::default();
            backend.add(
                "j1",
                "0",
                vec![
                    PhaseDefinition::new(captured, "GGrr"),
                    PhaseDefinition::new(4.0, "yyrr"),
                ],
            );
            let mut controller =
                AdaptivePhaseController::new(ControllerConfig::default()).unwrap();
            controller.initialize(&backend).unwrap();
            controller.category = SeverityCategory::Severe;
            let mut congestion = CongestionEstimator::default();
            congestion.set_incoming_lanes("j1", 1);
            congestion.record_sample("j1", 100, 0.0, 100);
            let telemetry = snapshot(&backend);
            let outcome = controller
                .step(&mut backend, &telemetry, &congestion)
                .unwrap();
            assert_eq!(outcome.adjusted[0].new_duration, expected);
        }
    }
}
