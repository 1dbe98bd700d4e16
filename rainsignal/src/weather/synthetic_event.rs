use rainsignal_core::engine::{WeatherError, WeatherSource};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// shape of a synthetic rain event
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EventPattern {
    /// linear rise to the maximum at mid-event, then linear decline to zero
    #[default]
    Ramp,
    /// bell curve centered on mid-event
    Peak,
    /// bell curve with seeded gaussian noise, floored at zero
    Random,
}

/// a generated rain event replayed by step. outside the event window the
/// weather is dry.
#[derive(Debug, Clone)]
pub struct SyntheticRainEvent {
    pattern: EventPattern,
    start_step: u64,
    /// one rainfall value per step of the event
    profile: Vec<f64>,
}

impl SyntheticRainEvent {
    pub fn new(
        pattern: EventPattern,
        start_step: u64,
        duration_steps: usize,
        max_intensity_mm_h: f64,
        seed: u64,
    ) -> Result<SyntheticRainEvent, WeatherError> {
        if duration_steps == 0 {
            return Err(WeatherError::ConfigurationError(String::from(
                "synthetic rain event must last at least one step",
            )));
        }
        if !max_intensity_mm_h.is_finite() || max_intensity_mm_h < 0.0 {
            return Err(WeatherError::ConfigurationError(format!(
                "max intensity must be a non-negative rate, found {max_intensity_mm_h}"
            )));
        }
        let profile = match pattern {
            EventPattern::Ramp => ramp(duration_steps, max_intensity_mm_h),
            EventPattern::Peak => bell(duration_steps, max_intensity_mm_h),
            EventPattern::Random => {
                let mut rng = StdRng::seed_from_u64(seed);
                let sigma = max_intensity_mm_h * 0.2;
                bell(duration_steps, max_intensity_mm_h)
                    .into_iter()
                    .map(|v| (v + sigma * standard_normal(&mut rng)).max(0.0))
                    .collect()
            }
        };
        Ok(SyntheticRainEvent {
            pattern,
            start_step,
            profile,
        })
    }

    pub fn profile(&self) -> &[f64] {
        &self.profile
    }

    pub fn rainfall_at(&self, step: u64) -> f64 {
        if step < self.start_step {
            return 0.0;
        }
        let offset = (step - self.start_step) as usize;
        self.profile.get(offset).copied().unwrap_or(0.0)
    }
}

impl WeatherSource for SyntheticRainEvent {
    fn rainfall(&mut self, step: u64) -> Result<f64, WeatherError> {
        Ok(self.rainfall_at(step))
    }

    fn name(&self) -> String {
        format!(
            "synthetic {:?} event at step {} over {} steps",
            self.pattern,
            self.start_step,
            self.profile.len()
        )
    }
}

/// `n` evenly spaced values from `start` to `stop` inclusive
fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => vec![],
        1 => vec![start],
        _ => {
            let delta = (stop - start) / (n - 1) as f64;
            (0..n).map(|i| start + delta * i as f64).collect()
        }
    }
}

fn ramp(n: usize, max: f64) -> Vec<f64> {
    let up = n / 2;
    let mut values = linspace(0.0, max, up);
    values.extend(linspace(max, 0.0, n - up));
    values
}

fn bell(n: usize, max: f64) -> Vec<f64> {
    linspace(-3.0, 3.0, n)
        .into_iter()
        .map(|x| max * (-x * x).exp())
        .collect()
}

/// Box-Muller transform of two uniform samples
fn standard_normal(rng: &mut StdRng) -> f64 {
    let u1: f64 = 1.0 - rng.random::<f64>();
    let u2: f64 = rng.random::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}
