use rainsignal_core::engine::{WeatherError, WeatherSource};

/// the same rainfall rate at every step
#[derive(Debug, Clone, Copy)]
pub struct ConstantWeather {
    pub rainfall_mm_h: f64,
}

impl WeatherSource for ConstantWeather {
    fn rainfall(&mut self, _step: u64) -> Result<f64, WeatherError> {
        Ok(self.rainfall_mm_h)
    }

    fn name(&self) -> String {
        format!("constant {:.2} mm/h", self.rainfall_mm_h)
    }
}
