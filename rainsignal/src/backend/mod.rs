mod grid_simulation;
mod grid_simulation_config;

pub use grid_simulation::GridSimulation;
pub use grid_simulation_config::GridSimulationConfig;
