pub mod components;
pub mod config;
pub mod engine;
pub mod events;
pub mod rng;
pub mod systems;
pub mod world;

pub use config::{ScenarioLoader, SimulationConfig};
pub use engine::{FinalReport, RunState, Simulation, SimulationSettings, StepSummary};
