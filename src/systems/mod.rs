mod movement;
mod predation;
mod reproduction;

pub use movement::{displace, MovementSystem};
pub use predation::{PredationSystem, PredatorClass};
pub use reproduction::ReproductionSystem;
