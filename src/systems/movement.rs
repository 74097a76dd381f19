use std::f64::consts::TAU;

use anyhow::Result;

use crate::{
    components::{Agent, Position},
    engine::{StepContext, System},
    events::{EventSink, SimEvent},
    rng::RandomSource,
    world::{Plane, Population},
};

/// Moves an agent by up to `move_unit` in a uniformly random direction and
/// clamps the result to the plane. Returns the old and new positions.
pub fn displace(
    agent: &mut Agent,
    plane: Plane,
    rng: &mut dyn RandomSource,
) -> (Position, Position) {
    let angle = rng.uniform(0.0, TAU);
    let reach = f64::from(agent.move_unit);
    // `as` truncates toward zero.
    let dx = (reach * angle.cos()) as i64;
    let dy = (reach * angle.sin()) as i64;
    let from = agent.position;
    let to = plane.clamp(i64::from(from.x) + dx, i64::from(from.y) + dy);
    agent.position = to;
    (from, to)
}

pub struct MovementSystem;

impl MovementSystem {
    pub const NAME: &'static str = "movement";

    pub fn new() -> Self {
        Self
    }
}

impl Default for MovementSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for MovementSystem {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn run(
        &mut self,
        ctx: &StepContext<'_>,
        population: &mut Population,
        rng: &mut dyn RandomSource,
        sink: &mut dyn EventSink,
    ) -> Result<usize> {
        let mut moved = 0;
        for index in 0..population.len() {
            let agent = population.at_mut(index);
            if !agent.is_alive() {
                continue;
            }
            let (from, to) = displace(agent, ctx.settings.plane, rng);
            sink.record(&SimEvent::Moved {
                agent: agent.tag(),
                from,
                to,
            })?;
            moved += 1;
        }
        Ok(moved)
    }
}
