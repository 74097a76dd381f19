use anyhow::Result;

use crate::{
    components::{Agent, AgentKind, Species},
    config::PredationConfig,
    engine::{StepContext, System},
    events::{EventSink, SimEvent},
    rng::RandomSource,
    world::Population,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredatorClass {
    Wolf,
    Lion,
    Hunter,
}

impl PredatorClass {
    /// Evaluation order within a step. Kills from an earlier class are
    /// visible to the later ones.
    pub const ORDER: [PredatorClass; 3] =
        [PredatorClass::Wolf, PredatorClass::Lion, PredatorClass::Hunter];

    pub fn is_member(self, agent: &Agent) -> bool {
        match (self, agent.kind()) {
            (PredatorClass::Hunter, AgentKind::Hunter) => true,
            (PredatorClass::Wolf, _) => agent.is_living(Species::Wolf),
            (PredatorClass::Lion, _) => agent.is_living(Species::Lion),
            _ => false,
        }
    }

    pub fn targets(self, prey: Species) -> bool {
        match self {
            PredatorClass::Wolf => {
                matches!(prey, Species::Sheep | Species::Hen | Species::Rooster)
            }
            PredatorClass::Lion => matches!(prey, Species::Cow | Species::Sheep),
            PredatorClass::Hunter => true,
        }
    }

    pub fn radius(self, config: &PredationConfig) -> f64 {
        match self {
            PredatorClass::Wolf => config.wolf_radius,
            PredatorClass::Lion => config.lion_radius,
            PredatorClass::Hunter => config.hunter_radius,
        }
    }
}

/// Wolves, then lions, then the hunter. Every predator scans the whole
/// population as it stood when the pass began and kills each living target
/// within its radius.
pub struct PredationSystem;

impl PredationSystem {
    pub const NAME: &'static str = "predation";

    pub fn new() -> Self {
        Self
    }

    fn hunt(
        class: PredatorClass,
        radius: f64,
        count: usize,
        population: &mut Population,
        sink: &mut dyn EventSink,
    ) -> Result<usize> {
        let mut kills = 0;
        for hunter_index in 0..count {
            let predator = *population.at(hunter_index);
            if !class.is_member(&predator) {
                continue;
            }
            for prey_index in 0..count {
                let prey = *population.at(prey_index);
                let Some(species) = prey.species() else {
                    continue;
                };
                if !prey.is_alive() || !class.targets(species) {
                    continue;
                }
                if predator.distance(&prey) > radius {
                    continue;
                }
                population.at_mut(prey_index).kill();
                sink.record(&SimEvent::Killed {
                    predator: predator.tag(),
                    prey: prey.tag(),
                })?;
                kills += 1;
            }
        }
        Ok(kills)
    }
}

impl Default for PredationSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for PredationSystem {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn run(
        &mut self,
        ctx: &StepContext<'_>,
        population: &mut Population,
        _rng: &mut dyn RandomSource,
        sink: &mut dyn EventSink,
    ) -> Result<usize> {
        let count = population.len();
        let mut kills = 0;
        for class in PredatorClass::ORDER {
            let radius = class.radius(&ctx.settings.predation);
            kills += Self::hunt(class, radius, count, population, sink)?;
        }
        Ok(kills)
    }
}
