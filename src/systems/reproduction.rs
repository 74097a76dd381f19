use anyhow::Result;

use crate::{
    components::{AgentKind, Gender},
    engine::{StepContext, System},
    events::{EventSink, SimEvent},
    rng::RandomSource,
    world::Population,
};

/// Breeds every nearby opposite-gender pair of the same species once per
/// step. Offspring join the population after the scan, so they cannot breed
/// or be hunted in the step they are born.
pub struct ReproductionSystem;

impl ReproductionSystem {
    pub const NAME: &'static str = "reproduction";

    pub fn new() -> Self {
        Self
    }
}

impl Default for ReproductionSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for ReproductionSystem {
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
        let radius = ctx.settings.reproduction.radius;
        let count = population.len();
        let mut births = Vec::new();

        for first_index in 0..count {
            let first = *population.at(first_index);
            let AgentKind::Animal {
                species,
                gender,
                alive: true,
            } = first.kind()
            else {
                continue;
            };
            for second_index in (first_index + 1)..count {
                let second = *population.at(second_index);
                let AgentKind::Animal {
                    species: other_species,
                    gender: other_gender,
                    alive: true,
                } = second.kind()
                else {
                    continue;
                };
                if other_species != species || other_gender == gender {
                    continue;
                }
                if first.distance(&second) > radius {
                    continue;
                }

                let child_gender = Gender::random(rng);
                let position = ctx.settings.plane.random_position(rng);
                let child =
                    population.create_animal(species, child_gender, first.move_unit(), position)?;
                sink.record(&SimEvent::Born {
                    parents: [first.tag(), second.tag()],
                    offspring: child.tag(),
                })?;
                births.push(child);
            }
        }

        let born = births.len();
        population.append(births);
        Ok(born)
    }
}
