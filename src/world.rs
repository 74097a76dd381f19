use std::collections::BTreeMap;
use std::fmt;

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde::Deserialize;
use thiserror::Error;

use crate::components::{Agent, AgentId, AgentKind, Gender, Position, Species};
use crate::rng::RandomSource;

/// Bounds of the plane. Coordinates are valid in `[0, width] x [0, height]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, Deserialize)]
pub struct Plane {
    pub width: i32,
    pub height: i32,
}

impl Plane {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    pub fn contains(&self, position: Position) -> bool {
        (0..=self.width).contains(&position.x) && (0..=self.height).contains(&position.y)
    }

    /// Takes `i64` so sums that overflow `i32` still clamp.
    pub fn clamp(&self, x: i64, y: i64) -> Position {
        Position {
            x: x.clamp(0, i64::from(self.width)) as i32,
            y: y.clamp(0, i64::from(self.height)) as i32,
        }
    }

    /// Draws x then y, both inclusive of the far edge.
    pub fn random_position(&self, rng: &mut dyn RandomSource) -> Position {
        let x = rng.int_inclusive(0, self.width);
        let y = rng.int_inclusive(0, self.height);
        Position { x, y }
    }
}

impl Default for Plane {
    fn default() -> Self {
        Self::new(500, 500)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PopulationError {
    #[error("move unit must be greater than zero")]
    ZeroMoveUnit,
}

/// Every agent ever created, in insertion order. Dead animals stay in place so
/// indices taken at the start of a pass remain valid until it ends.
#[derive(Debug, Clone, Default)]
pub struct Population {
    agents: Vec<Agent>,
    next_id: u64,
}

impl Population {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn_animal(
        &mut self,
        species: Species,
        gender: Gender,
        move_unit: u32,
        position: Position,
    ) -> Result<AgentId, PopulationError> {
        let agent = self.create_animal(species, gender, move_unit, position)?;
        self.agents.push(agent);
        Ok(agent.id)
    }

    pub fn spawn_hunter(
        &mut self,
        move_unit: u32,
        position: Position,
    ) -> Result<AgentId, PopulationError> {
        if move_unit == 0 {
            return Err(PopulationError::ZeroMoveUnit);
        }
        let agent = Agent {
            id: self.allocate(),
            position,
            move_unit,
            kind: AgentKind::Hunter,
        };
        self.agents.push(agent);
        Ok(agent.id)
    }

    /// Builds an animal with a fresh id without inserting it.
    pub(crate) fn create_animal(
        &mut self,
        species: Species,
        gender: Gender,
        move_unit: u32,
        position: Position,
    ) -> Result<Agent, PopulationError> {
        if move_unit == 0 {
            return Err(PopulationError::ZeroMoveUnit);
        }
        Ok(Agent {
            id: self.allocate(),
            position,
            move_unit,
            kind: AgentKind::Animal {
                species,
                gender,
                alive: true,
            },
        })
    }

    pub(crate) fn append(&mut self, agents: Vec<Agent>) {
        self.agents.extend(agents);
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn get(&self, id: AgentId) -> Option<&Agent> {
        self.agents.iter().find(|agent| agent.id == id)
    }

    pub(crate) fn at(&self, index: usize) -> &Agent {
        &self.agents[index]
    }

    pub(crate) fn at_mut(&mut self, index: usize) -> &mut Agent {
        &mut self.agents[index]
    }

    pub fn hunter(&self) -> Option<&Agent> {
        self.agents.iter().find(|agent| agent.is_hunter())
    }

    pub fn hunter_count(&self) -> usize {
        self.agents.iter().filter(|agent| agent.is_hunter()).count()
    }

    pub fn living_animals(&self) -> usize {
        self.agents
            .iter()
            .filter(|agent| !agent.is_hunter() && agent.is_alive())
            .count()
    }

    pub fn tally(&self) -> SurvivorTally {
        let mut tally = SurvivorTally::default();
        for agent in &self.agents {
            if let AgentKind::Animal {
                species,
                gender,
                alive: true,
            } = agent.kind
            {
                *tally.counts.entry((species, gender)).or_insert(0) += 1;
            }
        }
        tally
    }

    fn allocate(&mut self) -> AgentId {
        let id = AgentId(self.next_id);
        self.next_id += 1;
        id
    }
}

/// Alive animals per `(species, gender)`. Combinations with no survivors are
/// absent rather than zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SurvivorTally {
    counts: BTreeMap<(Species, Gender), usize>,
}

impl SurvivorTally {
    pub fn get(&self, species: Species, gender: Gender) -> usize {
        self.counts.get(&(species, gender)).copied().unwrap_or(0)
    }

    pub fn species_total(&self, species: Species) -> usize {
        Gender::ALL
            .iter()
            .map(|gender| self.get(species, *gender))
            .sum()
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Species, Gender, usize)> + '_ {
        self.counts
            .iter()
            .map(|((species, gender), count)| (*species, *gender, *count))
    }

    /// `"Species (Gender)"` keyed entries.
    pub fn labelled(&self) -> Vec<(String, usize)> {
        self.iter()
            .map(|(species, gender, count)| (format!("{species} ({gender})"), count))
            .collect()
    }
}

impl Serialize for SurvivorTally {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.counts.len()))?;
        for (label, count) in self.labelled() {
            map.serialize_entry(&label, &count)?;
        }
        map.end()
    }
}

impl fmt::Display for SurvivorTally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries: Vec<String> = self
            .labelled()
            .into_iter()
            .map(|(label, count)| format!("{label}: {count}"))
            .collect();
        f.write_str(&entries.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::{ScriptedRandom, SeededRandom};

    #[test]
    fn test_clamp_keeps_inside() {
        let plane = Plane::new(10, 5);
        assert_eq!(plane.clamp(-3, 9), Position::new(0, 5));
        assert_eq!(plane.clamp(11, -1), Position::new(10, 0));
        assert_eq!(plane.clamp(4, 4), Position::new(4, 4));
        assert!(plane.contains(Position::new(10, 5)));
        assert!(!plane.contains(Position::new(10, 6)));
        assert_eq!(
            plane.clamp(i64::from(i32::MAX) + 9, -(1 << 40)),
            Position::new(10, 0)
        );
    }

    #[test]
    fn test_random_position_in_bounds() {
        let plane = Plane::default();
        let mut rng = SeededRandom::new(3);
        for _ in 0..500 {
            assert!(plane.contains(plane.random_position(&mut rng)));
        }
        let mut edge = ScriptedRandom::constant(0.9999);
        assert_eq!(plane.random_position(&mut edge), Position::new(500, 500));
    }

    #[test]
    fn test_ids_are_sequential() {
        let mut population = Population::new();
        let a = population
            .spawn_animal(Species::Hen, Gender::Female, 1, Position::new(0, 0))
            .unwrap();
        let b = population.spawn_hunter(1, Position::new(0, 0)).unwrap();
        assert_eq!(a.raw(), 0);
        assert_eq!(b.raw(), 1);
        assert_eq!(population.hunter_count(), 1);
        assert_eq!(population.hunter().map(|h| h.id()), Some(b));
    }

    #[test]
    fn test_zero_move_unit_rejected() {
        let mut population = Population::new();
        assert_eq!(
            population.spawn_animal(Species::Cow, Gender::Male, 0, Position::new(0, 0)),
            Err(PopulationError::ZeroMoveUnit)
        );
        assert_eq!(
            population.spawn_hunter(0, Position::new(0, 0)),
            Err(PopulationError::ZeroMoveUnit)
        );
        assert!(population.is_empty());
    }

    #[test]
    fn test_tally_counts_only_living_animals() {
        let mut population = Population::new();
        let origin = Position::new(0, 0);
        population
            .spawn_animal(Species::Sheep, Gender::Male, 2, origin)
            .unwrap();
        population
            .spawn_animal(Species::Sheep, Gender::Male, 2, origin)
            .unwrap();
        population
            .spawn_animal(Species::Sheep, Gender::Female, 2, origin)
            .unwrap();
        population
            .spawn_animal(Species::Wolf, Gender::Female, 3, origin)
            .unwrap();
        population.spawn_hunter(1, origin).unwrap();
        population.at_mut(3).kill();

        let tally = population.tally();
        assert_eq!(tally.get(Species::Sheep, Gender::Male), 2);
        assert_eq!(tally.get(Species::Sheep, Gender::Female), 1);
        assert_eq!(tally.species_total(Species::Wolf), 0);
        assert_eq!(tally.total(), 3);
        assert_eq!(population.living_animals(), 3);
        assert_eq!(tally.to_string(), "Sheep (Male): 2, Sheep (Female): 1");
    }

    #[test]
    fn test_tally_serializes_with_labels() {
        let mut population = Population::new();
        population
            .spawn_animal(Species::Lion, Gender::Female, 4, Position::new(1, 1))
            .unwrap();
        let json = serde_json::to_string(&population.tally()).unwrap();
        assert_eq!(json, r#"{"Lion (Female)":1}"#);
    }
}
