use std::fmt;
use std::time::Instant;

use anyhow::Result;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::components::{AgentId, Position};
use crate::config::{PredationConfig, ReproductionConfig, SimulationConfig};
use crate::events::{EventSink, SimEvent};
use crate::rng::RandomSource;
use crate::systems::{MovementSystem, PredationSystem, ReproductionSystem};
use crate::world::{Plane, Population, SurvivorTally};

/// Fixed parameters of one run.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationSettings {
    pub name: String,
    pub steps: u64,
    pub plane: Plane,
    pub predation: PredationConfig,
    pub reproduction: ReproductionConfig,
}

impl SimulationSettings {
    pub fn from_config(config: &SimulationConfig) -> Self {
        Self {
            name: config.name.clone(),
            steps: config.steps,
            plane: config.plane,
            predation: config.predation.clone(),
            reproduction: config.reproduction.clone(),
        }
    }

    pub fn with_steps(mut self, steps: u64) -> Self {
        self.steps = steps;
        self
    }
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self::from_config(&SimulationConfig::zoo())
    }
}

pub struct StepContext<'a> {
    pub step: u64,
    pub settings: &'a SimulationSettings,
}

pub trait System {
    fn name(&self) -> &str;

    /// Returns how many agents the system acted on: moves, kills or births.
    fn run(
        &mut self,
        ctx: &StepContext<'_>,
        population: &mut Population,
        rng: &mut dyn RandomSource,
        sink: &mut dyn EventSink,
    ) -> Result<usize>;
}

#[derive(Clone, Debug)]
pub struct SystemRunReport {
    pub name: String,
    pub affected: usize,
    pub duration_ms: f64,
}

#[derive(Clone, Debug)]
pub struct StepSummary {
    pub step: u64,
    pub system_reports: Vec<SystemRunReport>,
    pub tally: SurvivorTally,
}

impl StepSummary {
    pub fn affected(&self, system: &str) -> usize {
        self.system_reports
            .iter()
            .filter(|report| report.name == system)
            .map(|report| report.affected)
            .sum()
    }

    pub fn moves(&self) -> usize {
        self.affected(MovementSystem::NAME)
    }

    pub fn kills(&self) -> usize {
        self.affected(PredationSystem::NAME)
    }

    pub fn births(&self) -> usize {
        self.affected(ReproductionSystem::NAME)
    }
}

/// Survivors at the end of a run. The hunter is always reported as one.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FinalReport {
    pub steps: u64,
    pub survivors: SurvivorTally,
    pub hunters: usize,
}

impl FinalReport {
    pub const HUNTER_LABEL: &'static str = "Hunter";

    pub fn new(steps: u64, survivors: SurvivorTally) -> Self {
        Self {
            steps,
            survivors,
            hunters: 1,
        }
    }

    pub fn entries(&self) -> Vec<(String, usize)> {
        let mut entries = self.survivors.labelled();
        entries.push((Self::HUNTER_LABEL.to_string(), self.hunters));
        entries
    }

    pub fn get(&self, label: &str) -> Option<usize> {
        self.entries()
            .into_iter()
            .find(|(key, _)| key == label)
            .map(|(_, count)| count)
    }
}

impl fmt::Display for FinalReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (label, count) in self.entries() {
            writeln!(f, "{label}: {count}")?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    NotStarted,
    /// `step` steps have completed.
    Running { step: u64 },
    Finished,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SimulationError {
    #[error("population must contain exactly one hunter, found {found}")]
    HunterCount { found: usize },
    #[error("agent {id} starts outside the plane at {position}")]
    OutOfBounds { id: AgentId, position: Position },
    #[error("simulation already finished after {steps} steps")]
    Finished { steps: u64 },
    #[error("simulation stopped at step {completed} of {steps}")]
    Incomplete { completed: u64, steps: u64 },
}

#[derive(Default)]
struct Scheduler {
    systems: Vec<Box<dyn System>>,
}

impl Scheduler {
    /// Movement, predation, reproduction. The order is part of the rules.
    fn standard() -> Self {
        let mut scheduler = Self::default();
        scheduler.add_system(Box::new(MovementSystem::new()));
        scheduler.add_system(Box::new(PredationSystem::new()));
        scheduler.add_system(Box::new(ReproductionSystem::new()));
        scheduler
    }

    fn add_system(&mut self, system: Box<dyn System>) {
        self.systems.push(system);
    }

    fn run(
        &mut self,
        ctx: &StepContext<'_>,
        population: &mut Population,
        rng: &mut dyn RandomSource,
        sink: &mut dyn EventSink,
    ) -> Result<Vec<SystemRunReport>> {
        let mut reports = Vec::with_capacity(self.systems.len());
        for system in self.systems.iter_mut() {
            let start = Instant::now();
            let affected = system.run(ctx, population, rng, sink)?;
            let elapsed = start.elapsed();
            reports.push(SystemRunReport {
                name: system.name().to_string(),
                affected,
                duration_ms: elapsed.as_secs_f64() * 1_000.0,
            });
        }
        Ok(reports)
    }
}

/// Drives one run: owns the population, the random source and the event sink.
pub struct Simulation<R, S> {
    settings: SimulationSettings,
    population: Population,
    rng: R,
    sink: S,
    scheduler: Scheduler,
    state: RunState,
}

impl<R: RandomSource, S: EventSink> Simulation<R, S> {
    /// Builds the configured roster with `rng`, which then drives the run.
    pub fn from_config(config: &SimulationConfig, mut rng: R, sink: S) -> Result<Self> {
        let population = config.build_population(&mut rng)?;
        let simulation =
            Self::with_population(SimulationSettings::from_config(config), population, rng, sink)?;
        Ok(simulation)
    }

    pub fn with_population(
        settings: SimulationSettings,
        population: Population,
        rng: R,
        sink: S,
    ) -> Result<Self, SimulationError> {
        let found = population.hunter_count();
        if found != 1 {
            return Err(SimulationError::HunterCount { found });
        }
        if let Some(agent) = population
            .agents()
            .iter()
            .find(|agent| !settings.plane.contains(agent.position()))
        {
            return Err(SimulationError::OutOfBounds {
                id: agent.id(),
                position: agent.position(),
            });
        }
        Ok(Self {
            settings,
            population,
            rng,
            sink,
            scheduler: Scheduler::standard(),
            state: RunState::NotStarted,
        })
    }

    pub fn settings(&self) -> &SimulationSettings {
        &self.settings
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    pub fn completed_steps(&self) -> u64 {
        match self.state {
            RunState::NotStarted => 0,
            RunState::Running { step } => step,
            RunState::Finished => self.settings.steps,
        }
    }

    pub fn step(&mut self) -> Result<StepSummary> {
        let completed = match self.state {
            RunState::NotStarted => {
                self.start()?;
                0
            }
            RunState::Running { step } => step,
            RunState::Finished => {
                return Err(SimulationError::Finished {
                    steps: self.settings.steps,
                }
                .into())
            }
        };
        if completed >= self.settings.steps {
            return Err(SimulationError::Finished {
                steps: self.settings.steps,
            }
            .into());
        }

        let step = completed + 1;
        self.sink.record(&SimEvent::StepStarted { step })?;
        let ctx = StepContext {
            step,
            settings: &self.settings,
        };
        let system_reports =
            self.scheduler
                .run(&ctx, &mut self.population, &mut self.rng, &mut self.sink)?;
        let tally = self.population.tally();
        self.sink.record(&SimEvent::StepTallied {
            step,
            tally: tally.clone(),
        })?;
        self.state = RunState::Running { step };

        let summary = StepSummary {
            step,
            system_reports,
            tally,
        };
        debug!(
            step,
            kills = summary.kills(),
            births = summary.births(),
            alive = summary.tally.total(),
            "step complete"
        );
        Ok(summary)
    }

    /// Runs every remaining step and finishes.
    pub fn run(&mut self) -> Result<FinalReport> {
        self.run_with_hook(|_| {})
    }

    pub fn run_with_hook<F>(&mut self, mut hook: F) -> Result<FinalReport>
    where
        F: FnMut(&StepSummary),
    {
        while self.completed_steps() < self.settings.steps && self.state != RunState::Finished {
            let summary = self.step()?;
            hook(&summary);
        }
        self.finish()
    }

    /// Emits the final report once every step has run.
    pub fn finish(&mut self) -> Result<FinalReport> {
        match self.state {
            RunState::Finished => {
                return Err(SimulationError::Finished {
                    steps: self.settings.steps,
                }
                .into())
            }
            RunState::NotStarted => self.start()?,
            RunState::Running { .. } => {}
        }
        let completed = self.completed_steps();
        if completed < self.settings.steps {
            return Err(SimulationError::Incomplete {
                completed,
                steps: self.settings.steps,
            }
            .into());
        }

        let report = self.report();
        self.sink.record(&SimEvent::Finished {
            report: report.clone(),
        })?;
        self.sink.finish()?;
        self.state = RunState::Finished;
        Ok(report)
    }

    /// Current survivors, whether or not the run is over.
    pub fn report(&self) -> FinalReport {
        FinalReport::new(self.completed_steps(), self.population.tally())
    }

    fn start(&mut self) -> Result<()> {
        self.sink.record(&SimEvent::SimulationStarted {
            name: self.settings.name.clone(),
            agents: self.population.len(),
            steps: self.settings.steps,
        })?;
        self.state = RunState::Running { step: 0 };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Gender, Species};
    use crate::events::RecordingSink;
    use crate::rng::{ScriptedRandom, SeededRandom};

    fn tiny(steps: u64) -> Simulation<ScriptedRandom, RecordingSink> {
        let mut population = Population::new();
        population
            .spawn_animal(Species::Cow, Gender::Male, 1, Position::new(10, 10))
            .unwrap();
        population.spawn_hunter(1, Position::new(400, 400)).unwrap();
        Simulation::with_population(
            SimulationSettings::default().with_steps(steps),
            population,
            ScriptedRandom::constant(0.125),
            RecordingSink::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_state_machine() {
        let mut simulation = tiny(2);
        assert_eq!(simulation.state(), RunState::NotStarted);

        let summary = simulation.step().unwrap();
        assert_eq!(summary.step, 1);
        assert_eq!(summary.moves(), 2);
        assert_eq!(simulation.state(), RunState::Running { step: 1 });

        let err = simulation.finish().unwrap_err();
        assert_eq!(
            err.downcast_ref::<SimulationError>(),
            Some(&SimulationError::Incomplete {
                completed: 1,
                steps: 2
            })
        );

        simulation.step().unwrap();
        let err = simulation.step().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SimulationError>(),
            Some(SimulationError::Finished { steps: 2 })
        ));

        let report = simulation.finish().unwrap();
        assert_eq!(report.steps, 2);
        assert_eq!(simulation.state(), RunState::Finished);
        assert!(simulation.finish().is_err());
    }

    #[test]
    fn test_event_order_within_step() {
        let mut simulation = tiny(1);
        simulation.run().unwrap();
        let names: Vec<&str> = simulation
            .sink()
            .events()
            .iter()
            .map(|event| match event {
                SimEvent::SimulationStarted { .. } => "started",
                SimEvent::StepStarted { .. } => "step",
                SimEvent::Moved { .. } => "moved",
                SimEvent::Killed { .. } => "killed",
                SimEvent::Born { .. } => "born",
                SimEvent::StepTallied { .. } => "tally",
                SimEvent::Finished { .. } => "finished",
            })
            .collect();
        assert_eq!(
            names,
            vec!["started", "step", "moved", "moved", "tally", "finished"]
        );
    }

    #[test]
    fn test_zero_steps_reports_initial_roster() {
        let mut simulation = tiny(0);
        let report = simulation.run().unwrap();
        assert_eq!(report.steps, 0);
        assert_eq!(report.get("Cow (Male)"), Some(1));
        assert_eq!(report.get(FinalReport::HUNTER_LABEL), Some(1));
    }

    #[test]
    fn test_requires_exactly_one_hunter() {
        let mut population = Population::new();
        population
            .spawn_animal(Species::Hen, Gender::Female, 1, Position::new(0, 0))
            .unwrap();
        let result = Simulation::with_population(
            SimulationSettings::default(),
            population.clone(),
            SeededRandom::new(1),
            RecordingSink::new(),
        );
        assert_eq!(
            result.err(),
            Some(SimulationError::HunterCount { found: 0 })
        );

        population.spawn_hunter(1, Position::new(0, 0)).unwrap();
        population.spawn_hunter(1, Position::new(0, 0)).unwrap();
        let result = Simulation::with_population(
            SimulationSettings::default(),
            population,
            SeededRandom::new(1),
            RecordingSink::new(),
        );
        assert_eq!(
            result.err(),
            Some(SimulationError::HunterCount { found: 2 })
        );
    }

    #[test]
    fn test_rejects_agents_off_the_plane() {
        let mut population = Population::new();
        population
            .spawn_animal(Species::Hen, Gender::Female, 1, Position::new(501, 0))
            .unwrap();
        population.spawn_hunter(1, Position::new(0, 0)).unwrap();
        let result = Simulation::with_population(
            SimulationSettings::default(),
            population,
            SeededRandom::new(1),
            RecordingSink::new(),
        );
        assert!(matches!(
            result.err(),
            Some(SimulationError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_report_display() {
        let mut population = Population::new();
        population
            .spawn_animal(Species::Wolf, Gender::Female, 3, Position::new(0, 0))
            .unwrap();
        let report = FinalReport::new(10, population.tally());
        assert_eq!(report.to_string(), "Wolf (Female): 1\nHunter: 1\n");
    }
}
