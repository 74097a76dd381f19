//! Scenario configuration: plane, rules, roster and logging.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::Level;

use crate::components::{Gender, Species};
use crate::rng::RandomSource;
use crate::world::{Plane, Population};

fn default_steps() -> u64 {
    1_000
}

fn default_wolf_radius() -> f64 {
    4.0
}

fn default_lion_radius() -> f64 {
    5.0
}

fn default_hunter_radius() -> f64 {
    8.0
}

fn default_reproduction_radius() -> f64 {
    3.0
}

fn default_hunter_move_unit() -> u32 {
    1
}

fn default_repeat() -> u32 {
    1
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_event_log() -> Option<PathBuf> {
    Some(PathBuf::from("simulation.log"))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub seed: u64,
    #[serde(default = "default_steps")]
    pub steps: u64,
    #[serde(default)]
    pub plane: Plane,
    #[serde(default)]
    pub predation: PredationConfig,
    #[serde(default)]
    pub reproduction: ReproductionConfig,
    #[serde(default)]
    pub hunter: HunterConfig,
    pub cohorts: Vec<CohortConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredationConfig {
    #[serde(default = "default_wolf_radius")]
    pub wolf_radius: f64,
    #[serde(default = "default_lion_radius")]
    pub lion_radius: f64,
    #[serde(default = "default_hunter_radius")]
    pub hunter_radius: f64,
}

impl Default for PredationConfig {
    fn default() -> Self {
        Self {
            wolf_radius: default_wolf_radius(),
            lion_radius: default_lion_radius(),
            hunter_radius: default_hunter_radius(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReproductionConfig {
    #[serde(default = "default_reproduction_radius")]
    pub radius: f64,
}

impl Default for ReproductionConfig {
    fn default() -> Self {
        Self {
            radius: default_reproduction_radius(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HunterConfig {
    #[serde(default = "default_hunter_move_unit")]
    pub move_unit: u32,
}

impl Default for HunterConfig {
    fn default() -> Self {
        Self {
            move_unit: default_hunter_move_unit(),
        }
    }
}

/// `members` are spawned in order, `repeat` times over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortConfig {
    #[serde(default = "default_repeat")]
    pub repeat: u32,
    pub members: Vec<MemberConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MemberConfig {
    pub species: Species,
    pub gender: Gender,
    pub move_unit: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_event_log")]
    pub event_log: Option<PathBuf>,
}

impl LoggingConfig {
    /// The level shared by the tracing filter and the event log.
    pub fn level(&self) -> Result<Level, ConfigError> {
        self.level
            .parse::<Level>()
            .map_err(|_| ConfigError::LogLevel(self.level.clone()))
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            event_log: default_event_log(),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("plane must have positive width and height, got {width}x{height}")]
    EmptyPlane { width: i32, height: i32 },
    #[error("{field} must not be negative, got {value}")]
    NegativeRadius { field: &'static str, value: f64 },
    #[error("{species} ({gender}) has a move unit of zero")]
    ZeroMoveUnit { species: Species, gender: Gender },
    #[error("hunter move unit must be greater than zero")]
    ZeroHunterMoveUnit,
    #[error("scenario must spawn at least one animal")]
    EmptyRoster,
    #[error("logging.level must be one of trace, debug, info, warn or error, got '{0}'")]
    LogLevel(String),
}

impl SimulationConfig {
    /// The default zoo: 30 sheep, 10 cows, 5 hens, 5 roosters, 10 wolves,
    /// 8 lions and one hunter on a 500x500 plane for 1000 steps.
    pub fn zoo() -> Self {
        use Gender::{Female, Male};
        use Species::{Cow, Hen, Lion, Rooster, Sheep, Wolf};

        let pair = |repeat, first: (Species, Gender), second: (Species, Gender), move_unit| {
            CohortConfig {
                repeat,
                members: vec![
                    MemberConfig {
                        species: first.0,
                        gender: first.1,
                        move_unit,
                    },
                    MemberConfig {
                        species: second.0,
                        gender: second.1,
                        move_unit,
                    },
                ],
            }
        };

        Self {
            name: "zoo".to_string(),
            description: Some("Predators, prey and a hunter on an open plain".to_string()),
            seed: 7,
            steps: default_steps(),
            plane: Plane::default(),
            predation: PredationConfig::default(),
            reproduction: ReproductionConfig::default(),
            hunter: HunterConfig::default(),
            cohorts: vec![
                pair(15, (Sheep, Male), (Sheep, Female), 2),
                pair(5, (Cow, Male), (Cow, Female), 2),
                pair(5, (Hen, Female), (Rooster, Male), 1),
                pair(5, (Wolf, Male), (Wolf, Female), 3),
                pair(4, (Lion, Male), (Lion, Female), 4),
            ],
            logging: LoggingConfig::default(),
        }
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let config: SimulationConfig =
            serde_yaml::from_str(text).context("Failed to parse scenario YAML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize scenario")
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.plane.width <= 0 || self.plane.height <= 0 {
            return Err(ConfigError::EmptyPlane {
                width: self.plane.width,
                height: self.plane.height,
            });
        }

        let radii = [
            ("predation.wolf_radius", self.predation.wolf_radius),
            ("predation.lion_radius", self.predation.lion_radius),
            ("predation.hunter_radius", self.predation.hunter_radius),
            ("reproduction.radius", self.reproduction.radius),
        ];
        for (field, value) in radii {
            if value.is_nan() || value < 0.0 {
                return Err(ConfigError::NegativeRadius { field, value });
            }
        }

        if self.hunter.move_unit == 0 {
            return Err(ConfigError::ZeroHunterMoveUnit);
        }

        for member in self.cohorts.iter().flat_map(|cohort| &cohort.members) {
            if member.move_unit == 0 {
                return Err(ConfigError::ZeroMoveUnit {
                    species: member.species,
                    gender: member.gender,
                });
            }
        }

        if self.total_animals() == 0 {
            return Err(ConfigError::EmptyRoster);
        }

        self.logging.level()?;

        Ok(())
    }

    pub fn total_animals(&self) -> u64 {
        self.cohorts
            .iter()
            .map(|cohort| u64::from(cohort.repeat) * cohort.members.len() as u64)
            .sum()
    }

    /// Spawns the roster in order at random positions, then the hunter.
    pub fn build_population(&self, rng: &mut dyn RandomSource) -> Result<Population> {
        self.validate()?;
        let mut population = Population::new();
        for cohort in &self.cohorts {
            for _ in 0..cohort.repeat {
                for member in &cohort.members {
                    let position = self.plane.random_position(rng);
                    population.spawn_animal(
                        member.species,
                        member.gender,
                        member.move_unit,
                        position,
                    )?;
                }
            }
        }
        let position = self.plane.random_position(rng);
        population.spawn_hunter(self.hunter.move_unit, position)?;
        Ok(population)
    }

    pub fn steps(&self, override_steps: Option<u64>) -> u64 {
        override_steps.unwrap_or(self.steps)
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::zoo()
    }
}

pub struct ScenarioLoader {
    base_dir: PathBuf,
}

impl ScenarioLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<SimulationConfig> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
        SimulationConfig::from_yaml_str(&data)
            .with_context(|| format!("Failed to load {}", path.display()))
    }
}
