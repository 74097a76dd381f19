use std::fmt;

use serde::{Deserialize, Serialize};

use crate::rng::RandomSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(pub(crate) u64);

impl AgentId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Species {
    Sheep,
    Wolf,
    Cow,
    Hen,
    Rooster,
    Lion,
}

impl Species {
    pub const ALL: [Species; 6] = [
        Species::Sheep,
        Species::Wolf,
        Species::Cow,
        Species::Hen,
        Species::Rooster,
        Species::Lion,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Species::Sheep => "Sheep",
            Species::Wolf => "Wolf",
            Species::Cow => "Cow",
            Species::Hen => "Hen",
            Species::Rooster => "Rooster",
            Species::Lion => "Lion",
        }
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub const ALL: [Gender; 2] = [Gender::Male, Gender::Female];

    /// Uniform choice between the two genders.
    pub fn random(rng: &mut dyn RandomSource) -> Gender {
        Self::ALL[rng.index(Self::ALL.len())]
    }

    pub fn name(self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Position) -> f64 {
        let dx = f64::from(self.x) - f64::from(other.x);
        let dy = f64::from(self.y) - f64::from(other.y);
        dx.hypot(dy)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentKind {
    Animal {
        species: Species,
        gender: Gender,
        alive: bool,
    },
    Hunter,
}

/// A positioned entity on the plane. Animals and the hunter share this record
/// and differ only in `kind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Agent {
    pub(crate) id: AgentId,
    pub(crate) position: Position,
    pub(crate) move_unit: u32,
    pub(crate) kind: AgentKind,
}

impl Agent {
    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn move_unit(&self) -> u32 {
        self.move_unit
    }

    pub fn kind(&self) -> AgentKind {
        self.kind
    }

    /// The hunter is always alive.
    pub fn is_alive(&self) -> bool {
        match self.kind {
            AgentKind::Animal { alive, .. } => alive,
            AgentKind::Hunter => true,
        }
    }

    pub fn is_hunter(&self) -> bool {
        matches!(self.kind, AgentKind::Hunter)
    }

    pub fn species(&self) -> Option<Species> {
        match self.kind {
            AgentKind::Animal { species, .. } => Some(species),
            AgentKind::Hunter => None,
        }
    }

    pub fn gender(&self) -> Option<Gender> {
        match self.kind {
            AgentKind::Animal { gender, .. } => Some(gender),
            AgentKind::Hunter => None,
        }
    }

    /// Living animal of the given species.
    pub fn is_living(&self, wanted: Species) -> bool {
        matches!(self.kind, AgentKind::Animal { species, alive: true, .. } if species == wanted)
    }

    pub fn distance(&self, other: &Agent) -> f64 {
        self.position.distance(other.position)
    }

    /// Marks an animal dead. Returns `false` when there was nothing to kill.
    pub(crate) fn kill(&mut self) -> bool {
        match &mut self.kind {
            AgentKind::Animal { alive, .. } if *alive => {
                *alive = false;
                true
            }
            _ => false,
        }
    }

    pub fn tag(&self) -> AgentTag {
        let role = match self.kind {
            AgentKind::Animal {
                species, gender, ..
            } => Role::Animal { species, gender },
            AgentKind::Hunter => Role::Hunter,
        };
        AgentTag { id: self.id, role }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Role {
    Animal { species: Species, gender: Gender },
    Hunter,
}

impl Role {
    /// `"Sheep (Male)"`, or `"Hunter"`.
    pub fn label(&self) -> String {
        match self {
            Role::Animal { species, gender } => format!("{species} ({gender})"),
            Role::Hunter => "Hunter".to_string(),
        }
    }
}

/// Loggable descriptor of an agent at the time of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AgentTag {
    pub id: AgentId,
    #[serde(flatten)]
    pub role: Role,
}

impl AgentTag {
    pub fn species(&self) -> Option<Species> {
        match self.role {
            Role::Animal { species, .. } => Some(species),
            Role::Hunter => None,
        }
    }

    pub fn gender(&self) -> Option<Gender> {
        match self.role {
            Role::Animal { gender, .. } => Some(gender),
            Role::Hunter => None,
        }
    }
}

impl fmt::Display for AgentTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.role.label(), self.id)
    }
}
