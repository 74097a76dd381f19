//! Structured simulation events and the sinks that consume them.

use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info, Level};

use crate::components::{AgentTag, Position};
use crate::engine::FinalReport;
use crate::world::SurvivorTally;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SimEvent {
    SimulationStarted {
        name: String,
        agents: usize,
        steps: u64,
    },
    StepStarted {
        step: u64,
    },
    Moved {
        agent: AgentTag,
        from: Position,
        to: Position,
    },
    Killed {
        predator: AgentTag,
        prey: AgentTag,
    },
    Born {
        parents: [AgentTag; 2],
        offspring: AgentTag,
    },
    StepTallied {
        step: u64,
        tally: SurvivorTally,
    },
    Finished {
        report: FinalReport,
    },
}

impl SimEvent {
    /// Movement is chatty and only shows up at debug level.
    pub fn level(&self) -> Level {
        match self {
            SimEvent::Moved { .. } => Level::DEBUG,
            _ => Level::INFO,
        }
    }
}

impl fmt::Display for SimEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimEvent::SimulationStarted {
                name,
                agents,
                steps,
            } => write!(
                f,
                "--- simulation '{name}' started with {agents} agents for {steps} steps ---"
            ),
            SimEvent::StepStarted { step } => write!(f, "--- step {step} ---"),
            SimEvent::Moved { agent, from, to } => write!(f, "{agent} moved {from} -> {to}"),
            SimEvent::Killed { predator, prey } => write!(f, "{predator} killed {prey}"),
            SimEvent::Born { parents, offspring } => write!(
                f,
                "{} and {} bred, offspring {}",
                parents[0], parents[1], offspring
            ),
            SimEvent::StepTallied { step, tally } => {
                write!(f, "survivors after step {step}: {tally}")
            }
            SimEvent::Finished { report } => {
                write!(f, "simulation finished after {} steps", report.steps)
            }
        }
    }
}

/// Receives every event the simulation emits, in emission order.
pub trait EventSink {
    fn record(&mut self, event: &SimEvent) -> Result<()>;

    /// Called once after the final event.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<T: EventSink + ?Sized> EventSink for Box<T> {
    fn record(&mut self, event: &SimEvent) -> Result<()> {
        (**self).record(event)
    }

    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }
}

/// Forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&mut self, event: &SimEvent) -> Result<()> {
        match event {
            SimEvent::Moved { agent, from, to } => {
                debug!(agent = %agent, from = %from, to = %to, "moved");
            }
            SimEvent::Killed { predator, prey } => {
                info!(predator = %predator, prey = %prey, "kill");
            }
            SimEvent::Born { parents, offspring } => {
                info!(
                    first = %parents[0],
                    second = %parents[1],
                    offspring = %offspring,
                    "birth"
                );
            }
            SimEvent::StepTallied { step, tally } => {
                info!(step, alive = tally.total(), "{tally}");
            }
            other => info!("{other}"),
        }
        Ok(())
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    events: Vec<SimEvent>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[SimEvent] {
        &self.events
    }

    pub fn into_events(self) -> Vec<SimEvent> {
        self.events
    }
}

impl EventSink for RecordingSink {
    fn record(&mut self, event: &SimEvent) -> Result<()> {
        self.events.push(event.clone());
        Ok(())
    }
}

/// Plain-text event log, one `timestamp | LEVEL | message` line per event.
pub struct LogFileSink {
    path: PathBuf,
    writer: BufWriter<File>,
    max_level: Level,
}

impl LogFileSink {
    /// Truncates any existing file at `path`.
    pub fn create(path: impl AsRef<Path>, max_level: Level) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let file = File::create(&path)
            .with_context(|| format!("Failed to create event log {}", path.display()))?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
            max_level,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EventSink for LogFileSink {
    fn record(&mut self, event: &SimEvent) -> Result<()> {
        let level = event.level();
        // tracing orders levels by verbosity: DEBUG > INFO.
        if level > self.max_level {
            return Ok(());
        }
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        writeln!(self.writer, "{timestamp} | {level} | {event}")
            .with_context(|| format!("Failed to write event log {}", self.path.display()))
    }

    fn finish(&mut self) -> Result<()> {
        self.writer
            .flush()
            .with_context(|| format!("Failed to flush event log {}", self.path.display()))
    }
}

/// Sends each event to several sinks in order.
#[derive(Default)]
pub struct Fanout {
    sinks: Vec<Box<dyn EventSink>>,
}

impl Fanout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl EventSink for Fanout {
    fn record(&mut self, event: &SimEvent) -> Result<()> {
        for sink in &mut self.sinks {
            sink.record(event)?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        for sink in &mut self.sinks {
            sink.finish()?;
        }
        Ok(())
    }
}
