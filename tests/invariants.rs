use std::collections::{HashMap, HashSet};

use menagerie::{
    components::{AgentId, Species},
    events::{RecordingSink, SimEvent},
    rng::SeededRandom,
    systems::PredatorClass,
    Simulation, SimulationConfig,
};

fn zoo(seed: u64, steps: u64) -> Simulation<SeededRandom, RecordingSink> {
    let mut config = SimulationConfig::zoo();
    config.seed = seed;
    config.steps = steps;
    Simulation::from_config(&config, SeededRandom::new(seed), RecordingSink::new())
        .expect("zoo builds")
}

#[test]
fn positions_stay_on_plane_and_death_is_permanent() {
    let mut simulation = zoo(5, 150);
    let plane = simulation.settings().plane;
    let mut dead: HashSet<AgentId> = HashSet::new();

    for _ in 0..150 {
        simulation.step().unwrap();
        for agent in simulation.population().agents() {
            assert!(
                plane.contains(agent.position()),
                "{} left the plane at {}",
                agent.tag(),
                agent.position()
            );
            if dead.contains(&agent.id()) {
                assert!(!agent.is_alive(), "{} came back to life", agent.tag());
            }
            if !agent.is_alive() {
                dead.insert(agent.id());
            }
        }
    }
    assert_eq!(simulation.population().hunter_count(), 1);
}

#[test]
fn births_and_kills_respect_the_rules() {
    let mut simulation = zoo(21, 200);
    simulation.run().unwrap();
    let events = simulation.sink().events();

    let mut step = 0;
    let mut killed: HashSet<AgentId> = HashSet::new();
    let mut born_in: HashMap<AgentId, u64> = HashMap::new();
    for event in events {
        match event {
            SimEvent::StepStarted { step: current } => step = *current,
            SimEvent::Killed { predator, prey } => {
                assert!(killed.insert(prey.id), "{prey} killed twice");
                assert!(!killed.contains(&predator.id), "{predator} hunted while dead");
                for id in [predator.id, prey.id] {
                    if let Some(birth) = born_in.get(&id) {
                        assert!(*birth < step, "agent hunted in its birth step");
                    }
                }
            }
            SimEvent::Born { parents, offspring } => {
                assert_eq!(parents[0].species(), parents[1].species());
                assert_ne!(parents[0].gender(), parents[1].gender());
                for parent in parents {
                    assert!(!killed.contains(&parent.id), "{parent} bred while dead");
                    if let Some(birth) = born_in.get(&parent.id) {
                        assert!(*birth < step, "{parent} bred in its birth step");
                    }
                }
                born_in.insert(offspring.id, step);
            }
            _ => {}
        }
    }
}

#[test]
fn first_step_kills_exactly_the_prey_within_reach() {
    let mut simulation = zoo(13, 1);
    let before = simulation.population().tally();
    let summary = simulation.step().unwrap();
    let radii = simulation.settings().predation.clone();

    // Predation and breeding do not move anyone, so the recorded positions
    // are the ones every predator saw. All predators start alive and only
    // the hunter, which goes last, can kill them.
    let founders: Vec<_> = simulation.population().agents()[..before.total() + 1].to_vec();
    for prey in founders.iter().filter(|agent| !agent.is_hunter()) {
        let species = prey.species().unwrap();
        let in_reach = founders.iter().any(|predator| {
            PredatorClass::ORDER.iter().any(|class| {
                let member = match class {
                    PredatorClass::Wolf => predator.species() == Some(Species::Wolf),
                    PredatorClass::Lion => predator.species() == Some(Species::Lion),
                    PredatorClass::Hunter => predator.is_hunter(),
                };
                member
                    && class.targets(species)
                    && predator.distance(prey) <= class.radius(&radii)
            })
        });
        assert_eq!(!prey.is_alive(), in_reach, "{}", prey.tag());
    }

    let births_of = |wanted: Species| {
        simulation
            .sink()
            .events()
            .iter()
            .filter(|event| {
                matches!(event, SimEvent::Born { offspring, .. } if offspring.species() == Some(wanted))
            })
            .count()
    };
    for species in Species::ALL {
        let deaths = founders
            .iter()
            .filter(|agent| agent.species() == Some(species) && !agent.is_alive())
            .count();
        assert_eq!(
            summary.tally.species_total(species),
            before.species_total(species) - deaths + births_of(species)
        );
    }
}
