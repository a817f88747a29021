//! Controller scheduling and command-intake behavior.

use murmur_core::prelude::*;
use murmur_runtime::prelude::*;
use parking_lot::Mutex;
use std::sync::Arc;

type Journal = Arc<Mutex<Vec<String>>>;

/// Records every phase call into a shared journal.
struct Recorder {
    core: AlgorithmCore,
    label: String,
    journal: Journal,
    execute_status: StatusCode,
}

impl Algorithm for Recorder {
    fn core(&self) -> &AlgorithmCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut AlgorithmCore {
        &mut self.core
    }

    fn analyze(&mut self) -> StatusCode {
        self.journal.lock().push(format!("{}:analyze", self.label));
        StatusCode::OK
    }

    fn plan(&mut self) -> StatusCode {
        self.journal.lock().push(format!("{}:plan", self.label));
        StatusCode::OK
    }

    fn execute(&mut self) -> StatusCode {
        self.journal.lock().push(format!("{}:execute", self.label));
        self.execute_status
    }
}

/// Platform reporting a fixed sense status.
struct Sensing {
    status: PlatformStatus,
    sense_status: StatusCode,
    journal: Journal,
}

impl Platform for Sensing {
    fn name(&self) -> &str {
        "sensing"
    }

    fn sense(&mut self) -> StatusCode {
        self.journal.lock().push("platform:sense".into());
        self.sense_status
    }

    fn analyze(&mut self) -> StatusCode {
        self.journal.lock().push("platform:analyze".into());
        StatusCode::OK
    }

    fn move_to(&mut self, _target: &Pose, _epsilon: f64) -> MoveOutcome {
        MoveOutcome::Arrived
    }

    fn status(&self) -> &PlatformStatus {
        &self.status
    }
}

fn registries(journal: &Journal) -> Arc<Registries> {
    let mut registries = Registries::new();
    let j = journal.clone();
    registries.algorithms.register("recorder", &["rec"], move |args, ctx| {
        let label = args
            .get("label")
            .map(|v| v.to_string())
            .unwrap_or_else(|| "recorder".to_string());
        let execute_status = args
            .get("execute_status")
            .map(|v| StatusCode::from_bits(v.to_integer() as u32))
            .unwrap_or(StatusCode::OK);
        j.lock().push(format!("created:{}", label));
        Ok(Box::new(Recorder {
            core: AlgorithmCore::new("recorder", ctx.store.clone(), ctx.agent.clone()),
            label,
            journal: j.clone(),
            execute_status,
        }))
    });
    let j = journal.clone();
    registries.platforms.register("sensing", &[], move |args, ctx| {
        let sense_status = args
            .get("sense_status")
            .map(|v| StatusCode::from_bits(v.to_integer() as u32))
            .unwrap_or(StatusCode::OK);
        Ok(Box::new(Sensing {
            status: PlatformStatus::for_platform("sensing", ctx.agent.as_str()),
            sense_status,
            journal: j.clone(),
        }))
    });
    registries.shared()
}

fn args(pairs: &[(&str, Value)]) -> KnowledgeMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn controller(journal: &Journal) -> (Controller, SharedStore) {
    let store = SharedStore::new();
    let controller = Controller::new(ControllerConfig::default(), store.clone(), registries(journal));
    (controller, store)
}

fn entries(journal: &Journal) -> Vec<String> {
    journal.lock().clone()
}

#[test]
fn run_once_ors_phase_results() {
    let journal = Journal::default();
    let (mut controller, _store) = controller(&journal);
    controller
        .init_platform("sensing", &args(&[("sense_status", Value::from(8))]))
        .unwrap();
    controller
        .init_algorithm("recorder", &args(&[("execute_status", Value::from(1))]))
        .unwrap();

    let status = controller.run_once();
    assert!(status.contains(StatusCode::UNBOUND));
    assert!(status.contains(StatusCode::WAITING));
    assert!(!status.contains(StatusCode::FAILED));
}

#[test]
fn phases_run_in_fixed_order() {
    let journal = Journal::default();
    let (mut controller, _store) = controller(&journal);
    controller.init_platform("sensing", &KnowledgeMap::new()).unwrap();
    controller
        .init_algorithm("recorder", &args(&[("label", Value::from("main"))]))
        .unwrap();
    controller
        .init_accent("recorder", &args(&[("label", Value::from("accent"))]))
        .unwrap();
    journal.lock().clear();

    controller.run_once();
    assert_eq!(
        entries(&journal),
        vec![
            "platform:sense",
            "platform:analyze",
            "main:analyze",
            "accent:analyze",
            "main:plan",
            "accent:plan",
            "main:execute",
            "accent:execute",
        ]
    );
}

#[test]
fn unbound_tick_contributes_nothing() {
    let journal = Journal::default();
    let (mut controller, _store) = controller(&journal);
    assert_eq!(controller.run_once(), StatusCode::OK);
    assert_eq!(controller.monitor(), StatusCode::OK);
    assert_eq!(controller.execute(), StatusCode::OK);
}

#[test]
fn agent_command_dispatches_once() {
    let journal = Journal::default();
    let (mut controller, store) = controller(&journal);
    CommandRecord::new("recorder", args(&[("label", Value::from("cmd"))])).write(&store, "agent.0");

    controller.run_once();
    assert_eq!(controller.algorithm_name(), Some("recorder"));
    assert_eq!(store.get_string("agent.0.algorithm"), "");
    assert!(store.to_map("agent.0.algorithm_args").is_empty());
    assert_eq!(store.get_string("agent.0.last_algorithm"), "recorder");
    assert_eq!(store.get_string("agent.0.last_algorithm_args.label"), "cmd");

    controller.run_once();
    controller.run_once();
    let created = entries(&journal)
        .iter()
        .filter(|e| e.starts_with("created:"))
        .count();
    assert_eq!(created, 1);
    assert_eq!(controller.self_vars().algorithm_accepts(), 1);
}

#[test]
fn local_command_wins_over_swarm() {
    let journal = Journal::default();
    let (mut controller, store) = controller(&journal);
    CommandRecord::new("recorder", args(&[("label", Value::from("local"))])).write(&store, "agent.0");
    SwarmVars::new(store.clone())
        .issue(&CommandRecord::new("rec", args(&[("label", Value::from("swarm"))])));

    controller.run_once();
    assert!(entries(&journal).contains(&"created:local".to_string()));
    assert!(!entries(&journal).contains(&"created:swarm".to_string()));
    assert_eq!(store.get_string("swarm.algorithm"), "rec");
    assert_eq!(store.get_string("swarm.algorithm_args.label"), "swarm");

    controller.run_once();
    assert!(entries(&journal).contains(&"created:swarm".to_string()));
    assert_eq!(store.get_string("swarm.algorithm"), "");
    assert_eq!(store.get_string("swarm.last_algorithm"), "rec");
    assert_eq!(store.get_string("agent.0.last_algorithm"), "rec");
}

#[test]
fn swarm_command_reaches_every_agent() {
    let journal = Journal::default();
    let registries = registries(&journal);
    let fabric = LoopbackFabric::new();
    let commander = SharedStore::new();
    fabric.attach(&commander);

    let mut controllers: Vec<Controller> = (0..3)
        .map(|i| {
            let store = SharedStore::new();
            fabric.attach(&store);
            Controller::new(ControllerConfig::for_agent(i, 3), store, registries.clone())
        })
        .collect();

    SwarmVars::new(commander.clone()).issue(&CommandRecord::new("recorder", KnowledgeMap::new()));
    commander.flush();

    // Agents tick one after another; an early consumer must not cancel the
    // command for the others.
    for controller in &mut controllers {
        controller.run_once();
    }
    for controller in &controllers {
        assert_eq!(controller.algorithm_name(), Some("recorder"));
    }
    assert_eq!(SwarmVars::new(commander).algorithm(), "recorder");
}

#[test]
fn unknown_algorithm_keeps_prior_instance() {
    let journal = Journal::default();
    let (mut controller, store) = controller(&journal);
    controller
        .init_algorithm("recorder", &args(&[("label", Value::from("keep"))]))
        .unwrap();

    let err = controller.init_algorithm("no such thing", &KnowledgeMap::new());
    assert_eq!(err, Err(MurmurError::unknown_algorithm("no such thing")));
    assert_eq!(controller.algorithm_name(), Some("recorder"));

    CommandRecord::new("missing", KnowledgeMap::new()).write(&store, "agent.0");
    controller.run_once();
    assert_eq!(controller.algorithm_name(), Some("recorder"));
    assert!(entries(&journal).contains(&"keep:execute".to_string()));
    assert_eq!(controller.self_vars().algorithm_rejects(), 1);
    assert_eq!(store.get_string("agent.0.algorithm"), "");
}

#[test]
fn unknown_platform_keeps_prior_instance() {
    let journal = Journal::default();
    let (mut controller, _store) = controller(&journal);
    controller.init_platform("sensing", &KnowledgeMap::new()).unwrap();
    assert!(controller.init_platform("teleporter", &KnowledgeMap::new()).is_err());
    assert_eq!(controller.platform_name().as_deref(), Some("sensing"));
}

#[test]
fn accents_run_without_primary() {
    let journal = Journal::default();
    let (mut controller, store) = controller(&journal);
    controller
        .init_accent("recorder", &args(&[("label", Value::from("first"))]))
        .unwrap();
    controller
        .init_accent("rec", &args(&[("label", Value::from("second"))]))
        .unwrap();
    journal.lock().clear();

    assert_eq!(controller.execute(), StatusCode::OK);
    assert_eq!(entries(&journal), vec!["first:execute", "second:execute"]);
    assert_eq!(
        controller.self_vars().accents(),
        vec!["recorder".to_string(), "recorder".to_string()]
    );
    assert_eq!(store.get_integer("agent.0.accents.size"), 2);
}

#[test]
fn clear_accents_is_idempotent() {
    let journal = Journal::default();
    let (mut controller, _store) = controller(&journal);
    controller.init_accent("recorder", &KnowledgeMap::new()).unwrap();

    controller.clear_accents();
    assert_eq!(controller.accent_count(), 0);
    controller.clear_accents();
    assert_eq!(controller.accent_count(), 0);
    assert!(controller.self_vars().accents().is_empty());
    assert!(controller.init_accent("", &KnowledgeMap::new()).is_err());
}

#[test]
fn replacing_platform_rebinds_algorithm() {
    let journal = Journal::default();
    let (mut controller, store) = controller(&journal);
    controller.init_algorithm("recorder", &KnowledgeMap::new()).unwrap();
    controller.init_platform("sensing", &KnowledgeMap::new()).unwrap();
    controller.run_once();
    assert_eq!(store.get_integer("platform.sensing.agent.0.ok"), 1);
    assert_eq!(store.get_integer("recorder.agent.0.ok"), 1);

    controller.init_platform("sensing", &KnowledgeMap::new()).unwrap();
    controller.run_once();
    assert_eq!(
        entries(&journal)
            .iter()
            .filter(|e| *e == "platform:sense")
            .count(),
        2
    );
}

#[test]
fn writes_are_flushed_after_each_tick() {
    let journal = Journal::default();
    let fabric = LoopbackFabric::new();
    let agent = SharedStore::new();
    let observer = SharedStore::new();
    fabric.attach(&agent);
    fabric.attach(&observer);

    let mut controller = Controller::new(ControllerConfig::default(), agent.clone(), registries(&journal));
    assert!(!observer.exists("agent.0.debug_level"));
    controller.run_once();
    assert_eq!(agent.pending_updates(), 0);
    assert_eq!(observer.get_integer("agent.0.debug_level"), 3);
}
