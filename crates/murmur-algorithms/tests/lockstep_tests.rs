//! Barrier-gated formation behavior across several agents.

use murmur_algorithms::platforms::NullPlatform;
use murmur_algorithms::{builtin_registries, FormationSync, Spell};
use murmur_core::prelude::*;
use murmur_runtime::prelude::*;

const GROUP: &str = "group.escort";

fn write_group(store: &SharedStore, members: &[&str]) {
    let mut group = FixedListGroup::new(GROUP, store.clone());
    group.clear_members();
    let ids: Vec<AgentId> = members.iter().map(|m| AgentId::from(*m)).collect();
    group.add_members(&ids);
    group.write();
}

fn formation_args(barrier: &str) -> KnowledgeMap {
    let mut args = KnowledgeMap::new();
    args.insert("group".into(), Value::from(GROUP));
    args.insert("start".into(), Value::from("(0,0)"));
    args.insert("end".into(), Value::from("(10,0)"));
    args.insert("formation".into(), Value::from("column"));
    args.insert("steps".into(), Value::from(2));
    args.insert("barrier".into(), Value::from(barrier));
    args
}

/// One formation member sharing `store`, flying a null platform.
struct Member {
    algorithm: FormationSync,
    _slot: PlatformSlot,
}

fn member(store: &SharedStore, agent: &str, barrier: &str) -> Member {
    let mut ctx = FactoryContext::new(store.clone(), agent.into());
    let mut slot = PlatformSlot::new();
    ctx.platform = slot.replace(Box::new(NullPlatform::new(&ctx)));
    let algorithm = FormationSync::new(&formation_args(barrier), &ctx).unwrap();
    Member {
        algorithm,
        _slot: slot,
    }
}

fn tick(member: &mut Member) -> StatusCode {
    let mut status = member.algorithm.analyze();
    status |= member.algorithm.plan();
    status |= member.algorithm.execute();
    status
}

#[test]
fn two_of_three_arrivals_do_not_advance() {
    let store = SharedStore::new();
    write_group(&store, &["agent.0", "agent.1", "agent.2"]);
    let mut a = member(&store, "agent.0", "barrier.k3");
    let mut b = member(&store, "agent.1", "barrier.k3");
    let c = member(&store, "agent.2", "barrier.k3");

    for _ in 0..5 {
        tick(&mut a);
        tick(&mut b);
    }

    let barrier = Barrier::new(store.clone(), "barrier.k3", 0, 3);
    assert_eq!(barrier.arrivals(1), 2);
    assert!(!barrier.round_reached(1));
    assert_eq!(a.algorithm.step(), 0);
    assert_eq!(b.algorithm.step(), 0);
    assert_eq!(c.algorithm.step(), 0);
    assert!(a.algorithm.status().get(StatusFlag::Waiting));
    assert_eq!(tick(&mut a), StatusCode::WAITING);
}

#[test]
fn group_advances_once_everyone_arrives() {
    let store = SharedStore::new();
    write_group(&store, &["agent.0", "agent.1", "agent.2"]);
    let mut members: Vec<Member> = ["agent.0", "agent.1", "agent.2"]
        .iter()
        .map(|id| member(&store, id, "barrier.advance"))
        .collect();

    for m in &mut members {
        tick(m);
    }
    for m in &members {
        assert_eq!(m.algorithm.step(), 0);
    }

    for m in &mut members {
        tick(m);
    }
    for m in &members {
        assert_eq!(m.algorithm.step(), 1);
    }
    assert_eq!(store.get_doubles("agent.0.location"), vec![5.0, 0.0, 0.0]);
    assert_eq!(store.get_doubles("agent.2.location"), vec![1.0, 0.0, 0.0]);

    for _ in 0..3 {
        for m in &mut members {
            tick(m);
        }
    }
    for m in &members {
        assert_eq!(m.algorithm.step(), m.algorithm.last_step());
        assert!(m.algorithm.is_finished());
    }
}

#[test]
fn role_index_survives_resync() {
    let store = SharedStore::new();
    write_group(&store, &["agent.0", "agent.1"]);
    let mut a = member(&store, "agent.0", "barrier.roles");
    let mut b = member(&store, "agent.1", "barrier.roles");
    assert_eq!(b.algorithm.index(), Some(1));

    // Reorder the stored group mid-sequence.
    write_group(&store, &["agent.1", "agent.0"]);
    tick(&mut a);
    tick(&mut b);
    tick(&mut a);
    tick(&mut b);

    assert_eq!(b.algorithm.step(), 1);
    assert_eq!(b.algorithm.index(), Some(1));
    assert!(b.algorithm.is_participating());
}

#[test]
fn removed_member_withdraws_at_round_boundary() {
    let store = SharedStore::new();
    write_group(&store, &["agent.0", "agent.1"]);
    let mut a = member(&store, "agent.0", "barrier.leave");
    let mut b = member(&store, "agent.1", "barrier.leave");

    write_group(&store, &["agent.0"]);
    tick(&mut a);
    tick(&mut b);
    assert!(b.algorithm.is_participating());

    tick(&mut a);
    tick(&mut b);
    assert!(!b.algorithm.is_participating());
    assert!(b.algorithm.status().get(StatusFlag::Paused));
    assert_eq!(tick(&mut b), StatusCode::OK);
}

#[test]
fn non_member_idles() {
    let store = SharedStore::new();
    write_group(&store, &["agent.0"]);
    let mut outsider = member(&store, "agent.7", "barrier.idle");
    assert_eq!(outsider.algorithm.index(), None);
    assert_eq!(tick(&mut outsider), StatusCode::OK);
    assert!(outsider.algorithm.status().get(StatusFlag::Paused));
    assert!(!store.exists("agent.7.location"));
}

#[test]
fn unknown_group_fails_construction() {
    let store = SharedStore::new();
    let ctx = FactoryContext::new(store, "agent.0".into());
    let err = FormationSync::new(&formation_args("barrier.none"), &ctx).err();
    assert_eq!(err, Some(MurmurError::UnknownGroup(GROUP.to_string())));
}

#[test]
fn controllers_fly_formation_over_fabric() {
    let registries = builtin_registries();
    let fabric = LoopbackFabric::new();
    let commander = SharedStore::new();
    fabric.attach(&commander);
    write_group(&commander, &["agent.0", "agent.1", "agent.2"]);

    let mut controllers: Vec<Controller> = (0..3)
        .map(|i| {
            let store = SharedStore::new();
            fabric.attach(&store);
            let mut controller =
                Controller::new(ControllerConfig::for_agent(i, 3), store, registries.clone());
            controller.init_platform("null", &KnowledgeMap::new()).unwrap();
            controller
        })
        .collect();
    commander.flush();

    let mut command = formation_args("barrier.fabric");
    command.insert("formation".into(), Value::from("line"));
    SwarmVars::new(commander.clone()).issue(&CommandRecord::new("formation_sync", command));
    commander.flush();

    for _ in 0..8 {
        for controller in &mut controllers {
            controller.run_once();
        }
    }

    for controller in &controllers {
        assert_eq!(controller.algorithm_name(), Some("formation sync"));
    }
    let locations: Vec<Vec<f64>> = (0..3)
        .map(|i| commander.get_doubles(&format!("agent.{}.location", i)))
        .collect();
    assert_eq!(locations[1], vec![10.0, 0.0, 0.0]);
    for location in &locations {
        assert_eq!(location[0], 10.0);
    }
    assert_eq!(commander.get_integer("barrier.fabric.0"), 3);
}

fn solo_controller(store: &SharedStore) -> Controller {
    write_group(store, &["agent.0"]);
    let mut controller = Controller::new(ControllerConfig::for_agent(0, 1), store.clone(), builtin_registries());
    controller.init_platform("null", &KnowledgeMap::new()).unwrap();
    controller
}

fn route(from: &str, to: &str, steps: &str) -> KnowledgeMap {
    let mut args = KnowledgeMap::new();
    args.insert("group".into(), Value::from(GROUP));
    args.insert("start".into(), Value::from(from));
    args.insert("end".into(), Value::from(to));
    args.insert("steps".into(), Value::from(steps));
    args
}

#[test]
fn unbounded_steps_are_rejected_at_dispatch() {
    let store = SharedStore::new();
    let mut controller = solo_controller(&store);
    controller.init_algorithm("debug", &KnowledgeMap::new()).unwrap();

    for steps in ["inf", "1e18", "NaN"] {
        CommandRecord::new("formation sync", route("(0,0)", "(10,0)", steps)).write(&store, "agent.0");
        controller.run_once();
        assert_eq!(controller.algorithm_name(), Some("debug"));
    }
}

#[test]
fn repeated_sequence_on_same_group_starts_from_step_zero() {
    let store = SharedStore::new();
    let mut controller = solo_controller(&store);

    CommandRecord::new("formation sync", route("(0,0)", "(10,0)", "4")).write(&store, "agent.0");
    controller.run_ticks(20);
    assert_eq!(store.get_doubles("agent.0.location"), vec![10.0, 0.0, 0.0]);

    CommandRecord::new("formation sync", route("(10,0)", "(0,0)", "4")).write(&store, "agent.0");
    controller.run_once();
    assert_eq!(store.get_doubles("agent.0.location"), vec![10.0, 0.0, 0.0]);
    controller.run_once();
    assert_eq!(store.get_doubles("agent.0.location"), vec![7.5, 0.0, 0.0]);

    controller.run_ticks(10);
    assert_eq!(store.get_doubles("agent.0.location"), vec![0.0, 0.0, 0.0]);
}

fn speller(store: &SharedStore, agent: &str) -> (Spell, PlatformSlot) {
    let mut ctx = FactoryContext::new(store.clone(), agent.into());
    let mut slot = PlatformSlot::new();
    ctx.platform = slot.replace(Box::new(NullPlatform::new(&ctx)));
    let mut args = KnowledgeMap::new();
    args.insert("group".into(), Value::from(GROUP));
    args.insert("text".into(), Value::from("HI"));
    args.insert("barrier".into(), Value::from("barrier.spell.test"));
    (Spell::new(&args, &ctx).unwrap(), slot)
}

#[test]
fn spell_assigns_three_members_per_letter() {
    let store = SharedStore::new();
    let ids = ["agent.0", "agent.1", "agent.2", "agent.3", "agent.4", "agent.5", "agent.6"];
    write_group(&store, &ids);
    let mut spellers: Vec<(Spell, PlatformSlot)> = ids.iter().map(|id| speller(&store, id)).collect();

    assert_eq!(spellers[4].0.index(), Some(4));
    assert_eq!(spellers[6].0.index(), None);
    assert_eq!(spellers[0].0.last_step(), 1);

    // Everyone but the last letter's final agent reports step 0.
    for (spell, _) in spellers.iter_mut().take(5) {
        spell.analyze();
        spell.plan();
        spell.execute();
    }
    assert!(!spellers[0].0.is_finished());
    spellers[0].0.plan();
    assert_eq!(spellers[0].0.step(), 0);

    for (spell, _) in spellers.iter_mut().skip(5) {
        spell.analyze();
        spell.plan();
        spell.execute();
    }
    assert_eq!(store.get_doubles("agent.4.location"), vec![8.0, 0.0, 0.0]);
    assert!(!store.exists("agent.6.location"));

    for (spell, _) in &mut spellers {
        spell.analyze();
        spell.plan();
        spell.execute();
    }
    assert_eq!(spellers[0].0.step(), 1);
    assert_eq!(store.get_doubles("agent.0.location"), vec![0.0, -8.0, 0.0]);
    assert_eq!(store.get_doubles("agent.4.location"), vec![8.0, -8.0, 0.0]);
    assert!(spellers[5].0.is_finished());
}
