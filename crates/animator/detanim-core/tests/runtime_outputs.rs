use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use detanim_core::{
    state_id, ClipEvent, ClipMotion, FadeRequest, Fp, Graph, GraphEvent, InstanceArena, Motion,
    State, StateBehaviour, StateId,
};
use detanim_test_fixtures::{
    locomotion_graph, single_layer_graph, static_clip, translating_clip, two_state_graph,
};

fn approx(a: Fp, b: Fp, eps: f64) {
    let eps = Fp::from_num(eps);
    assert!((a - b).abs() <= eps, "left={a} right={b} eps={eps}");
}

fn root_motion_graph() -> Graph {
    let runner = State::new("Run")
        .with_motion(Motion::Clip(ClipMotion::new(
            "Run",
            translating_clip("Run", 1.0, true),
        )))
        .with_default();
    let mut graph = single_layer_graph("root-motion", vec![], vec![runner]);
    graph.root_motion = true;
    graph
}

/// it should accumulate the root delta travelled each tick
#[test]
fn root_motion_delta_tracks_travel() {
    let graph = root_motion_graph();
    let mut instance = graph.initialise();

    for _ in 0..4 {
        graph.update(&mut instance, Fp::from_num(0.125));
        let root = instance.outputs.root_motion.expect("root motion enabled");
        approx(root.delta.position.x, Fp::from_num(0.125), 0.01);
    }
    let root = instance.outputs.root_motion.unwrap();
    approx(root.current.position.x, Fp::from_num(0.5), 0.01);
}

/// it should carry the full travelled distance across the loop seam
#[test]
fn root_motion_delta_spans_the_wrap() {
    let graph = root_motion_graph();
    let mut instance = graph.initialise();

    for _ in 0..7 {
        graph.update(&mut instance, Fp::from_num(0.125));
    }
    approx(instance.layers[0].time, Fp::from_num(0.875), 0.01);

    graph.update(&mut instance, Fp::from_num(0.25));
    let root = instance.outputs.root_motion.unwrap();
    approx(root.delta.position.x, Fp::from_num(0.25), 0.02);
}

/// it should skip clips that disable root motion
#[test]
fn disabled_root_motion_contributes_nothing() {
    let mut clip = translating_clip("Run", 1.0, true);
    clip.disable_root_motion = true;
    let runner = State::new("Run")
        .with_motion(Motion::Clip(ClipMotion::new("Run", clip)))
        .with_default();
    let mut graph = single_layer_graph("no-root", vec![], vec![runner]);
    graph.root_motion = true;

    let mut instance = graph.initialise();
    graph.update(&mut instance, Fp::from_num(0.25));
    let root = instance.outputs.root_motion.unwrap();
    assert_eq!(root.delta.position.x, Fp::ZERO);
    assert_eq!(root.current.position.x, Fp::ZERO);
}

/// it should fire a clip event exactly once as playback crosses it
#[test]
fn clip_event_fires_once() {
    let mut clip = static_clip("Stomp", 1.0, true);
    clip.events.push(ClipEvent {
        time: Fp::from_num(0.5),
        name: "stomp".into(),
    });
    let state = State::new("Stomp")
        .with_motion(Motion::Clip(ClipMotion::new("Stomp", clip)))
        .with_default();
    let graph = single_layer_graph("events", vec![], vec![state]);
    let mut instance = graph.initialise();

    let clip_events = |instance: &detanim_core::AnimatorInstance| {
        instance
            .outputs
            .events
            .iter()
            .filter(|e| matches!(e, GraphEvent::Clip { .. }))
            .count()
    };

    graph.update(&mut instance, Fp::from_num(0.3));
    assert_eq!(clip_events(&instance), 0);
    graph.update(&mut instance, Fp::from_num(0.3));
    assert_eq!(clip_events(&instance), 1);
    graph.update(&mut instance, Fp::from_num(0.3));
    assert_eq!(clip_events(&instance), 0);
}

/// it should emit enter/exit/transition events in firing order
#[test]
fn graph_events_trace_a_transition() {
    let graph = two_state_graph();
    let mut instance = graph.initialise();
    graph.update(&mut instance, Fp::from_num(0.1));
    assert!(matches!(
        instance.outputs.events[0],
        GraphEvent::StateEntered { state, .. } if state == state_id("A")
    ));

    instance.set_boolean(&graph, "Go", true);
    graph.update(&mut instance, Fp::from_num(0.1));
    let kinds: Vec<&GraphEvent> = instance.outputs.events.iter().collect();
    assert!(matches!(
        kinds[0],
        GraphEvent::StateExited { state, .. } if *state == state_id("A")
    ));
    assert!(matches!(
        kinds[1],
        GraphEvent::TransitionStarted { from, to, .. }
            if *from == state_id("A") && *to == state_id("B")
    ));
    assert!(matches!(
        kinds[2],
        GraphEvent::StateEntered { state, .. } if *state == state_id("B")
    ));
}

/// it should produce bit-identical runs for identical input sequences
#[test]
fn replicas_stay_bit_identical() {
    let graph_a = locomotion_graph();
    let graph_b = locomotion_graph();
    let mut one = graph_a.initialise();
    let mut two = graph_b.initialise();

    for tick in 0..60 {
        let speed = Fp::from_num(tick as i64) / Fp::from_num(30);
        for (graph, instance) in [(&graph_a, &mut one), (&graph_b, &mut two)] {
            instance.set_fixed_point(graph, "Speed", speed);
            instance.set_boolean(graph, "Moving", tick % 20 < 15);
            if tick == 25 {
                instance.set_trigger(graph, "Jump");
            }
            graph.update(instance, Fp::from_num(1.0 / 60.0));
        }
        let left = serde_json::to_string(&(&one.layers, &one.outputs)).unwrap();
        let right = serde_json::to_string(&(&two.layers, &two.outputs)).unwrap();
        assert_eq!(left, right, "diverged at tick {tick}");
    }
}

/// it should round-trip the graph asset through serde
#[test]
fn graph_serde_round_trip() {
    let graph = two_state_graph();
    let json = graph.to_json().unwrap();
    let restored = Graph::from_json(&json).unwrap();
    restored.validate().expect("restored graph still validates");
    assert_eq!(restored.name, graph.name);
    let (state, layer_index) = restored.get_state_by_name("B").unwrap();
    assert_eq!(layer_index, 0);
    assert_eq!(state.id, state_id("B"));
}

#[derive(Default)]
struct CountingBehaviour {
    enters: Arc<AtomicU32>,
    exits: Arc<AtomicU32>,
    handled: bool,
}

impl StateBehaviour for CountingBehaviour {
    fn on_state_enter(&self, _state: &State, _time: Fp) -> bool {
        self.enters.fetch_add(1, Ordering::SeqCst);
        self.handled
    }

    fn on_state_exit(&self, _state: &State, _time: Fp) -> bool {
        self.exits.fetch_add(1, Ordering::SeqCst);
        self.handled
    }
}

/// it should invoke behaviours in order and short-circuit on handled
#[test]
fn behaviours_short_circuit_on_handled() {
    let first_enters = Arc::new(AtomicU32::new(0));
    let first_exits = Arc::new(AtomicU32::new(0));
    let second_enters = Arc::new(AtomicU32::new(0));

    let mut graph = two_state_graph();
    let a = graph.layers[0]
        .states
        .iter_mut()
        .find(|s| s.name == "A")
        .unwrap();
    a.behaviours.push(Box::new(CountingBehaviour {
        enters: first_enters.clone(),
        exits: first_exits.clone(),
        handled: true,
    }));
    a.behaviours.push(Box::new(CountingBehaviour {
        enters: second_enters.clone(),
        exits: Arc::new(AtomicU32::new(0)),
        handled: false,
    }));

    let mut instance = graph.initialise();
    graph.update(&mut instance, Fp::from_num(0.1));
    assert_eq!(first_enters.load(Ordering::SeqCst), 1);
    assert_eq!(second_enters.load(Ordering::SeqCst), 0);

    instance.set_boolean(&graph, "Go", true);
    graph.update(&mut instance, Fp::from_num(0.1));
    assert_eq!(first_exits.load(Ordering::SeqCst), 1);
}

/// it should expose playback heads an external player can consume
#[test]
fn playback_heads_describe_the_fade() {
    let graph = two_state_graph();
    let mut instance = graph.initialise();
    graph.update(&mut instance, Fp::from_num(0.1));

    graph.fade_to(
        &mut instance,
        "B",
        FadeRequest {
            duration: Fp::from_num(0.2),
            ..Default::default()
        },
    );
    graph.update(&mut instance, Fp::from_num(0.1));

    let playback = instance.playback(0);
    assert_eq!(playback.current_state_id, state_id("A"));
    assert_eq!(playback.to_state_id, state_id("B"));
    approx(playback.transition_progress, Fp::from_num(0.5), 0.01);
}

/// it should return safe defaults for unknown variable names
#[test]
fn unknown_variable_names_are_safe() {
    let graph = two_state_graph();
    let mut instance = graph.initialise();

    instance.set_fixed_point(&graph, "Missing", Fp::ONE);
    assert_eq!(instance.get_fixed_point(&graph, "Missing"), Fp::ZERO);
    assert!(!instance.get_boolean(&graph, "AlsoMissing"));
    assert_eq!(instance.get_integer(&graph, "Nope"), 0);
}

/// it should drive instances owned by the arena through stable handles
#[test]
fn arena_owned_instances_update_in_place() {
    let graph = two_state_graph();
    let mut arena = InstanceArena::new();
    let handle = arena.insert(graph.initialise());

    graph.update(arena.get_mut(handle).unwrap(), Fp::from_num(0.1));
    let playback = arena.get(handle).unwrap().playback(0);
    assert_eq!(playback.current_state_id, state_id("A"));
    assert_eq!(playback.to_state_id, StateId::NONE);

    let removed = arena.remove(handle).expect("instance owned");
    assert_eq!(removed.layers[0].current_state_id, state_id("A"));
    assert!(arena.get(handle).is_none());
}
