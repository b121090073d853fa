//! Shared graph and clip fixtures for detanim integration tests.
//!
//! Everything here plays the role of the external baking collaborator:
//! float literals are converted to fixed point at build time only, the way
//! a real bake converts authored curves.

use detanim_core::{
    BlendKind, BlendTree, ClipData, ClipMotion, Condition, ConditionMode, Fp, FpVec2, Graph,
    Layer, Motion, MotionFrame, FpVec3, State, TableResolution, Transition, VariableDecl,
};

/// Clip whose root travels +X at one unit per second, sampled at 30 fps.
pub fn translating_clip(name: &str, length: f64, loop_time: bool) -> ClipData {
    let frame_count = ((length * 30.0) as usize).max(1) + 1;
    let mut clip = ClipData {
        clip_name: name.to_string(),
        frame_rate: 30,
        length: Fp::from_num(length),
        loop_time,
        ..Default::default()
    };
    for i in 0..frame_count {
        let t = Fp::from_num(length * i as f64 / (frame_count - 1) as f64);
        clip.frames.push(MotionFrame {
            time: t,
            position: FpVec3::new(t, Fp::ZERO, Fp::ZERO),
            ..Default::default()
        });
    }
    clip
}

/// Clip with a stationary root (two identity frames).
pub fn static_clip(name: &str, length: f64, loop_time: bool) -> ClipData {
    ClipData {
        clip_name: name.to_string(),
        frame_rate: 30,
        length: Fp::from_num(length),
        frames: vec![
            MotionFrame::default(),
            MotionFrame {
                time: Fp::from_num(length),
                ..Default::default()
            },
        ],
        loop_time,
        ..Default::default()
    }
}

/// State playing a stationary clip.
pub fn clip_state(name: &str, length: f64, loop_time: bool) -> State {
    State::new(name).with_motion(Motion::Clip(ClipMotion::new(
        name,
        static_clip(name, length, loop_time),
    )))
}

/// Baked 1D blend tree over stationary clips at the given thresholds.
pub fn tree_1d(
    name: &str,
    blend_parameter: usize,
    children: &[(&str, f64, f64)],
    resolution: TableResolution,
) -> BlendTree {
    let mut tree = BlendTree::new(name, BlendKind::Simple1D, blend_parameter);
    for (child_name, threshold, length) in children {
        tree.push_child(
            Motion::Clip(ClipMotion::new(
                child_name,
                static_clip(child_name, *length, true),
            )),
            FpVec2::new(Fp::from_num(*threshold), Fp::ZERO),
            Fp::ONE,
        );
    }
    tree.bake_tables(resolution);
    tree
}

/// Wrap states into a single-layer graph with a synthetic Any state.
pub fn single_layer_graph(name: &str, variables: Vec<VariableDecl>, mut states: Vec<State>) -> Graph {
    let mut layer = Layer::new("Base Layer", 0);
    states.push(State::any_state());
    layer.states = states;
    let mut graph = Graph::new(name);
    graph.variables = variables;
    graph.layers.push(layer);
    graph.validate().expect("fixture graph should validate");
    graph
}

/// Two clip states `A` (default) and `B`, with `A -> B` guarded by the
/// bool variable `Go` and a 0.25s cross-fade.
pub fn two_state_graph() -> Graph {
    let variables = vec![VariableDecl::bool("Go", 0, false)];

    let mut a = clip_state("A", 1.0, true).with_default();
    let mut b = clip_state("B", 1.0, true);

    let mut go = Transition::new(0, "A", "B");
    go.duration = Fp::from_num(0.25);
    go.conditions
        .push(Condition::boolean("Go", 0, ConditionMode::If));
    a.transitions.push(go);

    let mut back = Transition::new(0, "B", "A");
    back.has_exit_time = true;
    back.exit_time = Fp::ONE;
    back.duration = Fp::from_num(0.25);
    b.transitions.push(back);

    single_layer_graph("two-state", variables, vec![a, b])
}

/// Idle/Move/Jump locomotion graph:
/// - `Speed` (fp, index 0) drives the 1D `Move` blend tree,
/// - `Moving` (bool, index 1) gates Idle <-> Move,
/// - `Jump` (trigger, index 2) fires the Any-state transition into `Jump`.
pub fn locomotion_graph() -> Graph {
    let variables = vec![
        VariableDecl::fp("Speed", 0, Fp::ZERO),
        VariableDecl::bool("Moving", 1, false),
        VariableDecl::trigger("Jump", 2),
    ];

    let mut idle = clip_state("Idle", 1.0, true).with_default();
    let mut start = Transition::new(0, "Idle", "Move");
    start.duration = Fp::from_num(0.1);
    start
        .conditions
        .push(Condition::boolean("Moving", 1, ConditionMode::If));
    idle.transitions.push(start);

    let tree = tree_1d(
        "Locomotion",
        0,
        &[("IdleLoop", 0.0, 1.0), ("Walk", 1.0, 1.0), ("Run", 2.0, 0.5)],
        TableResolution::R32,
    );
    let mut moving = State::new("Move").with_motion(Motion::BlendTree(tree));
    let mut stop = Transition::new(0, "Move", "Idle");
    stop.duration = Fp::from_num(0.1);
    stop.conditions
        .push(Condition::boolean("Moving", 1, ConditionMode::IfNot));
    moving.transitions.push(stop);

    let mut jump = clip_state("Jump", 0.5, false);
    let mut land = Transition::new(0, "Jump", "Idle");
    land.has_exit_time = true;
    land.exit_time = Fp::ONE;
    land.duration = Fp::from_num(0.1);
    jump.transitions.push(land);

    let mut graph = {
        let mut layer = Layer::new("Base Layer", 0);
        let mut any = State::any_state();
        let mut leap = Transition::new(0, "Any State", "Jump");
        leap.duration = Fp::from_num(0.05);
        leap.conditions
            .push(Condition::boolean("Jump", 2, ConditionMode::If));
        any.transitions.push(leap);

        layer.states = vec![idle, moving, jump, any];
        let mut graph = Graph::new("locomotion");
        graph.variables = variables;
        graph.layers.push(layer);
        graph
    };
    graph.weight_table_resolution = TableResolution::R32;
    graph.validate().expect("locomotion graph should validate");
    graph
}
