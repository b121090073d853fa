use detanim_core::{
    state_id, BlendEntry, FadeRequest, Fp, StateId, TableResolution, VariableBank, VariableDecl,
};
use detanim_test_fixtures::{locomotion_graph, tree_1d, two_state_graph};

fn approx(a: Fp, b: Fp, eps: f64) {
    let eps = Fp::from_num(eps);
    assert!((a - b).abs() <= eps, "left={a} right={b} eps={eps}");
}

fn weight_of(list: &[BlendEntry], state: StateId) -> Fp {
    list.iter()
        .filter(|e| e.state_id == state)
        .map(|e| e.weight)
        .fold(Fp::ZERO, |acc, w| acc + w)
}

/// it should emit only the current state at weight 1 while idle
#[test]
fn idle_blend_list_is_current_only() {
    let graph = two_state_graph();
    let mut instance = graph.initialise();
    graph.update(&mut instance, Fp::from_num(0.1));

    let mut list = Vec::new();
    graph.generate_blend_list(&mut instance, &mut list);
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].state_id, state_id("A"));
    assert_eq!(list[0].weight, Fp::ONE);
    assert_eq!(list[0].current_time, instance.layers[0].time);
}

/// it should cross-fade blend weights from A to B and reach 1.0 for B
#[test]
fn fade_to_reaches_full_weight() {
    let graph = two_state_graph();
    let mut instance = graph.initialise();
    graph.update(&mut instance, Fp::from_num(0.1));

    graph.fade_to(
        &mut instance,
        "B",
        FadeRequest {
            duration: Fp::from_num(0.2),
            delta_time: Fp::from_num(0.1),
            ..Default::default()
        },
    );
    assert_eq!(instance.layers[0].to_state_id, state_id("B"));

    // Halfway through the 0.2s fade.
    graph.update(&mut instance, Fp::from_num(0.1));
    let mut list = Vec::new();
    graph.generate_blend_list(&mut instance, &mut list);
    approx(weight_of(&list, state_id("A")), Fp::from_num(0.5), 0.01);
    approx(weight_of(&list, state_id("B")), Fp::from_num(0.5), 0.01);

    // Ticks summing to the fade duration finish the hand-off.
    graph.update(&mut instance, Fp::from_num(0.1));
    assert_eq!(instance.layers[0].current_state_id, state_id("B"));
    assert_eq!(instance.layers[0].to_state_id, StateId::NONE);

    list.clear();
    graph.generate_blend_list(&mut instance, &mut list);
    assert_eq!(weight_of(&list, state_id("B")), Fp::ONE);
    assert_eq!(weight_of(&list, state_id("A")), Fp::ZERO);
}

/// it should refuse fades when the graph disallows them
#[test]
fn fade_to_disallowed_is_a_no_op() {
    let mut graph = two_state_graph();
    graph.allow_fade_to_transitions = false;
    let mut instance = graph.initialise();
    graph.update(&mut instance, Fp::from_num(0.1));

    graph.fade_to(&mut instance, "B", FadeRequest::default());
    assert_eq!(instance.layers[0].to_state_id, StateId::NONE);
}

/// it should refuse try_fade_to onto the current state or an active target
#[test]
fn try_fade_to_refusals() {
    let graph = two_state_graph();
    let mut instance = graph.initialise();
    graph.update(&mut instance, Fp::from_num(0.1));

    assert!(!graph.try_fade_to(&mut instance, "A", FadeRequest::default()));
    assert!(graph.try_fade_to(&mut instance, "B", FadeRequest::default()));
    assert!(!graph.try_fade_to(&mut instance, "B", FadeRequest::default()));
    assert!(!graph.try_fade_to(&mut instance, "Nope", FadeRequest::default()));
}

/// it should promote the To slot when a second fade lands mid-flight
#[test]
fn refade_promotes_to_into_from() {
    let graph = locomotion_graph();
    let mut instance = graph.initialise();
    graph.update(&mut instance, Fp::from_num(0.1));

    // Keep `Moving` true so the Move state's own IfNot-guarded exit stays
    // quiet while the fades run.
    instance.set_boolean(&graph, "Moving", true);
    graph.fade_to(
        &mut instance,
        "Move",
        FadeRequest {
            duration: Fp::ONE,
            ..Default::default()
        },
    );
    graph.update(&mut instance, Fp::from_num(0.1));
    graph.fade_to(
        &mut instance,
        "Jump",
        FadeRequest {
            duration: Fp::ONE,
            ..Default::default()
        },
    );

    let layer = &instance.layers[0];
    assert_eq!(layer.to_state_id, state_id("Jump"));
    // The original From contribution (Idle) is dropped by design.
    assert_eq!(layer.from_state_id, state_id("Move"));
    assert_eq!(layer.current_state_id, state_id("Idle"));
}

/// it should freeze condition transitions for the duration of a fade
#[test]
fn fade_scoped_ignore_transitions_lifts_on_completion() {
    let graph = two_state_graph();
    let mut instance = graph.initialise();
    graph.update(&mut instance, Fp::from_num(0.1));
    instance.set_boolean(&graph, "Go", true);

    graph.fade_to(
        &mut instance,
        "B",
        FadeRequest {
            duration: Fp::from_num(0.2),
            set_ignore_transitions: true,
            ..Default::default()
        },
    );
    assert!(instance.layers[0].ignore_transitions);

    graph.update(&mut instance, Fp::from_num(0.1));
    graph.update(&mut instance, Fp::from_num(0.1));
    assert_eq!(instance.layers[0].current_state_id, state_id("B"));
    assert!(!instance.layers[0].ignore_transitions);
}

/// it should drive stored blend-tree weights from the bank variable
#[test]
fn blend_tree_weights_follow_parameter() {
    let graph = locomotion_graph();
    let mut instance = graph.initialise();
    graph.update(&mut instance, Fp::from_num(0.1));

    instance.set_boolean(&graph, "Moving", true);
    for _ in 0..5 {
        graph.update(&mut instance, Fp::from_num(0.1));
    }
    assert_eq!(instance.layers[0].current_state_id, state_id("Move"));

    instance.set_fixed_point(&graph, "Speed", Fp::from_num(0.5));
    graph.update(&mut instance, Fp::from_num(0.1));
    let weights = instance.layers[0].weights_for(state_id("Move"));
    approx(weights[0], Fp::from_num(0.5), 0.01);
    approx(weights[1], Fp::from_num(0.5), 0.01);
    assert_eq!(weights[2], Fp::ZERO);

    instance.set_fixed_point(&graph, "Speed", Fp::from_num(2.0));
    graph.update(&mut instance, Fp::from_num(0.1));
    let weights = instance.layers[0].weights_for(state_id("Move"));
    assert_eq!(weights[0], Fp::ZERO);
    approx(weights[2], Fp::ONE, 0.01);
}

/// it should keep table weights non-negative and summing to at most 1
#[test]
fn table_weights_stay_convex_across_the_domain() {
    let tree = tree_1d(
        "sweep",
        0,
        &[("a", 0.0, 1.0), ("b", 1.0, 1.0), ("c", 2.0, 1.0)],
        TableResolution::R16,
    );
    let mut out = Vec::new();
    for step in -10..=35 {
        let bank = VariableBank::from_declarations(&[VariableDecl::fp(
            "Blend",
            0,
            Fp::from_num(step as f64 * 0.1),
        )]);
        tree.sample_weights(&bank, &mut out);
        let mut sum = Fp::ZERO;
        for w in &out {
            assert!(*w >= Fp::ZERO);
            sum += *w;
        }
        assert!(sum <= Fp::ONE, "sum {sum} at step {step}");
    }
}

/// it should clamp out-of-domain parameters to the boundary buckets
#[test]
fn table_lookup_clamps_out_of_domain() {
    let tree = tree_1d(
        "clamped",
        0,
        &[("lo", 0.0, 1.0), ("hi", 1.0, 1.0)],
        TableResolution::R8,
    );
    let mut out = Vec::new();

    let bank = VariableBank::from_declarations(&[VariableDecl::fp("Blend", 0, Fp::from_num(-50))]);
    tree.sample_weights(&bank, &mut out);
    assert_eq!(out, vec![Fp::ONE, Fp::ZERO]);

    let bank = VariableBank::from_declarations(&[VariableDecl::fp("Blend", 0, Fp::from_num(50))]);
    tree.sample_weights(&bank, &mut out);
    assert_eq!(out, vec![Fp::ZERO, Fp::ONE]);
}

/// it should approximate [0.5, 0.5] for two children at resolution 8
#[test]
fn midpoint_weights_within_quantization_error() {
    let tree = tree_1d(
        "mid",
        0,
        &[("a", 0.0, 1.0), ("b", 1.0, 1.0)],
        TableResolution::R8,
    );
    let bank =
        VariableBank::from_declarations(&[VariableDecl::fp("Blend", 0, Fp::from_num(0.5))]);
    let mut out = Vec::new();
    tree.sample_weights(&bank, &mut out);
    approx(out[0], Fp::from_num(0.5), 0.01);
    approx(out[1], Fp::from_num(0.5), 0.01);
}

/// it should re-derive a 1D tree's effective length from the live weights
#[test]
fn blended_length_follows_weights() {
    let graph = locomotion_graph();
    let mut instance = graph.initialise();
    graph.update(&mut instance, Fp::from_num(0.1));

    instance.set_boolean(&graph, "Moving", true);
    for _ in 0..5 {
        graph.update(&mut instance, Fp::from_num(0.1));
    }
    assert_eq!(instance.layers[0].current_state_id, state_id("Move"));

    // All child time scales are 1, so the blended length follows the
    // weighted child lengths: 1s at Speed=0, 0.5s at Speed=2.
    instance.set_fixed_point(&graph, "Speed", Fp::ZERO);
    graph.update(&mut instance, Fp::from_num(0.1));
    approx(instance.layers[0].length, Fp::ONE, 0.01);

    instance.set_fixed_point(&graph, "Speed", Fp::from_num(2.0));
    graph.update(&mut instance, Fp::from_num(0.1));
    approx(instance.layers[0].length, Fp::from_num(0.5), 0.01);
}
