use criterion::{criterion_group, criterion_main, Criterion};
use detanim_core::Fp;
use detanim_test_fixtures::locomotion_graph;

fn graph_step(c: &mut Criterion) {
    let graph = locomotion_graph();
    let mut instance = graph.initialise();
    instance.set_boolean(&graph, "Moving", true);
    instance.set_fixed_point(&graph, "Speed", Fp::from_num(1.2));
    let dt = Fp::from_num(1.0 / 60.0);

    c.bench_function("graph_step", |b| {
        b.iter(|| graph.update(&mut instance, dt));
    });
}

criterion_group!(benches, graph_step);
criterion_main!(benches);
