use criterion::{black_box, criterion_group, criterion_main, Criterion};
use trellis_compiler::{compile, Diagram};
use trellis_editor::{create, delete, move_id_deltas, move_object, reconnect_edge};

fn sample(groups: usize) -> Diagram {
    let mut source = String::new();
    for i in 0..groups {
        source.push_str(&format!("g{}: {{\n  n{}\n  n{}.shape: circle\n}}\n", i, i, i));
        if i > 0 {
            source.push_str(&format!("g{}.n{} -> g{}.n{}\n", i - 1, i - 1, i, i));
        }
    }
    match compile(&source) {
        Ok(diagram) => diagram,
        Err(e) => panic!("sample must compile: {e}"),
    }
}

fn create_object(c: &mut Criterion) {
    let diagram = sample(100);
    c.bench_function("create_object", |b| b.iter(|| create(black_box(&diagram), &[], "g50.n50")));
}

fn move_nested_object(c: &mut Criterion) {
    let diagram = sample(100);
    c.bench_function("move_nested_object", |b| {
        b.iter(|| move_object(black_box(&diagram), &[], "g50.n50", "g10.n50", true))
    });
}

fn delete_container(c: &mut Criterion) {
    let diagram = sample(100);
    c.bench_function("delete_container", |b| b.iter(|| delete(black_box(&diagram), &[], "g50")));
}

fn reconnect_chain_edge(c: &mut Criterion) {
    let diagram = sample(100);
    c.bench_function("reconnect_chain_edge", |b| {
        b.iter(|| reconnect_edge(black_box(&diagram), &[], "(g49.n49 -> g50.n50)[0]", None, Some("g0.n0")))
    });
}

fn preview_move_deltas(c: &mut Criterion) {
    let diagram = sample(100);
    c.bench_function("preview_move_deltas", |b| {
        b.iter(|| move_id_deltas(black_box(&diagram), &[], "g50", "g10.g50", true))
    });
}

criterion_group!(
    benches,
    create_object,
    move_nested_object,
    delete_container,
    reconnect_chain_edge,
    preview_move_deltas
);
criterion_main!(benches);
