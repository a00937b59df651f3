use criterion::{black_box, criterion_group, criterion_main, Criterion};
use trellis_parser::{parse, serialize};

fn sample(objects: usize) -> String {
    let mut source = String::new();
    for i in 0..objects {
        source.push_str(&format!("group {}: {{\n  node {}: label {}\n  node {}.style.fill: red\n}}\n", i, i, i, i));
        if i > 0 {
            source.push_str(&format!("group {}.node {} -> group {}.node {}\n", i - 1, i - 1, i, i));
        }
    }
    source
}

fn parse_small_diagram(c: &mut Criterion) {
    let source = "a -> b -> c\nb: { shape: circle }\n";
    c.bench_function("parse_small_diagram", |b| b.iter(|| parse(black_box(source))));
}

fn parse_large_diagram(c: &mut Criterion) {
    let source = sample(200);
    c.bench_function("parse_large_diagram", |b| b.iter(|| parse(black_box(&source))));
}

fn serialize_large_diagram(c: &mut Criterion) {
    let ast = match parse(&sample(200)) {
        Ok(ast) => ast,
        Err(e) => panic!("sample must parse: {e}"),
    };
    c.bench_function("serialize_large_diagram", |b| b.iter(|| serialize(black_box(&ast))));
}

criterion_group!(benches, parse_small_diagram, parse_large_diagram, serialize_large_diagram);
criterion_main!(benches);
