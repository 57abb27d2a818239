use criterion::{Criterion, criterion_group, criterion_main};
use mathfield_engine::editing::Model;
mod common;

fn bench_tokenize(c: &mut Criterion) {
    let mut group = c.benchmark_group("parsing");
    group.sample_size(20);

    let markup = common::generate_flat_markup(100);
    group.bench_function("tokenize", |b| {
        b.iter(|| {
            let tokens = mathfield_syntax::tokenize(std::hint::black_box(&markup));
            std::hint::black_box(tokens);
        });
    });

    group.bench_function("from_latex", |b| {
        b.iter(|| {
            let model = Model::from_latex(std::hint::black_box(&markup));
            std::hint::black_box(model);
        });
    });

    let nested = common::generate_nested_markup(20);
    group.bench_function("from_latex_nested", |b| {
        b.iter(|| {
            let model = Model::from_latex(std::hint::black_box(&nested));
            std::hint::black_box(model);
        });
    });

    group.finish();
}

fn bench_serialize(c: &mut Criterion) {
    let mut group = c.benchmark_group("serialize");
    group.sample_size(20);

    let model = Model::from_latex(&common::generate_flat_markup(100));
    let root = model.tree().root();

    group.bench_function("latex_cached", |b| {
        b.iter(|| std::hint::black_box(model.tree().latex(root)));
    });

    group.bench_function("latex_expanded", |b| {
        b.iter(|| std::hint::black_box(model.tree().latex_expanded(root)));
    });

    group.finish();
}

criterion_group!(benches, bench_tokenize, bench_serialize);
criterion_main!(benches);
