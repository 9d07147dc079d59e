//! Benchmarks for forward closure and tabled backward queries

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use ruleinf::{Goal, Node, Reasoner, RuleParser, Store};

/// A chain `n0 p n1 p n2 ... p n{len}`
fn chain(len: usize) -> Store {
    let text: String = (0..len).map(|i| format!("(n{} p n{}) ", i, i + 1)).collect();
    RuleParser::new()
        .parse_triples(&text)
        .expect("chain data parses")
        .into_iter()
        .collect()
}

fn forward_closure_benchmark(c: &mut Criterion) {
    let reasoner = Reasoner::from_text("[trans: (?a p ?b), (?b p ?c) -> (?a p ?c)]").expect("rules parse");
    let mut group = c.benchmark_group("forward_closure");
    for len in [10, 25, 50] {
        let data = chain(len);
        group.bench_with_input(BenchmarkId::new("chain", len), &data, |b, data| {
            b.iter(|| {
                let graph = reasoner.bind(data.clone()).expect("bind");
                black_box(graph.materialized().len())
            });
        });
    }
    group.finish();
}

fn tabled_query_benchmark(c: &mut Criterion) {
    let reasoner = Reasoner::from_text("[-> table(p)] [trans: (?a p ?c) <- (?a p ?b), (?b p ?c)]").expect("rules parse");
    let mut group = c.benchmark_group("tabled_closure");
    for len in [10, 25, 50] {
        let data = chain(len);
        group.bench_with_input(BenchmarkId::new("all_pairs", len), &data, |b, data| {
            b.iter(|| {
                let graph = reasoner.bind(data.clone()).expect("bind");
                black_box(graph.find_all(&Goal::any()).expect("query").len())
            });
        });
        group.bench_with_input(BenchmarkId::new("from_start", len), &data, |b, data| {
            let goal = Goal::new(Some(Node::uri("n0")), Some(Node::uri("p")), None);
            b.iter(|| {
                let graph = reasoner.bind(data.clone()).expect("bind");
                black_box(graph.find_all(&goal).expect("query").len())
            });
        });
    }
    group.finish();
}

criterion_group!(benches, forward_closure_benchmark, tabled_query_benchmark);
criterion_main!(benches);
