use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use matcher::{Matcher, RuleSet};

fn bench_matches(c: &mut Criterion) {
    let rules =
        RuleSet::from_patterns(["cat", "dog", "category", "scam", "crypto", "free money"]).unwrap();
    let matcher = Matcher::new(&rules).unwrap();
    let mut group = c.benchmark_group("matches");

    for size in [64, 512, 4096].iter() {
        let text = "the quick brown fox chased a category of dogs ".repeat(*size / 47 + 1);
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_function(format!("bytes_{size}"), |b| {
            b.iter(|| matcher.matches(black_box(&text)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_matches);
criterion_main!(benches);
