use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use corechain_work::{meets_difficulty, CancelToken, PowTemplate, WorkGenerator};

fn sample_template() -> PowTemplate {
    let prefix = br#"{"index":1,"nonce":"#.to_vec();
    let suffix = format!(
        r#","previous_hash":"{}","timestamp":1700000000000,"transactions":[]}}"#,
        "0".repeat(64)
    )
    .into_bytes();
    PowTemplate::new(prefix, suffix)
}

fn bench_pow_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("pow_generation");
    let template = sample_template();

    // Low difficulty levels that complete quickly enough for benchmarking.
    for difficulty in [0u32, 1, 2, 3] {
        group.bench_with_input(
            BenchmarkId::new("generate", difficulty),
            &difficulty,
            |b, &diff| {
                b.iter(|| {
                    black_box(
                        WorkGenerator
                            .generate(black_box(&template), diff, &CancelToken::new(), None)
                            .unwrap(),
                    )
                });
            },
        );
    }

    group.finish();
}

fn bench_template_hash(c: &mut Criterion) {
    let template = sample_template();
    let hasher = template.hasher();

    c.bench_function("template_hash_primed", |b| {
        b.iter(|| black_box(hasher.hash(black_box(123_456))))
    });

    c.bench_function("template_hash_one_shot", |b| {
        b.iter(|| black_box(template.hash(black_box(123_456))))
    });
}

fn bench_difficulty_check(c: &mut Criterion) {
    let hash = [0x0Fu8; 32];
    c.bench_function("meets_difficulty", |b| {
        b.iter(|| black_box(meets_difficulty(black_box(&hash), black_box(4))))
    });
}

criterion_group!(
    benches,
    bench_pow_generation,
    bench_template_hash,
    bench_difficulty_check
);
criterion_main!(benches);
