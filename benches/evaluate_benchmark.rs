//! Benchmarks for download evaluation.
//!
//! Run with: cargo bench
//!
//! This benchmark suite measures:
//! - Field extraction cost
//! - Evaluation against the default rules
//! - Scalability with different rule list sizes
//! - Rule replacement with and without a warm pattern cache

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use dlrule::field::Field;
use dlrule::pattern::PatternCache;
use dlrule::{
    default_rules, extract_fields, DownloadItem, EngineConfig, Organizer, Rule, RuleSet, StartTime,
};

fn item(mime: &str, filename: &str) -> DownloadItem {
    DownloadItem {
        mime: mime.to_string(),
        referrer: "https://example.com/downloads/page".to_string(),
        url: format!("https://cdn.example.com/files/{}?token=abc", filename),
        final_url: format!("https://cdn.example.com/files/{}", filename),
        filename: filename.to_string(),
        start_time: StartTime::EpochMillis(1_709_596_800_000),
    }
}

/// Generate a rule list where only the last rule matches `text/plain`.
fn generate_rules(count: usize) -> Vec<Rule> {
    let mut rules: Vec<Rule> = (0..count.saturating_sub(1))
        .map(|i| {
            Rule::new(format!("bucket{}/", i))
                .with_matcher(Field::Url, format!("host{}\\.example\\.org", i))
                .with_matcher(Field::Filename, format!("\\.ext{}$", i))
        })
        .collect();
    rules.push(
        Rule::new("site/${referrer:1}/${date:YYYY-MM}/")
            .with_matcher(Field::Referrer, ".+?://([^/]+)/.*"),
    );
    rules
}

fn bench_extract(c: &mut Criterion) {
    let items = [
        item("image/png", "photo.png"),
        item("application/octet-stream", "archive.zip"),
        item("text/plain", "caf%C3%A9%20menu.txt"),
        item("application/pdf", "Re\u{301}sume\u{301}.pdf"),
    ];

    let mut group = c.benchmark_group("extract");
    group.throughput(Throughput::Elements(items.len() as u64));

    group.bench_function("mixed_items", |b| {
        b.iter(|| {
            for item in &items {
                black_box(extract_fields(black_box(item), None).ok());
            }
        })
    });

    group.finish();
}

fn bench_default_rules(c: &mut Criterion) {
    let organizer = Organizer::with_defaults();
    let hit = item("image/png", "photo.png");
    let miss = item("text/html", "index.html");

    let mut group = c.benchmark_group("default_rules");

    group.bench_function("match", |b| b.iter(|| black_box(organizer.suggest(black_box(&hit)))));
    group.bench_function("no_match", |b| {
        b.iter(|| black_box(organizer.suggest(black_box(&miss))))
    });

    group.finish();
}

fn bench_scalability(c: &mut Criterion) {
    let mut group = c.benchmark_group("scalability");
    let record = extract_fields(&item("text/plain", "notes.txt"), None).unwrap();

    for size in [10, 100, 1000].iter() {
        let ruleset = RuleSet::from_rules(&generate_rules(*size), EngineConfig::default());

        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::new("rules", size), size, |b, _| {
            b.iter(|| black_box(ruleset.evaluate(black_box(&record))))
        });
    }

    group.finish();
}

fn bench_compile(c: &mut Criterion) {
    let rules = generate_rules(100);
    let warm = PatternCache::new(1024);
    RuleSet::compile(&rules, EngineConfig::default(), &warm);

    let mut group = c.benchmark_group("compile");

    group.bench_function("cold_100_rules", |b| {
        b.iter(|| black_box(RuleSet::from_rules(&rules, EngineConfig::default())))
    });
    group.bench_function("warm_100_rules", |b| {
        b.iter(|| black_box(RuleSet::compile(&rules, EngineConfig::default(), &warm)))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_extract,
    bench_default_rules,
    bench_scalability,
    bench_compile,
);

criterion_main!(benches);
