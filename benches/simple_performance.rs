use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use story_core::{twiml::MessagingResponse, MemoryStore, StoryService};
use storykit::config::AppConfig;
use time::OffsetDateTime;
use tokio::runtime::Runtime;

fn benchmark_submission(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let now = OffsetDateTime::now_utc();

    let message_sizes = vec![10, 40, 75];
    let mut group = c.benchmark_group("submission");

    for size in message_sizes {
        let body = "x".repeat(size);

        group.bench_with_input(BenchmarkId::new("submit", size), &size, |b, &_size| {
            b.to_async(&rt).iter(|| async {
                // Fresh store each round so the rate limiter never trips.
                let service = StoryService::with_defaults(Arc::new(MemoryStore::new()));
                black_box(service.submit("+15550001111", &body, now).await)
            })
        });
    }
    group.finish();
}

fn benchmark_status(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let now = OffsetDateTime::now_utc();

    let service = StoryService::with_defaults(Arc::new(MemoryStore::new()));
    rt.block_on(async {
        for i in 0..20 {
            let sender = format!("+1555000{i:04}");
            service.submit(&sender, "fragment", now).await.unwrap();
        }
    });

    let mut group = c.benchmark_group("status");
    group.bench_function("read", |b| {
        b.to_async(&rt)
            .iter(|| async { black_box(service.status(now).await) })
    });
    group.finish();
}

fn benchmark_reply_formatting(c: &mut Criterion) {
    let mut group = c.benchmark_group("reply_formatting");

    let plain = "Once upon a time there was a story built one text message at a time";
    let markup = "fish & chips <for> \"everyone\"";

    group.bench_function("plain_body", |b| {
        b.iter(|| black_box(MessagingResponse::with_message(plain).to_xml()))
    });
    group.bench_function("escaped_body", |b| {
        b.iter(|| black_box(MessagingResponse::with_message(markup).to_xml()))
    });

    group.finish();
}

fn benchmark_configuration_loading(c: &mut Criterion) {
    let mut group = c.benchmark_group("configuration");

    group.bench_function("create_default", |b| {
        b.iter(|| black_box(AppConfig::default()))
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_submission,
    benchmark_status,
    benchmark_reply_formatting,
    benchmark_configuration_loading
);

criterion_main!(benches);
