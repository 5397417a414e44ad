// Copyright (c) 2026 Bountyy Oy. All rights reserved.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use shield::{digest, extract, synthesize, HashesCollection, PolicyContext, ResourceKind, SriOptions};
use url::Url;

fn digest_benchmark(c: &mut Criterion) {
    let script = "document.querySelectorAll('a').forEach(a => a.classList.add('x'));".repeat(64);

    c.bench_function("digest_4k", |b| b.iter(|| black_box(digest(script.as_bytes()))));
}

fn extract_benchmark(c: &mut Criterion) {
    let html = r#"
        <!DOCTYPE html>
        <html>
        <head>
            <title>Test</title>
            <link rel="stylesheet" href="/styles/main.css">
            <style>body { margin: 0; }</style>
            <script src="https://cdn.example.com/lib.js"></script>
        </head>
        <body>
            <div id="content">
                <a href="/page1.html">Link 1</a>
                <script>window.dataLayer = [];</script>
            </div>
        </body>
        </html>
    "#;
    let url = Url::parse("http://localhost/index.html").unwrap();

    c.bench_function("extract_page", |b| b.iter(|| black_box(extract(html, &url).unwrap())));
}

fn synthesize_benchmark(c: &mut Criterion) {
    let mut hashes = HashesCollection::new();
    for i in 0..200 {
        let content = format!("script {}", i);
        hashes.record_inline(ResourceKind::Script, &digest(content.as_bytes()), Some("index.html"));
    }
    let slice = hashes.slice_for_page("index.html");
    let sri = SriOptions::default();
    let context = PolicyContext::for_static(&sri);

    c.bench_function("synthesize_200_hashes", |b| {
        b.iter(|| black_box(synthesize(&slice, None, &sri, &context).to_header_value()))
    });
}

criterion_group!(benches, digest_benchmark, extract_benchmark, synthesize_benchmark);
criterion_main!(benches);
