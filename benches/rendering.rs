use criterion::{criterion_group, criterion_main, Criterion};
use std::path::Path;

use mail_export::{Document, RenderOptions};

fn fixture_bytes() -> Vec<u8> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("attachments.eml");
    std::fs::read(path).unwrap()
}

fn bench_parse(c: &mut Criterion) {
    let bytes = fixture_bytes();
    let bytes = &bytes;
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("parse_attachments_eml", |b| {
        b.to_async(&rt).iter(|| async move {
            Document::init_eml(std::io::Cursor::new(bytes.clone()), RenderOptions::default())
                .await
                .unwrap()
        })
    });
}

fn bench_render(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let options = RenderOptions {
        highlight_keywords: vec!["chart".into(), "report".into()],
        ..Default::default()
    };
    let doc = rt
        .block_on(Document::init_eml(
            std::io::Cursor::new(fixture_bytes()),
            options,
        ))
        .unwrap();
    let doc = &doc;

    c.bench_function("render_attachments_eml", |b| {
        b.to_async(&rt).iter(|| async move { doc.get_as_html(None).await.unwrap() })
    });
}

criterion_group!(benches, bench_parse, bench_render);
criterion_main!(benches);
