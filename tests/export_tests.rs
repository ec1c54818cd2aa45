//! Integration tests for attachment export and PDF preparation.

use std::path::Path;

use assert_fs::prelude::*;
use async_trait::async_trait;
use predicates::prelude::*;

use mail_export::export::attachment::save_attachments;
use mail_export::export::pdf::{export_pdf, prepare_for_pdf, PageOptions, PdfRenderer};
use mail_export::{Document, ExportError, RenderOptions};

fn fixture(name: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

async fn open(name: &str) -> Document {
    let file = tokio::fs::File::open(fixture(name)).await.unwrap();
    Document::init_eml(file, RenderOptions::default()).await.unwrap()
}

/// Captures the HTML it is given instead of converting it.
struct EchoRenderer;

#[async_trait]
impl PdfRenderer for EchoRenderer {
    async fn render(&self, html: &str, _page: &PageOptions) -> mail_export::Result<Vec<u8>> {
        Ok(html.as_bytes().to_vec())
    }
}

struct FailingRenderer;

#[async_trait]
impl PdfRenderer for FailingRenderer {
    async fn render(&self, _html: &str, _page: &PageOptions) -> mail_export::Result<Vec<u8>> {
        Err(ExportError::Pdf("converter crashed".into()))
    }
}

#[tokio::test]
async fn test_save_standalone_attachments() {
    let doc = open("attachments.eml").await;
    let temp = assert_fs::TempDir::new().unwrap();

    let paths = save_attachments(&doc, temp.path(), false).await.unwrap();
    assert_eq!(paths.len(), 2);

    temp.child("attachment_1.pdf").assert(predicate::path::is_file());
    temp.child("notes.txt")
        .assert(predicate::str::contains("Remember the deadline."));
    temp.child("attachment_0.png").assert(predicate::path::missing());
}

#[tokio::test]
async fn test_save_including_embedded_never_overwrites() {
    let doc = open("attachments.eml").await;
    let temp = assert_fs::TempDir::new().unwrap();

    save_attachments(&doc, temp.path(), true).await.unwrap();
    temp.child("attachment_0.png").assert(predicate::path::is_file());

    let second = save_attachments(&doc, temp.path(), false).await.unwrap();
    assert_eq!(second.len(), 2);
    temp.child("notes_1.txt").assert(predicate::path::is_file());
    temp.child("attachment_1_1.pdf").assert(predicate::path::is_file());
}

#[tokio::test]
async fn test_save_nested_mail_under_subject() {
    let doc = open("nested.eml").await;
    let temp = assert_fs::TempDir::new().unwrap();

    save_attachments(&doc, temp.path(), false).await.unwrap();
    temp.child("Budget 2025.eml")
        .assert(predicate::str::contains("Subject: Budget 2025"));
}

#[tokio::test]
async fn test_export_pdf_passes_prepared_html() {
    let doc = open("attachments.eml").await;
    let bytes = export_pdf(&doc, &EchoRenderer, &PageOptions::default(), None)
        .await
        .unwrap();
    let html = String::from_utf8(bytes).unwrap();

    assert!(!html.contains("data:application/pdf;base64"));
    assert!(html.contains("<a download=\"attachment_1.pdf\">attachment_1.pdf</a>"));
    assert_eq!(html, prepare_for_pdf(&doc.get_as_html(None).await.unwrap()));
}

#[tokio::test]
async fn test_export_pdf_propagates_converter_error() {
    let doc = open("simple.eml").await;
    let err = export_pdf(&doc, &FailingRenderer, &PageOptions::default(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ExportError::Pdf(_)));
}
