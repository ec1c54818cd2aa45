//! PDF export: HTML preparation and an external converter process.

use std::process::Stdio;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::document::Document;
use crate::error::{ExportError, Result};
use crate::options::RenderOptions;

/// Data-URI downloads inside the attachments row.
static ATTACHMENT_HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<a href="data:[^"]*" download="#).expect("static regex")
});

/// Word's section page rules, which break pagination in converters.
static WORD_SECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)@page\s+WordSection[^{]*\{[^}]*\}\s*div\.WordSection").expect("static regex")
});

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSize {
    A3,
    #[default]
    A4,
    A5,
    Legal,
    Letter,
    Tabloid,
}

impl PageSize {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::A3 => "A3",
            Self::A4 => "A4",
            Self::A5 => "A5",
            Self::Legal => "Legal",
            Self::Letter => "Letter",
            Self::Tabloid => "Tabloid",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

impl Orientation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Portrait => "Portrait",
            Self::Landscape => "Landscape",
        }
    }
}

/// Page layout handed to the converter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageOptions {
    pub page_size: PageSize,
    pub orientation: Orientation,
    /// Same margin on all four sides, in millimetres.
    pub margin_mm: f32,
    pub print_background: bool,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            page_size: PageSize::A4,
            orientation: Orientation::Portrait,
            margin_mm: 10.0,
            print_background: true,
        }
    }
}

/// Converts a standalone HTML document into PDF bytes.
#[async_trait]
pub trait PdfRenderer: Send + Sync {
    async fn render(&self, html: &str, page: &PageOptions) -> Result<Vec<u8>>;
}

/// Rewrite rendered mail HTML for print: attachment links lose their data
/// URIs (a PDF cannot carry the download) and Word page-section rules are
/// dropped.
pub fn prepare_for_pdf(html: &str) -> String {
    let html = ATTACHMENT_HREF.replace_all(html, "<a download=");
    WORD_SECTION
        .replace_all(&html, "div.WordSection")
        .into_owned()
}

/// Render `doc` to HTML, prepare it for print and convert it.
pub async fn export_pdf(
    doc: &Document,
    renderer: &dyn PdfRenderer,
    page: &PageOptions,
    options: Option<&RenderOptions>,
) -> Result<Vec<u8>> {
    let html = prepare_for_pdf(&doc.get_as_html(options).await?);
    let pdf = renderer.render(&html, page).await?;
    tracing::debug!(bytes = pdf.len(), "PDF rendered");
    Ok(pdf)
}

/// Pipes HTML through an external converter reading stdin and writing PDF
/// to stdout (wkhtmltopdf-compatible command line).
#[derive(Debug, Clone)]
pub struct CommandPdfRenderer {
    pub command: String,
    /// Extra arguments placed before the page options.
    pub args: Vec<String>,
}

impl Default for CommandPdfRenderer {
    fn default() -> Self {
        Self {
            command: "wkhtmltopdf".to_string(),
            args: vec!["--quiet".to_string(), "--encoding".to_string(), "utf-8".to_string()],
        }
    }
}

impl CommandPdfRenderer {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }

    /// Full argument list for one conversion.
    pub fn arguments(&self, page: &PageOptions) -> Vec<String> {
        let margin = format!("{}mm", page.margin_mm);
        let mut args = self.args.clone();
        args.extend([
            "--page-size".to_string(),
            page.page_size.as_str().to_string(),
            "--orientation".to_string(),
            page.orientation.as_str().to_string(),
        ]);
        for side in ["--margin-top", "--margin-right", "--margin-bottom", "--margin-left"] {
            args.push(side.to_string());
            args.push(margin.clone());
        }
        args.push(if page.print_background { "--background" } else { "--no-background" }.to_string());
        args.push("-".to_string());
        args.push("-".to_string());
        args
    }
}

#[async_trait]
impl PdfRenderer for CommandPdfRenderer {
    async fn render(&self, html: &str, page: &PageOptions) -> Result<Vec<u8>> {
        let mut child = Command::new(&self.command)
            .args(self.arguments(page))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ExportError::Pdf(format!("cannot start '{}': {e}", self.command)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| ExportError::Pdf("converter stdin unavailable".into()))?;
        let input = html.as_bytes().to_vec();
        let writer = tokio::spawn(async move {
            stdin.write_all(&input).await?;
            stdin.shutdown().await
        });

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| ExportError::Pdf(format!("'{}' failed: {e}", self.command)))?;
        let written = writer.await.map_err(|e| ExportError::Pdf(e.to_string()))?;

        // A converter that exits early breaks the pipe; its stderr says why.
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExportError::Pdf(format!(
                "'{}' exited with {}: {}",
                self.command,
                output.status,
                stderr.trim()
            )));
        }
        written.map_err(|e| ExportError::Pdf(format!("writing HTML to '{}': {e}", self.command)))?;
        if output.stdout.is_empty() {
            return Err(ExportError::Pdf(format!("'{}' produced no output", self.command)));
        }
        Ok(output.stdout)
    }
}
