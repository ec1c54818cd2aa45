//! CLI entry point for `mail-export`.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};

use mail_export::config::{self, Config};
use mail_export::error::ExportError;
use mail_export::export::{attachment, pdf};
use mail_export::model::address::MailAddress;
use mail_export::parser::Adapters;
use mail_export::{Document, MailFormat, RenderOptions};

#[derive(Parser)]
#[command(
    name = "mail-export",
    version,
    about = "Render EML/MSG mail files as standalone HTML or PDF"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    render: RenderArgs,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

/// Overrides on top of the `[render]` section of the config file.
#[derive(Args)]
struct RenderArgs {
    /// Header section to leave out (to, cc, bcc, from, date, subject,
    /// reply-to, attachments, embedded). Repeatable.
    #[arg(long, value_name = "FIELD", global = true)]
    exclude: Vec<String>,

    /// Keyword to highlight in the body. Repeatable.
    #[arg(long, value_name = "KEYWORD", global = true)]
    highlight: Vec<String>,

    /// Match highlight keywords case-sensitively
    #[arg(long, global = true)]
    case_sensitive: bool,

    /// CSS file replacing the built-in stylesheet
    #[arg(long, value_name = "CSS_FILE", global = true)]
    style: Option<PathBuf>,

    /// Address template using {{name}} and {{email}}
    #[arg(long, value_name = "TEMPLATE", global = true)]
    address_template: Option<String>,

    /// Date pattern, e.g. "dd/MM/yyyy HH:mm"
    #[arg(long, value_name = "PATTERN", global = true)]
    date_pattern: Option<String>,

    /// Date locale, e.g. "fr" or "en-US"
    #[arg(long, value_name = "LOCALE", global = true)]
    locale: Option<String>,

    /// IANA time zone, e.g. "Europe/Paris"
    #[arg(long, value_name = "ZONE", global = true)]
    time_zone: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a mail as a standalone HTML document
    Html {
        path: PathBuf,
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Render a mail to PDF through the configured converter
    Pdf {
        path: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Print the normalized header
    Header {
        path: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Save attachments to a directory
    Attachments {
        path: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        /// Also save inline parts referenced from the body
        #[arg(long)]
        include_embedded: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = config::load_config();

    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level);

    let options = cli.render.apply(config.render.clone())?;

    match cli.command {
        Commands::Html { path, output } => cmd_html(&path, output.as_deref(), options).await,
        Commands::Pdf { path, output } => cmd_pdf(&path, &output, options, &config).await,
        Commands::Header { path, json } => cmd_header(&path, json, options).await,
        Commands::Attachments {
            path,
            output,
            include_embedded,
        } => cmd_attachments(&path, &output, include_embedded, options).await,
    }
}

/// Set up tracing with stderr output.
fn setup_logging(level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

impl RenderArgs {
    fn apply(self, mut options: RenderOptions) -> anyhow::Result<RenderOptions> {
        for field in &self.exclude {
            options.exclude_header.set(field)?;
        }
        if !self.highlight.is_empty() {
            options.highlight_keywords = self.highlight;
        }
        if self.case_sensitive {
            options.highlight_case_sensitive = true;
        }
        if let Some(path) = &self.style {
            let css = std::fs::read_to_string(path)
                .with_context(|| format!("reading stylesheet {}", path.display()))?;
            options.custom_style = Some(css);
        }
        if let Some(template) = self.address_template {
            options.format_email_address = Some(template);
        }
        if let Some(pattern) = self.date_pattern {
            options.date_format.pattern = Some(pattern);
        }
        if let Some(locale) = self.locale {
            options.date_format.locale = Some(locale);
        }
        if let Some(zone) = self.time_zone {
            options.date_format.time_zone = Some(zone);
        }
        options.validate()?;
        Ok(options)
    }
}

async fn open_document(path: &Path, options: RenderOptions) -> anyhow::Result<Document> {
    let format = path
        .extension()
        .and_then(|e| e.to_str())
        .and_then(MailFormat::from_extension)
        .unwrap_or(MailFormat::Eml);

    let file = tokio::fs::File::open(path)
        .await
        .map_err(|e| ExportError::io(path, e))?;
    let doc = Document::init(file, format, Adapters::eml_only(), options)
        .await
        .with_context(|| format!("opening {}", path.display()))?;
    Ok(doc)
}

async fn cmd_html(path: &Path, output: Option<&Path>, options: RenderOptions) -> anyhow::Result<()> {
    let doc = open_document(path, options).await?;
    let html = doc.get_as_html(None).await?;

    match output {
        Some(out) => {
            tokio::fs::write(out, html)
                .await
                .map_err(|e| ExportError::io(out, e))?;
            eprintln!("  Wrote {}", out.display());
        }
        None => print!("{html}"),
    }
    Ok(())
}

async fn cmd_pdf(path: &Path, output: &Path, options: RenderOptions, config: &Config) -> anyhow::Result<()> {
    let doc = open_document(path, options).await?;
    let renderer = config.pdf.renderer();
    let bytes = pdf::export_pdf(&doc, &renderer, &config.pdf.page, None).await?;

    tokio::fs::write(output, &bytes)
        .await
        .map_err(|e| ExportError::io(output, e))?;

    use humansize::{format_size, BINARY};
    eprintln!(
        "  Wrote {} ({})",
        output.display(),
        format_size(bytes.len(), BINARY)
    );
    Ok(())
}

async fn cmd_header(path: &Path, json: bool, options: RenderOptions) -> anyhow::Result<()> {
    let doc = open_document(path, options).await?;
    let header = doc.get_header(None).await?;

    let mut names = Vec::with_capacity(header.attachments.len());
    for att in &header.attachments {
        names.push(doc.attachment_filename(att).await?.to_string());
    }

    if json {
        let attachments: Vec<serde_json::Value> = header
            .attachments
            .iter()
            .zip(&names)
            .map(|(att, name)| {
                serde_json::json!({
                    "filename": name,
                    "content_type": att.mime_type(),
                    "disposition": att.disposition,
                    "size": att.size(),
                })
            })
            .collect();
        let mut value = serde_json::to_value(&header)?;
        value["format"] = serde_json::to_value(doc.format())?;
        value["attachments"] = serde_json::Value::Array(attachments);
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    use humansize::{format_size, BINARY};

    let plain = |list: &[MailAddress]| -> String {
        list.iter().map(MailAddress::display).collect::<Vec<_>>().join("; ")
    };

    println!();
    println!("  {:<12} {}", "Subject", header.subject.as_deref().unwrap_or(""));
    println!("  {:<12} {}", "From", plain(&header.from));
    println!("  {:<12} {}", "To", plain(&header.to));
    if !header.cc.is_empty() {
        println!("  {:<12} {}", "Cc", plain(&header.cc));
    }
    if !header.bcc.is_empty() {
        println!("  {:<12} {}", "Bcc", plain(&header.bcc));
    }
    if let Some(reply_to) = header.reply_to.as_deref().filter(|r| !r.is_empty()) {
        println!("  {:<12} {}", "Reply-To", plain(reply_to));
    }
    if let Some(date) = header.date {
        println!("  {:<12} {}", "Date", date.to_rfc2822());
    }
    println!("  {:<12} {}", "Attachments", header.attachments.len());
    for (att, name) in header.attachments.iter().zip(&names) {
        println!(
            "    {:<40} {:<30} {:>10}",
            name,
            att.mime_type(),
            format_size(att.size(), BINARY)
        );
    }
    println!();
    Ok(())
}

async fn cmd_attachments(
    path: &Path,
    output: &Path,
    include_embedded: bool,
    options: RenderOptions,
) -> anyhow::Result<()> {
    let doc = open_document(path, options).await?;
    let paths = attachment::save_attachments(&doc, output, include_embedded).await?;

    if paths.is_empty() {
        println!("  No attachments found.");
        return Ok(());
    }
    for p in &paths {
        println!("  {}", p.display());
    }
    println!(
        "  Extracted {} attachment(s) to {}",
        paths.len(),
        output.display()
    );
    Ok(())
}
