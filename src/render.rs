//! HTML assembly: header table, attachment links and body.
//!
//! The renderer only sees the canonical [`MailDocument`]; it never touches
//! the source container. Output is a pure function of the document, the
//! resolved attachment names and the options.

use std::fmt::Write as _;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::error::Result;
use crate::format::{escape_html, format_address_list, DateStyle};
use crate::model::attachment::Attachment;
use crate::model::mail::MailDocument;
use crate::options::{ExcludeHeader, RenderOptions};

/// Title used when the mail has no subject.
pub const DEFAULT_TITLE: &str = "Email";

/// Closes the header table.
const END: &str = "</table><br>";

/// Built-in stylesheet, replaced wholesale by `custom_style`.
pub const DEFAULT_STYLE: &str = r#"@font-face {
	font-family:"Cambria Math";
	panose-1:2 4 5 3 5 4 6 3 2 4;
}
@font-face {
	font-family:Aptos;
	panose-1:2 11 0 4 2 2 2 2 2 4;
}
body, html {
	font-family: Aptos, Arial, "Cambria Math", sans-serif;
}
.header {
	font-weight: bold;
	font-size: 18px;
}
.underline {
	border-bottom: 5px solid black;
	margin: 0 0 0.3rem 0;
}
.email-info {
	width: 100%;
	border-collapse: collapse;
}
.label {
	font-weight: bold;
	width: 100px;
	vertical-align: top;
	padding-right: 2em;
}"#;

/// An attachment paired with the filename the classifier assigned to it.
#[derive(Debug, Clone, Copy)]
pub struct AttachmentEntry<'a> {
    pub attachment: &'a Attachment,
    pub filename: &'a str,
}

/// The attachments that belong in the attachments row, or `None` when the
/// row is excluded. With `embedded_attachments` excluded only standalone
/// attachments are listed; inline ones stay referenced from the body.
pub fn listed_attachments(
    attachments: &[Arc<Attachment>],
    exclude: &ExcludeHeader,
) -> Option<Vec<Arc<Attachment>>> {
    if exclude.attachments {
        return None;
    }
    Some(
        attachments
            .iter()
            .filter(|a| !(exclude.embedded_attachments && a.is_inline()))
            .cloned()
            .collect(),
    )
}

/// Renders a [`MailDocument`] with one set of options.
pub struct HtmlRenderer<'o> {
    options: &'o RenderOptions,
    date_style: DateStyle,
}

impl<'o> HtmlRenderer<'o> {
    /// Resolve the date style up front so a bad option fails before any output.
    pub fn new(options: &'o RenderOptions) -> Result<Self> {
        Ok(Self {
            options,
            date_style: DateStyle::resolve(&options.date_format)?,
        })
    }

    /// Assemble the full HTML document.
    ///
    /// `attachments` is the attachments row content (see
    /// [`listed_attachments`]); `None` omits the row.
    pub fn render(&self, doc: &MailDocument, attachments: Option<&[AttachmentEntry<'_>]>) -> String {
        let exclude = &self.options.exclude_header;
        let template = self.options.format_email_address.as_deref();
        let header = &doc.header;

        let mut html = String::with_capacity(doc.body_html.len() + 4096);
        html.push_str("<!DOCTYPE html>\n<html>\n");
        self.push_head(&mut html, header.subject.as_deref());
        html.push_str("<body>\n");

        // Sender block
        let from = if exclude.from {
            String::new()
        } else {
            format_address_list(&header.from, template)
        };
        if !from.is_empty() {
            let _ = write!(
                html,
                "<div class=\"header\">{from}</div><div class=\"underline\"></div>"
            );
        }
        html.push_str("<table class=\"email-info\">");

        if !exclude.date {
            let date = header
                .date
                .as_ref()
                .map(|d| escape_html(&self.date_style.format(d)))
                .unwrap_or_default();
            push_row(&mut html, "Sent:", &date);
        }
        if !exclude.to {
            push_row(&mut html, "To:", &format_address_list(&header.to, template));
        }
        if !exclude.cc {
            push_row(&mut html, "Cc:", &format_address_list(&header.cc, template));
        }
        if !exclude.bcc {
            push_row(&mut html, "Bcc:", &format_address_list(&header.bcc, template));
        }

        if let Some(entries) = attachments {
            let links = entries
                .iter()
                .map(attachment_link)
                .collect::<Vec<_>>()
                .join("<br>");
            let cell = if links.is_empty() { "/" } else { links.as_str() };
            push_row(&mut html, "Attachments:", cell);
        }

        if let Some(reply_to) = header.reply_to.as_deref().filter(|r| !r.is_empty()) {
            if !exclude.reply_to {
                push_row(&mut html, "Reply-To:", &format_address_list(reply_to, template));
            }
        }

        if let Some(subject) = header.subject.as_deref().filter(|s| !s.is_empty()) {
            if !exclude.subject {
                push_row(&mut html, "Subject:", &escape_html(subject));
            }
        }

        html.push_str(END);
        let _ = write!(html, "<p>{}</p>\n</body>\n</html>\n", doc.body_html);
        html
    }

    fn push_head(&self, html: &mut String, subject: Option<&str>) {
        let title = subject
            .filter(|s| !s.is_empty())
            .map_or_else(|| DEFAULT_TITLE.to_string(), escape_html);
        let style = self.options.custom_style.as_deref().unwrap_or(DEFAULT_STYLE);
        let _ = write!(
            html,
            "<head>\n<title>{title}</title>\n\
             <meta http-equiv=\"Content-Type\" content=\"text/html; charset=utf-8\">\n\
             <style>\n{style}\n</style>\n</head>\n"
        );
    }
}

fn push_row(html: &mut String, label: &str, value: &str) {
    let _ = write!(
        html,
        "<tr><td class=\"label\">{label}</td><td>{value}</td></tr>"
    );
}

/// A download anchor carrying the attachment bytes as a data URI.
fn attachment_link(entry: &AttachmentEntry<'_>) -> String {
    let name = escape_html(entry.filename);
    format!(
        "<a href=\"data:{};base64,{}\" download=\"{name}\">{name}</a>",
        escape_html(entry.attachment.mime_type()),
        STANDARD.encode(&entry.attachment.content),
    )
}
