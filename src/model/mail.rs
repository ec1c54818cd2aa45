//! Canonical header record and the composed mail document.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::address::MailAddress;
use super::attachment::Attachment;

/// Which container format a document was parsed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MailFormat {
    /// MIME (RFC 5322) text container.
    Eml,
    /// Outlook compound-binary container.
    Msg,
}

impl MailFormat {
    /// Native file extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Eml => "eml",
            Self::Msg => "msg",
        }
    }

    /// Guess the format from a file extension (with or without the dot).
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "eml" => Some(Self::Eml),
            "msg" => Some(Self::Msg),
            _ => None,
        }
    }

    /// Resolve a MIME content type that denotes a nested mail container.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "message/rfc822" | "message/global" => Some(Self::Eml),
            "application/vnd.ms-outlook" | "application/x-ole-storage" => Some(Self::Msg),
            _ => None,
        }
    }
}

/// Canonical header of a mail, independent of the source format.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct Header {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub from: Vec<MailAddress>,
    pub to: Vec<MailAddress>,
    pub cc: Vec<MailAddress>,
    pub bcc: Vec<MailAddress>,
    /// Only EML sources carry Reply-To; always `None` for MSG.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<Vec<MailAddress>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub attachments: Vec<Arc<Attachment>>,
}

/// Everything a source adapter extracted from one container.
///
/// Built once per input stream and never modified afterwards.
#[derive(Debug)]
pub struct ParsedMail {
    pub format: MailFormat,
    pub subject: Option<String>,
    pub from: Vec<MailAddress>,
    pub to: Vec<MailAddress>,
    pub cc: Vec<MailAddress>,
    pub bcc: Vec<MailAddress>,
    pub reply_to: Option<Vec<MailAddress>>,
    pub date: Option<DateTime<Utc>>,

    /// HTML body, when the source has one.
    pub html: Option<String>,

    /// HTML derived from the plain-text body, used when `html` is absent.
    pub text_as_html: Option<String>,

    /// All attachments in source order, inline ones included.
    pub attachments: Vec<Arc<Attachment>>,
}

impl ParsedMail {
    /// The body HTML, preferring the real HTML part over the text-derived one.
    pub fn body_html(&self) -> Option<&str> {
        self.html.as_deref().or(self.text_as_html.as_deref())
    }
}

/// A header plus body HTML: the read-only input of the HTML renderer.
#[derive(Debug, Clone)]
pub struct MailDocument {
    pub format: MailFormat,
    pub header: Header,
    pub body_html: String,
}
