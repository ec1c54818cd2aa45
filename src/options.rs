//! Parse and render options.
//!
//! One closed set of optional fields, validated once at the boundary. Field
//! names are snake_case (TOML config); camelCase aliases accept the JSON
//! option bags produced by other tooling.

use serde::{Deserialize, Serialize};

use crate::error::{ExportError, Result};
use crate::format::DateStyle;

/// Header sections that can be left out of the rendered HTML.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExcludeHeader {
    pub to: bool,
    pub cc: bool,
    pub bcc: bool,
    pub from: bool,
    pub date: bool,
    pub subject: bool,
    #[serde(alias = "replyTo")]
    pub reply_to: bool,
    /// Drops the whole attachments row.
    pub attachments: bool,
    /// Lists only standalone attachments; inline ones stay in the body.
    #[serde(alias = "embeddedAttachments")]
    pub embedded_attachments: bool,
}

impl ExcludeHeader {
    /// Parse a header section name as used on the command line.
    pub fn set(&mut self, field: &str) -> Result<()> {
        let flag = match field.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "to" => &mut self.to,
            "cc" => &mut self.cc,
            "bcc" => &mut self.bcc,
            "from" => &mut self.from,
            "date" => &mut self.date,
            "subject" => &mut self.subject,
            "replyto" => &mut self.reply_to,
            "attachments" => &mut self.attachments,
            "embeddedattachments" | "embedded" => &mut self.embedded_attachments,
            _ => {
                return Err(ExportError::invalid_option(
                    "exclude_header",
                    format!("unknown header field '{field}'"),
                ))
            }
        };
        *flag = true;
        Ok(())
    }
}

/// Date formatting overrides. Unset fields fall back to the defaults
/// independently of each other.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DateFormat {
    /// Unicode-style pattern, e.g. `"dd/MM/yyyy HH:mm"`.
    #[serde(alias = "format", skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// BCP 47 style locale, e.g. `"fr"` or `"en-US"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    /// IANA time zone name, e.g. `"Europe/Paris"`.
    #[serde(alias = "timeZone", skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

/// Options controlling parsing side effects and HTML rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Only expose standalone attachments from `get_attachments` and the header.
    #[serde(alias = "ignoreEmbedded")]
    pub ignore_embedded: bool,

    #[serde(alias = "excludeHeader")]
    pub exclude_header: ExcludeHeader,

    /// Replaces the built-in stylesheet.
    #[serde(alias = "customStyle", skip_serializing_if = "Option::is_none")]
    pub custom_style: Option<String>,

    /// Address template with `{{name}}` and `{{email}}` placeholders.
    #[serde(alias = "formatEmailAddress", skip_serializing_if = "Option::is_none")]
    pub format_email_address: Option<String>,

    #[serde(alias = "dateFormat")]
    pub date_format: DateFormat,

    /// Words wrapped in `<mark>` in the body HTML. Matched literally.
    #[serde(alias = "highlightKeywords")]
    pub highlight_keywords: Vec<String>,

    #[serde(alias = "highlightCaseSensitive")]
    pub highlight_case_sensitive: bool,
}

impl RenderOptions {
    /// Deserialize and validate a JSON option bag.
    ///
    /// Any shape error (a keyword that is not a string, an unknown type for
    /// a flag) is reported as [`ExportError::InvalidOption`].
    pub fn from_json(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)
            .map_err(|e| ExportError::invalid_option("options", e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    /// Check every option before any stream is read or pattern compiled.
    pub fn validate(&self) -> Result<()> {
        if let Some(pos) = self
            .highlight_keywords
            .iter()
            .position(|k| k.trim().is_empty())
        {
            return Err(ExportError::invalid_option(
                "highlight_keywords",
                format!("keyword #{pos} is empty"),
            ));
        }
        DateStyle::resolve(&self.date_format)?;
        Ok(())
    }

    /// `true` if both option sets would highlight the body identically.
    pub(crate) fn same_highlight(&self, other: &Self) -> bool {
        self.highlight_keywords == other.highlight_keywords
            && self.highlight_case_sensitive == other.highlight_case_sensitive
    }
}
