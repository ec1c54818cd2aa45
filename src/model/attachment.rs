//! Attachment model.
//!
//! Attachments are immutable once extracted. The only late-bound piece is the
//! resolved filename, which is computed at most once per instance.

use std::sync::Arc;

use tokio::sync::OnceCell;

/// How the source presented an attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Disposition {
    /// A standalone download.
    Attachment,
    /// Referenced from the body HTML (e.g. an inline image).
    Inline,
}

/// A single attachment extracted from a mail document.
#[derive(Debug)]
pub struct Attachment {
    /// Decoded payload, exactly as extracted by the source adapter.
    pub content: Arc<[u8]>,

    /// MIME content type (e.g. `"application/pdf"`), when the source provides one.
    pub content_type: Option<String>,

    /// Filename provided by the source, if any.
    pub filename: Option<String>,

    /// Whether the attachment is standalone or inline.
    pub disposition: Disposition,

    /// Position in the original, unfiltered attachment list.
    pub index: usize,

    /// Filename chosen by the classifier. Set once, never changed.
    pub(crate) resolved_name: OnceCell<String>,
}

impl Attachment {
    pub fn new(
        index: usize,
        content: impl Into<Arc<[u8]>>,
        content_type: Option<String>,
        filename: Option<String>,
        disposition: Disposition,
    ) -> Self {
        Self {
            content: content.into(),
            content_type: content_type.filter(|ct| !ct.trim().is_empty()),
            filename: filename.filter(|name| !name.trim().is_empty()),
            disposition,
            index,
            resolved_name: OnceCell::new(),
        }
    }

    /// `true` if the attachment is embedded in the body rather than offered as a download.
    pub fn is_inline(&self) -> bool {
        self.disposition == Disposition::Inline
    }

    /// Content type to advertise in data URIs and exports.
    pub fn mime_type(&self) -> &str {
        self.content_type
            .as_deref()
            .unwrap_or("application/octet-stream")
    }

    /// Size of the decoded payload in bytes.
    pub fn size(&self) -> usize {
        self.content.len()
    }

    /// The filename assigned by the classifier, if it has been resolved already.
    pub fn resolved_filename(&self) -> Option<&str> {
        self.resolved_name.get().map(String::as_str)
    }
}
