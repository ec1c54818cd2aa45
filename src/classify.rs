//! Attachment classification and filename assignment.
//!
//! Filenames follow a fixed precedence:
//! 1. the filename provided by the source;
//! 2. for a nested mail container, the nested subject plus its native extension;
//! 3. `attachment_<index>.<ext>` when the content type maps to an extension;
//! 4. `attachment_<index>`.
//!
//! `<index>` is the position in the unfiltered attachment list, so names do
//! not move when embedded attachments are filtered out.

use std::sync::Arc;

use futures::future::try_join_all;

use crate::error::{ExportError, Result};
use crate::model::attachment::Attachment;
use crate::model::mail::MailFormat;
use crate::parser::Adapters;

/// Maximum mail-in-mail depth that is parsed to name an attachment.
///
/// Deeper nested containers get a placeholder name instead of being parsed.
pub const MAX_NESTING_DEPTH: usize = 8;

const EXTENSIONS: &[(&str, &str)] = &[
    ("application/pdf", "pdf"),
    ("application/zip", "zip"),
    ("application/gzip", "gz"),
    ("application/x-7z-compressed", "7z"),
    ("application/json", "json"),
    ("application/xml", "xml"),
    ("application/rtf", "rtf"),
    ("application/msword", "doc"),
    ("application/vnd.ms-excel", "xls"),
    ("application/vnd.ms-powerpoint", "ppt"),
    (
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "docx",
    ),
    (
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "xlsx",
    ),
    (
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "pptx",
    ),
    ("application/vnd.oasis.opendocument.text", "odt"),
    ("application/vnd.oasis.opendocument.spreadsheet", "ods"),
    ("application/vnd.ms-outlook", "msg"),
    ("message/rfc822", "eml"),
    ("text/plain", "txt"),
    ("text/html", "html"),
    ("text/csv", "csv"),
    ("text/calendar", "ics"),
    ("text/vcard", "vcf"),
    ("image/png", "png"),
    ("image/jpeg", "jpg"),
    ("image/gif", "gif"),
    ("image/bmp", "bmp"),
    ("image/webp", "webp"),
    ("image/svg+xml", "svg"),
    ("image/tiff", "tif"),
    ("audio/mpeg", "mp3"),
    ("audio/wav", "wav"),
    ("video/mp4", "mp4"),
];

/// File extension (without dot) for a MIME content type.
pub fn extension_for_mime(content_type: &str) -> Option<&'static str> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    let essence = match essence.as_str() {
        "image/jpg" | "image/pjpeg" => "image/jpeg",
        "application/x-zip-compressed" => "application/zip",
        other => other,
    };
    EXTENSIONS
        .iter()
        .find(|(mime, _)| *mime == essence)
        .map(|(_, ext)| *ext)
}

/// MIME content type for a file extension (with or without the leading dot).
pub fn mime_for_extension(extension: &str) -> Option<&'static str> {
    let ext = extension.trim().trim_start_matches('.').to_ascii_lowercase();
    let ext = match ext.as_str() {
        "jpeg" | "jpe" => "jpg",
        "htm" => "html",
        "tiff" => "tif",
        other => other,
    };
    EXTENSIONS
        .iter()
        .find(|(_, e)| *e == ext)
        .map(|(mime, _)| *mime)
}

/// Attachments split into standalone downloads and embedded (inline) parts.
#[derive(Debug, Default)]
pub struct Classified {
    pub visible: Vec<Arc<Attachment>>,
    pub embedded: Vec<Arc<Attachment>>,
}

impl Classified {
    /// Only the visible attachments when `ignore_embedded` is set, else all of
    /// them in source order.
    pub fn get_visible(&self, ignore_embedded: bool) -> Vec<Arc<Attachment>> {
        if ignore_embedded {
            return self.visible.clone();
        }
        let mut all: Vec<_> = self.visible.iter().chain(&self.embedded).cloned().collect();
        all.sort_by_key(|a| a.index);
        all
    }
}

/// Partitions attachments and assigns their filenames.
pub struct AttachmentClassifier;

impl AttachmentClassifier {
    /// Partition with a caller-supplied "is embedded" predicate.
    pub fn classify<F>(attachments: &[Arc<Attachment>], is_embedded: F) -> Classified
    where
        F: Fn(&Attachment) -> bool,
    {
        let (embedded, visible): (Vec<_>, Vec<_>) = attachments
            .iter()
            .cloned()
            .partition(|a| is_embedded(a.as_ref()));
        Classified { visible, embedded }
    }

    /// Partition with the predicate of the given source format: EML uses the
    /// MIME disposition, MSG has no inline concept.
    pub fn classify_for(format: MailFormat, attachments: &[Arc<Attachment>]) -> Classified {
        match format {
            MailFormat::Eml => Self::classify(attachments, Attachment::is_inline),
            MailFormat::Msg => Self::classify(attachments, |_| false),
        }
    }

    /// The filename of `attachment`, assigned on first call and then reused.
    ///
    /// `depth` is the nesting depth of the document owning the attachment.
    pub async fn filename<'a>(
        attachment: &'a Attachment,
        adapters: &Adapters,
        depth: usize,
    ) -> Result<&'a str> {
        attachment
            .resolved_name
            .get_or_try_init(|| assign_filename(attachment, adapters, depth))
            .await
            .map(String::as_str)
    }

    /// Resolve the filenames of several attachments concurrently.
    ///
    /// Results come back in input order; the first failure aborts the batch.
    pub async fn filenames<'a>(
        attachments: &'a [Arc<Attachment>],
        adapters: &Adapters,
        depth: usize,
    ) -> Result<Vec<&'a str>> {
        try_join_all(
            attachments
                .iter()
                .map(|a| Self::filename(a.as_ref(), adapters, depth)),
        )
        .await
    }
}

async fn assign_filename(attachment: &Attachment, adapters: &Adapters, depth: usize) -> Result<String> {
    if let Some(name) = &attachment.filename {
        return Ok(name.clone());
    }

    let index = attachment.index;
    let content_type = attachment.content_type.as_deref();

    if let Some(format) = content_type.and_then(MailFormat::from_content_type) {
        if let Some(subject) = nested_subject(attachment, format, adapters, depth).await? {
            return Ok(format!("{subject}.{}", format.extension()));
        }
    }

    Ok(match content_type.and_then(extension_for_mime) {
        Some(ext) => format!("attachment_{index}.{ext}"),
        None => format!("attachment_{index}"),
    })
}

/// Parse a nested mail attachment just far enough to read its subject.
async fn nested_subject(
    attachment: &Attachment,
    format: MailFormat,
    adapters: &Adapters,
    depth: usize,
) -> Result<Option<String>> {
    if depth + 1 > MAX_NESTING_DEPTH {
        tracing::warn!(
            index = attachment.index,
            depth,
            "Nested mail too deep, using a placeholder name"
        );
        return Ok(None);
    }

    let adapter = match adapters.get(format) {
        Ok(adapter) => adapter,
        Err(e) => {
            tracing::debug!(index = attachment.index, error = %e, "Cannot open nested mail");
            return Ok(None);
        }
    };

    let nested = adapter
        .parse_bytes(&attachment.content)
        .await
        .map_err(|e| ExportError::AttachmentResolution {
            index: attachment.index,
            reason: e.to_string(),
        })?;

    Ok(nested
        .subject
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}
