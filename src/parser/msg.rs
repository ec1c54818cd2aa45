//! MSG adapter.
//!
//! The compound-file reader and the RTF de-encapsulator are external
//! collaborators; this module only defines their narrow contracts and maps
//! what they return onto [`ParsedMail`].

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::SourceAdapter;
use crate::classify::mime_for_extension;
use crate::error::{ExportError, Result};
use crate::format::escape_html;
use crate::model::address::{AddressBook, MailAddress, RawAddress};
use crate::model::attachment::{Attachment, Disposition};
use crate::model::mail::{MailFormat, ParsedMail};

/// Error type returned by collaborator implementations.
pub type CollaboratorError = Box<dyn std::error::Error + Send + Sync>;

/// Recipient class of an MSG recipient record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipientKind {
    To,
    Cc,
    Bcc,
}

#[derive(Debug, Clone)]
pub struct MsgRecipient {
    pub name: Option<String>,
    pub email: Option<String>,
    pub kind: RecipientKind,
}

/// Reference to an attachment inside the compound file.
#[derive(Debug, Clone, Default)]
pub struct MsgAttachmentRef {
    /// Reader-specific handle.
    pub id: usize,
    pub file_name: Option<String>,
    /// `attachMimeTag`, when the producer set one.
    pub mime_tag: Option<String>,
    /// File extension including the dot, e.g. `".pdf"`.
    pub extension: Option<String>,
}

/// Fields read from an MSG compound file.
#[derive(Debug, Clone, Default)]
pub struct MsgFields {
    pub subject: Option<String>,
    pub sender_name: Option<String>,
    pub sender_email: Option<String>,
    pub recipients: Vec<MsgRecipient>,
    /// Delivery time as stored by the reader (RFC 2822 or RFC 3339).
    pub message_delivery_time: Option<String>,
    /// LZFu-compressed RTF body.
    pub compressed_rtf: Option<Vec<u8>>,
    /// Plain-text body, used when there is no RTF body.
    pub body: Option<String>,
    pub attachments: Vec<MsgAttachmentRef>,
}

/// Reads an Outlook compound file.
pub trait CompoundReader: Send + Sync {
    fn read_fields(&self, buffer: &[u8]) -> std::result::Result<MsgFields, CollaboratorError>;

    fn attachment_content(
        &self,
        buffer: &[u8],
        attachment: &MsgAttachmentRef,
    ) -> std::result::Result<Vec<u8>, CollaboratorError>;
}

/// Decompresses and de-encapsulates RTF bodies.
pub trait RtfDecoder: Send + Sync {
    fn decompress(&self, compressed: &[u8]) -> std::result::Result<Vec<u8>, CollaboratorError>;

    /// Extract the HTML (or plain text) wrapped in an RTF document.
    fn de_encapsulate(&self, rtf: &str) -> std::result::Result<String, CollaboratorError>;
}

/// Adapter for `.msg` containers.
#[derive(Clone)]
pub struct MsgAdapter {
    reader: Arc<dyn CompoundReader>,
    rtf: Arc<dyn RtfDecoder>,
}

impl MsgAdapter {
    pub fn new(reader: Arc<dyn CompoundReader>, rtf: Arc<dyn RtfDecoder>) -> Self {
        Self { reader, rtf }
    }

    fn decode_body(&self, fields: &MsgFields) -> Result<(Option<String>, Option<String>)> {
        if let Some(compressed) = fields.compressed_rtf.as_deref().filter(|c| !c.is_empty()) {
            let raw = self
                .rtf
                .decompress(compressed)
                .map_err(|e| ExportError::Parse(format!("RTF decompression failed: {e}")))?;
            let rtf: String = raw.iter().map(|&b| char::from(b)).collect();
            let html = self
                .rtf
                .de_encapsulate(&rtf)
                .map_err(|e| ExportError::Parse(format!("RTF de-encapsulation failed: {e}")))?;
            return Ok((Some(html), None));
        }
        Ok((None, fields.body.as_deref().map(text_to_html)))
    }
}

#[async_trait]
impl SourceAdapter for MsgAdapter {
    fn format(&self) -> MailFormat {
        MailFormat::Msg
    }

    async fn parse_bytes(&self, data: &[u8]) -> Result<ParsedMail> {
        if data.is_empty() {
            return Err(ExportError::EmptyDocument);
        }

        let fields = self
            .reader
            .read_fields(data)
            .map_err(|e| ExportError::Parse(e.to_string()))?;

        let (html, text_as_html) = self.decode_body(&fields)?;

        let mut attachments = Vec::with_capacity(fields.attachments.len());
        for (index, reference) in fields.attachments.iter().enumerate() {
            let content = self
                .reader
                .attachment_content(data, reference)
                .map_err(|e| ExportError::Parse(format!("attachment #{index}: {e}")))?;
            let content_type = reference.mime_tag.clone().or_else(|| {
                reference
                    .extension
                    .as_deref()
                    .and_then(mime_for_extension)
                    .map(String::from)
            });
            attachments.push(Arc::new(Attachment::new(
                index,
                content,
                content_type,
                reference.file_name.clone(),
                // MSG has no inline concept: everything is a standalone attachment.
                Disposition::Attachment,
            )));
        }

        let recipients = |kind: RecipientKind| {
            AddressBook::normalize(
                fields
                    .recipients
                    .iter()
                    .filter(|r| r.kind == kind)
                    .map(|r| {
                        RawAddress::Single(MailAddress::new(r.name.as_deref(), r.email.as_deref()))
                    }),
            )
        };

        let mail = ParsedMail {
            format: MailFormat::Msg,
            subject: fields.subject.clone().filter(|s| !s.is_empty()),
            from: AddressBook::normalize([RawAddress::Single(MailAddress::new(
                fields.sender_name.as_deref(),
                fields.sender_email.as_deref(),
            ))]),
            to: recipients(RecipientKind::To),
            cc: recipients(RecipientKind::Cc),
            bcc: recipients(RecipientKind::Bcc),
            reply_to: None,
            date: fields
                .message_delivery_time
                .as_deref()
                .and_then(parse_delivery_time),
            html,
            text_as_html,
            attachments,
        };

        if mail.subject.is_none()
            && mail.from.is_empty()
            && mail.to.is_empty()
            && mail.body_html().is_none()
            && mail.attachments.is_empty()
        {
            return Err(ExportError::EmptyDocument);
        }

        tracing::debug!(
            subject = mail.subject.as_deref().unwrap_or(""),
            attachments = mail.attachments.len(),
            "Parsed MSG message"
        );
        Ok(mail)
    }
}

/// Parse a delivery time in either RFC 2822 or RFC 3339 form.
fn parse_delivery_time(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Minimal HTML rendition of a plain-text body.
fn text_to_html(text: &str) -> String {
    escape_html(text)
        .replace("\r\n", "\n")
        .split('\n')
        .collect::<Vec<_>>()
        .join("<br/>")
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeReader {
        fields: MsgFields,
    }

    impl CompoundReader for FakeReader {
        fn read_fields(&self, buffer: &[u8]) -> std::result::Result<MsgFields, CollaboratorError> {
            if buffer.starts_with(b"BAD") {
                return Err("not a compound file".into());
            }
            Ok(self.fields.clone())
        }

        fn attachment_content(
            &self,
            _buffer: &[u8],
            attachment: &MsgAttachmentRef,
        ) -> std::result::Result<Vec<u8>, CollaboratorError> {
            Ok(format!("content-{}", attachment.id).into_bytes())
        }
    }

    struct FakeRtf;

    impl RtfDecoder for FakeRtf {
        fn decompress(&self, compressed: &[u8]) -> std::result::Result<Vec<u8>, CollaboratorError> {
            Ok(compressed.to_vec())
        }

        fn de_encapsulate(&self, rtf: &str) -> std::result::Result<String, CollaboratorError> {
            Ok(format!("<html>{rtf}</html>"))
        }
    }

    fn adapter(fields: MsgFields) -> MsgAdapter {
        MsgAdapter::new(Arc::new(FakeReader { fields }), Arc::new(FakeRtf))
    }

    fn sample_fields() -> MsgFields {
        MsgFields {
            subject: Some("Quarterly report".into()),
            sender_name: Some("Alice".into()),
            sender_email: Some("a@x.com".into()),
            recipients: vec![
                MsgRecipient {
                    name: Some("Bob".into()),
                    email: Some("b@x.com".into()),
                    kind: RecipientKind::To,
                },
                MsgRecipient {
                    name: Some("Carol".into()),
                    email: Some("c@x.com".into()),
                    kind: RecipientKind::Cc,
                },
                MsgRecipient {
                    name: Some("Bob".into()),
                    email: Some("b@x.com".into()),
                    kind: RecipientKind::To,
                },
            ],
            message_delivery_time: Some("Fri, 29 Nov 2024 10:32:12 GMT".into()),
            compressed_rtf: Some(b"{\\rtf1 body}".to_vec()),
            body: None,
            attachments: vec![MsgAttachmentRef {
                id: 7,
                file_name: None,
                mime_tag: None,
                extension: Some(".pdf".into()),
            }],
        }
    }

    #[tokio::test]
    async fn test_msg_fields_mapping() {
        let mail = adapter(sample_fields()).parse_bytes(b"OLE").await.unwrap();
        assert_eq!(mail.format, MailFormat::Msg);
        assert_eq!(mail.subject.as_deref(), Some("Quarterly report"));
        assert_eq!(mail.from[0].name.as_deref(), Some("Alice"));
        assert_eq!(mail.to.len(), 1);
        assert_eq!(mail.cc[0].address.as_deref(), Some("c@x.com"));
        assert!(mail.bcc.is_empty());
        assert!(mail.reply_to.is_none());
        assert_eq!(mail.html.as_deref(), Some("<html>{\\rtf1 body}</html>"));
        assert_eq!(mail.date.unwrap().to_rfc3339(), "2024-11-29T10:32:12+00:00");

        let att = &mail.attachments[0];
        assert_eq!(&*att.content, b"content-7");
        assert_eq!(att.content_type.as_deref(), Some("application/pdf"));
        assert_eq!(att.disposition, Disposition::Attachment);
    }

    #[tokio::test]
    async fn test_msg_plain_body_fallback() {
        let fields = MsgFields {
            compressed_rtf: None,
            body: Some("line 1\r\nline <2>".into()),
            ..sample_fields()
        };
        let mail = adapter(fields).parse_bytes(b"OLE").await.unwrap();
        assert!(mail.html.is_none());
        assert_eq!(mail.body_html(), Some("line 1<br/>line &lt;2&gt;"));
    }

    #[tokio::test]
    async fn test_msg_reader_failure_is_parse_error() {
        let err = adapter(sample_fields()).parse_bytes(b"BAD").await.unwrap_err();
        assert!(matches!(err, ExportError::Parse(_)));
    }

    #[tokio::test]
    async fn test_msg_empty() {
        let err = adapter(MsgFields::default())
            .parse_bytes(b"OLE")
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::EmptyDocument));

        let err = adapter(sample_fields()).parse_bytes(b"").await.unwrap_err();
        assert!(matches!(err, ExportError::EmptyDocument));
    }

    #[test]
    fn test_parse_delivery_time_rfc3339() {
        let dt = parse_delivery_time("2024-11-29T10:32:12.671Z").unwrap();
        assert_eq!(dt.timestamp(), 1_732_876_332);
    }
}
