//! End-to-end tests for MSG documents through the document facade.

use std::collections::HashMap;
use std::sync::Arc;

use mail_export::options::DateFormat;
use mail_export::parser::msg::{
    CollaboratorError, CompoundReader, MsgAdapter, MsgAttachmentRef, MsgFields, MsgRecipient,
    RecipientKind, RtfDecoder,
};
use mail_export::{Document, ExportError, MailFormat, RenderOptions};

/// Returns fixed fields; attachment bytes come from `contents` when present.
struct FakeReader {
    fields: MsgFields,
    contents: HashMap<usize, Vec<u8>>,
}

impl CompoundReader for FakeReader {
    fn read_fields(&self, _buffer: &[u8]) -> Result<MsgFields, CollaboratorError> {
        Ok(self.fields.clone())
    }

    fn attachment_content(
        &self,
        _buffer: &[u8],
        attachment: &MsgAttachmentRef,
    ) -> Result<Vec<u8>, CollaboratorError> {
        Ok(self
            .contents
            .get(&attachment.id)
            .cloned()
            .unwrap_or_else(|| format!("content-{}", attachment.id).into_bytes()))
    }
}

/// Treats the compressed body as plain RTF and strips the `{\rtf1 }` wrapper.
struct FakeRtf;

impl RtfDecoder for FakeRtf {
    fn decompress(&self, compressed: &[u8]) -> Result<Vec<u8>, CollaboratorError> {
        Ok(compressed.to_vec())
    }

    fn de_encapsulate(&self, rtf: &str) -> Result<String, CollaboratorError> {
        let inner = rtf
            .strip_prefix("{\\rtf1 ")
            .and_then(|r| r.strip_suffix('}'))
            .ok_or("not an encapsulated body")?;
        Ok(inner.to_string())
    }
}

fn recipient(name: &str, email: &str, kind: RecipientKind) -> MsgRecipient {
    MsgRecipient {
        name: Some(name.into()),
        email: Some(email.into()),
        kind,
    }
}

fn fields(attachments: Vec<MsgAttachmentRef>) -> MsgFields {
    MsgFields {
        subject: Some("Quarterly report".into()),
        sender_name: Some("Alice".into()),
        sender_email: Some("a@x.com".into()),
        recipients: vec![
            recipient("Bob", "b@x.com", RecipientKind::To),
            recipient("Carol", "c@x.com", RecipientKind::Cc),
        ],
        message_delivery_time: Some("Fri, 29 Nov 2024 10:32:12 GMT".into()),
        compressed_rtf: Some(b"{\\rtf1 <p>Numbers are attached.</p>}".to_vec()),
        body: None,
        attachments,
    }
}

async fn open(fields: MsgFields, contents: HashMap<usize, Vec<u8>>, options: RenderOptions) -> Document {
    let adapter = MsgAdapter::new(Arc::new(FakeReader { fields, contents }), Arc::new(FakeRtf));
    Document::init_msg(&b"OLE"[..], Arc::new(adapter), options)
        .await
        .unwrap()
}

fn two_attachments() -> Vec<MsgAttachmentRef> {
    vec![
        MsgAttachmentRef {
            id: 3,
            file_name: None,
            mime_tag: None,
            extension: Some(".pdf".into()),
        },
        MsgAttachmentRef {
            id: 4,
            file_name: Some("report.xlsx".into()),
            mime_tag: None,
            extension: Some(".xlsx".into()),
        },
    ]
}

#[tokio::test]
async fn test_msg_renders_without_reply_to() {
    let doc = open(fields(two_attachments()), HashMap::new(), RenderOptions::default()).await;
    assert_eq!(doc.format(), MailFormat::Msg);

    let html = doc.get_as_html(None).await.unwrap();
    assert!(html.contains("<title>Quarterly report</title>"));
    assert!(html.contains("<td class=\"label\">Sent:</td><td>Friday 29 November 2024 10:32</td>"));
    assert!(html.contains("<td class=\"label\">Cc:</td>"));
    assert!(!html.contains("Reply-To:"));
    assert!(html.contains("<p>Numbers are attached.</p>"));
}

#[tokio::test]
async fn test_msg_lists_every_attachment() {
    let doc = open(fields(two_attachments()), HashMap::new(), RenderOptions::default()).await;

    assert!(doc.get_embedded().await.unwrap().is_empty());
    let only_visible = RenderOptions {
        ignore_embedded: true,
        ..Default::default()
    };
    assert_eq!(doc.get_attachments(Some(&only_visible)).await.unwrap().len(), 2);

    let html = doc.get_as_html(None).await.unwrap();
    assert!(html.contains("download=\"attachment_0.pdf\""));
    assert!(html.contains("download=\"report.xlsx\""));
}

#[tokio::test]
async fn test_msg_nested_mail_named_after_subject() {
    let attachments = vec![MsgAttachmentRef {
        id: 9,
        file_name: None,
        mime_tag: Some("message/rfc822".into()),
        extension: None,
    }];
    let nested = b"From: Heidi <h@x.com>\r\nSubject: Budget 2025\r\n\r\nFigures\r\n".to_vec();
    let doc = open(
        fields(attachments),
        HashMap::from([(9, nested)]),
        RenderOptions::default(),
    )
    .await;

    let html = doc.get_as_html(None).await.unwrap();
    assert!(html.contains("download=\"Budget 2025.eml\""));
}

#[tokio::test]
async fn test_unreadable_nested_mail_fails_render() {
    let mut attachments = two_attachments();
    attachments.push(MsgAttachmentRef {
        id: 5,
        file_name: None,
        mime_tag: Some("message/rfc822".into()),
        extension: None,
    });
    let doc = open(
        fields(attachments),
        HashMap::from([(5, b"  \r\n ".to_vec())]),
        RenderOptions::default(),
    )
    .await;

    // The header itself still reads fine.
    assert_eq!(doc.get_header(None).await.unwrap().attachments.len(), 3);

    let err = doc.get_as_html(None).await.unwrap_err();
    assert!(matches!(err, ExportError::AttachmentResolution { index: 2, .. }));
}

#[tokio::test]
async fn test_msg_date_options_apply() {
    let options = RenderOptions {
        date_format: DateFormat {
            pattern: Some("yyyy-MM-dd".into()),
            locale: None,
            time_zone: Some("Asia/Tokyo".into()),
        },
        ..Default::default()
    };
    let doc = open(fields(Vec::new()), HashMap::new(), options).await;
    let html = doc.get_as_html(None).await.unwrap();
    assert!(html.contains("<td>2024-11-29</td>"));
    assert!(html.contains("<td class=\"label\">Attachments:</td><td>/</td>"));
}
