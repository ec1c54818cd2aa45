//! Canonical header construction from a parsed mail of either format.

use crate::classify::AttachmentClassifier;
use crate::model::mail::{Header, ParsedMail};

/// Build the canonical [`Header`] of a parsed mail.
///
/// Pure and infallible: anything the source did not provide stays `None`
/// (or empty, for address lists). With `ignore_embedded`, the attachment
/// list only holds standalone attachments.
pub fn build_header(mail: &ParsedMail, ignore_embedded: bool) -> Header {
    let attachments = AttachmentClassifier::classify_for(mail.format, &mail.attachments)
        .get_visible(ignore_embedded);

    Header {
        subject: mail.subject.clone(),
        from: mail.from.clone(),
        to: mail.to.clone(),
        cc: mail.cc.clone(),
        bcc: mail.bcc.clone(),
        reply_to: mail.reply_to.clone(),
        date: mail.date,
        attachments,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::address::MailAddress;
    use crate::model::attachment::{Attachment, Disposition};
    use crate::model::mail::MailFormat;
    use std::sync::Arc;

    fn mail(format: MailFormat) -> ParsedMail {
        ParsedMail {
            format,
            subject: Some("Hi".into()),
            from: vec![MailAddress::new(Some("Alice"), Some("a@x.com"))],
            to: Vec::new(),
            cc: Vec::new(),
            bcc: Vec::new(),
            reply_to: None,
            date: None,
            html: None,
            text_as_html: None,
            attachments: vec![
                Arc::new(Attachment::new(0, b"a".to_vec(), None, None, Disposition::Inline)),
                Arc::new(Attachment::new(1, b"b".to_vec(), None, None, Disposition::Attachment)),
            ],
        }
    }

    #[test]
    fn test_build_header_copies_fields() {
        let header = build_header(&mail(MailFormat::Eml), false);
        assert_eq!(header.subject.as_deref(), Some("Hi"));
        assert_eq!(header.from.len(), 1);
        assert!(header.to.is_empty());
        assert!(header.date.is_none());
        assert_eq!(header.attachments.len(), 2);
    }

    #[test]
    fn test_build_header_ignore_embedded() {
        let header = build_header(&mail(MailFormat::Eml), true);
        assert_eq!(header.attachments.len(), 1);
        assert_eq!(header.attachments[0].index, 1);

        // MSG attachments are all standalone.
        let header = build_header(&mail(MailFormat::Msg), true);
        assert_eq!(header.attachments.len(), 2);
    }
}
