//! EML adapter: maps a MIME message decoded by `mail-parser` onto [`ParsedMail`].

use std::borrow::Cow;
use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use chrono::DateTime;
use mail_parser::{Address, MessageParser, MimeHeaders, PartType};
use regex::{NoExpand, RegexBuilder};

use super::SourceAdapter;
use crate::error::{ExportError, Result};
use crate::model::address::{AddressBook, MailAddress, RawAddress};
use crate::model::attachment::{Attachment, Disposition};
use crate::model::mail::{MailFormat, ParsedMail};

/// Adapter for `.eml` (RFC 5322 / MIME) containers.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmlAdapter;

#[async_trait]
impl SourceAdapter for EmlAdapter {
    fn format(&self) -> MailFormat {
        MailFormat::Eml
    }

    async fn parse_bytes(&self, data: &[u8]) -> Result<ParsedMail> {
        parse_eml(data)
    }
}

/// Decode a raw EML message.
pub fn parse_eml(raw: &[u8]) -> Result<ParsedMail> {
    let bytes = skip_from_line(raw);
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(ExportError::EmptyDocument);
    }

    let msg = MessageParser::default()
        .parse(bytes)
        .ok_or_else(|| ExportError::Parse("input is not a MIME message".into()))?;

    let mut html = msg.html_part(0).and_then(|part| match &part.body {
        PartType::Html(html) => Some(html.to_string()),
        _ => None,
    });
    let text_as_html = if html.is_none() {
        msg.body_html(0).map(Cow::into_owned)
    } else {
        None
    };

    let mut content_ids = Vec::new();
    let attachments: Vec<Arc<Attachment>> = msg
        .attachments()
        .enumerate()
        .map(|(index, part)| {
            let content_type = part.content_type().map(|ct| match ct.subtype() {
                Some(sub) => format!("{}/{}", ct.ctype(), sub),
                None => ct.ctype().to_string(),
            });
            let disposition = match part.content_disposition() {
                Some(d) if d.ctype().eq_ignore_ascii_case("inline") => Disposition::Inline,
                Some(_) => Disposition::Attachment,
                // Parts referenced by Content-ID without a disposition are inline images.
                None if part.content_id().is_some() => Disposition::Inline,
                None => Disposition::Attachment,
            };
            let attachment = Arc::new(Attachment::new(
                index,
                part.contents().to_vec(),
                content_type,
                part.attachment_name().map(String::from),
                disposition,
            ));
            if let Some(id) = part.content_id() {
                let id = id.trim().trim_matches(['<', '>']).to_string();
                content_ids.push((id, Arc::clone(&attachment)));
            }
            attachment
        })
        .collect();

    if let Some(body) = html.as_mut() {
        inline_content_ids(body, &content_ids);
    }

    let mail = ParsedMail {
        format: MailFormat::Eml,
        subject: msg.subject().map(String::from),
        from: AddressBook::normalize(raw_addresses(msg.from())),
        to: AddressBook::normalize(raw_addresses(msg.to())),
        cc: AddressBook::normalize(raw_addresses(msg.cc())),
        bcc: AddressBook::normalize(raw_addresses(msg.bcc())),
        reply_to: msg
            .reply_to()
            .map(|addr| AddressBook::normalize(raw_addresses(Some(addr)))),
        date: msg
            .date()
            .and_then(|d| DateTime::from_timestamp(d.to_timestamp(), 0)),
        html,
        text_as_html,
        attachments,
    };

    if mail.subject.is_none()
        && mail.from.is_empty()
        && mail.to.is_empty()
        && mail.body_html().is_none_or(|b| b.trim().is_empty())
        && mail.attachments.is_empty()
    {
        return Err(ExportError::EmptyDocument);
    }

    tracing::debug!(
        subject = mail.subject.as_deref().unwrap_or(""),
        attachments = mail.attachments.len(),
        "Parsed EML message"
    );
    Ok(mail)
}

/// Replace `cid:` references with `data:` URIs built from the matching parts.
///
/// The parts stay in the attachment list; only the body stops depending on
/// the container to resolve them.
fn inline_content_ids(html: &mut String, parts: &[(String, Arc<Attachment>)]) {
    for (id, attachment) in parts {
        if id.is_empty() {
            continue;
        }
        let Ok(reference) = RegexBuilder::new(&format!("cid:{}", regex::escape(id)))
            .case_insensitive(true)
            .build()
        else {
            continue;
        };
        if !reference.is_match(html) {
            continue;
        }
        let uri = format!(
            "data:{};base64,{}",
            attachment.mime_type(),
            base64::engine::general_purpose::STANDARD.encode(&*attachment.content)
        );
        *html = reference.replace_all(html, NoExpand(&uri)).into_owned();
        tracing::trace!(content_id = %id, "Inlined embedded part");
    }
}

/// Map a `mail-parser` address header onto raw address records.
fn raw_addresses(addr: Option<&Address<'_>>) -> Vec<RawAddress> {
    match addr {
        None => Vec::new(),
        Some(Address::List(list)) => list
            .iter()
            .map(|a| RawAddress::Single(MailAddress::new(a.name.as_deref(), a.address.as_deref())))
            .collect(),
        Some(Address::Group(groups)) => groups
            .iter()
            .map(|g| RawAddress::Group {
                name: g.name.as_deref().map(String::from),
                members: g
                    .addresses
                    .iter()
                    .map(|a| MailAddress::new(a.name.as_deref(), a.address.as_deref()))
                    .collect(),
            })
            .collect(),
    }
}

/// Skip a UTF-8 BOM and a leading mbox `From ` separator line.
///
/// EML files cut out of mbox archives often keep the separator.
fn skip_from_line(data: &[u8]) -> &[u8] {
    let data = data.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(data);

    if data.starts_with(b"From ") {
        if let Some(pos) = data.iter().position(|&b| b == b'\n') {
            return &data[pos + 1..];
        }
    }
    data
}
