//! Formatting policy: dates (pattern, locale, time zone) and address anchors.

use chrono::{DateTime, Locale, Utc};
use chrono_tz::Tz;

use crate::error::{ExportError, Result};
use crate::model::address::MailAddress;
use crate::options::DateFormat;

/// Default date pattern: full weekday, day, month, year, hour:minute.
pub const DEFAULT_DATE_PATTERN: &str = "EEEE d MMMM yyyy HH:mm";
pub const DEFAULT_LOCALE: &str = "en-US";
pub const DEFAULT_TIME_ZONE: &str = "UTC";

/// Separator between addresses in a rendered list.
pub const ADDRESS_SEPARATOR: &str = "; ";

/// A [`DateFormat`] with every sub-field resolved and checked.
#[derive(Debug, Clone)]
pub struct DateStyle {
    strftime: String,
    locale: Locale,
    time_zone: Tz,
}

impl DateStyle {
    /// Resolve user overrides against the defaults. Each sub-field is
    /// independent: a pattern override keeps the default locale and zone.
    pub fn resolve(format: &DateFormat) -> Result<Self> {
        let pattern = format.pattern.as_deref().unwrap_or(DEFAULT_DATE_PATTERN);
        let locale = format.locale.as_deref().unwrap_or(DEFAULT_LOCALE);
        let time_zone = format.time_zone.as_deref().unwrap_or(DEFAULT_TIME_ZONE);

        Ok(Self {
            strftime: pattern_to_strftime(pattern)?,
            locale: resolve_locale(locale)?,
            time_zone: time_zone.parse::<Tz>().map_err(|_| {
                ExportError::invalid_option(
                    "date_format.time_zone",
                    format!("unknown time zone '{time_zone}'"),
                )
            })?,
        })
    }

    pub fn format(&self, date: &DateTime<Utc>) -> String {
        date.with_timezone(&self.time_zone)
            .format_localized(&self.strftime, self.locale)
            .to_string()
    }
}

/// Format a date with the given overrides (defaults for anything unset).
pub fn format_date(date: &DateTime<Utc>, format: &DateFormat) -> Result<String> {
    Ok(DateStyle::resolve(format)?.format(date))
}

/// Translate a Unicode/date-fns style pattern (`dd/MM/yyyy HH:mm`) into a
/// chrono strftime string (`%d/%m/%Y %H:%M`).
///
/// Text inside single quotes is literal; `''` is a literal quote.
pub fn pattern_to_strftime(pattern: &str) -> Result<String> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '\'' {
            if chars.get(i + 1) == Some(&'\'') {
                out.push('\'');
                i += 2;
                continue;
            }
            i += 1;
            while i < chars.len() {
                if chars[i] == '\'' {
                    if chars.get(i + 1) == Some(&'\'') {
                        out.push('\'');
                        i += 2;
                        continue;
                    }
                    break;
                }
                push_literal(&mut out, chars[i]);
                i += 1;
            }
            i += 1;
            continue;
        }

        if !c.is_ascii_alphabetic() {
            push_literal(&mut out, c);
            i += 1;
            continue;
        }

        let mut run = 1;
        while chars.get(i + run) == Some(&c) {
            run += 1;
        }
        out.push_str(token_to_strftime(c, run).ok_or_else(|| {
            ExportError::invalid_option(
                "date_format.pattern",
                format!("unsupported token '{}' in '{pattern}'", c.to_string().repeat(run)),
            )
        })?);
        i += run;
    }

    Ok(out)
}

fn push_literal(out: &mut String, c: char) {
    if c == '%' {
        out.push_str("%%");
    } else {
        out.push(c);
    }
}

fn token_to_strftime(letter: char, run: usize) -> Option<&'static str> {
    let item = match (letter, run) {
        ('y', 2) => "%y",
        ('y', _) => "%Y",
        ('M' | 'L', 1) => "%-m",
        ('M' | 'L', 2) => "%m",
        ('M' | 'L', 3) => "%b",
        ('M' | 'L', _) => "%B",
        ('d', 1) => "%-d",
        ('d', _) => "%d",
        ('E', 1..=3) => "%a",
        ('E', _) => "%A",
        ('H', 1) => "%-H",
        ('H', _) => "%H",
        ('h', 1) => "%-I",
        ('h', _) => "%I",
        ('m', 1) => "%-M",
        ('m', _) => "%M",
        ('s', 1) => "%-S",
        ('s', _) => "%S",
        ('S', _) => "%3f",
        ('a', _) => "%p",
        ('X' | 'x', 1 | 2) => "%z",
        ('X' | 'x', _) => "%:z",
        ('z', _) => "%Z",
        _ => return None,
    };
    Some(item)
}

/// Map a BCP 47 tag (`fr`, `fr-FR`, `en_US`) to a chrono locale.
fn resolve_locale(tag: &str) -> Result<Locale> {
    let normalized = tag.trim().replace('-', "_");
    let mut parts = normalized.splitn(2, '_');
    let lang = parts.next().unwrap_or("").to_ascii_lowercase();
    let region = parts.next().map(str::to_ascii_uppercase);

    let mut candidates = Vec::new();
    match region {
        Some(region) => candidates.push(format!("{lang}_{region}")),
        None => {
            candidates.push(lang.clone());
            candidates.push(format!("{lang}_{}", default_region(&lang)));
        }
    }

    candidates
        .iter()
        .find_map(|c| Locale::try_from(c.as_str()).ok())
        .ok_or_else(|| {
            ExportError::invalid_option("date_format.locale", format!("unknown locale '{tag}'"))
        })
}

/// Region used when a locale tag names only a language.
fn default_region(lang: &str) -> String {
    match lang {
        "en" => "US".into(),
        "zh" => "CN".into(),
        "sv" => "SE".into(),
        "da" => "DK".into(),
        "cs" => "CZ".into(),
        "el" => "GR".into(),
        "uk" => "UA".into(),
        "ko" => "KR".into(),
        "ja" => "JP".into(),
        "nb" => "NO".into(),
        other => other.to_ascii_uppercase(),
    }
}

/// Render one address.
///
/// With a template, `{{name}}` and `{{email}}` are replaced verbatim
/// everywhere they occur. Without one, a `mailto:` anchor whose text is the
/// name (or the address when there is no name). Blank addresses yield `None`.
pub fn format_address(address: &MailAddress, template: Option<&str>) -> Option<String> {
    if address.is_blank() {
        return None;
    }

    if let Some(template) = template {
        return Some(
            template
                .replace("{{name}}", address.name.as_deref().unwrap_or(""))
                .replace("{{email}}", address.address.as_deref().unwrap_or("")),
        );
    }

    let text = address
        .name
        .as_deref()
        .or(address.address.as_deref())
        .unwrap_or("");
    Some(match &address.address {
        Some(email) => format!(
            "<a href=\"mailto:{}\" class=\"mp_address_email\">{}</a>",
            escape_html(email),
            escape_html(text)
        ),
        None => escape_html(text),
    })
}

/// Render a list of addresses joined with `"; "`, skipping blank ones.
pub fn format_address_list(addresses: &[MailAddress], template: Option<&str>) -> String {
    addresses
        .iter()
        .filter_map(|a| format_address(a, template))
        .collect::<Vec<_>>()
        .join(ADDRESS_SEPARATOR)
}

/// Escape text for HTML element content and double-quoted attributes.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
