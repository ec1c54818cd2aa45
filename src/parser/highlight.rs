//! Keyword highlighting in body HTML.
//!
//! Keywords are matched literally and only in text between tags. Tags
//! (quoted attribute values included), comments, character entities and
//! the contents of `<style>`, `<script>` and `<title>` are never rewritten.

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

use crate::error::{ExportError, Result};

/// Everything that must pass through untouched. Alternatives are tried in
/// order, so raw-text elements win over the generic tag.
static OPAQUE: LazyLock<Regex> = LazyLock::new(|| {
    let attrs = r#"(?:[^>"']|"[^"]*"|'[^']*')*"#;
    let pattern = [
        r"<!--.*?-->".to_string(),
        format!(r"<style\b{attrs}>.*?</style\s*>"),
        format!(r"<script\b{attrs}>.*?</script\s*>"),
        format!(r"<title\b{attrs}>.*?</title\s*>"),
        format!("<{attrs}>"),
        r"&(?:#[0-9]+|#[xX][0-9a-fA-F]+|[A-Za-z][A-Za-z0-9]*);".to_string(),
    ]
    .join("|");
    Regex::new(&format!("(?is){pattern}")).expect("valid markup pattern")
});

/// Wrap every occurrence of any keyword in `<mark>…</mark>`.
///
/// Keywords must already be validated (non-blank); they are escaped before
/// being compiled so user input never acts as a pattern.
pub fn highlight(html: &str, keywords: &[String], case_sensitive: bool) -> Result<String> {
    if keywords.is_empty() {
        return Ok(html.to_string());
    }

    let alternation = keywords
        .iter()
        .map(|k| regex::escape(k))
        .collect::<Vec<_>>()
        .join("|");
    let matcher = RegexBuilder::new(&alternation)
        .case_insensitive(!case_sensitive)
        .build()
        .map_err(|e| ExportError::invalid_option("highlight_keywords", e.to_string()))?;

    let mut out = String::with_capacity(html.len() + 16);
    let mut last = 0;
    for tag in OPAQUE.find_iter(html) {
        mark_text(&mut out, &html[last..tag.start()], &matcher);
        out.push_str(tag.as_str());
        last = tag.end();
    }
    mark_text(&mut out, &html[last..], &matcher);

    Ok(out)
}

fn mark_text(out: &mut String, text: &str, matcher: &Regex) {
    let mut last = 0;
    for m in matcher.find_iter(text) {
        out.push_str(&text[last..m.start()]);
        out.push_str("<mark>");
        out.push_str(m.as_str());
        out.push_str("</mark>");
        last = m.end();
    }
    out.push_str(&text[last..]);
}
