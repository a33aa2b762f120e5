use mailparse::ParsedMail;
use scraper::{Html, Node};

use crate::domain::message::{DecodedBody, RawMessage};

/// Turns a raw RFC 822 message into the plain text the extraction rules
/// run against. Never fails; the worst case is an empty body.
pub fn decode_message(raw: &RawMessage) -> DecodedBody {
    let text = match mailparse::parse_mail(&raw.bytes) {
        Ok(parsed) => {
            if parsed.subparts.is_empty() {
                single_part_text(&parsed)
            } else {
                find_part(&parsed, "text/plain")
                    .map(part_text)
                    .or_else(|| find_part(&parsed, "text/html").map(|p| flatten_html(&part_text(p))))
                    .unwrap_or_default()
            }
        }
        Err(e) => {
            log::debug!("UID {}: MIME parse failed ({e}); using raw bytes", raw.id);
            String::from_utf8_lossy(&raw.bytes).into_owned()
        }
    };
    DecodedBody { text }
}

fn single_part_text(p: &ParsedMail) -> String {
    let body = part_text(p);
    if p.ctype.mimetype.eq_ignore_ascii_case("text/html") {
        flatten_html(&body)
    } else {
        body
    }
}

/// Depth-first search for the first leaf part of the given MIME type.
fn find_part<'a>(p: &'a ParsedMail<'a>, mime: &str) -> Option<&'a ParsedMail<'a>> {
    if p.subparts.is_empty() {
        return p.ctype.mimetype.eq_ignore_ascii_case(mime).then_some(p);
    }
    p.subparts.iter().find_map(|sp| find_part(sp, mime))
}

/// Charset and transfer-encoding aware body, falling back to lossy UTF-8
/// of the raw part bytes when the declared charset can't be honoured.
fn part_text(p: &ParsedMail) -> String {
    p.get_body().unwrap_or_else(|_| {
        p.get_body_raw()
            .map(|b| String::from_utf8_lossy(&b).into_owned())
            .unwrap_or_default()
    })
}

/// Strips markup and puts every text node on its own line so that label
/// cells and value cells of notification tables stay separable.
pub fn flatten_html(html: &str) -> String {
    let doc = Html::parse_document(html);
    let mut lines: Vec<&str> = Vec::new();

    for node in doc.root_element().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let in_code = node
            .parent()
            .and_then(|parent| parent.value().as_element().map(|e| e.name()))
            .is_some_and(|name| name.eq_ignore_ascii_case("script") || name.eq_ignore_ascii_case("style"));
        if in_code {
            continue;
        }
        let line = text.trim();
        if !line.is_empty() {
            lines.push(line);
        }
    }

    lines.join("\n")
}

/// Collapses a body into a short single line, for log output.
pub fn normalize_snippet(s: &str, max_chars: usize) -> String {
    let mut out = String::new();
    for line in s.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(line);
        if out.chars().count() >= max_chars {
            break;
        }
    }
    out.chars().take(max_chars).collect()
}
