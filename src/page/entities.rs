use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::merge::format::digits_only;
use crate::page::markup::{collapse_ws, strip_tags, MarkupNode};

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap());
static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:\+?1[-.\s]?)?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Phone,
    Email,
}

/// A phone or email occurrence inside one node's visible text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySpan {
    pub kind: EntityKind,
    pub start: usize,
    pub end: usize,
    pub text: String,
    /// Bare digits for phones (10, country code stripped), the address
    /// itself for emails.
    pub normalized: String,
}

/// A markup node plus the contact entities found in its text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedNode {
    pub node: MarkupNode,
    pub spans: Vec<EntitySpan>,
}

pub fn annotate(nodes: Vec<MarkupNode>) -> Vec<AnnotatedNode> {
    nodes
        .into_iter()
        .map(|node| {
            let spans = detect(&visible_text(&node));
            AnnotatedNode { node, spans }
        })
        .collect()
}

/// Find phones and emails in plain text. Emails are matched first and win
/// any overlap, so the digits of `a2145550100b@host.com` never surface as a
/// phone. Phone candidates touching adjacent digits (order numbers, long
/// ids) are rejected.
pub fn detect(text: &str) -> Vec<EntitySpan> {
    let mut spans: Vec<EntitySpan> = EMAIL_RE
        .find_iter(text)
        .map(|m| EntitySpan {
            kind: EntityKind::Email,
            start: m.start(),
            end: m.end(),
            text: m.as_str().to_string(),
            normalized: m.as_str().to_string(),
        })
        .collect();

    for m in PHONE_RE.find_iter(text) {
        if spans.iter().any(|s| m.start() < s.end && s.start < m.end()) {
            continue;
        }
        if digit_adjacent(text, m.start(), m.end()) {
            continue;
        }
        let digits = digits_only(m.as_str());
        let normalized = match digits.len() {
            10 => digits,
            11 if digits.starts_with('1') => digits[1..].to_string(),
            _ => continue,
        };
        spans.push(EntitySpan {
            kind: EntityKind::Phone,
            start: m.start(),
            end: m.end(),
            text: m.as_str().to_string(),
            normalized,
        });
    }

    spans.sort_by_key(|s| s.start);
    spans
}

fn digit_adjacent(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    matches!(before, Some(c) if c.is_ascii_digit()) || matches!(after, Some(c) if c.is_ascii_digit())
}

/// The text entity detection runs over, per node kind.
pub fn visible_text(node: &MarkupNode) -> String {
    match node {
        MarkupNode::Heading { text, .. } => text.clone(),
        MarkupNode::Paragraph { html } => collapse_ws(&strip_tags(html)),
        MarkupNode::List { items, .. } => items.join(" "),
        MarkupNode::Image { alt, .. } => alt.clone(),
        MarkupNode::Text(text) => text.clone(),
    }
}

/// Wrap bare email addresses in mailto anchors, leaving tags and anything
/// already inside an `<a>` untouched.
pub fn link_emails(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let bytes = html.as_bytes();
    let mut anchor_depth = 0usize;
    let mut text_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'<' && i + 1 < bytes.len() {
            let next = bytes[i + 1];
            if next.is_ascii_alphabetic() || next == b'/' || next == b'!' {
                if i > text_start {
                    push_linked(&html[text_start..i], anchor_depth == 0, &mut out);
                }
                let end = html[i..].find('>').map(|e| i + e + 1).unwrap_or(bytes.len());
                let tag = &html[i..end];
                match tag_name(tag).as_str() {
                    "a" => anchor_depth += 1,
                    "/a" => anchor_depth = anchor_depth.saturating_sub(1),
                    _ => {}
                }
                out.push_str(tag);
                i = end;
                text_start = i;
                continue;
            }
        }
        i += 1;
    }
    if bytes.len() > text_start {
        push_linked(&html[text_start..], anchor_depth == 0, &mut out);
    }
    out
}

fn push_linked(text: &str, allow: bool, out: &mut String) {
    if allow {
        out.push_str(&EMAIL_RE.replace_all(text, |caps: &Captures| {
            let email = caps.get(0).map_or("", |m| m.as_str());
            format!(r#"<a href="mailto:{}">{}</a>"#, email, email)
        }));
    } else {
        out.push_str(text);
    }
}

fn tag_name(tag: &str) -> String {
    tag.trim_start_matches('<')
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '/')
        .collect::<String>()
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(text: &str) -> Vec<(EntityKind, String)> {
        detect(text)
            .into_iter()
            .map(|s| (s.kind, s.normalized))
            .collect()
    }

    #[test]
    fn phone_formats_normalize_to_ten_digits() {
        for text in [
            "Call 214-555-0100 now",
            "Call (214) 555-0100 now",
            "Call 214.555.0100 now",
            "Call +1 214 555 0100 now",
            "Call 2145550100 now",
        ] {
            assert_eq!(
                kinds(text),
                vec![(EntityKind::Phone, "2145550100".to_string())],
                "failed on {:?}",
                text
            );
        }
    }

    #[test]
    fn eleven_digits_with_country_code() {
        for text in ["12145550100", "dial 12145550100", "dial 12145550100 today"] {
            assert_eq!(
                kinds(text),
                vec![(EntityKind::Phone, "2145550100".to_string())],
                "failed on {:?}",
                text
            );
        }
    }

    #[test]
    fn long_digit_runs_rejected() {
        assert!(detect("order 123456789012 shipped").is_empty());
    }

    #[test]
    fn seven_digit_numbers_ignored() {
        assert!(detect("call 555-0100").is_empty());
    }

    #[test]
    fn email_detected() {
        assert_eq!(
            kinds("write info@acme-plumbing.com today"),
            vec![(EntityKind::Email, "info@acme-plumbing.com".to_string())]
        );
    }

    #[test]
    fn trailing_dot_not_part_of_email() {
        let spans = detect("reach us at info@acme.com.");
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "info@acme.com");
    }

    #[test]
    fn email_wins_overlap_with_phone_digits() {
        assert_eq!(
            kinds("2145550100@textline.com"),
            vec![(EntityKind::Email, "2145550100@textline.com".to_string())]
        );
    }

    #[test]
    fn spans_sorted_by_position() {
        let spans = detect("a@b.com or 214-555-0100");
        assert_eq!(spans[0].kind, EntityKind::Email);
        assert_eq!(spans[1].kind, EntityKind::Phone);

        let spans = detect("214-555-0100 or a@b.com");
        assert_eq!(spans[0].kind, EntityKind::Phone);
        assert_eq!(spans[1].kind, EntityKind::Email);
    }

    #[test]
    fn annotate_scans_paragraph_visible_text() {
        let nodes = vec![MarkupNode::Paragraph {
            html: "Call <strong>214-555-0100</strong>".to_string(),
        }];
        let annotated = annotate(nodes);
        assert_eq!(annotated[0].spans.len(), 1);
        assert_eq!(annotated[0].spans[0].normalized, "2145550100");
    }

    #[test]
    fn link_emails_wraps_bare_address() {
        assert_eq!(
            link_emails("Contact info@acme.com today"),
            r#"Contact <a href="mailto:info@acme.com">info@acme.com</a> today"#
        );
    }

    #[test]
    fn link_emails_leaves_existing_anchor() {
        let html = r#"Write <a href="mailto:x@y.com">x@y.com</a>"#;
        assert_eq!(link_emails(html), html);
    }

    #[test]
    fn link_emails_ignores_addresses_inside_tags() {
        let html = r#"<img alt="info@acme.com"> plain"#;
        assert_eq!(link_emails(html), html);
    }
}
