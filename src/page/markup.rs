use std::sync::LazyLock;

use regex::Regex;

static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([A-Za-z][A-Za-z0-9-]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#).unwrap()
});

/// One block-level node of the source markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupNode {
    Heading { level: u8, text: String },
    Paragraph { html: String },
    List { ordered: bool, items: Vec<String> },
    Image { src: String, alt: String },
    /// Text (or inline markup) found outside any block tag.
    Text(String),
}

#[derive(Debug)]
enum Tok {
    Open { name: String, attrs: String, raw: String },
    Close { name: String, raw: String },
    Text { raw: String },
}

/// Parse markup into block nodes. Tolerant by construction: unclosed tags
/// close implicitly, unknown tags are dropped while their text flows
/// through, stray `<` stays literal text. Never fails.
pub fn parse(html: &str) -> Vec<MarkupNode> {
    let toks = tokenize(html);
    let mut nodes = Vec::new();
    let mut inline = String::new();
    let mut i = 0;

    while i < toks.len() {
        match &toks[i] {
            Tok::Open { name, attrs, .. } => {
                let name = name.as_str();
                if let Some(level) = heading_level(name) {
                    flush_inline(&mut inline, &mut nodes);
                    let (inner, next) = collect_inner(&toks, i + 1, name);
                    let text = collapse_ws(&strip_tags(&inner));
                    nodes.push(MarkupNode::Heading { level, text });
                    i = next;
                } else if name == "p" {
                    flush_inline(&mut inline, &mut nodes);
                    let (inner, next) = collect_inner(&toks, i + 1, name);
                    nodes.push(MarkupNode::Paragraph { html: inner.trim().to_string() });
                    i = next;
                } else if name == "ul" || name == "ol" {
                    flush_inline(&mut inline, &mut nodes);
                    let ordered = name == "ol";
                    let (items, next) = collect_list_items(&toks, i + 1);
                    nodes.push(MarkupNode::List { ordered, items });
                    i = next;
                } else if name == "img" {
                    flush_inline(&mut inline, &mut nodes);
                    nodes.push(MarkupNode::Image {
                        src: attr_value(attrs, "src").unwrap_or_default(),
                        alt: attr_value(attrs, "alt").unwrap_or_default(),
                    });
                    i += 1;
                } else if name == "script" || name == "style" {
                    flush_inline(&mut inline, &mut nodes);
                    i = skip_past_close(&toks, i + 1, name);
                } else if name == "br" {
                    inline.push(' ');
                    i += 1;
                } else if is_block(name) {
                    flush_inline(&mut inline, &mut nodes);
                    i += 1;
                } else {
                    // inline tag, content arrives as its own text tokens
                    i += 1;
                }
            }
            Tok::Close { name, .. } => {
                if is_block(name.as_str()) {
                    flush_inline(&mut inline, &mut nodes);
                }
                i += 1;
            }
            Tok::Text { raw } => {
                inline.push_str(raw);
                i += 1;
            }
        }
    }

    flush_inline(&mut inline, &mut nodes);
    nodes
}

fn flush_inline(inline: &mut String, nodes: &mut Vec<MarkupNode>) {
    let text = collapse_ws(&decode_entities(inline));
    inline.clear();
    if !text.is_empty() {
        nodes.push(MarkupNode::Text(text));
    }
}

/// Accumulate raw inner markup until the matching close tag. A new block
/// open before the close acts as an implicit close and is not consumed;
/// stray closes of other block tags are dropped, not embedded.
fn collect_inner(toks: &[Tok], start: usize, until: &str) -> (String, usize) {
    let mut inner = String::new();
    let mut i = start;
    while i < toks.len() {
        match &toks[i] {
            Tok::Close { name, .. } if name.as_str() == until => return (inner, i + 1),
            Tok::Open { name, .. } if name == "script" || name == "style" => {
                i = skip_past_close(toks, i + 1, name);
            }
            Tok::Open { name, .. } if is_block(name.as_str()) => return (inner, i),
            Tok::Close { name, .. } if is_block(name.as_str()) => i += 1,
            Tok::Open { raw, .. } | Tok::Close { raw, .. } | Tok::Text { raw } => {
                inner.push_str(raw);
                i += 1;
            }
        }
    }
    (inner, i)
}

/// Collect `<li>` texts, flattening nested lists into the same item run.
/// A heading open inside the list is treated as the list ending early.
fn collect_list_items(toks: &[Tok], start: usize) -> (Vec<String>, usize) {
    let mut items = Vec::new();
    let mut cur = String::new();
    let mut depth = 1usize;
    let mut i = start;

    while i < toks.len() {
        match &toks[i] {
            Tok::Open { name, .. } => {
                let name = name.as_str();
                if name == "ul" || name == "ol" {
                    depth += 1;
                } else if name == "li" {
                    push_item(&mut items, &mut cur);
                } else if name == "script" || name == "style" {
                    i = skip_past_close(toks, i + 1, name);
                    continue;
                } else if name == "br" {
                    cur.push(' ');
                } else if heading_level(name).is_some() {
                    push_item(&mut items, &mut cur);
                    return (items, i);
                }
            }
            Tok::Close { name, .. } => {
                let name = name.as_str();
                if name == "ul" || name == "ol" {
                    depth -= 1;
                    if depth == 0 {
                        push_item(&mut items, &mut cur);
                        return (items, i + 1);
                    }
                } else if name == "li" {
                    push_item(&mut items, &mut cur);
                }
            }
            Tok::Text { raw } => cur.push_str(raw),
        }
        i += 1;
    }

    push_item(&mut items, &mut cur);
    (items, i)
}

fn push_item(items: &mut Vec<String>, cur: &mut String) {
    let text = collapse_ws(&decode_entities(cur));
    cur.clear();
    if !text.is_empty() {
        items.push(text);
    }
}

fn skip_past_close(toks: &[Tok], start: usize, until: &str) -> usize {
    let mut i = start;
    while i < toks.len() {
        if let Tok::Close { name, .. } = &toks[i] {
            if name.as_str() == until {
                return i + 1;
            }
        }
        i += 1;
    }
    i
}

fn tokenize(html: &str) -> Vec<Tok> {
    let bytes = html.as_bytes();
    let mut toks = Vec::new();
    let mut text_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'<' {
            i += 1;
            continue;
        }
        let rest = &html[i..];

        if rest.starts_with("<!--") {
            flush_text(html, text_start, i, &mut toks);
            i = match rest.find("-->") {
                Some(end) => i + end + 3,
                None => bytes.len(),
            };
            text_start = i;
        } else if rest.starts_with("<!") || rest.starts_with("<?") {
            flush_text(html, text_start, i, &mut toks);
            i = match rest.find('>') {
                Some(end) => i + end + 1,
                None => bytes.len(),
            };
            text_start = i;
        } else if rest.starts_with("</") {
            let name: String = rest[2..]
                .chars()
                .take_while(|c| c.is_ascii_alphanumeric())
                .collect();
            match rest.find('>') {
                Some(end) if !name.is_empty() => {
                    flush_text(html, text_start, i, &mut toks);
                    toks.push(Tok::Close {
                        name: name.to_ascii_lowercase(),
                        raw: rest[..end + 1].to_string(),
                    });
                    i += end + 1;
                    text_start = i;
                }
                _ => i += 1,
            }
        } else if i + 1 < bytes.len() && bytes[i + 1].is_ascii_alphabetic() {
            match open_tag_end(bytes, i + 1) {
                Some(end) => {
                    flush_text(html, text_start, i, &mut toks);
                    let raw = &html[i..=end];
                    let content = raw[1..raw.len() - 1].trim_end_matches('/').trim();
                    let split = content
                        .find(|c: char| c.is_whitespace())
                        .unwrap_or(content.len());
                    toks.push(Tok::Open {
                        name: content[..split].to_ascii_lowercase(),
                        attrs: content[split..].trim().to_string(),
                        raw: raw.to_string(),
                    });
                    i = end + 1;
                    text_start = i;
                }
                None => i += 1,
            }
        } else {
            // lone '<', keep as text
            i += 1;
        }
    }

    flush_text(html, text_start, bytes.len(), &mut toks);
    toks
}

fn flush_text(html: &str, start: usize, end: usize, toks: &mut Vec<Tok>) {
    if end > start {
        toks.push(Tok::Text { raw: html[start..end].to_string() });
    }
}

/// Find the `>` ending an open tag, ignoring `>` inside quoted attributes.
fn open_tag_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut quote: Option<u8> = None;
    let mut i = start;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'"' || b == b'\'' => quote = Some(b),
            None if b == b'>' => return Some(i),
            None => {}
        }
        i += 1;
    }
    None
}

fn attr_value(attrs: &str, want: &str) -> Option<String> {
    for caps in ATTR_RE.captures_iter(attrs) {
        if caps[1].eq_ignore_ascii_case(want) {
            let value = caps.get(2).or_else(|| caps.get(3)).or_else(|| caps.get(4));
            return Some(decode_entities(value.map_or("", |m| m.as_str())));
        }
    }
    None
}

fn heading_level(name: &str) -> Option<u8> {
    match name {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}

fn is_block(name: &str) -> bool {
    matches!(
        name,
        "p" | "ul"
            | "ol"
            | "li"
            | "img"
            | "div"
            | "section"
            | "article"
            | "main"
            | "header"
            | "footer"
            | "nav"
            | "aside"
            | "table"
            | "blockquote"
            | "figure"
            | "form"
            | "hr"
    ) || heading_level(name).is_some()
}

/// Remove tags and decode entities, leaving visible text.
pub fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let bytes = html.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'<' && i + 1 < bytes.len() {
            let next = bytes[i + 1];
            if html[i..].starts_with("<!--") {
                i = match html[i..].find("-->") {
                    Some(end) => i + end + 3,
                    None => bytes.len(),
                };
                continue;
            }
            if next.is_ascii_alphabetic() || next == b'/' || next == b'!' || next == b'?' {
                i = match html[i..].find('>') {
                    Some(end) => i + end + 1,
                    None => bytes.len(),
                };
                out.push(' ');
                continue;
            }
        }
        let ch = html[i..].chars().next().unwrap_or(' ');
        out.push(ch);
        i += ch.len_utf8();
    }
    decode_entities(&out)
}

/// Decode the common named entities plus numeric character references.
/// Anything unrecognized stays literal.
pub fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        match tail.find(';') {
            Some(semi) if semi > 1 && semi <= 10 => match decode_entity(&tail[1..semi]) {
                Some(decoded) => {
                    out.push_str(&decoded);
                    rest = &tail[semi + 1..];
                }
                None => {
                    out.push('&');
                    rest = &tail[1..];
                }
            },
            _ => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(body: &str) -> Option<String> {
    match body {
        "amp" => Some("&".to_string()),
        "lt" => Some("<".to_string()),
        "gt" => Some(">".to_string()),
        "quot" => Some("\"".to_string()),
        "apos" => Some("'".to_string()),
        "nbsp" => Some(" ".to_string()),
        _ => {
            let num = body.strip_prefix('#')?;
            let code = match num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse::<u32>().ok()?,
            };
            char::from_u32(code).map(|c| c.to_string())
        }
    }
}

/// Collapse runs of whitespace to single spaces and trim the ends.
pub fn collapse_ws(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_blocks() {
        let nodes = parse("<h1>Acme Plumbing</h1><p>We fix pipes.</p><ul><li>Repairs</li><li>Installs</li></ul>");
        assert_eq!(
            nodes,
            vec![
                MarkupNode::Heading { level: 1, text: "Acme Plumbing".to_string() },
                MarkupNode::Paragraph { html: "We fix pipes.".to_string() },
                MarkupNode::List {
                    ordered: false,
                    items: vec!["Repairs".to_string(), "Installs".to_string()],
                },
            ]
        );
    }

    #[test]
    fn heading_text_is_tag_stripped() {
        let nodes = parse("<h2>Our <em>Services</em></h2>");
        assert_eq!(nodes, vec![MarkupNode::Heading { level: 2, text: "Our Services".to_string() }]);
    }

    #[test]
    fn paragraph_keeps_inline_markup() {
        let nodes = parse("<p>Call <strong>now</strong> for help</p>");
        assert_eq!(
            nodes,
            vec![MarkupNode::Paragraph { html: "Call <strong>now</strong> for help".to_string() }]
        );
    }

    #[test]
    fn stray_block_close_dropped_from_paragraph() {
        let nodes = parse("<div><p>kept text</div>");
        assert_eq!(nodes, vec![MarkupNode::Paragraph { html: "kept text".to_string() }]);

        let nodes = parse("<p>lede</section> tail");
        assert_eq!(nodes, vec![MarkupNode::Paragraph { html: "lede tail".to_string() }]);
    }

    #[test]
    fn unclosed_paragraph_closes_implicitly() {
        let nodes = parse("<p>first<p>second");
        assert_eq!(
            nodes,
            vec![
                MarkupNode::Paragraph { html: "first".to_string() },
                MarkupNode::Paragraph { html: "second".to_string() },
            ]
        );
    }

    #[test]
    fn unclosed_heading_ends_at_next_block() {
        let nodes = parse("<h2>Contact<p>Reach us anytime.</p>");
        assert_eq!(
            nodes,
            vec![
                MarkupNode::Heading { level: 2, text: "Contact".to_string() },
                MarkupNode::Paragraph { html: "Reach us anytime.".to_string() },
            ]
        );
    }

    #[test]
    fn stray_text_becomes_text_node() {
        let nodes = parse("hello <em>world</em>\n<p>para</p>");
        assert_eq!(
            nodes,
            vec![
                MarkupNode::Text("hello world".to_string()),
                MarkupNode::Paragraph { html: "para".to_string() },
            ]
        );
    }

    #[test]
    fn containers_are_transparent() {
        let nodes = parse("<div><section><h1>Title</h1><p>Body</p></section></div>");
        assert_eq!(
            nodes,
            vec![
                MarkupNode::Heading { level: 1, text: "Title".to_string() },
                MarkupNode::Paragraph { html: "Body".to_string() },
            ]
        );
    }

    #[test]
    fn comments_and_doctype_skipped() {
        let nodes = parse("<!DOCTYPE html><!-- generated --><p>kept</p>");
        assert_eq!(nodes, vec![MarkupNode::Paragraph { html: "kept".to_string() }]);
    }

    #[test]
    fn script_and_style_content_dropped() {
        let nodes = parse("<style>p { color: red }</style><script>if (a < b) { run() }</script><p>x</p>");
        assert_eq!(nodes, vec![MarkupNode::Paragraph { html: "x".to_string() }]);
    }

    #[test]
    fn image_attribute_forms() {
        let nodes = parse(r#"<img src="a.png" alt='Our team'><img src=b.png>"#);
        assert_eq!(
            nodes,
            vec![
                MarkupNode::Image { src: "a.png".to_string(), alt: "Our team".to_string() },
                MarkupNode::Image { src: "b.png".to_string(), alt: String::new() },
            ]
        );
    }

    #[test]
    fn image_without_src_still_parses() {
        let nodes = parse("<img alt=\"logo\">");
        assert_eq!(nodes, vec![MarkupNode::Image { src: String::new(), alt: "logo".to_string() }]);
    }

    #[test]
    fn nested_list_items_flatten() {
        let nodes = parse("<ul><li>A<ul><li>B</li></ul></li><li>C</li></ul>");
        assert_eq!(
            nodes,
            vec![MarkupNode::List {
                ordered: false,
                items: vec!["A".to_string(), "B".to_string(), "C".to_string()],
            }]
        );
    }

    #[test]
    fn ordered_list_flag() {
        let nodes = parse("<ol><li>one</li></ol>");
        assert_eq!(
            nodes,
            vec![MarkupNode::List { ordered: true, items: vec!["one".to_string()] }]
        );
    }

    #[test]
    fn blank_list_items_skipped() {
        let nodes = parse("<ul><li>kept</li><li>   </li></ul>");
        assert_eq!(
            nodes,
            vec![MarkupNode::List { ordered: false, items: vec!["kept".to_string()] }]
        );
    }

    #[test]
    fn lone_angle_bracket_stays_literal() {
        let nodes = parse("<p>5 < 10 is true</p>");
        assert_eq!(nodes, vec![MarkupNode::Paragraph { html: "5 < 10 is true".to_string() }]);
    }

    #[test]
    fn entities_decoded_in_plain_text() {
        let nodes = parse("<h1>Tom &amp; Sons</h1><ul><li>Bolts &#38; nuts</li></ul>");
        assert_eq!(
            nodes,
            vec![
                MarkupNode::Heading { level: 1, text: "Tom & Sons".to_string() },
                MarkupNode::List { ordered: false, items: vec!["Bolts & nuts".to_string()] },
            ]
        );
    }

    #[test]
    fn br_joins_text_runs() {
        let nodes = parse("one<br>two");
        assert_eq!(nodes, vec![MarkupNode::Text("one two".to_string())]);
    }

    #[test]
    fn empty_and_whitespace_input() {
        assert!(parse("").is_empty());
        assert!(parse("  \n\t ").is_empty());
    }

    #[test]
    fn strip_tags_decodes() {
        assert_eq!(collapse_ws(&strip_tags("<b>Tom</b> &amp; <i>Sons</i>")), "Tom & Sons");
    }
}
