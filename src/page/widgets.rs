use serde_json::{json, Value};

use crate::merge::format::format_phone;
use crate::page::entities::{link_emails, AnnotatedNode, EntityKind, EntitySpan};
use crate::page::markup::MarkupNode;
use crate::page::sections::Section;
use crate::page::CompileTally;

const BULLETS: &[char] = &['-', '*', '•', '–', '—', '✓', '✔', '►', '·'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetKind {
    Heading,
    Text,
    IconList,
    Button,
    Image,
}

impl WidgetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WidgetKind::Heading => "heading",
            WidgetKind::Text => "text",
            WidgetKind::IconList => "icon-list",
            WidgetKind::Button => "button",
            WidgetKind::Image => "image",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Widget {
    pub kind: WidgetKind,
    pub settings: Value,
}

/// One lowered section: its label plus the widgets in document order.
#[derive(Debug, Clone, PartialEq)]
pub struct PageSection {
    pub label: String,
    pub widgets: Vec<Widget>,
}

/// Lower a section to widgets. The opening heading becomes the first
/// widget; a section that ends up with no widgets at all is dropped.
pub fn lower_section(section: &Section, tally: &mut CompileTally) -> Option<PageSection> {
    let mut widgets = Vec::new();

    if let Some((level, text)) = &section.heading {
        match heading_widget(*level, text) {
            Some(w) => widgets.push(w),
            None => tally.dropped_nodes += 1,
        }
    }
    for node in &section.nodes {
        if let Some(w) = lower_node(node, tally) {
            widgets.push(w);
        }
    }

    if widgets.is_empty() {
        tally.empty_sections += 1;
        return None;
    }
    let label = section
        .heading
        .as_ref()
        .map(|(_, text)| text.clone())
        .unwrap_or_default();
    Some(PageSection { label, widgets })
}

fn lower_node(node: &AnnotatedNode, tally: &mut CompileTally) -> Option<Widget> {
    match &node.node {
        MarkupNode::Heading { level, text } => match heading_widget(*level, text) {
            Some(w) => Some(w),
            None => {
                tally.dropped_nodes += 1;
                None
            }
        },
        MarkupNode::Paragraph { html } => prose_widget(html, &node.spans, tally),
        MarkupNode::Text(text) => prose_widget(text, &node.spans, tally),
        MarkupNode::List { items, .. } => icon_list(items, tally),
        MarkupNode::Image { src, alt } => {
            if src.trim().is_empty() {
                tally.dropped_nodes += 1;
                None
            } else {
                Some(Widget {
                    kind: WidgetKind::Image,
                    settings: json!({ "image": { "url": src, "alt": alt } }),
                })
            }
        }
    }
}

fn heading_widget(level: u8, text: &str) -> Option<Widget> {
    if text.trim().is_empty() {
        return None;
    }
    Some(Widget {
        kind: WidgetKind::Heading,
        settings: json!({
            "title": text,
            "header_size": format!("h{}", level.clamp(1, 6)),
        }),
    })
}

/// Paragraphs and loose text runs. A phone number promotes the whole node
/// to a call button (first phone wins, surrounding prose is dropped);
/// otherwise the content becomes a text widget with bare emails linked.
fn prose_widget(html: &str, spans: &[EntitySpan], tally: &mut CompileTally) -> Option<Widget> {
    if let Some(phone) = spans.iter().find(|s| s.kind == EntityKind::Phone) {
        return Some(phone_button(phone));
    }
    let html = html.trim();
    if html.is_empty() {
        tally.dropped_nodes += 1;
        return None;
    }
    Some(Widget {
        kind: WidgetKind::Text,
        settings: json!({ "editor": format!("<p>{}</p>", link_emails(html)) }),
    })
}

fn phone_button(span: &EntitySpan) -> Widget {
    Widget {
        kind: WidgetKind::Button,
        settings: json!({
            "text": format!("📞 {}", format_phone(&span.normalized)),
            "link": { "url": format!("tel:{}", span.normalized) },
        }),
    }
}

fn icon_list(items: &[String], tally: &mut CompileTally) -> Option<Widget> {
    let entries: Vec<Value> = items
        .iter()
        .map(|item| strip_bullet(item))
        .filter(|text| !text.is_empty())
        .map(|text| json!({ "text": text, "icon": "check" }))
        .collect();
    if entries.is_empty() {
        tally.dropped_nodes += 1;
        return None;
    }
    Some(Widget {
        kind: WidgetKind::IconList,
        settings: json!({ "icon_list": entries }),
    })
}

/// Items often arrive with their bullet character baked into the text.
fn strip_bullet(item: &str) -> &str {
    item.trim_start().trim_start_matches(BULLETS).trim_start()
}
