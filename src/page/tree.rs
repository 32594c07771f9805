use serde::Serialize;
use serde_json::{json, Value};

use crate::page::widgets::PageSection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Section,
    Column,
    Widget,
}

/// One node of the emitted page tree. Serializes to the builder's wire
/// shape: `id`, `elType`, optional `widgetType`, `settings`, `elements`.
#[derive(Debug, Clone, Serialize)]
pub struct PageNode {
    pub id: String,
    #[serde(rename = "elType")]
    pub el_type: NodeType,
    #[serde(rename = "widgetType", skip_serializing_if = "Option::is_none")]
    pub widget_type: Option<String>,
    pub settings: Value,
    pub elements: Vec<PageNode>,
}

/// A whole page: the top-level section list. Serializes transparently as a
/// JSON array, which is what the page builder imports.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct PageTree {
    pub sections: Vec<PageNode>,
}

impl PageTree {
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    pub fn widget_count(&self) -> usize {
        self.sections
            .iter()
            .flat_map(|s| &s.elements)
            .map(|column| column.elements.len())
            .sum()
    }
}

struct IdGen {
    next: u32,
}

impl IdGen {
    fn new() -> Self {
        IdGen { next: 1 }
    }

    fn next_id(&mut self) -> String {
        let id = format!("pf{:06x}", self.next);
        self.next += 1;
        id
    }
}

/// Nest lowered sections into the section > column > widget tree with
/// deterministic ids assigned in document order.
pub fn assemble(sections: Vec<PageSection>) -> PageTree {
    let mut ids = IdGen::new();
    let nodes = sections
        .into_iter()
        .map(|section| {
            let settings = if section.label.is_empty() {
                json!({})
            } else {
                json!({ "label": section.label })
            };
            let section_id = ids.next_id();
            let column_id = ids.next_id();
            let widgets = section
                .widgets
                .into_iter()
                .map(|w| PageNode {
                    id: ids.next_id(),
                    el_type: NodeType::Widget,
                    widget_type: Some(w.kind.as_str().to_string()),
                    settings: w.settings,
                    elements: Vec::new(),
                })
                .collect();
            PageNode {
                id: section_id,
                el_type: NodeType::Section,
                widget_type: None,
                settings,
                elements: vec![PageNode {
                    id: column_id,
                    el_type: NodeType::Column,
                    widget_type: None,
                    settings: json!({}),
                    elements: widgets,
                }],
            }
        })
        .collect();
    PageTree { sections: nodes }
}
