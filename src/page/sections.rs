use crate::page::entities::AnnotatedNode;
use crate::page::markup::MarkupNode;

/// A run of nodes grouped under one heading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Level and text of the heading that opened the section, or None for
    /// content that appears before the first heading.
    pub heading: Option<(u8, String)>,
    pub nodes: Vec<AnnotatedNode>,
}

/// Split the node stream on headings. An H1 or H2 always opens a section,
/// as does a heading of any level when it is the very first node. Deeper
/// headings stay inside the current section. Leading content before the
/// first heading lands in a heading-less section, and an empty stream
/// yields no sections at all.
pub fn segment(nodes: Vec<AnnotatedNode>) -> Vec<Section> {
    let mut sections: Vec<Section> = Vec::new();
    let mut current: Option<Section> = None;

    for (idx, node) in nodes.into_iter().enumerate() {
        let opens = match &node.node {
            MarkupNode::Heading { level, .. } => *level <= 2 || idx == 0,
            _ => false,
        };
        if opens {
            if let Some(section) = current.take() {
                sections.push(section);
            }
            if let MarkupNode::Heading { level, text } = node.node {
                current = Some(Section { heading: Some((level, text)), nodes: Vec::new() });
            }
        } else {
            current
                .get_or_insert_with(|| Section { heading: None, nodes: Vec::new() })
                .nodes
                .push(node);
        }
    }

    if let Some(section) = current.take() {
        sections.push(section);
    }
    sections
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::entities::annotate;
    use crate::page::markup::parse;

    fn doc(html: &str) -> Vec<Section> {
        segment(annotate(parse(html)))
    }

    #[test]
    fn one_section_per_top_level_heading() {
        let sections = doc(
            "<h1>Acme</h1><p>intro</p>\
             <h2>Services</h2><ul><li>a</li></ul>\
             <h2>Contact</h2><p>call us</p>",
        );
        assert_eq!(sections.len(), 3);
        assert_eq!(sections[0].heading, Some((1, "Acme".to_string())));
        assert_eq!(sections[1].heading, Some((2, "Services".to_string())));
        assert_eq!(sections[2].heading, Some((2, "Contact".to_string())));
        assert_eq!(sections[0].nodes.len(), 1);
        assert_eq!(sections[1].nodes.len(), 1);
        assert_eq!(sections[2].nodes.len(), 1);
    }

    #[test]
    fn leading_content_gets_headingless_section() {
        let sections = doc("<p>intro</p><h2>First</h2><p>body</p>");
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].heading, None);
        assert_eq!(sections[0].nodes.len(), 1);
        assert_eq!(sections[1].heading, Some((2, "First".to_string())));
    }

    #[test]
    fn deep_headings_stay_inline() {
        let sections = doc("<h2>Services</h2><h3>Plumbing</h3><p>pipes</p>");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].nodes.len(), 2);
        assert!(matches!(
            sections[0].nodes[0].node,
            MarkupNode::Heading { level: 3, .. }
        ));
    }

    #[test]
    fn leading_deep_heading_opens_the_document() {
        let sections = doc("<h4>Note</h4><p>text</p>");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].heading, Some((4, "Note".to_string())));
    }

    #[test]
    fn empty_document_has_no_sections() {
        assert!(doc("").is_empty());
        assert!(doc("<!-- nothing here -->").is_empty());
    }

    #[test]
    fn heading_only_document() {
        let sections = doc("<h1>Just a title</h1>");
        assert_eq!(sections.len(), 1);
        assert!(sections[0].nodes.is_empty());
    }
}
