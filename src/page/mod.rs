pub mod entities;
pub mod markup;
pub mod sections;
pub mod tree;
pub mod widgets;

use tree::PageTree;

/// Degradations observed while compiling one document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompileTally {
    /// Nodes with nothing usable in them: blank paragraphs, empty headings,
    /// lists with no items, images with no source.
    pub dropped_nodes: usize,
    /// Sections that lowered to zero widgets and were removed.
    pub empty_sections: usize,
}

/// Compile markup into a page tree: parse, annotate contact entities,
/// segment on headings, lower to widgets, assemble. Pure per document, so
/// the same input always yields the same tree, ids included.
pub fn compile(markup_text: &str) -> (PageTree, CompileTally) {
    let mut tally = CompileTally::default();
    let annotated = entities::annotate(markup::parse(markup_text));
    let lowered: Vec<widgets::PageSection> = sections::segment(annotated)
        .iter()
        .filter_map(|section| widgets::lower_section(section, &mut tally))
        .collect();
    (tree::assemble(lowered), tally)
}
