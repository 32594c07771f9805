use serde::Serialize;

use crate::merge::MergeTally;
use crate::page::CompileTally;

/// Aggregate counters for one run. Degradation counters answer "what did
/// the pipeline quietly swallow" after the fact, since nothing in the
/// per-row path ever raises.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    pub rows: usize,
    pub sections: usize,
    pub widgets: usize,
    pub unknown_tokens: usize,
    pub unterminated_conditionals: usize,
    pub dropped_nodes: usize,
    pub empty_sections: usize,
    pub empty_pages: usize,
}

impl BuildReport {
    pub fn add_page(
        &mut self,
        merge: &MergeTally,
        compile: &CompileTally,
        sections: usize,
        widgets: usize,
    ) {
        self.rows += 1;
        self.sections += sections;
        self.widgets += widgets;
        self.unknown_tokens += merge.unknown_tokens;
        self.unterminated_conditionals += merge.unterminated_conditionals;
        self.dropped_nodes += compile.dropped_nodes;
        self.empty_sections += compile.empty_sections;
        if sections == 0 {
            self.empty_pages += 1;
        }
    }

    /// Fold a chunk-local report into the run total.
    pub fn absorb(&mut self, other: &BuildReport) {
        self.rows += other.rows;
        self.sections += other.sections;
        self.widgets += other.widgets;
        self.unknown_tokens += other.unknown_tokens;
        self.unterminated_conditionals += other.unterminated_conditionals;
        self.dropped_nodes += other.dropped_nodes;
        self.empty_sections += other.empty_sections;
        self.empty_pages += other.empty_pages;
    }

    pub fn has_degradations(&self) -> bool {
        self.unknown_tokens > 0
            || self.unterminated_conditionals > 0
            || self.dropped_nodes > 0
            || self.empty_sections > 0
            || self.empty_pages > 0
    }

    pub fn print(&self) {
        println!("\nBuild report");
        println!("============");
        println!("Rows:        {}", self.rows);
        println!("Sections:    {}", self.sections);
        println!("Widgets:     {}", self.widgets);
        println!(
            "Degraded:    {} unknown tokens, {} unterminated conditionals",
            self.unknown_tokens, self.unterminated_conditionals
        );
        println!(
            "Dropped:     {} nodes, {} empty sections, {} empty pages",
            self.dropped_nodes, self.empty_sections, self.empty_pages
        );
    }
}
