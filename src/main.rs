mod fields;
mod merge;
mod page;
mod publish;
mod report;
mod rows;
mod template;

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde_json::json;

use fields::FieldMap;
use page::tree::PageTree;
use report::BuildReport;

#[derive(Parser)]
#[command(name = "pageforge", about = "Business rows + markup template -> page builder JSON")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a page file per CSV row
    Build {
        /// CSV of business rows
        csv: PathBuf,
        /// Template doc URL (Google Docs share links are rewritten to HTML export)
        #[arg(long)]
        doc: Option<String>,
        /// Local template file, used when no doc is given or the fetch fails
        #[arg(long)]
        template: Option<PathBuf>,
        /// Output directory
        #[arg(short, long, default_value = "out")]
        out: PathBuf,
        /// Max rows to build (default: all)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Print one row's merged markup and page tree without writing anything
    Preview {
        csv: PathBuf,
        /// Row to preview (1-based)
        #[arg(short, long, default_value = "1")]
        row: usize,
        #[arg(long)]
        doc: Option<String>,
        #[arg(long)]
        template: Option<PathBuf>,
    },
    /// Build every page and upload it to the site API
    Publish {
        csv: PathBuf,
        /// API base URL
        #[arg(long)]
        endpoint: String,
        #[arg(long)]
        doc: Option<String>,
        #[arg(long)]
        template: Option<PathBuf>,
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Merge and compile every row without writing anything
    Check {
        csv: PathBuf,
        #[arg(long)]
        doc: Option<String>,
        #[arg(long)]
        template: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Build { csv, doc, template, out, limit } => {
            build(csv, doc, template, out, limit).await
        }
        Commands::Preview { csv, row, doc, template } => preview(csv, row, doc, template).await,
        Commands::Publish { csv, endpoint, doc, template, limit } => {
            publish_cmd(csv, endpoint, doc, template, limit).await
        }
        Commands::Check { csv, doc, template } => check(csv, doc, template).await,
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

async fn build(
    csv: PathBuf,
    doc: Option<String>,
    template: Option<PathBuf>,
    out: PathBuf,
    limit: Option<usize>,
) -> anyhow::Result<()> {
    let rows = rows::load_rows(&csv, limit)?;
    if rows.is_empty() {
        println!("No data rows in {}. Nothing to build.", csv.display());
        return Ok(());
    }
    let (markup, source) = template::load(doc.as_deref(), template.as_deref()).await;

    println!("Building {} pages (template: {})...", rows.len(), source);
    let started_at = Utc::now();
    let (mut pages, report) = build_pages(&rows, &markup);
    dedupe_slugs(&mut pages);

    fs::create_dir_all(&out).with_context(|| format!("creating {}", out.display()))?;
    for page in &pages {
        let path = out.join(format!("{}.json", page.slug));
        let body = serde_json::to_string_pretty(&page.tree)?;
        fs::write(&path, body).with_context(|| format!("writing {}", path.display()))?;
    }
    write_manifest(&out, &pages, &report, &source.to_string(), started_at)?;

    println!("Wrote {} pages to {}", pages.len(), out.display());
    report.print();
    Ok(())
}

async fn preview(
    csv: PathBuf,
    row: usize,
    doc: Option<String>,
    template: Option<PathBuf>,
) -> anyhow::Result<()> {
    if row == 0 {
        bail!("--row is 1-based");
    }
    let all = rows::load_rows(&csv, None)?;
    let fields = match all.get(row - 1) {
        Some(fields) => fields,
        None => bail!("row {} not found ({} has {} rows)", row, csv.display(), all.len()),
    };
    let (markup, source) = template::load(doc.as_deref(), template.as_deref()).await;

    let (merged, merge_tally) = merge::resolve(&markup, fields);
    let (tree, compile_tally) = page::compile(&merged);

    println!("Template: {}", source);
    println!("Slug:     {}", fields.slug(row - 1));
    println!("Title:    {}", fields.title(row - 1));
    println!("\n--- Merged markup ---\n{}", merged.trim_end());
    println!("\n--- Page tree ---\n{}", serde_json::to_string_pretty(&tree)?);

    if tree.is_empty() {
        println!("\nNo sections produced.");
    } else {
        println!("\n{:>3} | {:<24} | {:>7} | {:<40}", "#", "Section", "Widgets", "Types");
        println!("{}", "-".repeat(84));
        for (i, section) in tree.sections.iter().enumerate() {
            let label = section.settings["label"].as_str().unwrap_or("-");
            let kinds: Vec<&str> = section
                .elements
                .iter()
                .flat_map(|column| &column.elements)
                .filter_map(|w| w.widget_type.as_deref())
                .collect();
            println!(
                "{:>3} | {:<24} | {:>7} | {:<40}",
                i + 1,
                truncate(label, 24),
                kinds.len(),
                truncate(&kinds.join(", "), 40)
            );
        }
    }

    let mut report = BuildReport::default();
    report.add_page(&merge_tally, &compile_tally, tree.section_count(), tree.widget_count());
    report.print();
    Ok(())
}

async fn publish_cmd(
    csv: PathBuf,
    endpoint: String,
    doc: Option<String>,
    template: Option<PathBuf>,
    limit: Option<usize>,
) -> anyhow::Result<()> {
    let rows = rows::load_rows(&csv, limit)?;
    if rows.is_empty() {
        println!("No data rows in {}. Nothing to publish.", csv.display());
        return Ok(());
    }
    let (markup, source) = template::load(doc.as_deref(), template.as_deref()).await;

    println!("Building {} pages (template: {})...", rows.len(), source);
    let (mut pages, report) = build_pages(&rows, &markup);
    dedupe_slugs(&mut pages);
    report.print();

    println!("\nPublishing {} pages to {}...", pages.len(), endpoint);
    let uploads = pages
        .into_iter()
        .map(|p| publish::PageUpload { slug: p.slug, title: p.title, tree: p.tree })
        .collect();
    let stats = publish::publish_pages(&endpoint, uploads).await?;
    println!("Done: {} uploaded ({} ok, {} errors).", stats.total, stats.ok, stats.errors);

    if !stats.page_ids.is_empty() {
        println!("\nAssigned page ids:");
        for (slug, id) in stats.page_ids.iter().take(20) {
            println!("  {:<40} {}", truncate(slug, 40), id);
        }
        if stats.page_ids.len() > 20 {
            println!("  ... and {} more", stats.page_ids.len() - 20);
        }
    }
    Ok(())
}

async fn check(
    csv: PathBuf,
    doc: Option<String>,
    template: Option<PathBuf>,
) -> anyhow::Result<()> {
    let rows = rows::load_rows(&csv, None)?;
    if rows.is_empty() {
        bail!("{} has no data rows", csv.display());
    }
    let (markup, source) = template::load(doc.as_deref(), template.as_deref()).await;

    println!("Checking {} rows (template: {})...", rows.len(), source);
    let (pages, report) = build_pages(&rows, &markup);
    report.print();

    if !markup.trim().is_empty() && report.empty_pages > 0 {
        bail!(
            "check failed: {} of {} rows produced an empty page",
            report.empty_pages,
            pages.len()
        );
    }
    if report.has_degradations() {
        println!("\nCheck passed with degradations (see report above): {} pages.", pages.len());
    } else {
        println!("\nCheck passed: {} pages, nothing degraded.", pages.len());
    }
    Ok(())
}

struct BuiltPage {
    slug: String,
    title: String,
    tree: PageTree,
}

struct RowOutput {
    page: BuiltPage,
    merge: merge::MergeTally,
    compile: page::CompileTally,
}

fn build_page(fields: &FieldMap, index: usize, markup: &str) -> RowOutput {
    let (merged, merge_tally) = merge::resolve(markup, fields);
    let (tree, compile_tally) = page::compile(&merged);
    RowOutput {
        page: BuiltPage { slug: fields.slug(index), title: fields.title(index), tree },
        merge: merge_tally,
        compile: compile_tally,
    }
}

fn build_pages(rows: &[FieldMap], markup: &str) -> (Vec<BuiltPage>, BuildReport) {
    use indicatif::{ProgressBar, ProgressStyle};
    use rayon::prelude::*;

    let pb = ProgressBar::new(rows.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")
            .unwrap()
            .progress_chars("#>-"),
    );

    let mut report = BuildReport::default();
    let mut pages = Vec::with_capacity(rows.len());

    for (chunk_idx, chunk) in rows.chunks(500).enumerate() {
        let base = chunk_idx * 500;
        let results: Vec<_> = chunk
            .par_iter()
            .enumerate()
            .map(|(i, fields)| build_page(fields, base + i, markup))
            .collect();

        let mut chunk_report = BuildReport::default();
        for out in results {
            chunk_report.add_page(
                &out.merge,
                &out.compile,
                out.page.tree.section_count(),
                out.page.tree.widget_count(),
            );
            pages.push(out.page);
        }
        report.absorb(&chunk_report);
        pb.inc(chunk.len() as u64);
    }

    pb.finish_and_clear();
    (pages, report)
}

/// Slugs collide when two rows share a name and city. Later pages get a
/// numeric suffix, in row order so reruns stay stable.
fn dedupe_slugs(pages: &mut [BuiltPage]) {
    let mut seen: HashSet<String> = HashSet::new();
    for page in pages.iter_mut() {
        if seen.insert(page.slug.clone()) {
            continue;
        }
        let mut n = 2;
        loop {
            let candidate = format!("{}-{}", page.slug, n);
            if seen.insert(candidate.clone()) {
                page.slug = candidate;
                break;
            }
            n += 1;
        }
    }
}

fn write_manifest(
    out: &Path,
    pages: &[BuiltPage],
    report: &BuildReport,
    template_source: &str,
    started_at: DateTime<Utc>,
) -> anyhow::Result<()> {
    let manifest = json!({
        "started_at": started_at.to_rfc3339(),
        "finished_at": Utc::now().to_rfc3339(),
        "template_source": template_source,
        "report": report,
        "pages": pages
            .iter()
            .map(|p| json!({
                "slug": p.slug,
                "title": p.title,
                "status": if p.tree.is_empty() { "empty" } else { "ok" },
                "sections": p.tree.section_count(),
                "widgets": p.tree.widget_count(),
            }))
            .collect::<Vec<_>>(),
    });
    let path = out.join("manifest.json");
    fs::write(&path, serde_json::to_string_pretty(&manifest)?)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_with_slug(slug: &str) -> BuiltPage {
        BuiltPage {
            slug: slug.to_string(),
            title: "t".to_string(),
            tree: page::compile("<h1>x</h1>").0,
        }
    }

    #[test]
    fn cli_accepts_positional_csv() {
        let cli = Cli::try_parse_from([
            "pageforge", "build", "rows.csv", "--template", "t.html", "-n", "5",
        ])
        .unwrap();
        match cli.command {
            Commands::Build { csv, limit, .. } => {
                assert_eq!(csv, PathBuf::from("rows.csv"));
                assert_eq!(limit, Some(5));
            }
            _ => panic!("expected build subcommand"),
        }

        for args in [
            vec!["pageforge", "preview", "rows.csv", "--row", "3"],
            vec!["pageforge", "publish", "rows.csv", "--endpoint", "https://example.com/api"],
            vec!["pageforge", "check", "rows.csv"],
        ] {
            let sub = args[1];
            assert!(Cli::try_parse_from(args).is_ok(), "failed on {}", sub);
        }
    }

    #[test]
    fn duplicate_slugs_get_suffixes() {
        let mut pages = vec![
            page_with_slug("acme-dallas"),
            page_with_slug("acme-dallas"),
            page_with_slug("acme-dallas"),
        ];
        dedupe_slugs(&mut pages);
        assert_eq!(pages[0].slug, "acme-dallas");
        assert_eq!(pages[1].slug, "acme-dallas-2");
        assert_eq!(pages[2].slug, "acme-dallas-3");
    }

    #[test]
    fn build_pages_fills_report() {
        let mut fm = FieldMap::new();
        fm.insert("business_name", "Acme");
        fm.insert("city", "Dallas");
        fm.insert("phone", "2145550100");
        let rows = vec![fm, FieldMap::new()];

        let (pages, report) = build_pages(&rows, "<h1>[BUSINESS_NAME]</h1><p>Call [PHONE].</p>");
        assert_eq!(pages.len(), 2);
        assert_eq!(report.rows, 2);
        assert_eq!(pages[0].slug, "acme-dallas");
        assert_eq!(pages[1].slug, "page-2");
        assert_eq!(report.unknown_tokens, 1);
    }

    #[test]
    fn built_pages_keep_row_order() {
        let mut a = FieldMap::new();
        a.insert("business_name", "Alpha");
        let mut b = FieldMap::new();
        b.insert("business_name", "Beta");

        let (pages, _) = build_pages(&[a, b], "<h1>[BUSINESS_NAME]</h1>");
        assert_eq!(pages[0].slug, "alpha");
        assert_eq!(pages[1].slug, "beta");
    }
}
