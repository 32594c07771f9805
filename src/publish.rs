use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::page::tree::PageTree;

const CONCURRENCY: usize = 8;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("PAGEFORGE_API_KEY environment variable is not set")]
    MissingApiKey,
    #[error("api returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

/// One page ready for upload.
#[derive(Debug, Clone)]
pub struct PageUpload {
    pub slug: String,
    pub title: String,
    pub tree: PageTree,
}

#[derive(Debug, Clone)]
pub struct PublishStats {
    pub total: usize,
    pub ok: usize,
    pub errors: usize,
    /// (slug, id) for every page the API acknowledged with an id.
    pub page_ids: Vec<(String, String)>,
}

/// Upload pages concurrently, collecting results as they arrive. A failed
/// page is logged and counted, the rest of the run keeps going.
pub async fn publish_pages(endpoint: &str, pages: Vec<PageUpload>) -> Result<PublishStats> {
    let api_key = std::env::var("PAGEFORGE_API_KEY").map_err(|_| PublishError::MissingApiKey)?;

    let client = Arc::new(
        reqwest::Client::builder()
            .user_agent("pageforge/0.1")
            .timeout(Duration::from_secs(30))
            .build()?,
    );
    let semaphore = Arc::new(Semaphore::new(CONCURRENCY));
    let total = pages.len();
    let url = format!("{}/pages", endpoint.trim_end_matches('/'));

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")?
            .progress_chars("=> "),
    );

    let (tx, mut rx) =
        tokio::sync::mpsc::channel::<(String, Result<Option<String>, PublishError>)>(CONCURRENCY * 2);

    for page in pages {
        let client = Arc::clone(&client);
        let sem = Arc::clone(&semaphore);
        let tx = tx.clone();
        let url = url.clone();
        let api_key = api_key.clone();

        tokio::spawn(async move {
            let _permit = sem.acquire().await.unwrap();
            let result = upload_page(&client, &url, &api_key, &page).await;
            let _ = tx.send((page.slug, result)).await;
        });
    }
    drop(tx);

    let mut stats = PublishStats { total, ok: 0, errors: 0, page_ids: Vec::new() };
    while let Some((slug, result)) = rx.recv().await {
        match result {
            Ok(Some(id)) => {
                stats.ok += 1;
                stats.page_ids.push((slug, id));
            }
            Ok(None) => stats.ok += 1,
            Err(e) => {
                warn!("publish failed for {}: {}", slug, e);
                stats.errors += 1;
            }
        }
        pb.inc(1);
    }
    pb.finish();

    info!("Published {}/{} pages ({} errors)", stats.ok, stats.total, stats.errors);
    Ok(stats)
}

async fn upload_page(
    client: &reqwest::Client,
    url: &str,
    api_key: &str,
    page: &PageUpload,
) -> Result<Option<String>, PublishError> {
    let response = client
        .post(url)
        .bearer_auth(api_key)
        .json(&payload_for(page))
        .send()
        .await?;
    let status = response.status();
    if !status.is_success() {
        let message: String = response
            .text()
            .await
            .unwrap_or_default()
            .chars()
            .take(200)
            .collect();
        return Err(PublishError::Api { status: status.as_u16(), message });
    }
    let body = response.json::<Value>().await.unwrap_or(Value::Null);
    Ok(assigned_id(&body))
}

/// The API returns the stored page as JSON; its id may be numeric or a
/// string depending on the backend.
fn assigned_id(body: &Value) -> Option<String> {
    match &body["id"] {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn payload_for(page: &PageUpload) -> Value {
    json!({
        "title": page.title,
        "slug": page.slug,
        "content": page.tree,
        "generated_at": Utc::now().to_rfc3339(),
    })
}
