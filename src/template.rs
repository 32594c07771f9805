use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use anyhow::{bail, Result};
use regex::Regex;
use tracing::{info, warn};

static DOC_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https://docs\.google\.com/document/d/([A-Za-z0-9_-]+)").unwrap()
});

const USER_AGENT: &str = "pageforge/0.1";

/// Fallback layout used when no template can be acquired. Generic enough to
/// produce a serviceable page from the common business fields alone.
pub const DEFAULT_TEMPLATE: &str = r#"<h1>[BUSINESS_NAME]</h1>
<p>[BUSINESS_NAME] proudly serves [CITY] and the surrounding area.</p>
[IF emergency=yes]
<p>Emergency? Call [PHONE] right now.</p>
[/IF]
<h2>Our Services</h2>
[SERVICES_LIST]
<h2>Why Choose Us</h2>
<ul>
<li>Locally owned and operated</li>
<li>Up-front pricing</li>
<li>Satisfaction guaranteed</li>
</ul>
<h2>Get In Touch</h2>
<p>Call [PHONE] or email [EMAIL] for a free quote.</p>
"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    RemoteDoc(String),
    File(PathBuf),
    Builtin,
}

impl fmt::Display for TemplateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateSource::RemoteDoc(url) => write!(f, "remote:{}", url),
            TemplateSource::File(path) => write!(f, "file:{}", path.display()),
            TemplateSource::Builtin => write!(f, "builtin"),
        }
    }
}

/// Acquire the template markup: remote doc first, then a local file, then
/// the built-in layout. Acquisition never fails the run, each unavailable
/// source just falls through to the next.
pub async fn load(doc_url: Option<&str>, file: Option<&Path>) -> (String, TemplateSource) {
    if let Some(url) = doc_url {
        match fetch_remote(url).await {
            Ok(body) => {
                info!("template loaded from {}", url);
                return (body, TemplateSource::RemoteDoc(url.to_string()));
            }
            Err(e) => warn!("remote template {} unavailable ({}), falling back", url, e),
        }
    }
    if let Some(path) = file {
        match fs::read_to_string(path) {
            Ok(body) => return (body, TemplateSource::File(path.to_path_buf())),
            Err(e) => warn!(
                "template file {} unreadable ({}), falling back",
                path.display(),
                e
            ),
        }
    }
    (DEFAULT_TEMPLATE.to_string(), TemplateSource::Builtin)
}

/// Rewrite a Google Docs share link to its HTML export endpoint. Any other
/// URL passes through untouched.
pub fn export_url(url: &str) -> String {
    match DOC_URL_RE.captures(url) {
        Some(caps) => format!(
            "https://docs.google.com/document/d/{}/export?format=html",
            &caps[1]
        ),
        None => url.to_string(),
    }
}

async fn fetch_remote(url: &str) -> Result<String> {
    let url = export_url(url);
    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(30))
        .build()?;
    let response = client.get(&url).send().await?;
    if !response.status().is_success() {
        bail!("fetch returned {}", response.status());
    }
    let body = response.text().await?;
    if body.trim().is_empty() {
        bail!("fetch returned an empty body");
    }
    Ok(body)
}
