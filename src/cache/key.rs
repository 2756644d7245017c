use crate::crawler::CrawlBudget;
use crate::url::{normalize_source_url, ParsedSource, SourceKind};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use url::Url;

/// Number of hex characters of the option digest kept in a key
const DIGEST_LEN: usize = 16;

/// Shape of the final prompt document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Markdown,
    Xml,
    Json,
    Plain,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Markdown => "markdown",
            OutputFormat::Xml => "xml",
            OutputFormat::Json => "json",
            OutputFormat::Plain => "plain",
        }
    }
}

/// Options a caller attaches to an ingest request
///
/// All fields except `show_progress` shape the output and therefore take part
/// in the cache key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestOptions {
    pub format: OutputFormat,
    pub token_budget: Option<usize>,
    /// Tokenizer name, e.g. `cl100k_base`
    pub encoder: Option<String>,
    /// File extensions to include, with or without a leading dot
    pub extensions: Vec<String>,
    pub excluded_dirs: Vec<String>,
    pub show_progress: bool,
}

/// Derives the cache key for a source and its output-shaping options
///
/// Format: `{kind}:{normalized_url}:{digest}`
///
/// # Examples
///
/// ```
/// use prompt_harvest::cache::{derive_key, RequestOptions};
/// use prompt_harvest::url::classify;
///
/// let source = classify("https://github.com/facebook/react");
/// let a = RequestOptions { extensions: vec!["RS".into(), ".toml".into()], ..Default::default() };
/// let b = RequestOptions { extensions: vec!["toml".into(), "rs".into()], show_progress: true, ..Default::default() };
/// assert_eq!(derive_key(&source, &a), derive_key(&source, &b));
/// ```
pub fn derive_key(source: &ParsedSource, options: &RequestOptions) -> String {
    build_key(source, canonical_options(options))
}

/// Derives the cache key of a website snapshot
///
/// A crawl with a different page or depth budget produces a different
/// snapshot, so the budget joins the option digest.
pub fn derive_crawl_key(
    source: &ParsedSource,
    options: &RequestOptions,
    budget: &CrawlBudget,
) -> String {
    let mut canonical = canonical_options(options);
    let _ = write!(
        canonical,
        "max_depth={}\nmax_pages={}\nignore_robots={}\n",
        budget.max_depth, budget.max_pages, budget.ignore_robots
    );
    build_key(source, canonical)
}

fn build_key(source: &ParsedSource, canonical: String) -> String {
    let digest = hex::encode(Sha256::digest(canonical.as_bytes()));
    format!(
        "{}:{}:{}",
        kind_label(source.kind),
        normalized_source(source),
        &digest[..DIGEST_LEN]
    )
}

fn kind_label(kind: SourceKind) -> &'static str {
    match kind {
        SourceKind::GitRepository => "git-repository",
        SourceKind::Website => "website",
        SourceKind::Rejected => "rejected",
    }
}

fn normalized_source(source: &ParsedSource) -> String {
    match source.kind {
        SourceKind::GitRepository => source
            .repository_slug()
            .unwrap_or_else(|| source.normalized_url.clone()),
        SourceKind::Website => Url::parse(&source.normalized_url)
            .map(|url| normalize_source_url(&url))
            .unwrap_or_else(|_| source.normalized_url.clone()),
        SourceKind::Rejected => source.raw_input.clone(),
    }
}

/// One `name=value` line per shaping option, list values sorted
fn canonical_options(options: &RequestOptions) -> String {
    let extensions = normalize_list(&options.extensions, |ext| {
        ext.trim().trim_start_matches('.').to_lowercase()
    });
    let excluded_dirs = normalize_list(&options.excluded_dirs, |dir| {
        dir.trim().trim_end_matches('/').to_lowercase()
    });

    format!(
        "format={}\ntoken_budget={}\nencoder={}\nextensions={}\nexcluded_dirs={}\n",
        options.format.as_str(),
        options
            .token_budget
            .map(|budget| budget.to_string())
            .unwrap_or_default(),
        options.encoder.as_deref().unwrap_or_default(),
        extensions.join(","),
        excluded_dirs.join(","),
    )
}

fn normalize_list(values: &[String], normalize: impl Fn(&str) -> String) -> Vec<String> {
    let mut normalized: Vec<String> = values
        .iter()
        .map(|value| normalize(value))
        .filter(|value| !value.is_empty())
        .collect();
    normalized.sort();
    normalized.dedup();
    normalized
}
