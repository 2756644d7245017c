//! URL handling module for Prompt-Harvest
//!
//! This module is the synchronous gate every untrusted input passes through:
//! SSRF-safe validation, classification into git repositories and websites,
//! and the normalization used to deduplicate pages during a crawl.

mod domain;
mod git;
mod normalize;
mod validate;

pub use domain::{extract_domain, same_domain};
pub use git::GitProvider;
pub use normalize::{normalize_for_crawl, normalize_source_url, strip_fragment};
pub use validate::{is_private_ipv4, validate, ValidationVerdict};

use serde::{Deserialize, Serialize};

/// What a raw input turned out to point at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    /// A repository on a known git-hosting provider
    GitRepository,
    /// Any other fetchable website
    Website,
    /// The input failed validation
    Rejected,
}

/// A classified input URL
///
/// `owner` and `repo` are both present whenever `kind` is
/// [`SourceKind::GitRepository`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedSource {
    /// The input exactly as supplied
    pub raw_input: String,
    /// Parsed form of the input (https assumed when the scheme was missing)
    pub normalized_url: String,
    /// Lowercase host
    pub domain: String,
    pub kind: SourceKind,
    pub provider: Option<GitProvider>,
    pub owner: Option<String>,
    pub repo: Option<String>,
    pub git_ref: Option<String>,
    /// Why validation failed, for rejected inputs
    pub rejection: Option<String>,
}

impl ParsedSource {
    fn rejected(input: &str, reason: String) -> Self {
        Self {
            raw_input: input.to_string(),
            normalized_url: String::new(),
            domain: String::new(),
            kind: SourceKind::Rejected,
            provider: None,
            owner: None,
            repo: None,
            git_ref: None,
            rejection: Some(reason),
        }
    }

    pub fn is_git_repository(&self) -> bool {
        self.kind == SourceKind::GitRepository
    }

    /// `provider/owner/repo[@ref]` for repositories, `None` otherwise
    pub fn repository_slug(&self) -> Option<String> {
        let provider = self.provider?;
        let owner = self.owner.as_deref()?;
        let repo = self.repo.as_deref()?;
        Some(match &self.git_ref {
            Some(git_ref) => format!("{}/{}/{}@{}", provider, owner, repo, git_ref),
            None => format!("{}/{}/{}", provider, owner, repo),
        })
    }
}

/// Validates and classifies an input, never failing
///
/// # Examples
///
/// ```
/// use prompt_harvest::url::{classify, SourceKind};
///
/// assert_eq!(classify("https://github.com/facebook/react").kind, SourceKind::GitRepository);
/// assert_eq!(classify("https://docs.rs/tokio").kind, SourceKind::Website);
/// assert_eq!(classify("ftp://example.com").kind, SourceKind::Rejected);
/// ```
pub fn classify(input: &str) -> ParsedSource {
    let url = match validate::parse_checked(input) {
        Ok(url) => url,
        Err(reason) => return ParsedSource::rejected(input, reason),
    };

    let domain = extract_domain(&url).unwrap_or_default();
    let mut source = ParsedSource {
        raw_input: input.to_string(),
        normalized_url: url.to_string(),
        domain,
        kind: SourceKind::Website,
        provider: None,
        owner: None,
        repo: None,
        git_ref: None,
        rejection: None,
    };

    if let Some(path) = git::match_repository(&url) {
        source.kind = SourceKind::GitRepository;
        source.provider = Some(path.provider);
        source.owner = Some(path.owner);
        source.repo = Some(path.repo);
        source.git_ref = path.git_ref;
    }

    source
}

/// Parses a git-hosting repository URL
///
/// Returns `None` for invalid inputs and for valid URLs that are not
/// repositories on a known provider.
///
/// # Examples
///
/// ```
/// use prompt_harvest::url::parse;
///
/// let source = parse("https://github.com/u/r/tree/feat/sub").unwrap();
/// assert_eq!(source.owner.as_deref(), Some("u"));
/// assert_eq!(source.git_ref.as_deref(), Some("feat"));
///
/// assert!(parse("https://example.com/u/r").is_none());
/// ```
pub fn parse(input: &str) -> Option<ParsedSource> {
    let source = classify(input);
    source.is_git_repository().then_some(source)
}
