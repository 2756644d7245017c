//! Recognition of repository URLs on known git-hosting providers

use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Git-hosting providers whose repository URLs are recognized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GitProvider {
    GitHub,
    GitLab,
    Bitbucket,
}

impl GitProvider {
    /// Looks up the provider for a lowercase hostname (`www.` is accepted)
    pub fn from_host(host: &str) -> Option<Self> {
        match host.strip_prefix("www.").unwrap_or(host) {
            "github.com" => Some(Self::GitHub),
            "gitlab.com" => Some(Self::GitLab),
            "bitbucket.org" => Some(Self::Bitbucket),
            _ => None,
        }
    }

    pub fn domain(&self) -> &'static str {
        match self {
            Self::GitHub => "github.com",
            Self::GitLab => "gitlab.com",
            Self::Bitbucket => "bitbucket.org",
        }
    }

    /// Path segments that introduce a ref after `/{owner}/{repo}`
    fn ref_marker(&self) -> &'static [&'static str] {
        match self {
            Self::GitHub => &["tree"],
            Self::GitLab => &["-", "tree"],
            Self::Bitbucket => &["src"],
        }
    }
}

impl fmt::Display for GitProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.domain())
    }
}

/// Owner, repository and optional ref captured from a repository URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RepositoryPath {
    pub provider: GitProvider,
    pub owner: String,
    pub repo: String,
    pub git_ref: Option<String>,
}

/// Matches `/{owner}/{repo}[/{marker}/{ref}[/...]]` on a known provider
///
/// The ref is the single segment following the marker: a branch named
/// `feature/x` is captured as `feature`. A trailing `.git` is dropped from
/// the repository name.
pub(crate) fn match_repository(url: &Url) -> Option<RepositoryPath> {
    let host = url.host_str()?.to_lowercase();
    let provider = GitProvider::from_host(&host)?;

    let segments: Vec<&str> = url
        .path_segments()?
        .filter(|segment| !segment.is_empty())
        .collect();

    let (owner, repo, rest) = match segments.as_slice() {
        [owner, repo, rest @ ..] => (*owner, *repo, rest),
        _ => return None,
    };

    let repo = repo.strip_suffix(".git").unwrap_or(repo);
    if !is_name(owner) || !is_name(repo) {
        return None;
    }

    let git_ref = if rest.is_empty() {
        None
    } else {
        let marker = provider.ref_marker();
        if rest.len() <= marker.len() || &rest[..marker.len()] != marker {
            return None;
        }
        Some(rest[marker.len()].to_string())
    };

    Some(RepositoryPath {
        provider,
        owner: owner.to_string(),
        repo: repo.to_string(),
        git_ref,
    })
}

fn is_name(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}
