use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::net::Ipv4Addr;
use url::{Host, Url};

/// Hostnames that are never fetched, regardless of how they resolve
const BLOCKED_HOSTNAMES: &[&str] = &[
    "localhost",
    "localhost.localdomain",
    "ip6-localhost",
    "ip6-loopback",
    "0.0.0.0",
];

/// Outcome of validating a raw URL string
///
/// Validation never fails with an error: a rejected input is reported as a
/// verdict carrying the reason of the first rule it broke.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationVerdict {
    pub valid: bool,
    pub reason: Option<String>,
}

impl ValidationVerdict {
    pub fn accept() -> Self {
        Self {
            valid: true,
            reason: None,
        }
    }

    pub fn reject(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            reason: Some(reason.into()),
        }
    }
}

/// Validates an untrusted URL string before any network access
///
/// # Rules
///
/// Checked in order; the first failing rule determines the reason:
///
/// 1. Empty or unparsable input → "Invalid URL format"
/// 2. Scheme must be http or https; a missing scheme is treated as https
/// 3. Hostname in the fixed blocklist → "Blocked hostname"
/// 4. Literal private or link-local IPv4, bare or IPv4-mapped IPv6 →
///    "Private IP address"
/// 5. `..` in the path or the domain → "suspicious path traversal"
///
/// The private address check is lexical: hostnames are never resolved.
///
/// # Examples
///
/// ```
/// use prompt_harvest::url::validate;
///
/// assert!(validate("https://example.com/docs").valid);
/// assert!(validate("example.com").valid);
/// assert!(!validate("ftp://example.com/").valid);
/// assert!(!validate("http://192.168.1.10/").valid);
/// ```
pub fn validate(input: &str) -> ValidationVerdict {
    match parse_checked(input) {
        Ok(_) => ValidationVerdict::accept(),
        Err(reason) => ValidationVerdict::reject(reason),
    }
}

/// Parses and validates in one pass, returning the parsed URL on success
pub(crate) fn parse_checked(input: &str) -> Result<Url, String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err("Invalid URL format: empty input".to_string());
    }

    let candidate = with_default_scheme(trimmed);
    let url = Url::parse(&candidate).map_err(|e| format!("Invalid URL format: {}", e))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(format!("Invalid protocol: {}", url.scheme()));
    }

    let host = url
        .host()
        .ok_or_else(|| "Invalid URL format: missing hostname".to_string())?;

    if is_blocked_host(&host) {
        return Err(format!("Blocked hostname: {}", host));
    }

    if let Some(addr) = literal_ipv4(&host) {
        if addr.is_unspecified() || is_private_ipv4(addr) {
            return Err(format!("Private IP address: {}", host));
        }
    }

    if has_traversal(&candidate) {
        return Err("Invalid URL: suspicious path traversal".to_string());
    }

    Ok(url)
}

/// Prepends `https://` when the input carries no scheme of its own
///
/// `example.com:8080/path` is scheme-less even though it parses as a URL
/// with scheme `example.com`, so a port-shaped remainder is treated as a
/// missing scheme.
fn with_default_scheme(input: &str) -> Cow<'_, str> {
    if has_explicit_scheme(input) {
        Cow::Borrowed(input)
    } else {
        Cow::Owned(format!("https://{}", input))
    }
}

fn has_explicit_scheme(input: &str) -> bool {
    let Some((scheme, rest)) = input.split_once(':') else {
        return false;
    };

    let mut chars = scheme.chars();
    let valid_scheme = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    if !valid_scheme {
        return false;
    }

    // host:port, optionally followed by a path
    let port: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    let after_port = &rest[port.len()..];
    let looks_like_port =
        !port.is_empty() && (after_port.is_empty() || after_port.starts_with(['/', '?', '#']));

    !looks_like_port
}

fn is_blocked_host(host: &Host<&str>) -> bool {
    match host {
        Host::Domain(domain) => {
            let domain = domain.to_lowercase();
            BLOCKED_HOSTNAMES.contains(&domain.as_str()) || domain.ends_with(".localhost")
        }
        Host::Ipv4(addr) => addr.is_unspecified(),
        Host::Ipv6(addr) => addr.is_loopback() || addr.is_unspecified(),
    }
}

/// IPv4 literal behind the host, including the `::ffff:a.b.c.d` mapped form
fn literal_ipv4(host: &Host<&str>) -> Option<Ipv4Addr> {
    match host {
        Host::Ipv4(addr) => Some(*addr),
        Host::Ipv6(addr) => addr.to_ipv4_mapped(),
        Host::Domain(_) => None,
    }
}

/// Returns true for 10/8, 172.16/12, 192.168/16, 127/8 and 169.254/16
pub fn is_private_ipv4(addr: Ipv4Addr) -> bool {
    let [a, b, _, _] = addr.octets();
    matches!(
        (a, b),
        (10, _) | (127, _) | (192, 168) | (169, 254) | (172, 16..=31)
    )
}

/// Detects `..` in the authority or as a path segment
///
/// Runs on the raw candidate string because URL parsing removes dot
/// segments before they could be inspected.
fn has_traversal(candidate: &str) -> bool {
    let after_scheme = candidate
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(candidate);

    let (authority, path) = match after_scheme.find(['/', '?', '#']) {
        Some(idx) => after_scheme.split_at(idx),
        None => (after_scheme, ""),
    };

    if authority.contains("..") {
        return true;
    }

    let path = path.split(['?', '#']).next().unwrap_or("");
    path.split(['/', '\\']).any(|segment| {
        let lowered = segment.to_ascii_lowercase();
        matches!(lowered.as_str(), ".." | "%2e%2e" | ".%2e" | "%2e.")
    })
}
