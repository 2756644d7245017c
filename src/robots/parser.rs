//! Robots.txt parser implementation
//!
//! Directive parsing comes from the robotstxt crate, matching is our own.
//! Only the `User-agent: *` groups are honored. Rules are plain path
//! prefixes; the longest matching prefix decides, and an Allow rule only
//! overrides a Disallow rule when its prefix is strictly longer.

use robotstxt::{parse_robotstxt, RobotsParseHandler};
use serde::{Deserialize, Serialize};

/// Parsed robots.txt rules for one crawl run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RobotsPolicy {
    pub disallowed_prefixes: Vec<String>,
    pub allowed_prefixes: Vec<String>,
    pub sitemaps: Vec<String>,
}

impl RobotsPolicy {
    /// Creates a permissive policy that allows everything
    ///
    /// This is used as the default when robots.txt cannot be fetched.
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Parses raw robots.txt content
    ///
    /// Tokenizing is done by the robotstxt crate; `PolicyCollector` keeps
    /// the prefixes of `User-agent: *` groups and every `Sitemap` line.
    /// Unknown directives and malformed lines are ignored.
    pub fn parse(content: &str) -> Self {
        let mut collector = PolicyCollector::default();
        parse_robotstxt(content, &mut collector);
        collector.policy
    }

    /// Checks if a path (optionally with query) may be fetched
    ///
    /// # Examples
    ///
    /// ```
    /// use prompt_harvest::robots::RobotsPolicy;
    ///
    /// let policy = RobotsPolicy::parse("User-agent: *\nDisallow: /private/\nAllow: /private/press/");
    /// assert!(policy.is_allowed("/public/index.html"));
    /// assert!(!policy.is_allowed("/private/notes"));
    /// assert!(policy.is_allowed("/private/press/release"));
    /// ```
    pub fn is_allowed(&self, path: &str) -> bool {
        let longest = |prefixes: &[String]| {
            prefixes
                .iter()
                .filter(|prefix| path.starts_with(prefix.as_str()))
                .map(String::len)
                .max()
        };

        match longest(&self.disallowed_prefixes) {
            None => true,
            Some(disallow_len) => longest(&self.allowed_prefixes)
                .is_some_and(|allow_len| allow_len > disallow_len),
        }
    }

    /// Returns true when the policy contains no path rules
    pub fn is_permissive(&self) -> bool {
        self.disallowed_prefixes.is_empty()
    }
}

/// Collects rule prefixes while the robotstxt parser walks the file
///
/// Consecutive `User-agent` lines form one group; the group applies when
/// any of its agents is `*`.
#[derive(Debug, Default)]
struct PolicyCollector {
    policy: RobotsPolicy,
    group_applies: bool,
    reading_agents: bool,
}

impl PolicyCollector {
    fn rule(&mut self, value: &str) -> Option<String> {
        self.reading_agents = false;
        (self.group_applies && !value.is_empty()).then(|| value.to_string())
    }
}

impl RobotsParseHandler for PolicyCollector {
    fn handle_robots_start(&mut self) {}

    fn handle_robots_end(&mut self) {}

    fn handle_user_agent(&mut self, _line_num: u32, user_agent: &str) {
        if !self.reading_agents {
            // A user-agent after rules starts a new group
            self.group_applies = false;
            self.reading_agents = true;
        }
        if user_agent.split_whitespace().next() == Some("*") {
            self.group_applies = true;
        }
    }

    fn handle_allow(&mut self, _line_num: u32, value: &str) {
        if let Some(prefix) = self.rule(value) {
            self.policy.allowed_prefixes.push(prefix);
        }
    }

    fn handle_disallow(&mut self, _line_num: u32, value: &str) {
        if let Some(prefix) = self.rule(value) {
            self.policy.disallowed_prefixes.push(prefix);
        }
    }

    fn handle_sitemap(&mut self, _line_num: u32, value: &str) {
        if !value.is_empty() {
            self.policy.sitemaps.push(value.to_string());
        }
    }

    fn handle_unknown_action(&mut self, _line_num: u32, _action: &str, _value: &str) {
        self.reading_agents = false;
    }
}
