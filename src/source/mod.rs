//! Source references and their normalization.
//!
//! Users name repositories in many shapes. [`Source::parse`] turns any of them into a
//! canonical [`Source`] record with a stable lookup `name` and a protocol-qualified
//! clone `url`:
//!
//! | Input | `name` | `url` |
//! |-------|--------|-------|
//! | `anthropics/skills` | `anthropics/skills` | `https://github.com/anthropics/skills.git` |
//! | `anthropics/skills#document-skills` | `anthropics/skills` | same, `subdir = document-skills` |
//! | `https://gitlab.com/team/tools` | `team/tools` | `https://gitlab.com/team/tools.git` |
//! | `git@github.com:team/tools.git` | `team/tools` | `ssh://git@github.com/team/tools.git` |
//! | `https://git.corp/a/b/c` | `git.corp_a_b_c` | `https://git.corp/a/b/c` |
//! | `/srv/skills` | `srv_skills` | `file:///srv/skills` |
//!
//! Parsing is a pure function of the input. It fails with
//! [`SkillsError::InvalidSourceFormat`] only when the input has no `/` at all.

use anyhow::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

use crate::constants::{DEFAULT_HOST, KNOWN_HOSTS};
use crate::core::SkillsError;
use crate::discovery::RepoFormat;

static SCHEME_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<scheme>[A-Za-z][A-Za-z0-9+.-]*)://(?:(?P<user>[^@/]+)@)?(?P<host>[^/:]*)(?::(?P<port>\d+))?(?P<path>/.*)?$",
    )
    .expect("scheme URL pattern compiles")
});

static SCP_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(?P<user>[A-Za-z0-9._-]+)@)?(?P<host>[A-Za-z0-9.-]+):(?P<path>[^/].*)$")
        .expect("scp URL pattern compiles")
});

/// A normalized reference to a git repository publishing artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// Stable lookup key, unique within a project (usually `owner/repo`)
    pub name: String,

    /// Protocol-qualified clone URL
    pub url: String,

    /// Forces a discovery strategy instead of auto-detection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<RepoFormat>,

    /// Limits discovery to this repository subtree
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subdir: Option<String>,
}

impl Source {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            format: None,
            subdir: None,
        }
    }

    #[must_use]
    pub const fn with_format(mut self, format: Option<RepoFormat>) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_subdir(mut self, subdir: Option<String>) -> Self {
        self.subdir = subdir;
        self
    }

    /// Name for an unnamed artifact or collection sitting at the discovery root.
    ///
    /// The last `subdir` segment, else the repository segment of the URL. Never
    /// depends on where the repository happens to be checked out.
    ///
    /// ```rust
    /// use skills_cli::source::Source;
    ///
    /// assert_eq!(Source::parse("acme/pdf-skill")?.root_name(), "pdf-skill");
    /// assert_eq!(Source::parse("acme/tools#skills/review")?.root_name(), "review");
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    #[must_use]
    pub fn root_name(&self) -> String {
        if let Some(last) = self.subdir.as_deref().and_then(|s| s.rsplit('/').next()) {
            if !last.is_empty() {
                return last.to_string();
            }
        }
        let trimmed = self.url.trim_end_matches('/');
        let last = trimmed.rsplit(['/', ':']).next().unwrap_or(trimmed);
        let last = last.strip_suffix(".git").unwrap_or(last);
        if last.is_empty() {
            self.name.rsplit('/').next().unwrap_or(&self.name).to_string()
        } else {
            last.to_string()
        }
    }

    /// The clone URL with any credentials removed, for logs and messages.
    #[must_use]
    pub fn display_url(&self) -> String {
        strip_auth_from_url(&self.url)
    }

    /// Parses a free-form repository reference.
    ///
    /// A trailing `#subdir` fragment is split off first. The remainder may be
    /// `owner/repo` shorthand, an `http(s)://`, `ssh://`, `git://` or `file://` URL,
    /// scp-style `[user@]host:owner/repo`, or a local path.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use skills_cli::source::Source;
    ///
    /// let source = Source::parse("anthropics/skills#document-skills")?;
    /// assert_eq!(source.name, "anthropics/skills");
    /// assert_eq!(source.url, "https://github.com/anthropics/skills.git");
    /// assert_eq!(source.subdir.as_deref(), Some("document-skills"));
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    ///
    /// # Errors
    ///
    /// [`SkillsError::InvalidSourceFormat`] when the input is empty, has no `/`, or
    /// its subdirectory tries to leave the repository.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let invalid = |reason: &str| SkillsError::InvalidSourceFormat {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        let (base, fragment) = match trimmed.split_once('#') {
            Some((base, fragment)) => (base.trim(), clean_subdir(fragment)),
            None => (trimmed, None),
        };
        if base.is_empty() {
            return Err(invalid("no repository given").into());
        }
        if !base.contains('/') {
            return Err(invalid("expected 'owner/repo', a URL, or a path").into());
        }
        if fragment.as_deref().is_some_and(|s| s.split('/').any(|seg| seg == "..")) {
            return Err(invalid("subdirectory must stay inside the repository").into());
        }

        let parsed = if is_local_path(base) {
            local_source(base)
        } else if let Some(source) = parse_scheme_url(base) {
            source
        } else if let Some(source) = parse_scp_url(base) {
            source
        } else if let Some(source) = parse_shorthand(base) {
            source
        } else {
            Self::new(fallback_name(base), base.trim_end_matches('/'))
        };

        let subdir = fragment.or(parsed.subdir.clone());
        if subdir.as_deref().is_some_and(|s| s.split('/').any(|seg| seg == "..")) {
            return Err(invalid("subdirectory must stay inside the repository").into());
        }
        tracing::trace!("Normalized source '{}' to {} ({})", input, parsed.name, parsed.url);
        Ok(parsed.with_subdir(subdir))
    }
}

impl fmt::Display for Source {
    /// `url[#subdir][ (format)]`, with credentials removed from the URL.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_url())?;
        if let Some(subdir) = &self.subdir {
            write!(f, "#{subdir}")?;
        }
        if let Some(format) = self.format {
            write!(f, " ({format})")?;
        }
        Ok(())
    }
}

/// Builds `name = owner/repo` and a `.git`-suffixed URL on `host`.
fn hosted(prefix: &str, host: &str, owner: &str, repo: &str) -> Source {
    let repo = repo.strip_suffix(".git").unwrap_or(repo);
    Source::new(format!("{owner}/{repo}"), format!("{prefix}{host}/{owner}/{repo}.git"))
}

/// Path segments after `owner/repo` that name a subtree (`tree/<ref>/<path>`).
fn subdir_from_extra(extra: &[&str], browse_url: bool) -> Option<String> {
    if !browse_url {
        return clean_subdir(&extra.join("/"));
    }
    let rest = match extra {
        ["-", "tree" | "blob", _reference, rest @ ..] | ["tree" | "blob", _reference, rest @ ..] => {
            rest
        }
        _ => return None,
    };
    clean_subdir(&rest.join("/"))
}

/// The `<ref>` of a `.../tree/<ref>/...` or `.../blob/<ref>/...` browse URL.
///
/// [`Source::parse`] keeps only the subtree of such a URL; callers that want to pin
/// what the user was looking at read the ref from here.
///
/// ```rust
/// use skills_cli::source::browse_ref;
///
/// let url = "https://github.com/anthropics/skills/tree/v1.2/document-skills";
/// assert_eq!(browse_ref(url).as_deref(), Some("v1.2"));
/// assert_eq!(browse_ref("anthropics/skills"), None);
/// ```
#[must_use]
pub fn browse_ref(input: &str) -> Option<String> {
    let base = input.trim().split('#').next()?;
    let caps = SCHEME_URL.captures(base)?;
    if caps["scheme"].eq_ignore_ascii_case("file") {
        return None;
    }
    let segments: Vec<&str> =
        caps.name("path")?.as_str().split('/').filter(|s| !s.is_empty()).collect();
    match segments.as_slice() {
        [_, _, "-", "tree" | "blob", reference, ..] | [_, _, "tree" | "blob", reference, ..] => {
            Some((*reference).to_string())
        }
        _ => None,
    }
}

fn parse_scheme_url(base: &str) -> Option<Source> {
    let caps = SCHEME_URL.captures(base)?;

    let scheme = caps["scheme"].to_ascii_lowercase();
    if scheme == "file" {
        return Some(Source::new(fallback_name(base), base.trim_end_matches('/')));
    }

    let host = caps["host"].to_ascii_lowercase();
    let segments: Vec<&str> = caps
        .name("path")
        .map_or("", |m| m.as_str())
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();
    let known = KNOWN_HOSTS.contains(&host.as_str());
    if host.is_empty() || segments.len() < 2 || (!known && segments.len() != 2) {
        return Some(Source::new(fallback_name(base), base.trim_end_matches('/')));
    }

    let port = caps.name("port").map(|p| format!(":{}", p.as_str())).unwrap_or_default();
    let host_port = format!("{host}{port}");
    let prefix = match scheme.as_str() {
        "ssh" | "git+ssh" | "ssh+git" => {
            let user = caps.name("user").map_or("git", |u| u.as_str());
            format!("ssh://{user}@")
        }
        "http" | "https" => match caps.name("user") {
            Some(user) => format!("{scheme}://{}@", user.as_str()),
            None => format!("{scheme}://"),
        },
        other => format!("{other}://"),
    };

    let mut source = hosted(&prefix, &host_port, segments[0], segments[1]);
    source.subdir = subdir_from_extra(&segments[2..], true);
    Some(source)
}

fn parse_scp_url(base: &str) -> Option<Source> {
    let caps = SCP_URL.captures(base)?;

    let segments: Vec<&str> = caps["path"].split('/').filter(|s| !s.is_empty()).collect();
    if segments.len() < 2 {
        return Some(Source::new(fallback_name(base), base));
    }

    let user = caps.name("user").map_or("git", |u| u.as_str());
    let host = caps["host"].to_ascii_lowercase();
    let mut source = hosted(&format!("ssh://{user}@"), &host, segments[0], segments[1]);
    source.subdir = subdir_from_extra(&segments[2..], false);
    Some(source)
}

fn parse_shorthand(base: &str) -> Option<Source> {
    if base.contains(':') || base.starts_with('/') {
        return None;
    }
    let segments: Vec<&str> = base.split('/').filter(|s| !s.is_empty()).collect();
    if segments.len() < 2 || segments.iter().any(|s| s.chars().any(char::is_whitespace)) {
        return None;
    }

    let mut source = hosted("https://", DEFAULT_HOST, segments[0], segments[1]);
    source.subdir = subdir_from_extra(&segments[2..], false);
    Some(source)
}

fn is_local_path(base: &str) -> bool {
    base.starts_with('/') || base.starts_with("./") || base.starts_with("../")
}

fn local_source(base: &str) -> Source {
    let trimmed = base.trim_end_matches('/');
    let url = if trimmed.starts_with('/') {
        format!("file://{trimmed}")
    } else {
        trimmed.to_string()
    };
    Source::new(fallback_name(trimmed), url)
}

/// Normalizes a subdirectory fragment; empty means none.
fn clean_subdir(raw: &str) -> Option<String> {
    let segments: Vec<&str> =
        raw.trim().split('/').filter(|s| !s.is_empty() && *s != ".").collect();
    if segments.is_empty() { None } else { Some(segments.join("/")) }
}

/// Derives a usable name from an unrecognized URL.
///
/// Drops the protocol and any credentials, the trailing `.git` and slashes, and
/// flattens the remaining separators to `_`.
#[must_use]
pub fn fallback_name(url: &str) -> String {
    let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    let without_auth = match without_scheme.split_once('@') {
        Some((auth, rest)) if !auth.contains('/') => rest,
        _ => without_scheme,
    };
    let trimmed = without_auth.trim_matches('/');
    let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);
    let trimmed = trimmed.trim_start_matches("./").trim_start_matches("../");

    trimmed
        .chars()
        .map(|c| if matches!(c, '/' | ':' | '\\') { '_' } else { c })
        .collect()
}

/// Removes `user[:password]@` from a URL.
#[must_use]
pub fn strip_auth_from_url(url: &str) -> String {
    if let Some((scheme, rest)) = url.split_once("://") {
        if let Some((auth, host_and_path)) = rest.split_once('@') {
            if !auth.contains('/') {
                return format!("{scheme}://{host_and_path}");
            }
        }
    }
    url.to_string()
}
