//! LiveJournal username handling
//!
//! Validates usernames, extracts them from journal URLs and builds the
//! journal, profile and FOAF links for a username.

use std::fmt;

use thiserror::Error;

/// Domain used by LiveJournal journals
pub const DEFAULT_DOMAIN: &str = "livejournal.com";

/// Errors produced while turning user input into a username
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    /// The candidate contains characters outside `[a-z0-9_]` or is empty
    #[error("\"{0}\" is not a valid LiveJournal user name.")]
    Invalid(String),

    /// The URL does not point at a journal
    #[error("\"{0}\" is not a LiveJournal journal URL.")]
    NotAJournalUrl(String),
}

/// Returns true if `username` is a non-empty string of `[a-z0-9_]` only.
pub fn is_valid_username(username: &str) -> bool {
    !username.is_empty()
        && username
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// A validated, canonical LiveJournal username
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity(String);

impl Identity {
    /// Validates `username` as-is. No case folding or hyphen translation is done.
    pub fn parse(username: &str) -> Result<Self, IdentityError> {
        if is_valid_username(username) {
            Ok(Self(username.to_string()))
        } else {
            Err(IdentityError::Invalid(username.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Identity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The journal service usernames belong to
///
/// Holds the domain and scheme used to parse journal URLs and to build links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    domain: String,
    scheme: String,
}

impl Default for Service {
    fn default() -> Self {
        Self::new(DEFAULT_DOMAIN, "http")
    }
}

impl Service {
    pub fn new(domain: impl Into<String>, scheme: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            scheme: scheme.into(),
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Turns a bare username or a journal URL into a validated username.
    ///
    /// Anything containing `.`, `/` or `:` is treated as a URL; everything
    /// else must already be a valid username.
    pub fn normalize(&self, raw: &str) -> Result<Identity, IdentityError> {
        if !raw.contains(['.', '/', ':']) {
            return Identity::parse(raw);
        }

        let username = self.username_from_url(raw);
        if username.is_empty() {
            return Err(IdentityError::NotAJournalUrl(raw.to_string()));
        }
        Identity::parse(&username)
    }

    /// Extracts the username from a journal URL, or returns an empty string.
    ///
    /// The scheme is optional. `users.` and `community.` hosts carry the
    /// username in the first path segment, `www.` carries none, and any other
    /// subdomain of the service is the username itself. Hyphens become
    /// underscores.
    pub fn username_from_url(&self, url: &str) -> String {
        let rest = match url.find("://") {
            Some(idx) => &url[idx + 3..],
            None => url.strip_prefix("//").unwrap_or(url),
        };
        let rest = rest.split(['?', '#']).next().unwrap_or_default();

        let (authority, path) = match rest.find('/') {
            Some(idx) => rest.split_at(idx),
            None => (rest, ""),
        };
        let host = authority.rsplit('@').next().unwrap_or_default();
        let host = host.split(':').next().unwrap_or_default();

        let username = if host == self.host("users") || host == self.host("community") {
            path.split('/').find(|s| !s.is_empty()).unwrap_or_default()
        } else if host == self.host("www") {
            ""
        } else if !host.ends_with(&format!(".{}", self.domain)) {
            ""
        } else {
            host.split('.').next().unwrap_or_default()
        };

        username.replace('-', "_")
    }

    /// Link to a user's journal.
    ///
    /// Usernames with a leading or trailing underscore can't be expressed as a
    /// subdomain, so they use the `users.` host form.
    pub fn userlink(&self, username: &str) -> String {
        if username.starts_with('_') || username.ends_with('_') {
            format!("{}://{}/{}/", self.scheme, self.host("users"), username)
        } else {
            format!(
                "{}://{}.{}/",
                self.scheme,
                username.replace('_', "-"),
                self.domain
            )
        }
    }

    /// Link to a user's profile page.
    pub fn profilelink(&self, username: &str) -> String {
        self.userlink(username) + "profile"
    }

    /// Link to a user's FOAF document. Doesn't check the username.
    pub fn foaflink(&self, username: &str) -> String {
        self.userlink(username) + "data/foaf"
    }

    fn host(&self, prefix: &str) -> String {
        format!("{}.{}", prefix, self.domain)
    }
}
