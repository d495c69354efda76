use crate::{Error, Result};
use regex::Regex;
use std::collections::HashMap;

/// The name of the header carrying credentials.
pub const AUTHORIZATION: &str = "authorization";

/// The parts of an inbound HTTP request that authentication looks at.
///
/// Header names are case-insensitive, cookie names are not.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    path: Option<String>,
    headers: HashMap<String, String>,
    cookies: HashMap<String, String>,
}

impl RequestContext {
    /// Create a request for `path` without headers or cookies.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Default::default()
        }
    }

    /// Add a header, replacing any header with the same name.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Add a cookie, replacing any cookie with the same name.
    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    /// The request path, if known.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// The value of the header `name`.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// The value of the cookie `name`.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }
}

/// Path patterns that do not require authentication.
///
/// A `*` in a pattern matches any run of characters. Patterns match a prefix of the path, so
/// `/api/v1/stat*` covers `/api/v1/status/` as well as `/api/v1/stats/`, and `/api/v1/status`
/// covers everything below it.
#[derive(Debug, Clone, Default)]
pub struct ExemptPaths {
    patterns: Vec<(String, Regex)>,
}

impl ExemptPaths {
    /// Compile the given patterns.
    pub fn new<Pattern: AsRef<str>>(patterns: impl IntoIterator<Item = Pattern>) -> Result<Self> {
        let patterns = patterns
            .into_iter()
            .map(|pattern| {
                let pattern = pattern.as_ref();
                compile_pattern(pattern).map(|regex| (pattern.to_string(), regex))
            })
            .collect::<Result<_>>()?;
        Ok(Self { patterns })
    }

    /// Returns true if there are no patterns.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// The patterns, in the order they were given.
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(|(pattern, _)| pattern.as_str())
    }

    /// Returns false iff `path` is exempt from authentication.
    ///
    /// A missing or empty path and an empty pattern set always require authentication.
    /// The path is given a trailing `/` before matching.
    ///
    /// # Example
    ///
    /// ```rust
    /// # use typed_auth::ExemptPaths;
    /// # fn main() -> typed_auth::Result {
    /// let exempt = ExemptPaths::new(["/api/v1/stat*", "/api/v1/forbidden/"])?;
    /// assert!(!exempt.requires_auth(Some("/api/v1/status")));
    /// assert!(!exempt.requires_auth(Some("/api/v1/stats")));
    /// assert!(!exempt.requires_auth(Some("/api/v1/forbidden")));
    /// assert!(exempt.requires_auth(Some("/api/v1/users")));
    /// assert!(exempt.requires_auth(None));
    /// # Ok(()) }
    /// ```
    pub fn requires_auth(&self, path: Option<&str>) -> bool {
        let Some(path) = path.filter(|path| !path.is_empty()) else {
            return true;
        };
        if self.patterns.is_empty() {
            return true;
        }

        let normalized;
        let path = if path.ends_with('/') {
            path
        } else {
            normalized = format!("{path}/");
            &normalized
        };

        !self.patterns.iter().any(|(_, regex)| regex.is_match(path))
    }
}

fn compile_pattern(pattern: &str) -> Result<Regex> {
    let expression = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    Regex::new(&format!("^{expression}")).map_err(|source| Error::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}
