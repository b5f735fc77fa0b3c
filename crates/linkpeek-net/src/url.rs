//! URL parsing and resolution (simplified RFC 3986).
//!
//! Hrefs in host documents may be relative; they are resolved against the
//! document's base URL before prefix matching.
//!
//! Path, query and fragment are always held percent-encoded, the way a
//! browser reports `HTMLAnchorElement.href`: spaces, quotes and non-ASCII
//! characters are escaped on the way in, existing `%XX` escapes are kept.

use std::fmt;

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

/// Escaped in paths.
const PATH_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Escaped in query strings.
const QUERY_SET: &AsciiSet = &CONTROLS.add(b' ').add(b'"').add(b'#').add(b'<').add(b'>');

/// Escaped in fragments.
const FRAGMENT_SET: &AsciiSet = &CONTROLS.add(b' ').add(b'"').add(b'<').add(b'>').add(b'`');

fn encode(s: &str, set: &'static AsciiSet) -> String {
    utf8_percent_encode(s, set).to_string()
}

/// A parsed absolute URL.
#[derive(Debug, Clone, PartialEq)]
pub struct Url {
    /// Lowercased scheme (e.g. `"https"`).
    pub scheme: String,
    pub host: String,
    pub port: Option<u16>,
    /// Percent-encoded path starting with `/`.
    pub path: String,
    /// Percent-encoded query string without the leading `?`.
    pub query: Option<String>,
    /// Percent-encoded fragment without the leading `#`.
    pub fragment: Option<String>,
}

impl Url {
    /// Parse an absolute (`scheme://host/path`) URL.
    ///
    /// Relative references return `None`; use [`Url::resolve`] for those.
    pub fn parse(url: &str) -> Option<Self> {
        let url = url.trim();
        let idx = url.find("://")?;
        let scheme = &url[..idx];
        if scheme.is_empty()
            || !scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        {
            return None;
        }
        Self::parse_authority_and_path(scheme, &url[idx + 3..])
    }

    /// Parse `host[:port]/path?query#fragment` once the scheme is known.
    fn parse_authority_and_path(scheme: &str, rest: &str) -> Option<Url> {
        let (rest, fragment) = match rest.find('#') {
            Some(i) => (&rest[..i], Some(encode(&rest[i + 1..], FRAGMENT_SET))),
            None => (rest, None),
        };

        let (rest, query) = match rest.find('?') {
            Some(i) => (&rest[..i], Some(encode(&rest[i + 1..], QUERY_SET))),
            None => (rest, None),
        };

        let (authority, path) = match rest.find('/') {
            Some(i) => (&rest[..i], &rest[i..]),
            None => (rest, "/"),
        };

        let (host, port) = match authority.rfind(':') {
            Some(i) => match authority[i + 1..].parse::<u16>() {
                Ok(p) => (&authority[..i], Some(p)),
                Err(_) => (authority, None),
            },
            None => (authority, None),
        };

        if host.is_empty() {
            return None;
        }

        Some(Url {
            scheme: scheme.to_lowercase(),
            host: host.to_lowercase(),
            port,
            path: encode(path, PATH_SET),
            query,
            fragment,
        })
    }

    /// Resolve a (possibly relative) reference against this base URL.
    ///
    /// Handles absolute URLs (returned as parsed), protocol-relative
    /// (`//host/path`), absolute paths, relative paths with `.`/`..`,
    /// query-only and fragment-only references.
    pub fn resolve(&self, relative: &str) -> Option<Url> {
        let relative = relative.trim();
        if relative.is_empty() {
            return Some(self.clone());
        }

        if relative.contains("://") {
            return Url::parse(relative);
        }

        if let Some(rest) = relative.strip_prefix("//") {
            return Self::parse_authority_and_path(&self.scheme, rest);
        }

        if let Some(frag) = relative.strip_prefix('#') {
            let mut resolved = self.clone();
            resolved.fragment = Some(encode(frag, FRAGMENT_SET));
            return Some(resolved);
        }

        if let Some(query) = relative.strip_prefix('?') {
            let mut resolved = self.clone();
            resolved.query = Some(encode(query, QUERY_SET));
            resolved.fragment = None;
            return Some(resolved);
        }

        let (rel_path, query, fragment) = split_path_query_fragment(relative);
        let path = if rel_path.starts_with('/') {
            resolve_path("/", &rel_path)
        } else {
            resolve_path(self.directory(), &rel_path)
        };
        Some(Url {
            scheme: self.scheme.clone(),
            host: self.host.clone(),
            port: self.port,
            path: encode(&path, PATH_SET),
            query: query.map(|q| encode(&q, QUERY_SET)),
            fragment: fragment.map(|f| encode(&f, FRAGMENT_SET)),
        })
    }

    /// Directory portion of the path (up to and including the last `/`).
    pub fn directory(&self) -> &str {
        match self.path.rfind('/') {
            Some(i) => &self.path[..=i],
            None => "/",
        }
    }

    /// `scheme://host[:port]`.
    pub fn origin(&self) -> String {
        let mut s = format!("{}://{}", self.scheme, self.host);
        if let Some(port) = self.port {
            s.push_str(&format!(":{port}"));
        }
        s
    }

    /// Path plus query, as sent on the HTTP request line.
    pub fn request_target(&self) -> String {
        match self.query {
            Some(ref q) => format!("{}?{}", self.path, q),
            None => self.path.clone(),
        }
    }

    /// Default port for the scheme when none is given explicitly.
    pub fn port_or_default(&self) -> u16 {
        self.port
            .unwrap_or(if self.scheme == "https" { 443 } else { 80 })
    }
}

impl fmt::Display for Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{port}")?;
        }
        write!(f, "{}", self.path)?;
        if let Some(ref q) = self.query {
            write!(f, "?{q}")?;
        }
        if let Some(ref frag) = self.fragment {
            write!(f, "#{frag}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

/// Split a (possibly relative) path string into `(path, query, fragment)`.
fn split_path_query_fragment(s: &str) -> (String, Option<String>, Option<String>) {
    let (s, fragment) = match s.find('#') {
        Some(i) => (&s[..i], Some(s[i + 1..].to_string())),
        None => (s, None),
    };
    let (path, query) = match s.find('?') {
        Some(i) => (s[..i].to_string(), Some(s[i + 1..].to_string())),
        None => (s.to_string(), None),
    };
    (path, query, fragment)
}

/// Resolve a relative path against a base directory, collapsing `.` and
/// `..` segments. A trailing `/` on `relative` is kept.
fn resolve_path(base_dir: &str, relative: &str) -> String {
    let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();

    for seg in relative.split('/') {
        match seg {
            "" | "." => {},
            ".." => {
                segments.pop();
            },
            s => segments.push(s),
        }
    }

    let mut out = format!("/{}", segments.join("/"));
    if relative.ends_with('/') && !out.ends_with('/') {
        out.push('/');
    }
    out
}
